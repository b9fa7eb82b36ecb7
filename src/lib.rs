//! Unpixel recovers text that was obscured with a block-mosaic filter.
//!
//! The attack is supervised and font-specific: given the font, block size,
//! and a regex describing the candidate strings, it synthesizes labeled
//! (text, pixelized image) pairs, trains a Hidden Markov Model whose states
//! are short character n-grams and whose observations are k-means cluster
//! indices over local pixel windows, and Viterbi-decodes a supplied
//! mosaicked image back into a character sequence.
pub mod config;
pub mod driver;
pub mod errors;
pub mod font;
pub mod hmm;
pub mod params;
pub mod pipeline;

pub use crate::errors::{DepixError, DepixResult};
pub use crate::hmm::depix::DepixHmm;
pub use crate::params::{PictureParams, TrainingParams};
