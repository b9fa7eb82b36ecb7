//! Observation quantization and the Hidden Markov Model over character
//! n-gram states, including decoding and string reconstruction.
pub mod cluster;
pub mod depix;
pub mod model;
pub mod reconstruct;
