/// End-to-end model: synthesizes training data, fits the quantizer,
/// estimates the HMM distributions, and decodes mosaicked images back into
/// strings.
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::time::Instant;

use image::RgbImage;
use ndarray::{Array1, Array2};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::errors::{DepixError, DepixResult};
use crate::hmm::cluster::KMeansQuantizer;
use crate::hmm::model::{Hmm, StateTuple};
use crate::hmm::reconstruct::{reconstruct_string, string_similarity};
use crate::params::{PictureParams, TrainingParams};
use crate::pipeline::create_training_data;
use crate::pipeline::windows::{window_vectors_from_image, Window};

pub struct DepixHmm {
    picture: PictureParams,
    training: TrainingParams,
    rng: StdRng,
    quantizer: Option<KMeansQuantizer>,
    model: Option<Hmm>,
}

impl DepixHmm {
    pub fn new(picture: PictureParams, training: TrainingParams) -> Self {
        let rng = match training.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            picture,
            training,
            rng,
            quantizer: None,
            model: None,
        }
    }

    pub fn picture(&self) -> &PictureParams {
        &self.picture
    }

    pub fn training(&self) -> &TrainingParams {
        &self.training
    }

    pub fn model(&self) -> Option<&Hmm> {
        self.model.as_ref()
    }

    /// Synthesize the training batch, fit the quantizer, and estimate the
    /// HMM distributions.
    pub fn train(&mut self) -> DepixResult<()> {
        let data = create_training_data(self.training.n_img_train, &self.picture, &mut self.rng)?;
        let mut windows: Vec<Window> = data.windows.into_iter().flatten().collect();

        let t = Instant::now();
        let quantizer = KMeansQuantizer::fit(&windows, self.training.n_clusters, self.rng.gen())?;
        quantizer.assign_windows(&mut windows);
        tracing::info!(
            target: "unpixel::timing",
            elapsed_ms = t.elapsed().as_millis() as u64,
            "performed clustering"
        );

        let used_clusters: BTreeSet<usize> = windows.iter().filter_map(|w| w.cluster).collect();
        if used_clusters.len() != self.training.n_clusters {
            tracing::warn!(
                n_clusters = self.training.n_clusters,
                used = used_clusters.len(),
                "fewer clusters used than requested; typical for monospaced fonts whose \
                 glyph advance divides the window width"
            );
        }

        let t = Instant::now();
        let model = estimate_hmm(&windows)?;
        tracing::info!(
            target: "unpixel::timing",
            elapsed_ms = t.elapsed().as_millis() as u64,
            "calculated HMM properties"
        );

        self.log_state_summary(&model);
        self.quantizer = Some(quantizer);
        self.model = Some(model);
        Ok(())
    }

    /// Decode a user-supplied mosaicked image whose grid starts at the image
    /// origin. An image with fewer than `window_size` tile columns yields
    /// the empty string.
    pub fn decode_image(&self, image: &RgbImage) -> DepixResult<String> {
        let vectors =
            window_vectors_from_image(image, self.picture.block_size, self.picture.window_size);
        if vectors.is_empty() {
            tracing::warn!(
                width = image.width(),
                height = image.height(),
                block_size = self.picture.block_size,
                window_size = self.picture.window_size,
                "image has fewer tile columns than the window size; nothing to decode"
            );
            return Ok(String::new());
        }

        let (quantizer, _) = self.require_trained()?;
        let clusters = quantizer.assign(&vectors);
        self.decode_clusters(&clusters)
    }

    /// Decode windows that already carry feature vectors (the evaluation
    /// path); clusters are assigned in place first.
    pub fn decode_windows(&self, windows: &mut [Window]) -> DepixResult<String> {
        let (quantizer, _) = self.require_trained()?;
        quantizer.assign_windows(windows);
        let clusters: Vec<usize> = windows.iter().filter_map(|w| w.cluster).collect();
        self.decode_clusters(&clusters)
    }

    fn decode_clusters(&self, clusters: &[usize]) -> DepixResult<String> {
        let (_, model) = self.require_trained()?;
        let path = model.log_viterbi(clusters)?;
        Ok(reconstruct_string(
            &path,
            self.picture.block_size,
            self.picture.font.as_ref(),
        ))
    }

    /// Generate a fresh test batch and score the trained model against it.
    /// Returns the exact-match accuracy and the mean normalized similarity.
    pub fn evaluate(&mut self) -> DepixResult<(f64, f64)> {
        let t = Instant::now();
        let data = create_training_data(self.training.n_img_test, &self.picture, &mut self.rng)?;

        let mut exact = 0usize;
        let mut similarities: Vec<f64> = Vec::with_capacity(data.texts.len());
        for (text, mut windows) in data.texts.iter().zip(data.windows.into_iter()) {
            let reconstructed = self.decode_windows(&mut windows)?;
            let similarity = string_similarity(text, &reconstructed);
            if &reconstructed == text {
                exact += 1;
            }
            similarities.push(similarity);
            tracing::debug!(expected = %text, actual = %reconstructed, similarity, "evaluated example");
        }

        tracing::info!(
            target: "unpixel::timing",
            elapsed_ms = t.elapsed().as_millis() as u64,
            "performed evaluation"
        );

        if similarities.is_empty() {
            return Ok((0.0, 0.0));
        }
        let accuracy = exact as f64 / similarities.len() as f64;
        let average_similarity = similarities.iter().sum::<f64>() / similarities.len() as f64;
        Ok((accuracy, average_similarity))
    }

    fn require_trained(&self) -> DepixResult<(&KMeansQuantizer, &Hmm)> {
        match (&self.quantizer, &self.model) {
            (Some(q), Some(m)) => Ok((q, m)),
            _ => Err(DepixError::Model("model has not been trained".into())),
        }
    }

    /// How many states of each tuple length were observed, against the
    /// |alphabet|^len count a full language would produce.
    fn log_state_summary(&self, model: &Hmm) {
        let alphabet: BTreeSet<char> = model.states().iter().flatten().copied().collect();
        let mut by_length: BTreeMap<usize, usize> = BTreeMap::new();
        for state in model.states() {
            *by_length.entry(state.len()).or_default() += 1;
        }
        for (len, count) in by_length {
            tracing::debug!(
                len,
                count,
                expected = (alphabet.len() as f64).powi(len as i32) as u64,
                "observed states of tuple length"
            );
        }
    }
}

/// Estimate the HMM distributions from the flattened training stream.
/// Windows must arrive image-major and window-index-major; `window_index ==
/// 0` marks image starts and suppresses cross-image transitions.
pub fn estimate_hmm(windows: &[Window]) -> DepixResult<Hmm> {
    let clusters: Vec<usize> = windows
        .iter()
        .map(|w| {
            w.cluster
                .ok_or_else(|| DepixError::Model("window has no cluster assigned".into()))
        })
        .collect::<DepixResult<_>>()?;

    let observations: Vec<usize> = clusters.iter().copied().collect::<BTreeSet<_>>().into_iter().collect();
    let states: Vec<StateTuple> = windows
        .iter()
        .map(|w| w.characters.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let state_ids: HashMap<&StateTuple, usize> =
        states.iter().enumerate().map(|(i, s)| (s, i)).collect();
    let observation_ids: HashMap<usize, usize> = observations
        .iter()
        .enumerate()
        .map(|(i, &o)| (o, i))
        .collect();

    let n_states = states.len();

    // Starting probabilities from the first window of every image.
    let mut starting = Array1::<f64>::zeros(n_states);
    let mut n_starts = 0u64;
    for window in windows.iter().filter(|w| w.window_index == 0) {
        starting[state_ids[&window.characters]] += 1.0;
        n_starts += 1;
    }
    if n_starts > 0 {
        starting.mapv_inplace(|v| v / n_starts as f64);
    }

    // Transition counts over consecutive pairs, skipping image boundaries.
    let mut transition = Array2::<f64>::zeros((n_states, n_states));
    for pair in windows.windows(2) {
        if pair[1].window_index == 0 {
            continue;
        }
        let from = state_ids[&pair[0].characters];
        let to = state_ids[&pair[1].characters];
        transition[[from, to]] += 1.0;
    }
    // States without outgoing observations default to the uniform row;
    // a zero row would otherwise poison the log domain.
    for mut row in transition.rows_mut() {
        let sum = row.sum();
        if sum == 0.0 {
            row.fill(1.0 / n_states as f64);
        } else {
            row.mapv_inplace(|v| v / sum);
        }
    }

    let mut emission = Array2::<f64>::zeros((n_states, observations.len()));
    for (window, &cluster) in windows.iter().zip(&clusters) {
        emission[[state_ids[&window.characters], observation_ids[&cluster]]] += 1.0;
    }
    for mut row in emission.rows_mut() {
        let sum = row.sum();
        if sum > 0.0 {
            row.mapv_inplace(|v| v / sum);
        }
    }

    Hmm::new(observations, states, starting, transition, emission)
}
