/// The Hidden Markov Model: states are short character tuples, observations
/// are cluster indices. Log-domain matrices are derived lazily from the
/// linear ones on first decode so the two representations cannot drift.
use std::collections::HashMap;

use ndarray::{Array1, Array2};
use once_cell::sync::OnceCell;

use crate::errors::{DepixError, DepixResult};

pub type StateTuple = Vec<char>;

/// Tolerance for the row-stochasticity check.
const ROW_SUM_TOLERANCE: f64 = 1e-3;

pub struct Hmm {
    observations: Vec<usize>,
    states: Vec<StateTuple>,
    starting: Array1<f64>,
    transition: Array2<f64>,
    emission: Array2<f64>,
    observation_columns: HashMap<usize, usize>,
    log_starting: OnceCell<Array1<f64>>,
    log_transition: OnceCell<Array2<f64>>,
    log_emission: OnceCell<Array2<f64>>,
}

impl Hmm {
    /// Validates the matrix shapes against the state and observation counts
    /// (fatal) and warns about rows that do not sum to one.
    pub fn new(
        observations: Vec<usize>,
        states: Vec<StateTuple>,
        starting: Array1<f64>,
        transition: Array2<f64>,
        emission: Array2<f64>,
    ) -> DepixResult<Self> {
        let n_states = states.len();
        let n_observations = observations.len();

        if starting.len() != n_states {
            return Err(DepixError::Model(format!(
                "starting probabilities must have one entry per state ({} != {n_states})",
                starting.len()
            )));
        }
        if transition.dim() != (n_states, n_states) {
            return Err(DepixError::Model(format!(
                "transition probabilities must have shape ({n_states}, {n_states}), got {:?}",
                transition.dim()
            )));
        }
        if emission.dim() != (n_states, n_observations) {
            return Err(DepixError::Model(format!(
                "emission probabilities must have shape ({n_states}, {n_observations}), got {:?}",
                emission.dim()
            )));
        }

        warn_if_not_row_stochastic(&transition, "transition");
        warn_if_not_row_stochastic(&emission, "emission");

        let observation_columns = observations
            .iter()
            .enumerate()
            .map(|(col, &obs)| (obs, col))
            .collect();

        Ok(Self {
            observations,
            states,
            starting,
            transition,
            emission,
            observation_columns,
            log_starting: OnceCell::new(),
            log_transition: OnceCell::new(),
            log_emission: OnceCell::new(),
        })
    }

    pub fn states(&self) -> &[StateTuple] {
        &self.states
    }

    pub fn observations(&self) -> &[usize] {
        &self.observations
    }

    pub fn starting(&self) -> &Array1<f64> {
        &self.starting
    }

    pub fn transition(&self) -> &Array2<f64> {
        &self.transition
    }

    pub fn emission(&self) -> &Array2<f64> {
        &self.emission
    }

    pub fn log_starting(&self) -> &Array1<f64> {
        self.log_starting
            .get_or_init(|| self.starting.mapv(f64::ln))
    }

    pub fn log_transition(&self) -> &Array2<f64> {
        self.log_transition
            .get_or_init(|| self.transition.mapv(f64::ln))
    }

    pub fn log_emission(&self) -> &Array2<f64> {
        self.log_emission
            .get_or_init(|| self.emission.mapv(f64::ln))
    }

    fn observation_column(&self, observation: usize) -> DepixResult<usize> {
        self.observation_columns
            .get(&observation)
            .copied()
            .ok_or_else(|| {
                DepixError::Model(format!("observation {observation} was never seen in training"))
            })
    }

    fn columns_for(&self, sequence: &[usize]) -> DepixResult<Vec<usize>> {
        sequence
            .iter()
            .map(|&o| self.observation_column(o))
            .collect()
    }

    /// Linear-domain Viterbi. Underflows on long sequences; kept for short
    /// inputs and as the parity reference for the log decoder.
    pub fn viterbi(&self, sequence: &[usize]) -> DepixResult<Vec<StateTuple>> {
        if sequence.is_empty() {
            return Ok(Vec::new());
        }
        let cols = self.columns_for(sequence)?;
        let n = self.states.len();
        let len = cols.len();

        let mut scores = Array2::<f64>::zeros((n, len));
        let mut pointers = Array2::<usize>::zeros((n, len));

        for s in 0..n {
            scores[[s, 0]] = self.starting[s] * self.emission[[s, cols[0]]];
        }
        for t in 1..len {
            for s in 0..n {
                let (arg, best) = (0..n)
                    .map(|prev| (prev, scores[[prev, t - 1]] * self.transition[[prev, s]]))
                    .fold((0, f64::NEG_INFINITY), first_max);
                scores[[s, t]] = best * self.emission[[s, cols[t]]];
                pointers[[s, t]] = arg;
            }
        }

        Ok(self.backtrace(&scores, &pointers))
    }

    /// Log-domain Viterbi; the production decoder. Identical structure and
    /// argmax policy to the linear form, with sums instead of products.
    pub fn log_viterbi(&self, sequence: &[usize]) -> DepixResult<Vec<StateTuple>> {
        if sequence.is_empty() {
            return Ok(Vec::new());
        }
        let cols = self.columns_for(sequence)?;
        let n = self.states.len();
        let len = cols.len();

        let log_starting = self.log_starting();
        let log_transition = self.log_transition();
        let log_emission = self.log_emission();

        let mut scores = Array2::<f64>::zeros((n, len));
        let mut pointers = Array2::<usize>::zeros((n, len));

        for s in 0..n {
            scores[[s, 0]] = log_starting[s] + log_emission[[s, cols[0]]];
        }
        for t in 1..len {
            for s in 0..n {
                let (arg, best) = (0..n)
                    .map(|prev| (prev, scores[[prev, t - 1]] + log_transition[[prev, s]]))
                    .fold((0, f64::NEG_INFINITY), first_max);
                scores[[s, t]] = best + log_emission[[s, cols[t]]];
                pointers[[s, t]] = arg;
            }
        }

        Ok(self.backtrace(&scores, &pointers))
    }

    fn backtrace(&self, scores: &Array2<f64>, pointers: &Array2<usize>) -> Vec<StateTuple> {
        let len = scores.ncols();
        let n = scores.nrows();

        let mut path = vec![0usize; len];
        path[len - 1] = (0..n)
            .map(|s| (s, scores[[s, len - 1]]))
            .fold((0, f64::NEG_INFINITY), first_max)
            .0;
        for t in (1..len).rev() {
            path[t - 1] = pointers[[path[t], t]];
        }

        path.into_iter().map(|s| self.states[s].clone()).collect()
    }
}

/// Fold step keeping the first maximum, matching the argmax policy of both
/// decoders.
fn first_max(best: (usize, f64), candidate: (usize, f64)) -> (usize, f64) {
    if candidate.1 > best.1 {
        candidate
    } else {
        best
    }
}

fn warn_if_not_row_stochastic(matrix: &Array2<f64>, name: &str) {
    for (row, sum) in matrix
        .rows()
        .into_iter()
        .map(|r| r.sum())
        .enumerate()
    {
        if (sum - 1.0).abs() > ROW_SUM_TOLERANCE {
            tracing::warn!(row, sum, "{name} probabilities are not properly normalized");
        }
    }
}
