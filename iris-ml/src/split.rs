//! Deterministic train/test partitioning
//!
//! Sample indices are shuffled with a seeded Xoshiro256++ generator; the first
//! `ceil(test_size * n)` shuffled indices become the test set and the rest the
//! train set, so a given seed always yields the same partition.

use crate::core::unified_error::{errors, UnifiedResult};
use linfa::Dataset;
use ndarray::{Array1, Array2, Axis, Ix1};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256PlusPlus;

/// Two disjoint partitions of one dataset
#[derive(Debug, Clone)]
pub struct TrainTestSplit {
    pub train: Dataset<f64, usize, Ix1>,
    pub test: Dataset<f64, usize, Ix1>,
    /// Dataset row of each train sample
    pub train_indices: Vec<usize>,
    /// Dataset row of each test sample
    pub test_indices: Vec<usize>,
}

pub fn train_test_split(
    records: &Array2<f64>,
    targets: &Array1<usize>,
    test_size: f64,
    random_state: u64,
) -> UnifiedResult<TrainTestSplit> {
    let n_samples = records.nrows();
    if targets.len() != n_samples {
        return Err(errors::validation("targets", n_samples, targets.len()));
    }
    if !(test_size > 0.0 && test_size < 1.0) {
        return Err(errors::config_error(
            "test_size",
            &format!("must be in (0, 1), got {test_size}"),
        ));
    }

    let n_test = (test_size * n_samples as f64).ceil() as usize;
    let n_train = n_samples.saturating_sub(n_test);
    if n_test == 0 || n_train == 0 {
        return Err(errors::config_error(
            "test_size",
            &format!("{test_size} of {n_samples} samples leaves an empty partition"),
        ));
    }

    let mut indices: Vec<usize> = (0..n_samples).collect();
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(random_state);
    indices.shuffle(&mut rng);

    let test_indices = indices[..n_test].to_vec();
    let train_indices = indices[n_test..].to_vec();

    let train = Dataset::new(
        records.select(Axis(0), &train_indices),
        targets.select(Axis(0), &train_indices),
    );
    let test = Dataset::new(
        records.select(Axis(0), &test_indices),
        targets.select(Axis(0), &test_indices),
    );

    Ok(TrainTestSplit {
        train,
        test,
        train_indices,
        test_indices,
    })
}
