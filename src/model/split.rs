//! Stratified train/test partitioning.

use crate::data::{CancerType, LabelVector};
use crate::error::{BiomarkerError, Result};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Sample indices assigned to the training and test partitions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitIndices {
    /// Training rows, ascending.
    pub train: Vec<usize>,
    /// Held-out rows, ascending.
    pub test: Vec<usize>,
}

/// Split samples into train and test sets, preserving class proportions.
///
/// Classes are visited in canonical order. Within each class the sample
/// indices are shuffled by a single `ChaCha8Rng` seeded from `seed`, and the
/// first `round(n_c * test_fraction)` go to the test set. Every class with at
/// least two samples keeps at least one sample on each side; a singleton
/// class stays in training.
///
/// # Arguments
/// * `labels` - Class label per sample
/// * `test_fraction` - Proportion held out, strictly between 0 and 1
/// * `seed` - Random seed; the same labels and seed give the same split
pub fn split_stratified(labels: &LabelVector, test_fraction: f64, seed: u64) -> Result<SplitIndices> {
    if !(test_fraction > 0.0 && test_fraction < 1.0) {
        return Err(BiomarkerError::InvalidParameter(format!(
            "Test fraction must be in (0, 1), got {}",
            test_fraction
        )));
    }

    let mut by_class: BTreeMap<CancerType, Vec<usize>> = BTreeMap::new();
    for (i, &label) in labels.labels().iter().enumerate() {
        by_class.entry(label).or_default().push(i);
    }

    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut train = Vec::with_capacity(labels.len());
    let mut test = Vec::new();
    for indices in by_class.values_mut() {
        indices.shuffle(&mut rng);
        let n_test = class_test_count(indices.len(), test_fraction);
        test.extend_from_slice(&indices[..n_test]);
        train.extend_from_slice(&indices[n_test..]);
    }

    if test.is_empty() {
        return Err(BiomarkerError::InvalidParameter(
            "Test partition is empty; need at least two samples in some class".to_string(),
        ));
    }

    train.sort_unstable();
    test.sort_unstable();
    Ok(SplitIndices { train, test })
}

fn class_test_count(n_class: usize, test_fraction: f64) -> usize {
    if n_class < 2 {
        return 0;
    }
    let n_test = (n_class as f64 * test_fraction).round() as usize;
    n_test.clamp(1, n_class - 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(counts: &[(CancerType, usize)]) -> LabelVector {
        let mut ids = Vec::new();
        let mut labs = Vec::new();
        for &(class, n) in counts {
            for _ in 0..n {
                ids.push(format!("s{}", ids.len()));
                labs.push(class);
            }
        }
        LabelVector::new(ids, labs).unwrap()
    }

    #[test]
    fn test_proportions_preserved() {
        let l = labels(&[(CancerType::BRCA, 50), (CancerType::COAD, 10), (CancerType::PRAD, 20)]);
        let split = split_stratified(&l, 0.2, 42).unwrap();
        assert_eq!(split.test.len(), 10 + 2 + 4);
        assert_eq!(split.train.len() + split.test.len(), 80);

        let test_labels = l.subset(&split.test).unwrap();
        let counts = test_labels.class_counts();
        assert_eq!(counts[&CancerType::BRCA], 10);
        assert_eq!(counts[&CancerType::COAD], 2);
        assert_eq!(counts[&CancerType::PRAD], 4);
    }

    #[test]
    fn test_disjoint_and_sorted() {
        let l = labels(&[(CancerType::KIRC, 7), (CancerType::LUAD, 9)]);
        let split = split_stratified(&l, 0.3, 1).unwrap();
        assert!(split.train.windows(2).all(|w| w[0] < w[1]));
        assert!(split.test.windows(2).all(|w| w[0] < w[1]));
        assert!(split.train.iter().all(|i| !split.test.contains(i)));
    }

    #[test]
    fn test_deterministic_for_seed() {
        let l = labels(&[(CancerType::BRCA, 30), (CancerType::LUAD, 30)]);
        let a = split_stratified(&l, 0.25, 7).unwrap();
        let b = split_stratified(&l, 0.25, 7).unwrap();
        let c = split_stratified(&l, 0.25, 8).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_small_classes() {
        let l = labels(&[(CancerType::BRCA, 2), (CancerType::COAD, 1)]);
        let split = split_stratified(&l, 0.1, 0).unwrap();
        assert_eq!(split.test.len(), 1);
        assert_eq!(split.train.len(), 2);
        assert!(split_stratified(&l, 1.0, 0).is_err());
        assert!(split_stratified(&l, 0.0, 0).is_err());
    }
}
