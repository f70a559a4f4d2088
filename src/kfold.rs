//! Stratified k-fold partitioning of labeled records.
//!
//! Folds are handed out by size rather than by role. In conventional k-fold
//! cross validation the (k-1)/k complement trains and the 1/k slice tests;
//! this dataset is large enough (over half a million flows) that the SVM
//! trained downstream cannot use the majority partition, so the layout
//! writer stores the small slice as the training set and the complement as
//! the testing set.

use log::{debug, info};
use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};

use crate::{
    error::{Error, Result},
    record::Label,
};

/// Seed used by the ISCX tooling for every published split.
pub const DEFAULT_SEED: u64 = 99999999;
pub const DEFAULT_FOLDS: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fold {
    /// 1-based fold number, as used in output file names.
    pub number: usize,
    /// The fold's own members, about 1/k of the records. Written as the
    /// training set.
    pub small_labeled_fold: Vec<usize>,
    /// Every record outside the fold. Written as the testing set.
    pub large_labeled_fold: Vec<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StratifiedKFold {
    folds: usize,
    seed: u64,
}

impl StratifiedKFold {
    pub fn new(folds: usize, seed: u64) -> Self {
        Self { folds, seed }
    }

    #[inline]
    pub fn folds(&self) -> usize {
        self.folds
    }

    /// Partitions `0..labels.len()` into stratified folds.
    pub fn split(&self, labels: &[Label]) -> Result<Vec<Fold>> {
        let k = self.folds;
        let n = labels.len();
        info!("calculating {k} stratified folds over {n} records");

        if k < 2 {
            return Err(Error::Configuration(format!(
                "at least 2 folds are required, got {k}"
            )));
        }
        if k > n {
            return Err(Error::Configuration(format!(
                "cannot split {n} records into {k} folds"
            )));
        }

        let mut classes: [Vec<usize>; 2] = [Vec::new(), Vec::new()];
        for (i, label) in labels.iter().enumerate() {
            classes[*label as usize].push(i);
        }

        for (label, members) in Label::ALL.iter().zip(&classes) {
            if !members.is_empty() && members.len() < k {
                return Err(Error::Configuration(format!(
                    "{k} folds requested but only {} {label:?} records exist; \
                     every fold needs at least one record of each class",
                    members.len()
                )));
            }
        }

        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut assignment = vec![0usize; n];
        // Each class continues dealing where the previous one stopped so
        // fold sizes never differ by more than one.
        let mut next = 0usize;
        for (label, members) in Label::ALL.iter().zip(classes.iter_mut()) {
            members.shuffle(&mut rng);
            for &index in members.iter() {
                assignment[index] = next;
                next = (next + 1) % k;
            }
            debug!("dealt {} {label:?} records", members.len());
        }

        let folds = (0..k)
            .map(|fold| {
                let (small, large): (Vec<usize>, Vec<usize>) =
                    (0..n).partition(|&index| assignment[index] == fold);
                Fold {
                    number: fold + 1,
                    small_labeled_fold: small,
                    large_labeled_fold: large,
                }
            })
            .collect();

        info!("fold calculation complete");
        Ok(folds)
    }
}
