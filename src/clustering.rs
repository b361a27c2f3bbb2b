//! Clustering priors and helpers for choosing a group from scores
//!
//! The component models score how well a value fits each group; the
//! clustering prior scores how likely each group is to receive another
//! value. A collapsed Gibbs sampler adds the two and draws a group.
use rand::Rng;
use rv::misc::{ln_pflip, pflip};
use serde::{Deserialize, Serialize};

use crate::error::{LowEntropyError, PitmanYorError};
use crate::lace_assert;
use crate::misc::ln_gamma;
use lace_utils::{logsumexp, Packed};

/// Two-parameter Chinese restaurant process
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PitmanYor {
    alpha: f64,
    d: f64,
}

impl PitmanYor {
    /// Create a new Pitman-Yor process
    ///
    /// # Arguments
    /// - alpha: concentration, greater than `-d`
    /// - d: discount in [0, 1). `d = 0` is the Dirichlet process.
    pub fn new(alpha: f64, d: f64) -> Result<Self, PitmanYorError> {
        if !(0.0..1.0).contains(&d) {
            Err(PitmanYorError::DiscountOutOfRange { d })
        } else if !(alpha > -d && alpha.is_finite()) {
            Err(PitmanYorError::AlphaTooLow { alpha, d })
        } else {
            Ok(PitmanYor { alpha, d })
        }
    }

    #[inline]
    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    #[inline]
    pub fn d(&self) -> f64 {
        self.d
    }

    #[inline]
    fn ln_new_group_weight(&self, group_count: usize) -> f64 {
        self.d.mul_add(group_count as f64, self.alpha).ln()
    }

    /// Log probability that the next value joins a group.
    ///
    /// # Arguments
    /// - group_size: values in the group; 0 means a new group
    /// - group_count: non-empty groups, not counting the new one
    /// - sample_size: values seated so far
    pub fn score_add_value(
        &self,
        group_size: usize,
        group_count: usize,
        sample_size: usize,
    ) -> f64 {
        if sample_size == 0 {
            // the first value always starts a group
            return 0.0;
        }
        let ln_z = (sample_size as f64 + self.alpha).ln();
        if group_size == 0 {
            self.ln_new_group_weight(group_count) - ln_z
        } else {
            (group_size as f64 - self.d).ln() - ln_z
        }
    }

    /// Log probability change from taking a value out of a group of
    /// `group_size`. The inverse of `score_add_value`.
    pub fn score_remove_value(
        &self,
        group_size: usize,
        group_count: usize,
        sample_size: usize,
    ) -> f64 {
        assert!(group_size > 0, "Can't remove from an empty group");
        let group_size = group_size - 1;
        let group_count = if group_size == 0 {
            group_count - 1
        } else {
            group_count
        };
        -self.score_add_value(group_size, group_count, sample_size - 1)
    }

    /// Log probability of a partition with group sizes `counts`. Empty
    /// groups are ignored.
    pub fn score_counts(&self, counts: &[usize]) -> f64 {
        let ln_gamma_one_minus_d = ln_gamma(1.0 - self.d);
        let (group_part, group_count, sample_size) = counts
            .iter()
            .filter(|&&count| count > 0)
            .fold((0.0, 0_usize, 0_usize), |(score, k, n), &count| {
                (
                    score + ln_gamma(count as f64 - self.d)
                        - ln_gamma_one_minus_d,
                    k + 1,
                    n + count,
                )
            });

        if sample_size == 0 {
            return 0.0;
        }

        let new_group_part: f64 = (1..group_count)
            .map(|k| self.ln_new_group_weight(k))
            .sum();
        let ln_z = ln_gamma(self.alpha + sample_size as f64)
            - ln_gamma(self.alpha + 1.0);

        group_part + new_group_part - ln_z
    }

    /// Seat `size` values one at a time. Returns the group of each value;
    /// groups are numbered in order of creation.
    pub fn sample_assignments<R: Rng>(
        &self,
        size: usize,
        rng: &mut R,
    ) -> Vec<usize> {
        if size == 0 {
            return Vec::new();
        }

        let mut counts = vec![1];
        let mut ps = vec![1.0 - self.d, self.alpha + self.d];
        let mut assignments = vec![0; size];

        for z in assignments.iter_mut().skip(1) {
            let zi = pflip(&ps, 1, rng)[0];
            *z = zi;
            if zi < counts.len() {
                ps[zi] += 1.0;
                counts[zi] += 1;
            } else {
                ps[zi] = 1.0 - self.d;
                counts.push(1);
                ps.push(self.d.mul_add(counts.len() as f64, self.alpha));
            }
        }

        assignments
    }
}

/// Groups above this size score additions with the large-size limit
const VERY_LARGE_GROUP: usize = 10_000;

/// Clustering prior that favors a few large groups.
///
/// A partition of `n` values scores `sum_k n_k ln n_k`, which is `n` times
/// the negative entropy of the group proportions plus `n ln n`. Scores are
/// unnormalized. Opening a new group before all `dataset_size` values are
/// seated costs an approximate correction for the values still to come.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LowEntropy {
    dataset_size: usize,
}

impl LowEntropy {
    /// Create a prior for a dataset of `dataset_size` values
    pub fn new(dataset_size: usize) -> Result<Self, LowEntropyError> {
        if dataset_size == 0 {
            Err(LowEntropyError::EmptyDataset)
        } else {
            Ok(LowEntropy { dataset_size })
        }
    }

    #[inline]
    pub fn dataset_size(&self) -> usize {
        self.dataset_size
    }

    fn approximate_postpred_correction(&self, sample_size: usize) -> f64 {
        let sample_size = sample_size as f64;
        let dataset_size = self.dataset_size as f64;
        let exponent = 0.45 - 0.1 / sample_size - 0.1 / dataset_size;
        (dataset_size / sample_size).ln() * exponent
    }

    /// Unnormalized log weight of adding a value to a group.
    ///
    /// # Arguments
    /// - group_size: values in the group; 0 means a new group
    /// - group_count: non-empty groups; unused by this prior
    /// - sample_size: values seated so far
    pub fn score_add_value(
        &self,
        group_size: usize,
        _group_count: usize,
        sample_size: usize,
    ) -> f64 {
        if group_size == 0 {
            if sample_size == 0 || sample_size >= self.dataset_size {
                0.0
            } else {
                self.approximate_postpred_correction(sample_size)
            }
        } else if group_size > VERY_LARGE_GROUP {
            1.0 + (group_size as f64 + 1.0).ln()
        } else {
            let size = group_size as f64;
            let bigger = size + 1.0;
            (bigger / size).ln().mul_add(size, bigger.ln())
        }
    }

    /// The inverse of `score_add_value` for a value leaving a group of
    /// `group_size`
    pub fn score_remove_value(
        &self,
        group_size: usize,
        group_count: usize,
        sample_size: usize,
    ) -> f64 {
        assert!(group_size > 0, "Can't remove from an empty group");
        -self.score_add_value(group_size - 1, group_count, sample_size - 1)
    }

    /// `sum_k n_k ln n_k` over the group sizes. The correction for opening
    /// groups on a partial dataset is not included.
    pub fn score_counts(&self, counts: &[usize]) -> f64 {
        counts
            .iter()
            .filter(|&&count| count > 1)
            .map(|&count| {
                let count = count as f64;
                count * count.ln()
            })
            .sum()
    }

    /// Seat `size` values one at a time, weighting each group by
    /// `score_add_value`. Groups are numbered in order of creation.
    pub fn sample_assignments<R: Rng>(
        &self,
        size: usize,
        rng: &mut R,
    ) -> Vec<usize> {
        let mut counts: Vec<usize> = Vec::new();
        let mut scores: Vec<f64> = Vec::new();
        let mut assignments = Vec::with_capacity(size);

        for sample_size in 0..size {
            scores.clear();
            scores.extend(counts.iter().map(|&count| {
                self.score_add_value(count, counts.len(), sample_size)
            }));
            scores.push(self.score_add_value(0, counts.len(), sample_size));

            let z = sample_group(&scores, rng);
            if z == counts.len() {
                counts.push(1);
            } else {
                counts[z] += 1;
            }
            assignments.push(z);
        }

        assignments
    }
}

/// Group sizes from the group of each value.
///
/// Group ids are dense from 0; ids no value refers to get a count of 0.
/// Accepts anything that yields group ids, such as `asgn.iter()` or the
/// values of a map from value id to group id.
pub fn count_assignments<'a, I>(groupids: I) -> Vec<usize>
where
    I: IntoIterator<Item = &'a usize>,
{
    let mut counts = Vec::new();
    for &groupid in groupids {
        if groupid >= counts.len() {
            counts.resize(groupid + 1, 0);
        }
        counts[groupid] += 1;
    }
    counts
}

/// Group sizes under a `PitmanYor` prior, scored against every group at
/// once.
///
/// Samplers keep exactly one empty group, which stands for "start a new
/// group": after a value lands in it, add a new empty group, and remove
/// groups that become empty.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PitmanYorMixture {
    counts: Vec<usize>,
    sample_size: usize,
    group_count: usize,
    shifted_scores: Vec<f64>,
}

impl PitmanYorMixture {
    /// Build from existing group sizes
    pub fn from_counts(model: &PitmanYor, counts: Vec<usize>) -> Self {
        let mut mixture = PitmanYorMixture {
            counts,
            ..Default::default()
        };
        mixture.init(model);
        mixture
    }

    /// Recompute every cached score from the counts
    pub fn init(&mut self, model: &PitmanYor) {
        self.sample_size = self.counts.iter().sum();
        self.group_count =
            self.counts.iter().filter(|&&count| count > 0).count();
        self.shifted_scores.resize(self.counts.len(), 0.0);
        for groupid in 0..self.counts.len() {
            self.update_group(model, groupid);
        }
    }

    fn update_group(&mut self, model: &PitmanYor, groupid: usize) {
        let group_size = self.counts[groupid];
        self.shifted_scores[groupid] = if group_size == 0 {
            0.0
        } else {
            (group_size as f64 - model.d).ln()
        };
    }

    #[inline]
    pub fn counts(&self) -> &[usize] {
        &self.counts
    }

    #[inline]
    pub fn sample_size(&self) -> usize {
        self.sample_size
    }

    /// The number of non-empty groups
    #[inline]
    pub fn group_count(&self) -> usize {
        self.group_count
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Append an empty group
    pub fn add_group(&mut self, model: &PitmanYor) {
        let groupid = self.counts.len();
        self.counts.packed_add(0);
        self.shifted_scores.packed_add(0.0);
        self.update_group(model, groupid);
    }

    /// Remove the group at `groupid`; the last group moves into its slot
    pub fn remove_group(&mut self, _model: &PitmanYor, groupid: usize) {
        let group_size = self.counts[groupid];
        if group_size > 0 {
            self.sample_size -= group_size;
            self.group_count -= 1;
        }
        self.counts.packed_remove(groupid);
        self.shifted_scores.packed_remove(groupid);
    }

    pub fn add_value(&mut self, model: &PitmanYor, groupid: usize) {
        if self.counts[groupid] == 0 {
            self.group_count += 1;
        }
        self.counts[groupid] += 1;
        self.sample_size += 1;
        self.update_group(model, groupid);
    }

    pub fn remove_value(&mut self, model: &PitmanYor, groupid: usize) {
        assert!(
            self.counts[groupid] > 0,
            "Can't remove from an empty group"
        );
        self.counts[groupid] -= 1;
        self.sample_size -= 1;
        if self.counts[groupid] == 0 {
            self.group_count -= 1;
        }
        self.update_group(model, groupid);
    }

    /// Overwrite `scores` with the log probability that the next value
    /// joins each group
    pub fn score_value(&self, model: &PitmanYor, scores: &mut [f64]) {
        lace_assert!(
            2,
            scores.len() == self.counts.len(),
            "scores has length {} but there are {} groups",
            scores.len(),
            self.counts.len()
        );
        lace_assert!(
            3,
            self.counts.iter().filter(|&&count| count == 0).count() == 1,
            "expected exactly one empty group"
        );

        if self.sample_size == 0 {
            scores.iter_mut().for_each(|score| *score = 0.0);
            return;
        }

        let shift = -(self.sample_size as f64 + model.alpha).ln();
        let ln_new = model.ln_new_group_weight(self.group_count);
        scores
            .iter_mut()
            .zip(self.counts.iter().zip(self.shifted_scores.iter()))
            .for_each(|(score, (&count, &shifted))| {
                *score = if count == 0 { ln_new } else { shifted } + shift;
            });
    }
}

/// Normalize log scores into probabilities
pub fn posterior_weights(scores: &[f64]) -> Vec<f64> {
    let ln_z = logsumexp(scores);
    scores.iter().map(|score| (score - ln_z).exp()).collect()
}

/// Draw a group index with probability proportional to `exp(scores)`
pub fn sample_group<R: Rng>(scores: &[f64], rng: &mut R) -> usize {
    ln_pflip(scores, 1, false, rng)[0]
}
