//! Dirichlet, Discrete model for categorical data
//!
//! Values are category indices in `0..dim`. The category probabilities have
//! a Dirichlet prior with one concentration per category. `N` is the largest
//! number of categories a model can hold; `dim` is fixed per `Shared` and
//! checked against `N` on construction.
use std::iter::repeat;

use log::debug;
use rand::Rng;
use rv::dist::Dirichlet;
use rv::misc::pflip;
use rv::traits::Rv;
use serde::{Deserialize, Serialize};

use crate::error::DdError;
use crate::lace_assert;
use crate::misc::ln_gamma;
use crate::traits::{GroupT, SamplerT, ScorerT, SharedT, VectorizedScorerT};
use lace_utils::{vector_add_subtract, vector_log, vector_sum, Packed};

pub type Value = usize;

pub type Mixture<const N: usize> = crate::mixture::Mixture<VectorizedScorer<N>>;

/// Capacity used when there is no reason to pick another
pub const DEFAULT_MAX_DIM: usize = 256;

/// Dirichlet concentrations, one per category
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Shared<const N: usize> {
    alphas: heapless::Vec<f64, N>,
}

impl<const N: usize> Shared<N> {
    /// Create a new prior with `alphas.len()` categories
    pub fn new(alphas: &[f64]) -> Result<Self, DdError> {
        if alphas.is_empty() {
            return Err(DdError::EmptyDimension);
        }

        if let Some((ix, &alpha)) = alphas
            .iter()
            .enumerate()
            .find(|(_, &alpha)| !(alpha > 0.0 && alpha.is_finite()))
        {
            return Err(DdError::AlphaTooLow { ix, alpha });
        }

        heapless::Vec::from_slice(alphas)
            .map(|alphas| Shared { alphas })
            .map_err(|_| DdError::DimensionTooLarge {
                dim: alphas.len(),
                max_dim: N,
            })
    }

    /// Create a new prior with the same concentration for every category
    pub fn symmetric(dim: usize, alpha: f64) -> Result<Self, DdError> {
        Self::new(&vec![alpha; dim])
    }

    /// The number of categories
    #[inline]
    pub fn dim(&self) -> usize {
        self.alphas.len()
    }

    #[inline]
    pub fn alphas(&self) -> &[f64] {
        &self.alphas
    }

    #[inline]
    pub fn alpha_sum(&self) -> f64 {
        self.alphas.iter().sum()
    }
}

impl<const N: usize> SharedT for Shared<N> {
    type Value = Value;
    type Group = Group<N>;

    fn plus_group(&self, group: &Group<N>) -> Self {
        let alphas = self
            .alphas
            .iter()
            .zip(group.counts.iter())
            .map(|(alpha, &count)| alpha + count as f64)
            .collect();
        Shared { alphas }
    }
}

/// Per-category counts of a group
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Group<const N: usize> {
    count_sum: usize,
    counts: heapless::Vec<usize, N>,
}

impl<const N: usize> Group<N> {
    #[inline]
    pub fn counts(&self) -> &[usize] {
        &self.counts
    }
}

impl<const N: usize> GroupT for Group<N> {
    type Shared = Shared<N>;
    type Value = Value;

    fn new(shared: &Shared<N>) -> Self {
        Group {
            count_sum: 0,
            counts: repeat(0).take(shared.dim()).collect(),
        }
    }

    fn init(&mut self, shared: &Shared<N>) {
        *self = Self::new(shared);
    }

    #[inline]
    fn count(&self) -> usize {
        self.count_sum
    }

    fn add_value(&mut self, shared: &Shared<N>, value: &usize) {
        lace_assert!(1, *value < shared.dim(), "value out of bounds: {}", value);
        self.count_sum += 1;
        self.counts[*value] += 1;
    }

    fn remove_value(&mut self, shared: &Shared<N>, value: &usize) {
        assert!(self.count_sum > 0, "Can't remove from an empty group");
        lace_assert!(1, *value < shared.dim(), "value out of bounds: {}", value);
        assert!(
            self.counts[*value] > 0,
            "Can't remove {} from a group that does not contain it",
            value
        );
        self.count_sum -= 1;
        self.counts[*value] -= 1;
    }

    fn merge(&mut self, _shared: &Shared<N>, source: &Group<N>) {
        self.counts
            .iter_mut()
            .zip(source.counts.iter())
            .for_each(|(count, source_count)| *count += source_count);
        self.count_sum += source.count_sum;
    }

    fn score_value(&self, shared: &Shared<N>, value: &usize) -> f64 {
        Scorer::new(shared, self).eval(shared, value)
    }

    fn score_data(&self, shared: &Shared<N>) -> f64 {
        let (score, alpha_sum) = shared
            .alphas
            .iter()
            .zip(self.counts.iter())
            .fold((0.0, 0.0), |(score, alpha_sum), (&alpha, &count)| {
                (
                    score + ln_gamma(alpha + count as f64) - ln_gamma(alpha),
                    alpha_sum + alpha,
                )
            });
        score + ln_gamma(alpha_sum)
            - ln_gamma(alpha_sum + self.count_sum as f64)
    }

    fn sample_value<R: Rng>(&self, shared: &Shared<N>, rng: &mut R) -> usize {
        Sampler::new(shared, self, rng).eval(shared, rng)
    }
}

/// Posterior pseudo-counts of one group
#[derive(Clone, Debug, PartialEq)]
pub struct Scorer<const N: usize> {
    alpha_sum: f64,
    alphas: heapless::Vec<f64, N>,
}

impl<const N: usize> ScorerT for Scorer<N> {
    type Shared = Shared<N>;

    fn new(shared: &Shared<N>, group: &Group<N>) -> Self {
        let post = shared.plus_group(group);
        Scorer {
            alpha_sum: post.alpha_sum(),
            alphas: post.alphas,
        }
    }

    #[inline]
    fn eval(&self, shared: &Shared<N>, value: &usize) -> f64 {
        lace_assert!(1, *value < shared.dim(), "value out of bounds: {}", value);
        (self.alphas[*value] / self.alpha_sum).ln()
    }
}

/// A posterior draw of the category probabilities
#[derive(Clone, Debug, PartialEq)]
pub struct Sampler<const N: usize> {
    ps: Vec<f64>,
}

impl<const N: usize> SamplerT for Sampler<N> {
    type Shared = Shared<N>;

    fn new<R: Rng>(shared: &Shared<N>, group: &Group<N>, rng: &mut R) -> Self {
        let post = shared.plus_group(group);
        let ps: Vec<f64> =
            Dirichlet::new_unchecked(post.alphas.to_vec()).draw(rng);
        Sampler { ps }
    }

    fn eval<R: Rng>(&self, _shared: &Shared<N>, rng: &mut R) -> usize {
        pflip(&self.ps, 1, rng)[0]
    }
}

/// Incrementally patched marginal likelihood of a set of groups.
///
/// Holds one term per category plus one for the concentration sum, so that
/// changing a single concentration only touches two terms. Valid only for
/// the groups it was initialized with, and only until they change.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CachedDataScorer<const N: usize> {
    alpha_sum: f64,
    shared_part: Vec<f64>,
    scores: Vec<f64>,
}

impl<const N: usize> CachedDataScorer<N> {
    pub fn init(&mut self, shared: &Shared<N>, groups: &[Group<N>]) {
        let dim = shared.dim();

        self.shared_part.clear();
        self.alpha_sum = 0.0;
        for &alpha in shared.alphas() {
            self.alpha_sum += alpha;
            self.shared_part.push(ln_gamma(alpha));
        }
        self.shared_part.push(ln_gamma(self.alpha_sum));

        self.scores.clear();
        self.scores.resize(dim + 1, 0.0);
        for group in groups.iter().filter(|group| !group.is_empty()) {
            for (ix, &alpha) in shared.alphas().iter().enumerate() {
                self.scores[ix] += ln_gamma(alpha + group.counts[ix] as f64)
                    - self.shared_part[ix];
            }
            self.scores[dim] += self.shared_part[dim]
                - ln_gamma(self.alpha_sum + group.count_sum as f64);
        }
    }

    /// The log marginal likelihood under the current concentrations
    pub fn eval(&self) -> f64 {
        vector_sum(&self.scores)
    }

    /// Change the concentration of category `value` from `old_alpha` to
    /// `new_alpha`
    pub fn update(
        &mut self,
        value: usize,
        old_alpha: f64,
        new_alpha: f64,
        groups: &[Group<N>],
    ) {
        assert!(
            !self.scores.is_empty(),
            "CachedDataScorer must be initialized before it is updated"
        );
        let dim = self.scores.len() - 1;
        lace_assert!(1, value < dim, "value out of bounds: {}", value);

        self.shared_part[value] = ln_gamma(new_alpha);
        self.alpha_sum += new_alpha - old_alpha;
        self.shared_part[dim] = ln_gamma(self.alpha_sum);

        self.scores[value] = 0.0;
        self.scores[dim] = 0.0;
        for group in groups.iter().filter(|group| !group.is_empty()) {
            self.scores[value] += ln_gamma(new_alpha + group.counts[value] as f64)
                - self.shared_part[value];
            self.scores[dim] += self.shared_part[dim]
                - ln_gamma(self.alpha_sum + group.count_sum as f64);
        }
    }
}

/// Log posterior pseudo-counts of every group.
///
/// `scores[value][groupid]` is `ln(alpha[value] + count[value])` and
/// `scores_shift[groupid]` is `ln(alpha_sum + count_sum)`, so scoring is a
/// lookup and a subtraction.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct VectorizedScorer<const N: usize> {
    alpha_sum: f64,
    scores: Vec<Vec<f64>>,
    scores_shift: Vec<f64>,
}

impl<const N: usize> VectorizedScorer<N> {
    fn update_row_value(
        &mut self,
        shared: &Shared<N>,
        groupid: usize,
        group: &Group<N>,
        value: usize,
    ) {
        self.scores[value][groupid] =
            (shared.alphas[value] + group.counts[value] as f64).ln();
    }

    fn update_row_shift(&mut self, groupid: usize, group: &Group<N>) {
        self.scores_shift[groupid] =
            (self.alpha_sum + group.count_sum as f64).ln();
    }
}

impl<const N: usize> VectorizedScorerT for VectorizedScorer<N> {
    type Shared = Shared<N>;
    type Group = Group<N>;
    type Value = Value;
    type DataCache = CachedDataScorer<N>;

    #[inline]
    fn len(&self) -> usize {
        self.scores_shift.len()
    }

    fn resize(&mut self, shared: &Shared<N>, size: usize) {
        self.alpha_sum = shared.alpha_sum();
        self.scores_shift.resize(size, 0.0);
        self.scores.resize(shared.dim(), Vec::new());
        self.scores.iter_mut().for_each(|row| row.resize(size, 0.0));
    }

    fn add_group(&mut self, _shared: &Shared<N>) {
        self.scores_shift.packed_add(0.0);
        self.scores.iter_mut().for_each(|row| row.packed_add(0.0));
    }

    fn remove_group(&mut self, _shared: &Shared<N>, groupid: usize) {
        self.scores_shift.packed_remove(groupid);
        self.scores
            .iter_mut()
            .for_each(|row| row.packed_remove(groupid));
    }

    fn update_group(
        &mut self,
        shared: &Shared<N>,
        groupid: usize,
        group: &Group<N>,
    ) {
        for value in 0..shared.dim() {
            self.update_row_value(shared, groupid, group, value);
        }
        self.update_row_shift(groupid, group);
    }

    fn update_group_value(
        &mut self,
        shared: &Shared<N>,
        groupid: usize,
        group: &Group<N>,
        value: &usize,
    ) {
        lace_assert!(1, *value < shared.dim(), "value out of bounds: {}", value);
        self.update_row_value(shared, groupid, group, *value);
        self.update_row_shift(groupid, group);
    }

    fn update_all(&mut self, shared: &Shared<N>, groups: &[Group<N>]) {
        lace_assert!(
            2,
            groups.len() == self.len(),
            "{} groups but {} rows",
            groups.len(),
            self.len()
        );
        self.alpha_sum = shared.alpha_sum();
        for (groupid, group) in groups.iter().enumerate() {
            for (value, &alpha) in shared.alphas().iter().enumerate() {
                self.scores[value][groupid] = alpha + group.counts[value] as f64;
            }
            self.scores_shift[groupid] = self.alpha_sum + group.count_sum as f64;
        }
        vector_log(&mut self.scores_shift);
        self.scores.iter_mut().for_each(|row| vector_log(row));
    }

    fn score_value(
        &self,
        shared: &Shared<N>,
        value: &usize,
        scores_accum: &mut [f64],
    ) {
        lace_assert!(1, *value < shared.dim(), "value out of bounds: {}", value);
        lace_assert!(
            2,
            scores_accum.len() == self.len(),
            "scores_accum has length {} but there are {} groups",
            scores_accum.len(),
            self.len()
        );
        vector_add_subtract(
            scores_accum,
            &self.scores[*value],
            &self.scores_shift,
        );
    }

    fn score_data(
        &self,
        shared: &Shared<N>,
        groups: &[Group<N>],
        cache: &mut CachedDataScorer<N>,
    ) -> f64 {
        cache.init(shared, groups);
        cache.eval()
    }

    fn score_data_grid(
        &self,
        shareds: &[Shared<N>],
        groups: &[Group<N>],
        cache: &mut CachedDataScorer<N>,
        scores_out: &mut [f64],
    ) {
        assert_eq!(shareds.len(), scores_out.len());
        if shareds.is_empty() {
            return;
        }

        let dim = shareds[0].dim();
        cache.init(&shareds[0], groups);
        scores_out[0] = cache.eval();

        let mut n_patches: usize = 0;
        for (pair, score) in shareds.windows(2).zip(scores_out.iter_mut().skip(1)) {
            let (old, new) = (&pair[0], &pair[1]);
            assert_eq!(new.dim(), dim, "grid points must share a dimension");
            for (value, (&old_alpha, &new_alpha)) in
                old.alphas().iter().zip(new.alphas().iter()).enumerate()
            {
                if new_alpha != old_alpha {
                    cache.update(value, old_alpha, new_alpha, groups);
                    n_patches += 1;
                }
            }
            *score = cache.eval();
        }
        debug!(
            "Scored {} grid points over {} groups with {} patches",
            shareds.len(),
            groups.len(),
            n_patches
        );
    }
}

/// Draw one value from the posterior predictive of `group`
pub fn sample_value<R: Rng, const N: usize>(
    shared: &Shared<N>,
    group: &Group<N>,
    rng: &mut R,
) -> usize {
    Sampler::new(shared, group, rng).eval(shared, rng)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::*;
    use rand::SeedableRng;
    use rand_xoshiro::Xoshiro256Plus;

    const TOL: f64 = 1E-10;

    type Sh = Shared<8>;
    type Gr = Group<8>;

    fn group_from(shared: &Sh, xs: &[usize]) -> Gr {
        let mut group = Gr::new(shared);
        xs.iter().for_each(|x| group.add_value(shared, x));
        group
    }

    #[test]
    fn new_validates_alphas() {
        assert_eq!(Sh::new(&[]), Err(DdError::EmptyDimension));
        assert_eq!(
            Sh::new(&[1.0, 0.0]),
            Err(DdError::AlphaTooLow { ix: 1, alpha: 0.0 })
        );
        assert_eq!(
            Sh::new(&[1.0; 9]),
            Err(DdError::DimensionTooLarge { dim: 9, max_dim: 8 })
        );
        assert_eq!(Sh::new(&[1.0; 8]).unwrap().dim(), 8);
    }

    #[test]
    fn add_and_remove_counts() {
        let shared = Sh::symmetric(3, 0.5).unwrap();
        let mut group = group_from(&shared, &[0, 0, 1]);
        group.remove_value(&shared, &1);
        assert_eq!(group.counts(), &[2, 0, 0]);
        assert_eq!(group.count(), 2);
    }

    #[test]
    #[should_panic]
    fn add_out_of_bounds_value_panics() {
        let shared = Sh::symmetric(3, 0.5).unwrap();
        let mut group = Gr::new(&shared);
        group.add_value(&shared, &3);
    }

    #[test]
    #[should_panic]
    fn remove_from_empty_group_panics() {
        let shared = Sh::symmetric(3, 0.5).unwrap();
        let mut group = Gr::new(&shared);
        group.remove_value(&shared, &0);
    }

    #[test]
    #[should_panic]
    fn remove_absent_value_panics() {
        let shared = Sh::symmetric(3, 0.5).unwrap();
        let mut group = group_from(&shared, &[0]);
        group.remove_value(&shared, &2);
    }

    #[test]
    fn merge_keeps_count_sum_in_sync() {
        let shared = Sh::symmetric(3, 0.5).unwrap();
        let mut group = group_from(&shared, &[0, 2]);
        group.merge(&shared, &group_from(&shared, &[1, 2, 2]));
        assert_eq!(group.counts(), &[1, 1, 3]);
        assert_eq!(group.count(), group.counts().iter().sum::<usize>());
    }

    #[test]
    fn merge_is_associative_and_commutative() {
        let shared = Sh::symmetric(4, 0.5).unwrap();
        let a = group_from(&shared, &[0, 3, 3]);
        let b = Gr::new(&shared);
        let c = group_from(&shared, &[1, 2, 2, 3, 0, 0, 1]);
        let direct = group_from(&shared, &[0, 3, 3, 1, 2, 2, 3, 0, 0, 1]);

        let merged = |first: &Gr, second: &Gr| {
            let mut group = first.clone();
            group.merge(&shared, second);
            group
        };

        let ab_c = merged(&merged(&a, &b), &c);
        let a_bc = merged(&a, &merged(&b, &c));
        let ca_b = merged(&merged(&c, &a), &b);

        for group in [ab_c, a_bc, ca_b].iter() {
            assert_eq!(group, &direct);
        }
    }

    #[test]
    #[should_panic(expected = "initialized")]
    fn updating_uninitialized_cache_panics() {
        let mut cache = CachedDataScorer::<8>::default();
        cache.update(0, 1.0, 2.0, &[]);
    }

    #[test]
    fn predictive_sums_to_one() {
        let shared = Sh::new(&[0.5, 1.0, 2.5, 0.1]).unwrap();
        let group = group_from(&shared, &[0, 3, 3, 1]);
        let total: f64 = (0..shared.dim())
            .map(|x| group.score_value(&shared, &x).exp())
            .sum();
        assert_relative_eq!(total, 1.0, epsilon = TOL);
    }

    #[test]
    fn sequential_predictive_equals_marginal() {
        let shared = Sh::new(&[0.5, 1.0, 2.5]).unwrap();
        let xs = [2, 0, 2, 2, 1, 0];
        let mut group = Gr::new(&shared);
        let mut total = 0.0;
        for x in xs.iter() {
            total += group.score_value(&shared, x);
            group.add_value(&shared, x);
        }
        assert_relative_eq!(total, group.score_data(&shared), epsilon = 1E-9);
    }

    #[test]
    fn vectorized_scores_match_group_scores_after_value_updates() {
        let shared = Sh::new(&[0.5, 1.0, 2.0]).unwrap();
        let mut groups = vec![Gr::new(&shared), group_from(&shared, &[1, 1])];
        let mut scorer = VectorizedScorer::default();
        scorer.resize(&shared, groups.len());
        scorer.update_all(&shared, &groups);

        groups[0].add_value(&shared, &2);
        scorer.update_group_value(&shared, 0, &groups[0], &2);
        groups[1].remove_value(&shared, &1);
        scorer.update_group_value(&shared, 1, &groups[1], &1);

        for x in 0..shared.dim() {
            let mut scores = vec![0.0; groups.len()];
            scorer.score_value(&shared, &x, &mut scores);
            for (score, group) in scores.iter().zip(groups.iter()) {
                assert_relative_eq!(
                    *score,
                    group.score_value(&shared, &x),
                    epsilon = TOL
                );
            }
        }
    }

    #[test]
    fn score_data_sums_group_marginals() {
        let shared = Sh::new(&[0.5, 1.0, 2.0]).unwrap();
        let groups = vec![
            group_from(&shared, &[0, 1]),
            Gr::new(&shared),
            group_from(&shared, &[2, 2, 2, 0]),
        ];
        let scorer = VectorizedScorer::default();
        let expected: f64 =
            groups.iter().map(|group| group.score_data(&shared)).sum();
        let mut cache = CachedDataScorer::default();
        assert_relative_eq!(
            scorer.score_data(&shared, &groups, &mut cache),
            expected,
            epsilon = TOL
        );
    }

    #[test]
    fn grid_matches_fresh_score_data() {
        let groups_shared = Sh::symmetric(3, 1.0).unwrap();
        let groups = vec![
            group_from(&groups_shared, &[0, 1, 1]),
            group_from(&groups_shared, &[2]),
            group_from(&groups_shared, &[0, 0, 0, 2, 1]),
        ];
        let shareds = vec![
            Sh::new(&[1.0, 1.0, 1.0]).unwrap(),
            Sh::new(&[2.0, 1.0, 1.0]).unwrap(),
            Sh::new(&[2.0, 0.5, 1.0]).unwrap(),
            Sh::new(&[2.0, 0.5, 1.0]).unwrap(),
            Sh::new(&[0.1, 3.0, 7.0]).unwrap(),
        ];
        let scorer = VectorizedScorer::default();
        let mut cache = CachedDataScorer::default();
        let mut scores = vec![0.0; shareds.len()];
        scorer.score_data_grid(&shareds, &groups, &mut cache, &mut scores);

        for (shared, score) in shareds.iter().zip(scores.iter()) {
            let mut fresh = CachedDataScorer::default();
            assert_relative_eq!(
                *score,
                scorer.score_data(shared, &groups, &mut fresh),
                epsilon = 1E-8
            );
        }
    }

    #[test]
    fn posterior_samples_follow_counts() {
        let mut rng = Xoshiro256Plus::seed_from_u64(1337);
        let shared = Sh::symmetric(3, 0.5).unwrap();
        let xs: Vec<usize> = (0..100).map(|i| usize::from(i >= 90)).collect();
        let group = group_from(&shared, &xs);

        let n = 5_000;
        let zeros = (0..n)
            .filter(|_| group.sample_value(&shared, &mut rng) == 0)
            .count();
        let freq = zeros as f64 / n as f64;
        assert!((freq - 0.89).abs() < 0.05, "frequency of 0 was {}", freq);
        let twos = (0..100)
            .filter(|_| sample_value(&shared, &group, &mut rng) == 2)
            .count();
        assert!(twos < 10, "drew {} twos", twos);
    }
}
