//! The contract every conjugate component model implements
use std::fmt::Debug;

use rand::Rng;

/// Prior hyperparameters shared by every group of a model
pub trait SharedT: Clone + Debug {
    /// The type of a single observation
    type Value;
    /// Per-group sufficient statistics
    type Group: GroupT<Shared = Self, Value = Self::Value>;

    /// The posterior hyperparameters after conditioning on `group`
    fn plus_group(&self, group: &Self::Group) -> Self;
}

/// Sufficient statistics of the observations assigned to one group
pub trait GroupT: Clone + Debug {
    type Shared: SharedT<Group = Self, Value = Self::Value>;
    type Value;

    /// An empty group
    fn new(shared: &Self::Shared) -> Self;

    /// Reset to the empty group
    fn init(&mut self, shared: &Self::Shared);

    /// The number of observations in the group
    fn count(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.count() == 0
    }

    /// Observe `value`
    fn add_value(&mut self, shared: &Self::Shared, value: &Self::Value);

    /// Forget a previously observed `value`.
    ///
    /// # Panics
    /// Panics if the group is empty.
    fn remove_value(&mut self, shared: &Self::Shared, value: &Self::Value);

    /// Absorb the statistics of `source` as if its values had been added
    fn merge(&mut self, shared: &Self::Shared, source: &Self);

    /// Log posterior predictive of `value`
    fn score_value(&self, shared: &Self::Shared, value: &Self::Value) -> f64;

    /// Log marginal likelihood of the observations in the group
    fn score_data(&self, shared: &Self::Shared) -> f64;

    /// Draw a value from the posterior predictive
    fn sample_value<R: Rng>(
        &self,
        shared: &Self::Shared,
        rng: &mut R,
    ) -> Self::Value;
}

/// Posterior predictive log density of one group, ready for repeated
/// evaluation
pub trait ScorerT {
    type Shared: SharedT;

    fn new(
        shared: &Self::Shared,
        group: &<Self::Shared as SharedT>::Group,
    ) -> Self;

    fn eval(
        &self,
        shared: &Self::Shared,
        value: &<Self::Shared as SharedT>::Value,
    ) -> f64;
}

/// A posterior draw of the latent parameters of one group, used to emit
/// predictive samples
pub trait SamplerT {
    type Shared: SharedT;

    fn new<R: Rng>(
        shared: &Self::Shared,
        group: &<Self::Shared as SharedT>::Group,
        rng: &mut R,
    ) -> Self;

    fn eval<R: Rng>(
        &self,
        shared: &Self::Shared,
        rng: &mut R,
    ) -> <Self::Shared as SharedT>::Value;
}

/// Scores one value against every group at once.
///
/// Holds one row of scoring parameters per group. Row `i` must always
/// describe the `i`th group of the collection it was built from; callers
/// are responsible for calling `update_group` after mutating a group and for
/// mirroring `remove_group`'s swap in their own collection.
pub trait VectorizedScorerT: Default + Clone + Debug {
    type Shared: SharedT<Group = Self::Group, Value = Self::Value>;
    type Group: GroupT<Shared = Self::Shared, Value = Self::Value>;
    type Value;
    /// Scratch state for `score_data`/`score_data_grid`. Owned by the
    /// caller for the length of one evaluation pass.
    type DataCache: Default;

    /// The number of rows
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Set the number of rows. Row contents are undefined until updated.
    fn resize(&mut self, shared: &Self::Shared, size: usize);

    /// Append a row
    fn add_group(&mut self, shared: &Self::Shared);

    /// Remove row `groupid`; the last row moves into its place
    fn remove_group(&mut self, shared: &Self::Shared, groupid: usize);

    /// Recompute row `groupid` from `group`
    fn update_group(
        &mut self,
        shared: &Self::Shared,
        groupid: usize,
        group: &Self::Group,
    );

    /// Recompute row `groupid` after `value` was added to or removed from
    /// `group`
    fn update_group_value(
        &mut self,
        shared: &Self::Shared,
        groupid: usize,
        group: &Self::Group,
        _value: &Self::Value,
    ) {
        self.update_group(shared, groupid, group);
    }

    /// Recompute every row
    fn update_all(&mut self, shared: &Self::Shared, groups: &[Self::Group]) {
        for (groupid, group) in groups.iter().enumerate() {
            self.update_group(shared, groupid, group);
        }
    }

    /// Add the log posterior predictive of `value` under each group to the
    /// corresponding entry of `scores_accum`
    fn score_value(
        &self,
        shared: &Self::Shared,
        value: &Self::Value,
        scores_accum: &mut [f64],
    );

    /// Log marginal likelihood of every group under `shared`
    fn score_data(
        &self,
        shared: &Self::Shared,
        groups: &[Self::Group],
        _cache: &mut Self::DataCache,
    ) -> f64 {
        groups.iter().map(|group| group.score_data(shared)).sum()
    }

    /// `score_data` for each hyperparameter set in `shareds`, written to the
    /// corresponding entry of `scores_out`
    fn score_data_grid(
        &self,
        shareds: &[Self::Shared],
        groups: &[Self::Group],
        cache: &mut Self::DataCache,
        scores_out: &mut [f64],
    ) {
        assert_eq!(shareds.len(), scores_out.len());
        shareds
            .iter()
            .zip(scores_out.iter_mut())
            .for_each(|(shared, out)| {
                *out = self.score_data(shared, groups, cache);
            });
    }
}
