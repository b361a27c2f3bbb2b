//! A collection of groups kept in lock-step with their vectorized scorer
use log::{debug, trace};
use rand::Rng;

use crate::index::{GroupIndex, GroupKey};
use crate::lace_assert;
use crate::traits::{GroupT, VectorizedScorerT};
use lace_utils::Packed;

/// The groups of one component model and the scorer that scores values
/// against all of them.
///
/// Group `i` and scorer row `i` always describe the same group. Every
/// mutation goes through the mixture so the scorer is never stale.
#[derive(Clone, Debug, Default)]
pub struct Mixture<V: VectorizedScorerT> {
    scorer: V,
    groups: Vec<V::Group>,
    index: GroupIndex,
}

impl<V: VectorizedScorerT> Mixture<V> {
    /// An empty mixture. Call `init` before use.
    pub fn new() -> Self {
        Mixture {
            scorer: V::default(),
            groups: Vec::new(),
            index: GroupIndex::default(),
        }
    }

    /// Build a mixture over existing groups
    pub fn from_groups(shared: &V::Shared, groups: Vec<V::Group>) -> Self {
        let mut index = GroupIndex::default();
        groups.iter().for_each(|_| {
            index.push();
        });
        let mut mixture = Mixture {
            scorer: V::default(),
            groups,
            index,
        };
        mixture.init(shared);
        mixture
    }

    /// Rebuild every scorer row from the current groups. Must be called
    /// again whenever `shared` changes.
    pub fn init(&mut self, shared: &V::Shared) {
        self.scorer.resize(shared, self.groups.len());
        self.scorer.update_all(shared, &self.groups);
        debug!("Initialized mixture with {} groups", self.groups.len());
    }

    /// The number of groups
    #[inline]
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    #[inline]
    pub fn groups(&self) -> &[V::Group] {
        &self.groups
    }

    #[inline]
    pub fn group(&self, groupid: usize) -> &V::Group {
        &self.groups[groupid]
    }

    #[inline]
    pub fn scorer(&self) -> &V {
        &self.scorer
    }

    /// The current slot of the group with `key`, if it still exists
    pub fn slot_of(&self, key: GroupKey) -> Option<usize> {
        self.index.slot(key)
    }

    /// The key of the group in `groupid`
    pub fn key_of(&self, groupid: usize) -> Option<GroupKey> {
        self.index.key(groupid)
    }

    /// Append an empty group. It lives at slot `len() - 1`.
    pub fn add_group(&mut self, shared: &V::Shared) -> GroupKey {
        let groupid = self.groups.len();
        self.groups.packed_add(V::Group::new(shared));
        self.scorer.add_group(shared);
        self.scorer
            .update_group(shared, groupid, &self.groups[groupid]);
        let key = self.index.push();
        trace!("Added group {:?} at slot {}", key, groupid);
        key
    }

    /// Remove the group at `groupid`. The last group moves into its slot.
    pub fn remove_group(
        &mut self,
        shared: &V::Shared,
        groupid: usize,
    ) -> GroupKey {
        self.groups.packed_remove(groupid);
        self.scorer.remove_group(shared, groupid);
        let key = self.index.swap_remove(groupid);
        lace_assert!(
            2,
            self.index.len() == self.groups.len(),
            "{} keys but {} groups",
            self.index.len(),
            self.groups.len()
        );
        trace!("Removed group {:?} from slot {}", key, groupid);
        key
    }

    pub fn add_value(
        &mut self,
        shared: &V::Shared,
        groupid: usize,
        value: &V::Value,
    ) {
        self.groups[groupid].add_value(shared, value);
        self.scorer.update_group_value(
            shared,
            groupid,
            &self.groups[groupid],
            value,
        );
    }

    pub fn remove_value(
        &mut self,
        shared: &V::Shared,
        groupid: usize,
        value: &V::Value,
    ) {
        self.groups[groupid].remove_value(shared, value);
        self.scorer.update_group_value(
            shared,
            groupid,
            &self.groups[groupid],
            value,
        );
    }

    /// Merge the group at `source` into the group at `dest` and remove
    /// `source`. Returns the slot `dest` occupies afterwards.
    pub fn merge_groups(
        &mut self,
        shared: &V::Shared,
        dest: usize,
        source: usize,
    ) -> usize {
        assert_ne!(dest, source, "Can't merge a group into itself");
        let source_group =
            std::mem::replace(&mut self.groups[source], V::Group::new(shared));
        self.groups[dest].merge(shared, &source_group);
        self.scorer.update_group(shared, dest, &self.groups[dest]);

        let last = self.groups.len() - 1;
        self.remove_group(shared, source);
        if dest == last {
            source
        } else {
            dest
        }
    }

    /// Add the log posterior predictive of `value` under each group to
    /// `scores_accum`, which must have one entry per group.
    pub fn score_value(
        &self,
        shared: &V::Shared,
        value: &V::Value,
        scores_accum: &mut [f64],
    ) {
        lace_assert!(
            2,
            scores_accum.len() == self.groups.len(),
            "scores_accum has length {} but there are {} groups",
            scores_accum.len(),
            self.groups.len()
        );
        self.scorer.score_value(shared, value, scores_accum);
    }

    /// Log marginal likelihood of all groups under `shared`
    pub fn score_data(&self, shared: &V::Shared) -> f64 {
        let mut cache = V::DataCache::default();
        self.scorer.score_data(shared, &self.groups, &mut cache)
    }

    /// Log marginal likelihood of all groups under each of `shareds`.
    ///
    /// Neighboring grid points that differ in few hyperparameters are
    /// cheapest. `cache` is scratch space for this call only.
    pub fn score_data_grid(
        &self,
        shareds: &[V::Shared],
        cache: &mut V::DataCache,
        scores_out: &mut [f64],
    ) {
        self.scorer
            .score_data_grid(shareds, &self.groups, cache, scores_out);
    }

    /// Draw a value from the posterior predictive of the group at `groupid`
    pub fn sample_value<R: Rng>(
        &self,
        shared: &V::Shared,
        groupid: usize,
        rng: &mut R,
    ) -> V::Value {
        self.groups[groupid].sample_value(shared, rng)
    }
}
