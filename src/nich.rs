//! Normal, Inverse-Chi-Squared model for real-valued data
//!
//! Observations are Gaussian with unknown mean and variance. The variance
//! has a scaled inverse-χ² prior with `nu` degrees of freedom and scale
//! `sigmasq`; the mean is Gaussian around `mu` with `kappa` pseudo-counts.
//! The posterior predictive is a Student-t.
use rand::Rng;
use rv::dist::{ChiSquared, Gaussian};
use rv::traits::Rv;
use serde::{Deserialize, Serialize};

use crate::error::NichError;
use crate::lace_assert;
use crate::misc::{ln_gamma, ln_gamma_nu, LN_PI};
use crate::traits::{GroupT, SamplerT, ScorerT, SharedT, VectorizedScorerT};
use lace_utils::Packed;

pub type Value = f64;

/// Groups and their vectorized scorer
pub type Mixture = crate::mixture::Mixture<VectorizedScorer>;

/// Normal, Inverse-Chi-Squared hyperparameters
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Shared {
    mu: f64,
    kappa: f64,
    sigmasq: f64,
    nu: f64,
}

impl Shared {
    /// Create a new prior
    ///
    /// # Arguments
    /// - mu: prior mean
    /// - kappa: pseudo-count of observations behind `mu`
    /// - sigmasq: prior scale of the variance
    /// - nu: degrees of freedom of the variance
    pub fn new(
        mu: f64,
        kappa: f64,
        sigmasq: f64,
        nu: f64,
    ) -> Result<Self, NichError> {
        if !mu.is_finite() {
            Err(NichError::MuNotFinite { mu })
        } else if !(kappa > 0.0 && kappa.is_finite()) {
            Err(NichError::KappaTooLow { kappa })
        } else if !(sigmasq > 0.0 && sigmasq.is_finite()) {
            Err(NichError::SigmaSqTooLow { sigmasq })
        } else if !(nu > 0.0 && nu.is_finite()) {
            Err(NichError::NuTooLow { nu })
        } else {
            Ok(Self::new_unchecked(mu, kappa, sigmasq, nu))
        }
    }

    /// Create a new prior without checking the parameters
    #[inline]
    pub fn new_unchecked(mu: f64, kappa: f64, sigmasq: f64, nu: f64) -> Self {
        Shared {
            mu,
            kappa,
            sigmasq,
            nu,
        }
    }

    #[inline]
    pub fn mu(&self) -> f64 {
        self.mu
    }

    #[inline]
    pub fn kappa(&self) -> f64 {
        self.kappa
    }

    #[inline]
    pub fn sigmasq(&self) -> f64 {
        self.sigmasq
    }

    #[inline]
    pub fn nu(&self) -> f64 {
        self.nu
    }
}

impl Default for Shared {
    fn default() -> Self {
        Shared::new_unchecked(0.0, 1.0, 1.0, 1.0)
    }
}

impl SharedT for Shared {
    type Value = Value;
    type Group = Group;

    fn plus_group(&self, group: &Group) -> Self {
        let n = group.count as f64;
        let mu_1 = self.mu - group.mean;
        let kappa = self.kappa + n;
        let mu = self.kappa.mul_add(self.mu, group.mean * n) / kappa;
        let nu = self.nu + n;
        let sigmasq = (self.nu.mul_add(self.sigmasq, group.count_times_variance)
            + (n * self.kappa * mu_1 * mu_1) / kappa)
            / nu;
        Shared {
            mu,
            kappa,
            sigmasq,
            nu,
        }
    }
}

/// Running count, mean, and count × variance of a group
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Group {
    count: usize,
    mean: f64,
    count_times_variance: f64,
}

impl Group {
    #[inline]
    pub fn mean(&self) -> f64 {
        self.mean
    }

    #[inline]
    pub fn count_times_variance(&self) -> f64 {
        self.count_times_variance
    }
}

impl GroupT for Group {
    type Shared = Shared;
    type Value = Value;

    fn new(_shared: &Shared) -> Self {
        Group::default()
    }

    fn init(&mut self, _shared: &Shared) {
        self.count = 0;
        self.mean = 0.0;
        self.count_times_variance = 0.0;
    }

    #[inline]
    fn count(&self) -> usize {
        self.count
    }

    fn add_value(&mut self, _shared: &Shared, value: &f64) {
        self.count += 1;
        let delta = value - self.mean;
        self.mean += delta / self.count as f64;
        self.count_times_variance += delta * (value - self.mean);
    }

    fn remove_value(&mut self, _shared: &Shared, value: &f64) {
        assert!(self.count > 0, "Can't remove from an empty group");

        let total = self.mean * self.count as f64;
        let delta = value - self.mean;

        self.count -= 1;
        self.mean = if self.count == 0 {
            0.0
        } else {
            (total - value) / self.count as f64
        };
        // zero or one values have no spread
        if self.count <= 1 {
            self.count_times_variance = 0.0;
        } else {
            self.count_times_variance -= delta * (value - self.mean);
        }
    }

    fn merge(&mut self, _shared: &Shared, source: &Group) {
        let total_count = self.count + source.count;
        if total_count == 0 {
            return;
        }
        let delta = source.mean - self.mean;
        let source_part = source.count as f64 / total_count as f64;
        let cross_part = self.count as f64 * source_part;
        self.count = total_count;
        self.mean = source_part.mul_add(delta, self.mean);
        self.count_times_variance +=
            cross_part.mul_add(delta * delta, source.count_times_variance);
    }

    fn score_value(&self, shared: &Shared, value: &f64) -> f64 {
        Scorer::new(shared, self).eval(shared, value)
    }

    fn score_data(&self, shared: &Shared) -> f64 {
        let post = shared.plus_group(self);
        let ln_gamma_part = ln_gamma(0.5 * post.nu) - ln_gamma(0.5 * shared.nu);
        let kappa_part = 0.5 * (shared.kappa / post.kappa).ln();
        let scale_part = 0.5
            * shared.nu.mul_add(
                (shared.nu * shared.sigmasq).ln(),
                -post.nu * (post.nu * post.sigmasq).ln(),
            );
        ln_gamma_part + kappa_part + scale_part
            - 0.5 * self.count as f64 * LN_PI
    }

    fn sample_value<R: Rng>(&self, shared: &Shared, rng: &mut R) -> f64 {
        Sampler::new(shared, self, rng).eval(shared, rng)
    }
}

/// Student-t posterior predictive of one group
#[derive(Clone, Debug, PartialEq)]
pub struct Scorer {
    score: f64,
    log_coeff: f64,
    precision: f64,
    mean: f64,
}

impl ScorerT for Scorer {
    type Shared = Shared;

    fn new(shared: &Shared, group: &Group) -> Self {
        let post = shared.plus_group(group);
        let lambda = post.kappa / ((post.kappa + 1.0) * post.sigmasq);
        Scorer {
            score: ln_gamma_nu(post.nu)
                + 0.5 * (lambda / (std::f64::consts::PI * post.nu)).ln(),
            log_coeff: -0.5 * post.nu - 0.5,
            precision: lambda / post.nu,
            mean: post.mu,
        }
    }

    #[inline]
    fn eval(&self, _shared: &Shared, value: &f64) -> f64 {
        let diff = value - self.mean;
        self.log_coeff
            .mul_add(self.precision.mul_add(diff * diff, 1.0).ln(), self.score)
    }
}

/// A posterior draw of the group mean and variance
#[derive(Clone, Debug, PartialEq)]
pub struct Sampler {
    mu: f64,
    sigmasq: f64,
}

impl SamplerT for Sampler {
    type Shared = Shared;

    fn new<R: Rng>(shared: &Shared, group: &Group, rng: &mut R) -> Self {
        let post = shared.plus_group(group);
        let chi_sq: f64 = ChiSquared::new_unchecked(post.nu).draw(rng);
        let sigmasq = post.nu * post.sigmasq / chi_sq;
        let mu: f64 =
            Gaussian::new_unchecked(post.mu, (sigmasq / post.kappa).sqrt())
                .draw(rng);
        Sampler { mu, sigmasq }
    }

    fn eval<R: Rng>(&self, _shared: &Shared, rng: &mut R) -> f64 {
        Gaussian::new_unchecked(self.mu, self.sigmasq.sqrt()).draw(rng)
    }
}

/// Student-t parameters of every group, one row per group
#[derive(Clone, Debug, Default, PartialEq)]
pub struct VectorizedScorer {
    score: Vec<f64>,
    log_coeff: Vec<f64>,
    precision: Vec<f64>,
    mean: Vec<f64>,
}

impl VectorizedScorerT for VectorizedScorer {
    type Shared = Shared;
    type Group = Group;
    type Value = Value;
    type DataCache = ();

    #[inline]
    fn len(&self) -> usize {
        self.score.len()
    }

    fn resize(&mut self, _shared: &Shared, size: usize) {
        self.score.resize(size, 0.0);
        self.log_coeff.resize(size, 0.0);
        self.precision.resize(size, 0.0);
        self.mean.resize(size, 0.0);
    }

    fn add_group(&mut self, _shared: &Shared) {
        self.score.packed_add(0.0);
        self.log_coeff.packed_add(0.0);
        self.precision.packed_add(0.0);
        self.mean.packed_add(0.0);
    }

    fn remove_group(&mut self, _shared: &Shared, groupid: usize) {
        self.score.packed_remove(groupid);
        self.log_coeff.packed_remove(groupid);
        self.precision.packed_remove(groupid);
        self.mean.packed_remove(groupid);
    }

    fn update_group(
        &mut self,
        shared: &Shared,
        groupid: usize,
        group: &Group,
    ) {
        let base = Scorer::new(shared, group);
        self.score[groupid] = base.score;
        self.log_coeff[groupid] = base.log_coeff;
        self.precision[groupid] = base.precision;
        self.mean[groupid] = base.mean;
    }

    fn score_value(
        &self,
        _shared: &Shared,
        value: &f64,
        scores_accum: &mut [f64],
    ) {
        lace_assert!(
            2,
            scores_accum.len() == self.len(),
            "scores_accum has length {} but there are {} groups",
            scores_accum.len(),
            self.len()
        );
        scores_accum
            .iter_mut()
            .zip(self.score.iter())
            .zip(self.log_coeff.iter())
            .zip(self.precision.iter().zip(self.mean.iter()))
            .for_each(|(((accum, score), log_coeff), (precision, mean))| {
                let diff = value - mean;
                *accum += log_coeff
                    .mul_add(precision.mul_add(diff * diff, 1.0).ln(), *score);
            });
    }
}

/// Draw one value from the posterior predictive of `group`
pub fn sample_value<R: Rng>(shared: &Shared, group: &Group, rng: &mut R) -> f64 {
    Sampler::new(shared, group, rng).eval(shared, rng)
}
