//! Log-gamma helpers shared by the component models
use special::Gamma;

pub(crate) const LN_PI: f64 = 1.144_729_885_849_400_2;

#[inline]
pub(crate) fn ln_gamma(x: f64) -> f64 {
    Gamma::ln_gamma(x).0
}

/// `ln Γ((ν + 1) / 2) - ln Γ(ν / 2)`, the Student-t normalizer in ν
#[inline]
pub(crate) fn ln_gamma_nu(nu: f64) -> f64 {
    let half_nu = 0.5 * nu;
    ln_gamma(half_nu + 0.5) - ln_gamma(half_nu)
}
