//! Conjugate component models for collapsed Gibbs sampling of mixture
//! models.
//!
//! Each model comes as a family of types:
//!
//! - `Shared`: the prior hyperparameters, shared by every group
//! - `Group`: the sufficient statistics of the values assigned to one group
//! - `Scorer`: the posterior predictive of one group, ready to score values
//! - `Sampler`: a draw from the posterior of one group
//! - `VectorizedScorer`: posterior predictives of every group, for scoring
//!   one value against all groups at once
//!
//! Two models are provided: [`nich`] (Normal with Normal, Inverse-Chi-Squared
//! prior) and [`dd`] (Categorical with Dirichlet prior).
//!
//! # Example
//!
//! ```
//! use lace_conjugate::nich;
//!
//! let shared = nich::Shared::new(0.0, 1.0, 1.0, 1.0).unwrap();
//! let mut mixture = nich::Mixture::new();
//! mixture.init(&shared);
//! mixture.add_group(&shared);
//! mixture.add_group(&shared);
//! mixture.add_value(&shared, 0, &1.2);
//! mixture.add_value(&shared, 1, &-3.0);
//!
//! let mut scores = vec![0.0; mixture.len()];
//! mixture.score_value(&shared, &1.0, &mut scores);
//! assert!(scores[0] > scores[1]);
//! ```
#![warn(unused_extern_crates)]
#![warn(
    clippy::all,
    clippy::imprecise_flops,
    clippy::suboptimal_flops,
    clippy::unseparated_literal_suffix,
    clippy::unreadable_literal,
    clippy::option_option,
    clippy::implicit_clone
)]
pub mod clustering;
pub mod config;
pub mod dd;
mod error;
mod index;
mod misc;
pub mod mixture;
pub mod nich;
pub mod traits;

pub use error::{
    ConfigError, DdError, LowEntropyError, NichError, PitmanYorError,
};
pub use index::GroupKey;
pub use rv;
pub use traits::{GroupT, SamplerT, ScorerT, SharedT, VectorizedScorerT};
