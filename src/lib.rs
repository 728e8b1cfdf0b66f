//! Multiversal (specification curve) analysis for OLS models.
//!
//! Every subset of a pool of candidate controls is estimated on the full
//! sample and on resampled draws; the spread of the coefficient of interest
//! across that space is the robustness evidence.

pub mod error;
pub mod logging;
pub mod types;

pub mod frame;
pub mod io;
pub mod parallel;
pub mod qc;
pub mod subsets;

pub mod bootstrap;
pub mod crossval;
pub mod model;
pub mod plot;
pub mod results;

pub use model::{FitConfig, OlsRobust};
pub use results::OlsResult;
