pub mod fit;
mod linalg;
pub mod stats;
pub mod types;

pub use fit::{OlsEngine, PinvOls, predict, simple_ols, stripped_ols};
pub use types::*;
