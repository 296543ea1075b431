//! Configuration: environment-driven settings and named constants.

mod constants;
mod settings;

pub use constants::*;
pub use settings::Config;
