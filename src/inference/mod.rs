//! Search and inference algorithms.

mod control;
mod mcmc;

pub use self::control::Control;
pub use self::mcmc::{MCMCChain, Samples};
