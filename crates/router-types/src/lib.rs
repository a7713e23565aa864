//! Shared types for the swap router.
//!
//! Every crate in the workspace speaks in terms of the types defined here:
//! liquidity sources, price samples, fills, paths, resting orders, quotes and
//! the per-round liquidity snapshot consumed by the optimizer.

pub mod common;
pub mod errors;
pub mod fill;
pub mod liquidity;
pub mod order;
pub mod quote;
pub mod sample;
pub mod schedule;
pub mod source;
pub mod validation;

pub use common::*;
pub use errors::*;
pub use fill::*;
pub use liquidity::*;
pub use order::*;
pub use quote::*;
pub use sample::*;
pub use schedule::*;
pub use source::*;
pub use validation::*;
