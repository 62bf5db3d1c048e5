//! Analysis modules.
//!
//! Derivation of the categorical fields, and the filter/bucket/pivot
//! pipeline that runs on every dashboard update.

pub mod derive;
pub mod pipeline;

pub use derive::*;
pub use pipeline::*;
