//! Utils Module - Shared Infrastructure
//!
//! Constants, the in-memory reading store and telemetry.

pub mod constants;
pub mod store;
pub mod telemetry;

pub use constants::*;
pub use store::*;
pub use telemetry::*;
