//! Core Module - Business Logic
//!
//! Risk classification, element rules, synthesis of missing sensor fields
//! and report rendering/delivery.

pub mod classifier;
pub mod elements;
pub mod reporter;
pub mod synthesizer;

pub use classifier::*;
pub use reporter::*;
pub use synthesizer::*;
