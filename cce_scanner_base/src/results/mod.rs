//! # Run Results Module
//!
//! Verdicts, run results and the evidence sanitizer that guards every string
//! derived from a device document.
//!
//! ## Core Types
//! - [`Verdict`] - Outcome of one rule for one device
//! - [`RunResult`] - Status, verdicts and summary of one device run
//! - [`RunSummary`] - Verdict counts per status and category

pub mod evidence;
pub mod types;

pub use types::*;
