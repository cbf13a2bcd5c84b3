//! Engine module housing the detection loop and the session handle.
//!
//! `controller` owns the periodic tick pipeline; `core` wires one session
//! (`DetectionEngine`) around it for the CLI and embedders.

pub mod controller;
pub mod core;

pub use controller::{DetectionController, TickOutcome};
pub use core::{DetectionEngine, EngineParts};
