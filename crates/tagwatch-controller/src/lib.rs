//! Scan classification and feedback loop for the tagwatch appliance.
//!
//! The [`ControlLoop`] is the only stateful piece of the system. It polls the
//! reader, classifies each identifier against the [`CardRegistry`], renders
//! the outcome on the indicator panel and buzzer, then hands a notification
//! to the publisher.
//!
//! [`CardRegistry`]: tagwatch_core::CardRegistry

pub mod controller;
pub mod state;

pub use controller::{ControlLoop, ControllerConfig, ScanReport, indicator_for};
pub use state::ScanState;
