//! Barcode-driven clock-in/clock-out tracking.

pub mod barcode;
pub mod policy;
pub mod session;
pub mod tracker;
