//! Analysis tools: convention detection and data export.

pub mod convention;
pub mod export;

pub use convention::Convention;
pub use export::ExportSystem;
