//! Application layer - Use cases and port interfaces
//!
//! Holds the platform adapter that drives native handles, the samplers and
//! listener delivery it runs on, and the view model that consumes it.

pub mod adapter;
pub mod listeners;
pub mod ports;
pub mod sampler;
pub mod view_model;

pub use adapter::PlatformAdapter;
pub use view_model::{AudioViewModel, ViewSnapshot};
