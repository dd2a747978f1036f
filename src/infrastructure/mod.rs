//! Infrastructure layer - Adapter implementations
//!
//! Native backends for each platform family, the adapter factory, config
//! storage, and the recordings directory.

pub mod config;
pub mod platform;
pub mod storage;

// Re-export adapters
pub use config::XdgConfigStore;
pub use platform::{create_recorder_player, PlatformKind};
pub use storage::{default_recordings_dir, latest_recording};
