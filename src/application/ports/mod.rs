//! Port interfaces (traits) for external systems
//!
//! These traits define the boundaries between the application
//! and infrastructure layers.

pub mod config;
pub mod native;
pub mod recorder_player;

// Re-export common types
pub use config::ConfigStore;
pub use native::{
    Capabilities, CompletionHandler, NativeBackend, NativeError, NativePlayer, NativeRecorder,
};
pub use recorder_player::{
    AudioRecorderPlayer, ListenerKind, MeteringListener, PlaybackListener, RecordingListener,
    Subscription,
};
