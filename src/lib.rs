//! recplay - cross-platform audio recorder/player
//!
//! One recorder/player contract over several native backends, with periodic
//! progress and metering events and a view model that folds them into a
//! single observable snapshot.
//!
//! # Architecture
//!
//! The crate follows hexagonal (ports & adapters) architecture:
//!
//! - **Domain**: Time values, sessions, recorder/player config, progress events, errors
//! - **Application**: The `AudioRecorderPlayer` port, the platform adapter, samplers, listeners, the view model
//! - **Infrastructure**: Native backends (desktop, simulated, unsupported), config store, recordings dir
//! - **CLI**: Argument parsing, output formatting, logging, and the record/play/info runners

pub mod application;
pub mod cli;
pub mod domain;
pub mod infrastructure;
