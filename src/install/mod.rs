//! Container runtime installation
//!
//! - `platform` - host detection and the per-platform constant table
//! - `progress` - transfer observers
//! - `download` - streamed artifact download with atomic placement
//! - `runner` - child process execution
//! - `orchestration` - per-OS install flow and its state machine

pub mod download;
pub mod orchestration;
pub mod platform;
pub mod progress;
pub mod runner;

pub use download::{Downloader, Fetched};
pub use orchestration::{InstallOptions, InstallPlan, InstallState, Orchestrator};
pub use platform::{HostFamily, Platform};
pub use progress::ProgressSink;
pub use runner::ProcessRunner;
