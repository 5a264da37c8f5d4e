//! meow: the paw-friendly Cheshire Cat AI command line interface
//!
//! Installs a container runtime suited to the host and manages the
//! Cheshire Cat container on top of it.

pub mod cli;
pub mod config;
pub mod context;
pub mod docker;
pub mod error;
pub mod install;
pub mod logging;
pub mod runners;

pub use context::{Context, OutputOptions};
pub use error::{MeowError, Result};
