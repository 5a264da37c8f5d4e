//! Per-invocation context handed to every command

use log::LevelFilter;
use tokio_util::sync::CancellationToken;

use crate::config::Settings;
use crate::error::{MeowError, Result};
use crate::install::platform::Platform;
use crate::install::progress::{BarSink, LogSink, ProgressSink};

/// Global output flags
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OutputOptions {
    pub verbose: bool,
    pub quiet: bool,
    pub json: bool,
}

impl OutputOptions {
    /// Reject flag combinations before any work starts
    pub fn validate(&self) -> Result<()> {
        if self.verbose && self.quiet {
            return Err(MeowError::Validation(
                "--verbose and --quiet flags are incompatible".to_string(),
            ));
        }
        Ok(())
    }

    pub fn level_filter(&self) -> LevelFilter {
        if self.verbose {
            LevelFilter::Debug
        } else if self.quiet {
            LevelFilter::Error
        } else {
            LevelFilter::Info
        }
    }
}

/// Resolved settings, output flags and the cancellation token of one run
#[derive(Debug, Clone)]
pub struct Context {
    pub settings: Settings,
    pub output: OutputOptions,
    pub platform: Platform,
    pub cancel: CancellationToken,
}

impl Context {
    pub fn new(settings: Settings, output: OutputOptions) -> Result<Self> {
        output.validate()?;
        Ok(Self {
            settings,
            output,
            platform: Platform::detect(),
            cancel: CancellationToken::new(),
        })
    }

    /// Pick the progress renderer matching the output flags
    pub fn progress_sink(&self, label: &str) -> Option<Box<dyn ProgressSink>> {
        if self.output.quiet {
            None
        } else if self.output.json {
            Some(Box::new(LogSink::new(label)))
        } else {
            Some(Box::new(BarSink::new(label)))
        }
    }
}
