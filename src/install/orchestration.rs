//! Container runtime installation flow
//!
//! Picks the install path for the host family and drives it through
//! `NotInstalled -> Downloading -> Installing -> Installed`, stopping at
//! `Failed` on the first error. Nothing is repaired or rolled back.

use std::fmt;
use std::path::{Path, PathBuf};

use log::{debug, error, info, warn};

use super::download::{Downloader, Fetched};
use super::platform::{self, HostFamily, Platform};
use super::progress::ProgressSink;
use super::runner::ProcessRunner;
use crate::context::Context;
use crate::error::{MeowError, Result};

/// Shell script that installs Docker Engine on Linux hosts
pub const INSTALL_DOCKER_SCRIPT: &str = include_str!("../../assets/install-docker.sh");

/// Flags passed to the Docker Desktop installer for an unattended install
pub const DESKTOP_INSTALLER_ARGS: [&str; 2] = ["--quiet", "--accept-license"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallState {
    NotInstalled,
    Downloading,
    Installing,
    Installed,
    Failed,
}

impl InstallState {
    pub fn is_terminal(self) -> bool {
        matches!(self, InstallState::Installed | InstallState::Failed)
    }
}

/// Concrete steps for one host
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallPlan {
    /// Run the embedded install script with `shell -c`
    NativeScript { shell: String, script: String },
    /// Download the Desktop installer, then execute it
    DesktopInstaller {
        url: String,
        path: PathBuf,
        args: Vec<String>,
    },
    /// No install path defined for this host
    Unimplemented { platform: Platform },
}

impl InstallPlan {
    /// Resolve the plan for `platform` from the constant table
    pub fn for_platform(platform: Platform) -> Result<Self> {
        let plan = match platform.family() {
            HostFamily::NativePackage => InstallPlan::NativeScript {
                shell: platform::lookup_for(platform, platform::DOCKER_INSTALL_SHELL)?,
                script: INSTALL_DOCKER_SCRIPT.to_string(),
            },
            HostFamily::DesktopInstaller => InstallPlan::DesktopInstaller {
                url: platform::lookup_for(platform, platform::DOCKER_DESKTOP_INSTALLER_URL)?,
                path: PathBuf::from(platform::lookup_for(
                    platform,
                    platform::DOCKER_DESKTOP_INSTALLER_PATH,
                )?),
                args: DESKTOP_INSTALLER_ARGS.iter().map(|a| a.to_string()).collect(),
            },
            HostFamily::Unimplemented => InstallPlan::Unimplemented { platform },
        };
        Ok(plan)
    }

    /// Human readable description of each step, in execution order
    pub fn steps(&self) -> Vec<String> {
        match self {
            InstallPlan::NativeScript { shell, .. } => vec![format!(
                "run the bundled Docker Engine install script with `{shell} -c`"
            )],
            InstallPlan::DesktopInstaller { url, path, args } => vec![
                format!("download {} to {}", url, path.display()),
                format!("run {} {}", path.display(), args.join(" ")),
            ],
            InstallPlan::Unimplemented { platform } => {
                vec![format!("no automatic installation available for {platform}")]
            }
        }
    }
}

impl fmt::Display for InstallPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, step) in self.steps().iter().enumerate() {
            writeln!(f, "{}. {}", i + 1, step)?;
        }
        Ok(())
    }
}

/// Options of the `install` command
#[derive(Debug, Clone, Copy, Default)]
pub struct InstallOptions {
    /// Download the installer again even if it is already present
    pub reinstall: bool,
    /// Print the steps instead of running them
    pub dry_run: bool,
}

/// Drives an [`InstallPlan`] and records every state it passes through
pub struct Orchestrator<'a> {
    ctx: &'a Context,
    downloader: Downloader,
    runner: ProcessRunner,
    state: InstallState,
    history: Vec<InstallState>,
}

impl<'a> Orchestrator<'a> {
    pub fn new(ctx: &'a Context, downloader: Downloader) -> Self {
        Self {
            ctx,
            downloader,
            runner: ProcessRunner::new(),
            state: InstallState::NotInstalled,
            history: vec![InstallState::NotInstalled],
        }
    }

    pub fn state(&self) -> InstallState {
        self.state
    }

    /// Every state entered so far, starting with `NotInstalled`
    pub fn history(&self) -> &[InstallState] {
        &self.history
    }

    /// Execute `plan`; a dry run only prints it.
    pub async fn run(
        &mut self,
        plan: &InstallPlan,
        options: InstallOptions,
        sink: Option<&dyn ProgressSink>,
    ) -> Result<InstallState> {
        if options.dry_run {
            println!("Planned installation steps for {}:", self.ctx.platform);
            print!("{plan}");
            return Ok(self.state);
        }

        let result = match plan {
            InstallPlan::NativeScript { shell, script } => self.run_script(shell, script).await,
            InstallPlan::DesktopInstaller { url, path, args } => {
                self.run_desktop_installer(url, path, args, options.reinstall, sink)
                    .await
            }
            InstallPlan::Unimplemented { platform } => {
                warn!("automatic installation is not available on {platform}");
                return Err(MeowError::NotImplemented(format!(
                    "container runtime installation on {platform}"
                )));
            }
        };

        match result {
            Ok(()) => {
                self.transition(InstallState::Installed);
                Ok(self.state)
            }
            Err(e) => {
                error!("installation failed in state {:?}: {}", self.state, e);
                self.transition(InstallState::Failed);
                Err(e)
            }
        }
    }

    async fn run_script(&mut self, shell: &str, script: &str) -> Result<()> {
        info!(
            "Downloading and installing Docker Engine (os={}, arch={})",
            self.ctx.platform.os, self.ctx.platform.arch
        );
        self.transition(InstallState::Installing);
        self.runner
            .run(
                shell,
                ["-c", script],
                self.ctx.output.verbose,
                &self.ctx.cancel,
            )
            .await
    }

    async fn run_desktop_installer(
        &mut self,
        url: &str,
        path: &Path,
        args: &[String],
        reinstall: bool,
        sink: Option<&dyn ProgressSink>,
    ) -> Result<()> {
        info!(
            "Downloading Docker Desktop installer (os={}, arch={}, url={})",
            self.ctx.platform.os, self.ctx.platform.arch, url
        );
        self.transition(InstallState::Downloading);
        match self
            .downloader
            .fetch(url, path, reinstall, sink, &self.ctx.cancel)
            .await?
        {
            Fetched::AlreadyPresent => {
                info!("Docker Desktop installer already present at {}", path.display())
            }
            Fetched::Downloaded(bytes) => {
                debug!("downloaded {} bytes to {}", bytes, path.display())
            }
        }

        info!(
            "Running Docker Desktop installer (os={}, arch={}, path={})",
            self.ctx.platform.os,
            self.ctx.platform.arch,
            path.display()
        );
        self.transition(InstallState::Installing);
        let program = path.to_string_lossy();
        self.runner
            .run(&program, args, self.ctx.output.verbose, &self.ctx.cancel)
            .await
    }

    fn transition(&mut self, next: InstallState) {
        debug_assert!(!self.state.is_terminal(), "left terminal state {:?}", self.state);
        debug!("install state {:?} -> {:?}", self.state, next);
        self.state = next;
        self.history.push(next);
    }
}
