//! Top-level command handlers
//!
//! Each handler receives the already-built [`Context`]; nothing here reads
//! flags or configuration on its own.

use std::io::Write;

use anyhow::{Context as _, Result};
use log::info;
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

use crate::cli::{CatCmd, Cmd};
use crate::context::Context;
use crate::docker::{self, ContainerEngine, DockerEngine};
use crate::install::{
    Downloader, InstallOptions, InstallPlan, InstallState, Orchestrator, ProgressSink,
};

/// Dispatch a parsed command
pub async fn run(command: &Cmd, ctx: &Context) -> Result<()> {
    match command {
        Cmd::Install { reinstall, dry_run } => {
            run_install(
                ctx,
                InstallOptions {
                    reinstall: *reinstall,
                    dry_run: *dry_run,
                },
            )
            .await
        }
        Cmd::Cat { action } => run_cat(ctx, *action).await,
        Cmd::Version => {
            run_version();
            Ok(())
        }
    }
}

/// Install the container runtime for the current host
pub async fn run_install(ctx: &Context, options: InstallOptions) -> Result<()> {
    let plan = InstallPlan::for_platform(ctx.platform)
        .with_context(|| format!("no install plan for {}", ctx.platform))?;

    let sink = download_sink(ctx, &plan, options);
    let mut orchestrator = Orchestrator::new(ctx, Downloader::new()?);
    let state = orchestrator
        .run(&plan, options, sink.as_deref())
        .await
        .with_context(|| format!("install on {} failed", ctx.platform))?;

    if state == InstallState::Installed {
        info!("Container runtime installed on {}", ctx.platform);
        announce(ctx, "✅ Installation complete");
    }
    Ok(())
}

/// Progress renderer for the installer download; only the Desktop path downloads anything
fn download_sink(
    ctx: &Context,
    plan: &InstallPlan,
    options: InstallOptions,
) -> Option<Box<dyn ProgressSink>> {
    match plan {
        InstallPlan::DesktopInstaller { .. } if !options.dry_run => {
            ctx.progress_sink("Docker Desktop installer")
        }
        _ => None,
    }
}

/// Run one container lifecycle action against the local engine
pub async fn run_cat(ctx: &Context, action: CatCmd) -> Result<()> {
    let engine = DockerEngine::connect(ctx.cancel.clone())
        .context("cannot connect to the container engine (is it installed and running?)")?;
    cat_action(&engine, ctx, action).await
}

/// Engine-agnostic half of [`run_cat`]
pub async fn cat_action<E: ContainerEngine>(engine: &E, ctx: &Context, action: CatCmd) -> Result<()> {
    let cat = &ctx.settings.cat;
    match action {
        CatCmd::Pull => {
            let image = cat.image_ref();
            let sink = ctx.progress_sink(&format!("pull {image}"));
            engine
                .pull_image(&image, sink.as_deref())
                .await
                .with_context(|| format!("pull {image} failed"))?;
            announce(ctx, &format!("✓ Pulled {image}"));
        }
        CatCmd::Start => {
            let sink = ctx.progress_sink(&format!("pull {}", cat.image_ref()));
            let exit_code = docker::run_cat(engine, cat, sink.as_deref())
                .await
                .with_context(|| format!("container {} failed", cat.container_name))?;
            if exit_code != 0 {
                anyhow::bail!(
                    "container {} exited with code {}",
                    cat.container_name,
                    exit_code
                );
            }
        }
        CatCmd::Stop => {
            engine
                .stop_container(&cat.container_name)
                .await
                .with_context(|| format!("stop {} failed", cat.container_name))?;
            announce(ctx, &format!("✓ Stopped {}", cat.container_name));
        }
        CatCmd::Rm => {
            engine
                .remove_container(&cat.container_name)
                .await
                .with_context(|| format!("remove {} failed", cat.container_name))?;
            announce(ctx, &format!("✓ Removed {}", cat.container_name));
        }
    }
    Ok(())
}

pub fn run_version() {
    println!("meow version {}", env!("CARGO_PKG_VERSION"));
}

/// Green confirmation line for humans; silent for `--quiet` and `--json`
fn announce(ctx: &Context, message: &str) {
    if ctx.output.quiet || ctx.output.json {
        return;
    }
    let mut stdout = StandardStream::stdout(ColorChoice::Auto);
    let _ = stdout.set_color(ColorSpec::new().set_fg(Some(Color::Green)).set_bold(true));
    let _ = writeln!(stdout, "{message}");
    let _ = stdout.reset();
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use crate::config::Settings;
    use crate::context::OutputOptions;
    use crate::install::Platform;

    fn json_ctx() -> Context {
        let output = OutputOptions {
            json: true,
            ..Default::default()
        };
        Context::new(Settings::default(), output).unwrap()
    }

    #[test]
    fn only_the_desktop_download_gets_a_progress_sink() {
        let ctx = json_ctx();
        let script = InstallPlan::NativeScript {
            shell: "bash".to_string(),
            script: "true".to_string(),
        };
        let desktop = InstallPlan::DesktopInstaller {
            url: "http://127.0.0.1:9/installer.exe".to_string(),
            path: PathBuf::from("/tmp/installer.exe"),
            args: Vec::new(),
        };
        let unimplemented = InstallPlan::Unimplemented {
            platform: Platform::new("macos", "aarch64"),
        };
        let dry_run = InstallOptions {
            dry_run: true,
            ..Default::default()
        };

        assert!(download_sink(&ctx, &script, InstallOptions::default()).is_none());
        assert!(download_sink(&ctx, &unimplemented, InstallOptions::default()).is_none());
        assert!(download_sink(&ctx, &desktop, dry_run).is_none());
        assert!(download_sink(&ctx, &desktop, InstallOptions::default()).is_some());
    }
}
