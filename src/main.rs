use clap::Parser;
use log::{error, warn};

use meow_cli::cli::Args;
use meow_cli::config::Settings;
use meow_cli::{Context, logging, runners};

fn main() {
    let args = Args::parse();
    let output = args.output();

    // Flag conflicts are reported before any config, network or process work.
    if let Err(e) = output.validate() {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }

    if let Err(e) = logging::init(&output) {
        eprintln!("WARN: logger already initialised: {e}");
    }

    let (settings, source) = match Settings::load(args.config.as_deref()) {
        Ok(loaded) => loaded,
        Err(e) => {
            error!("{e}");
            std::process::exit(1);
        }
    };
    if let Some(path) = source {
        eprintln!("Using config file: {}", path.display());
    }

    let ctx = match Context::new(settings, output) {
        Ok(ctx) => ctx,
        Err(e) => {
            error!("{e}");
            std::process::exit(1);
        }
    };

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("FATAL: Failed to create Tokio runtime: {e}");
            std::process::exit(1);
        }
    };

    if let Err(e) = rt.block_on(real_main(&args, &ctx)) {
        error!(
            "{e:#} (os={}, arch={})",
            ctx.platform.os, ctx.platform.arch
        );
        std::process::exit(1);
    }
}

async fn real_main(args: &Args, ctx: &Context) -> anyhow::Result<()> {
    let cancel = ctx.cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupted, cancelling");
            cancel.cancel();
        }
    });

    runners::run(&args.command, ctx).await
}
