//! Logger setup for text or JSON-lines output

use std::io::Write;

use log::LevelFilter;

use crate::context::OutputOptions;

/// Modules that are far too chatty at debug level
const NOISY_MODULES: [&str; 3] = ["hyper", "hyper_util", "reqwest"];

/// Install the global logger. Records go to stdout.
///
/// `RUST_LOG` module directives still apply; the flags pick the default level.
pub fn init(output: &OutputOptions) -> Result<(), log::SetLoggerError> {
    let level = output.level_filter();
    let mut builder = env_logger::Builder::from_default_env();
    builder
        .filter_level(level)
        .target(env_logger::Target::Stdout);

    for module in NOISY_MODULES {
        builder.filter_module(module, level.min(LevelFilter::Info));
    }

    if output.json {
        builder.format(|buf, record| {
            let line = serde_json::json!({
                "time": buf.timestamp_millis().to_string(),
                "level": record.level().as_str(),
                "target": record.target(),
                "msg": record.args().to_string(),
            });
            writeln!(buf, "{line}")
        });
    } else {
        builder.format(|buf, record| {
            writeln!(
                buf,
                "[{} {} {}] {}",
                buf.timestamp_millis(),
                record.level(),
                record.target(),
                record.args()
            )
        });
    }

    builder.try_init()
}
