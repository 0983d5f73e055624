use clap::Parser;
use navkit::Mode;
use navkit::core::config::{ResolvedConfig, load_config, resolve};
use simplelog::{ConfigBuilder, LevelFilter, WriteLogger};
use std::fs::File;

#[derive(Parser)]
#[command(name = "navkit", about = "Page navigation stack with a terminal host")]
struct Args {
    /// Platform mode, picks the default page transition
    #[arg(short, long, value_enum)]
    mode: Option<Mode>,

    /// Skip transition animations
    #[arg(long)]
    no_animate: bool,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> std::io::Result<()> {
    let args = Args::parse();
    dotenv::dotenv().ok();

    // Config errors fall back to defaults; the logger is not up yet
    let (mut resolved, config_error) = match load_config() {
        Ok(config) => (resolve(&config, args.mode), None),
        Err(e) => (
            ResolvedConfig {
                mode: args.mode.unwrap_or_default(),
                ..ResolvedConfig::default()
            },
            Some(e),
        ),
    };
    if args.no_animate {
        resolved.animated = false;
    }
    if let Some(level) = args.log_level {
        resolved.log_level = level;
    }

    // Initialize file logger - writes to navkit.log in current directory
    let log_config = ConfigBuilder::new().set_time_format_rfc3339().build();
    let level = resolved
        .log_level
        .parse::<LevelFilter>()
        .unwrap_or(LevelFilter::Info);

    if let Ok(log_file) = File::create("navkit.log") {
        let _ = WriteLogger::init(level, log_config, log_file);
    }

    if let Some(e) = config_error {
        log::warn!("Failed to load config, using defaults: {}", e);
    }
    log::info!(
        "Navkit starting up (mode: {}, animated: {})",
        resolved.mode,
        resolved.animated
    );

    navkit::tui::run(resolved)
}
