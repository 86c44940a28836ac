use anyhow::{Context, Result};
use clap::Parser;
use std::fs::OpenOptions;

fn main() -> Result<()> {
    let cfg = symchaos::config::Config::parse();

    let mut logger =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"));
    if let Some(path) = cfg.log_file.as_ref() {
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path)
            .with_context(|| format!("open log file {}", path.display()))?;
        logger
            .format_timestamp_micros()
            .target(env_logger::Target::Pipe(Box::new(file)));
    }
    logger.init();

    log::info!(
        "starting symchaos: map={} mode={} renderer={:?}",
        cfg.map.tag(),
        cfg.mode.label(),
        cfg.renderer
    );
    symchaos::app::run(cfg)
}
