pub mod coaching;
pub mod detection;
pub mod exercise;
pub mod form;
pub mod pose;
pub mod replay;
pub mod session;
pub mod settings;
pub mod utils;
pub mod voice;

use clap::Parser;

use replay::ReplayOptions;

fn init_logging() {
    let level = match std::env::var("FORMCOACH_DEBUG").as_deref() {
        Ok("1") => log::LevelFilter::Debug,
        _ => log::LevelFilter::Info,
    };
    // RUST_LOG still overrides the default level
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();
}

pub fn run() -> anyhow::Result<()> {
    let options = ReplayOptions::parse();
    init_logging();

    log::info!(
        "FormCoach replaying {} with {}",
        options.frames.display(),
        options.settings.display()
    );

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    let summary = runtime.block_on(replay::run_replay(&options))?;
    println!("{summary}");
    Ok(())
}
