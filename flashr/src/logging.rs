use log::LevelFilter;

/// Sets up `env_logger` on stderr.
///
/// Defaults to warnings only so log lines do not tear up the progress bars;
/// each `-v` raises the level one step. `RUST_LOG` overrides both.
pub fn init(verbosity: u8) {
    let level = match verbosity {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        _ => LevelFilter::Debug,
    };

    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .target(env_logger::Target::Stderr)
        .init();
}
