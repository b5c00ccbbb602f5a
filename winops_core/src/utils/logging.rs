use log::LevelFilter;

/// Initialize logging using env_logger.
/// Defaults to `info`; `RUST_LOG` overrides, e.g.
/// `RUST_LOG=winops_core=debug winops --remote lab1 services list`.
pub fn init_logging() {
    env_logger::Builder::new()
        .filter_level(LevelFilter::Info)
        .parse_default_env()
        .init();
}
