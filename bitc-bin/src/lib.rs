pub mod cli;
pub mod driver;
pub mod toolchain;

use tracing_subscriber::EnvFilter;

/// Installs a stderr subscriber. `RUST_LOG` wins over `-v`; without either,
/// nothing is installed.
pub fn init_tracing(verbose: u8) {
    let filter = if std::env::var_os("RUST_LOG").is_some() {
        EnvFilter::from_default_env()
    } else {
        match verbose {
            0 => return,
            1 => EnvFilter::new("bitc=debug,bitc_bin=debug"),
            _ => EnvFilter::new("bitc=trace,bitc_bin=trace"),
        }
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
