use tracing_subscriber::EnvFilter;

/// Environment variables consulted for the log filter, most specific first.
const FILTER_ENV_VARS: [&str; 2] = ["PHASELOAD_LOG", "RUST_LOG"];

pub fn init_logging(verbose: bool, no_color: bool) {
    let fallback = if verbose { "debug" } else { "info" };
    let filter = FILTER_ENV_VARS
        .iter()
        .find_map(|name| std::env::var(name).ok())
        .and_then(|value| EnvFilter::try_new(value).ok())
        .unwrap_or_else(|| EnvFilter::new(fallback));

    let installed = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(!no_color)
        .try_init();
    if let Err(err) = installed {
        eprintln!("Failed to install the tracing subscriber: {}", err);
    }
}
