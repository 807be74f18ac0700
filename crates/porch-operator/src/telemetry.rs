use tracing_subscriber::{fmt, EnvFilter};

/// Initialize tracing for the operator.
///
/// `RUST_LOG` wins over `log_level` when set. Targets are kept so that
/// kube runtime logs can be told apart from reconciler logs.
pub fn init(log_level: &str) {
    fmt()
        .with_env_filter(filter(log_level))
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();
}

fn filter(log_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level))
}
