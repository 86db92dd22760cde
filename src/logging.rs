use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Environment variable holding an `EnvFilter` directive string, e.g. `autocut=debug`.
pub const LOG_ENV_VAR: &str = "AUTOCUT_LOG";

/// Install JSON logging on stderr at `info`, unless [`LOG_ENV_VAR`] says otherwise.
pub fn init() {
    init_with_default(LevelFilter::INFO);
}

/// Install JSON logging on stderr, falling back to `default_level` when [`LOG_ENV_VAR`] is unset.
///
/// Stdout is left alone so subtitles can be piped. Only the first call in a process installs a
/// subscriber; later calls are no-ops.
pub fn init_with_default(default_level: LevelFilter) {
    let _ = tracing_subscriber::registry()
        .with(env_filter(default_level))
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_current_span(true)
                .with_span_list(false),
        )
        .try_init();
}

fn env_filter(default_level: LevelFilter) -> EnvFilter {
    EnvFilter::builder()
        .with_env_var(LOG_ENV_VAR)
        .with_default_directive(default_level.into())
        .from_env_lossy()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_init_is_harmless() {
        init_with_default(LevelFilter::DEBUG);
        init();
    }

    #[test]
    fn default_level_applies_without_env_override() {
        if std::env::var_os(LOG_ENV_VAR).is_some() {
            return;
        }
        let filter = env_filter(LevelFilter::WARN);
        assert_eq!(filter.max_level_hint(), Some(LevelFilter::WARN));
    }
}
