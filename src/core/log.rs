use tracing::level_filters::LevelFilter;
use tracing_subscriber::{
    EnvFilter, filter::Targets, fmt, prelude::__tracing_subscriber_SubscriberExt,
    util::SubscriberInitExt,
};

/// Installs the global subscriber. When `RUST_LOG` is set it alone decides
/// what is logged and `verbose` is ignored.
pub fn init_logging(verbose: bool) {
    let env_filter = EnvFilter::try_from_default_env().ok();
    let app_filter = app_targets(verbose, env_filter.is_some());
    let env_filter = env_filter.unwrap_or_else(|| EnvFilter::new(default_level(verbose)));

    tracing_subscriber::registry()
        .with(fmt::layer().pretty().without_time())
        .with(app_filter)
        .with(env_filter)
        .init();
}

fn default_level(verbose: bool) -> &'static str {
    if verbose { "debug" } else { "info" }
}

/// Per-target levels used only without `RUST_LOG`: the app at info (debug
/// when verbose), everything else at warn.
fn app_targets(verbose: bool, env_configured: bool) -> Option<Targets> {
    if env_configured {
        return None;
    }
    let level_filter = if verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    };
    Some(
        Targets::new()
            .with_target("quotesync", level_filter)
            .with_default(LevelFilter::WARN),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing::Level;

    #[test]
    fn test_default_targets() {
        let targets = app_targets(false, false).unwrap();
        assert!(targets.would_enable("quotesync::core::batch", &Level::INFO));
        assert!(!targets.would_enable("quotesync::core::batch", &Level::DEBUG));
        assert!(!targets.would_enable("reqwest::connect", &Level::INFO));
        assert!(targets.would_enable("reqwest::connect", &Level::WARN));

        let verbose = app_targets(true, false).unwrap();
        assert!(verbose.would_enable("quotesync::providers::gateway", &Level::DEBUG));
    }

    #[test]
    fn test_rust_log_replaces_app_targets() {
        // RUST_LOG=quotesync=debug must not be capped at info
        assert!(app_targets(false, true).is_none());
        assert!(app_targets(true, true).is_none());
    }
}
