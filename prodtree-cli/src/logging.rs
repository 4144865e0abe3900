//! Logging for the `prodtree` binary.
//!
//! Logs go to stderr so `--output json` keeps stdout machine-readable.

use anyhow::{Result, bail};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use prodtree_core::config::GeneralConfig;

/// Install the global subscriber from `[general]`.
///
/// `RUST_LOG` wins over `log_level`. `log_format` is `json` or `pretty`.
pub fn init_tracing(config: &GeneralConfig) -> Result<()> {
    let json = match config.log_format.as_str() {
        "json" => true,
        "pretty" => false,
        other => bail!("unknown log format '{other}', expected 'json' or 'pretty'"),
    };

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    let layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);
    let registry = tracing_subscriber::registry().with(filter);

    let installed = if json {
        registry.with(layer.json()).try_init()
    } else {
        registry.with(layer.pretty()).try_init()
    };
    installed.map_err(|e| anyhow::anyhow!("failed to initialize tracing: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_log_format_is_rejected() {
        let config = GeneralConfig {
            log_format: "xml".to_owned(),
            ..GeneralConfig::default()
        };
        let err = init_tracing(&config).expect_err("xml is not a log format");
        assert!(err.to_string().contains("'xml'"));
    }
}
