use std::sync::Once;

/// Environment variable read before `RUST_LOG`.
pub const LOG_ENV: &str = "GRIDVIEW_LOG";

/// Filter used when neither the config nor the environment sets one.
/// wgpu and naga are chatty at info.
pub const DEFAULT_FILTER: &str = "info,wgpu_core=warn,wgpu_hal=warn,naga=warn";

/// Logger configuration.
///
/// `env_filter` follows the `env_logger` filter syntax (e.g. "debug",
/// "gridview_engine=trace,wgpu=warn").
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub env_filter: Option<String>,
    pub write_style: env_logger::WriteStyle,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            env_filter: None,
            write_style: env_logger::WriteStyle::Auto,
        }
    }
}

impl LoggingConfig {
    /// Picks the filter: explicit config, then `GRIDVIEW_LOG`, then
    /// `RUST_LOG`, then [`DEFAULT_FILTER`].
    pub fn resolve_filter(&self, env: impl Fn(&str) -> Option<String>) -> String {
        self.env_filter
            .clone()
            .or_else(|| env(LOG_ENV))
            .or_else(|| env("RUST_LOG"))
            .unwrap_or_else(|| DEFAULT_FILTER.to_owned())
    }
}

static INIT: Once = Once::new();

/// Initializes the global logger once; later calls are ignored.
pub fn init_logging(config: LoggingConfig) {
    INIT.call_once(|| {
        let filter = config.resolve_filter(|key| std::env::var(key).ok());

        let mut builder = env_logger::Builder::new();
        builder.parse_filters(&filter);
        builder.write_style(config.write_style);

        if let Err(e) = builder.try_init() {
            eprintln!("logger already set: {e}");
            return;
        }

        log::debug!("logging initialized with filter `{filter}`");
    });
}
