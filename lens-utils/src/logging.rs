use std::{env, io, sync::Once};

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

static LOG_INIT: Once = Once::new();

/// Install the global subscriber, writing to stderr.
///
/// `RUST_LOG` selects what is logged and defaults to `info`, so every
/// deployment step shows up. `RUST_LOG_FORMAT=json` switches to one JSON
/// object per line.
pub fn init_logging() {
    LOG_INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
        let json = env::var("RUST_LOG_FORMAT").is_ok_and(|f| f == "json");
        let json_layer = json.then(|| fmt::layer().json().with_writer(io::stderr));
        let text_layer = (!json).then(|| {
            fmt::layer()
                .with_ansi(colored())
                .with_writer(io::stderr)
        });
        tracing_subscriber::registry()
            .with(filter)
            .with(json_layer)
            .with(text_layer)
            .init();
    });
}

/// Colours stay on unless `NO_COLOR` is set to a non-empty value.
fn colored() -> bool {
    env::var_os("NO_COLOR").is_none_or(|v| v.is_empty())
}
