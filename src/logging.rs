//! Logging initialization

use tracing_subscriber::{fmt::layer, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Installs a stderr subscriber, compact or JSON. `RUST_LOG` overrides the
/// default `info` level.
pub fn init(json: bool) {
    let filt = EnvFilter::builder()
        .with_default_directive(tracing::Level::INFO.into())
        .from_env_lossy();

    let stderr_sub = if json {
        layer().json().with_writer(std::io::stderr).with_filter(filt).boxed()
    } else {
        layer().compact().with_writer(std::io::stderr).with_filter(filt).boxed()
    };

    // a second init (tests, embedding) keeps the first subscriber
    let _ = tracing_subscriber::registry().with(stderr_sub).try_init();
}
