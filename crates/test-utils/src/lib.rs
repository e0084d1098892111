pub mod builders;
pub mod fake_executor;
pub mod notifier;
pub mod reload;

use std::future::Future;
use std::sync::Once;
use std::time::Duration;

use assetwatch::logging::LOG_ENV;
use tracing_subscriber::{fmt, EnvFilter};

/// Upper bound for any single awaited step in a test.
pub const TEST_TIMEOUT: Duration = Duration::from_secs(10);

static INIT: Once = Once::new();

/// Route crate logs to the test writer, so they only show for failing tests.
///
/// Reads the same `ASSETWATCH_LOG` variable as the binary, e.g.
/// `ASSETWATCH_LOG=assetwatch=trace cargo test`. Without it, assetwatch logs
/// at `debug` and everything else (axum, notify) at `warn`.
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter = std::env::var(LOG_ENV)
            .ok()
            .and_then(|value| EnvFilter::try_new(value).ok())
            .unwrap_or_else(|| EnvFilter::new("warn,assetwatch=debug"));

        // Another subscriber may already be installed by a test binary.
        let _ = fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(false)
            .try_init();
    });
}

/// Await `f`, failing the test if it takes longer than [`TEST_TIMEOUT`].
pub async fn with_timeout<F, T>(f: F) -> T
where
    F: Future<Output = T>,
{
    match tokio::time::timeout(TEST_TIMEOUT, f).await {
        Ok(value) => value,
        Err(_) => panic!("test step did not finish within {TEST_TIMEOUT:?}"),
    }
}
