//! Shared fixtures for the `routines` integration tests.
//!
//! - [`builders`] shortens routine and runner setup.
//! - [`fake_launcher`] records argv instead of spawning processes.
//! - [`tracker`] is an in-process command that records its invocations.
//! - [`store`] is an in-memory transactional store with an `edit` command.

pub mod builders;
pub mod fake_launcher;
pub mod store;
pub mod tracker;

use std::sync::Once;
use tracing_subscriber::{EnvFilter, fmt};

pub use builders::{Harness, RoutineBuilder, track};
pub use fake_launcher::FakeLauncher;
pub use store::{EditHandler, MemoryStore};
pub use tracker::{TrackRecord, Tracker};

static INIT: Once = Once::new();

/// Initialise tracing for tests.
///
/// - Uses `with_test_writer()`, so logs are captured per-test.
/// - The Rust test harness only prints captured output for **failing** tests
///   (unless you run with `-- --nocapture`).
///
/// Enable levels with e.g.:
/// `ROUTINES_LOG=debug cargo test`
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_env("ROUTINES_LOG").unwrap_or_else(|_| EnvFilter::new("info"));

        fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .init();
    });
}

/// Run a future with a 5-second timeout.
pub async fn with_timeout<F, T>(f: F) -> T
where
    F: std::future::Future<Output = T>,
{
    tokio::time::timeout(std::time::Duration::from_secs(5), f)
        .await
        .expect("Test timed out after 5 seconds")
}
