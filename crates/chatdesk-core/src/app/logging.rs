use std::thread;

use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use super::error_collector_layer::ErrorCollectorLayer;
use super::error_store::ErrorStore;

const MAX_ERROR_ENTRIES: usize = 200;

/// Install the global subscriber: `fmt` output filtered by `RUST_LOG` (falling back
/// to `default_directive`) plus an [`ErrorCollectorLayer`] feeding the returned store.
///
/// Returns `None` if a global subscriber was already installed.
pub fn init_tracing(default_directive: &str) -> Option<ErrorStore> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));
    let (collector, receiver) = ErrorCollectorLayer::new();

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .with(collector)
        .try_init()
        .ok()?;

    let store = ErrorStore::new(MAX_ERROR_ENTRIES);
    let sink = store.clone();
    thread::Builder::new()
        .name("error-collector".into())
        .spawn(move || {
            for entry in receiver {
                sink.add_entry(entry);
            }
        })
        .ok()?;

    tracing::info!("Tracing initialized");
    Some(store)
}
