use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::bus::{EventBus, RefreshEvent};

pub const DEFAULT_REFRESH_PERIOD: Duration = Duration::from_secs(60);

/// Publishes a refresh immediately and then once per `period` until cancelled.
pub fn spawn_refresh_loop<E>(
    bus: EventBus<E>,
    period: Duration,
    shutdown: CancellationToken,
) -> JoinHandle<()>
where
    E: RefreshEvent + Send + 'static,
{
    tokio::spawn(async move {
        while !shutdown.is_cancelled() {
            bus.refresh();
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                _ = tokio::time::sleep(period) => {}
            }
        }
        debug!(bus = bus.name(), "refresh loop stopped");
    })
}
