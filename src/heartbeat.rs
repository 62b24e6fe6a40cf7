use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::config::Device;
use crate::supabase::Sink;

/// How long `stop` waits for an in-flight report before giving up.
pub const STOP_TIMEOUT: Duration = Duration::from_secs(2);

/// Periodic liveness report, independent of the polling loop.
///
/// The task reports device identity and the crate version on every tick so
/// the backend can tell a silent scale from a dead bridge. A failed report
/// is logged and the ticker keeps going.
#[derive(Debug)]
pub struct Heartbeat {
    stop: watch::Sender<bool>,
    handle: Option<JoinHandle<()>>,
}

impl Heartbeat {
    /// Spawns the reporting task. The first report goes out immediately.
    pub fn start<S>(sink: Arc<S>, device: Device, period: Duration) -> Heartbeat
    where
        S: Sink + 'static,
    {
        let (stop, mut stopped) = watch::channel(false);
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            loop {
                tokio::select! {
                    _ = stopped.changed() => break,
                    _ = ticker.tick() => {
                        if let Err(e) = sink
                            .insert_heartbeat(&device, env!("CARGO_PKG_VERSION"))
                            .await
                        {
                            log::error!("Failed to report heartbeat: {e:#}");
                        }
                    }
                }
            }
        });

        Heartbeat {
            stop,
            handle: Some(handle),
        }
    }

    /// Signals the task to stop and waits for an in-flight report to finish,
    /// bounded by [`STOP_TIMEOUT`]. Calling this again is a no-op.
    pub async fn stop(&mut self) {
        let _ = self.stop.send(true);
        let Some(handle) = self.handle.take() else {
            return;
        };

        match tokio::time::timeout(STOP_TIMEOUT, handle).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => log::error!("Heartbeat task failed: {e}"),
            Err(_) => log::warn!("Heartbeat task did not stop within {STOP_TIMEOUT:?}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::supabase::MockSink;

    fn device() -> Device {
        Device {
            id: "default".to_string(),
            name: "Tanita TBF-400".to_string(),
        }
    }

    #[tokio::test]
    async fn reports_repeatedly_until_stopped() {
        let mut sink = MockSink::new();
        sink.expect_insert_heartbeat()
            .times(2..)
            .returning(|_, _| Ok(()));
        let sink = Arc::new(sink);

        let mut heartbeat =
            Heartbeat::start(Arc::clone(&sink), device(), Duration::from_millis(10));
        tokio::time::sleep(Duration::from_millis(55)).await;
        heartbeat.stop().await;
    }

    #[tokio::test]
    async fn failed_report_does_not_stop_the_ticker() {
        let mut sink = MockSink::new();
        sink.expect_insert_heartbeat()
            .times(2..)
            .returning(|_, _| Err(anyhow::anyhow!("backend unreachable")));
        let sink = Arc::new(sink);

        let mut heartbeat =
            Heartbeat::start(Arc::clone(&sink), device(), Duration::from_millis(10));
        tokio::time::sleep(Duration::from_millis(55)).await;
        heartbeat.stop().await;
    }

    #[tokio::test]
    async fn stop_is_idempotent() {
        let mut sink = MockSink::new();
        sink.expect_insert_heartbeat().returning(|_, _| Ok(()));

        let mut heartbeat = Heartbeat::start(Arc::new(sink), device(), Duration::from_secs(10));
        heartbeat.stop().await;
        heartbeat.stop().await;
    }
}
