//! Periodic sweep of stale counter entries.

use std::time::Duration;

use chrono::Utc;
use tokio::task::JoinHandle;

use crate::ServiceState;

/// Default interval between sweeps.
pub const SWEEP_INTERVAL: Duration = Duration::from_secs(60 * 60);

/// Spawns the janitor on the current tokio runtime.
///
/// The first sweep runs one `interval` after start. The task runs until the
/// runtime shuts down or the handle is aborted.
pub fn spawn(state: ServiceState, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(interval).await;
            let report = state.sweep_stale(Utc::now());
            if report.total() > 0 {
                tracing::info!(
                    api = report.api,
                    speed = report.speed,
                    booking_ip = report.booking_ip,
                    booking_phone = report.booking_phone,
                    "Swept stale rate-limit entries"
                );
            } else {
                tracing::debug!("Janitor found nothing to sweep");
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ServiceConfig;
    use chrono::TimeDelta;

    #[tokio::test]
    async fn janitor_sweeps_on_interval() {
        let state = ServiceState::new(&ServiceConfig::default());
        let stale = Utc::now() - TimeDelta::minutes(61);
        state.booking_guard().admit("1.2.3.4", None, stale).unwrap();
        state
            .booking_guard()
            .admit("5.6.7.8", None, Utc::now() - TimeDelta::minutes(59))
            .unwrap();

        let handle = spawn(state.clone(), Duration::from_millis(20));
        tokio::time::sleep(Duration::from_millis(200)).await;
        handle.abort();

        let ip = state.booking_guard().ip_store();
        assert!(ip.get("1.2.3.4").is_none());
        assert!(ip.get("5.6.7.8").is_some());
    }
}
