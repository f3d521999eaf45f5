use std::sync::Arc;
use std::time::Duration;

use tracing::error;
use tracing::info;

use super::module::DatetimeModule;
use crate::config::PollingConfig;
use crate::integrations::pubsub::PubSubClient;
use crate::integrations::sunrise::SunriseClient;

/// Where the poll loop is after the last tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollState {
    /// Last tick succeeded; poll again after the regular interval
    Running,
    /// Last tick failed; wait out the backoff before trying again
    Backoff,
}

/// Re-arms the status refresh after each tick.
///
/// A tick is only armed once the previous one has resolved, so at most one is
/// ever in flight.
#[derive(Debug)]
pub struct Scheduler {
    interval: Duration,
    backoff: Duration,
    state: PollState,
}

impl Scheduler {
    pub fn new(config: &PollingConfig) -> Self {
        Self {
            interval: Duration::from_millis(config.interval_ms),
            backoff: Duration::from_millis(config.backoff_ms),
            state: PollState::Running,
        }
    }

    pub fn state(&self) -> PollState {
        self.state
    }

    /// Delay before the next tick, given the current state
    pub fn next_delay(&self) -> Duration {
        match self.state {
            PollState::Running => self.interval,
            PollState::Backoff => self.backoff,
        }
    }

    /// Run a single tick and return the delay before the next one
    pub async fn poll_once<S, P>(&mut self, module: &DatetimeModule<S, P>) -> Duration
    where
        S: SunriseClient,
        P: PubSubClient,
    {
        self.state = match module.refresh().await {
            Ok(()) => PollState::Running,
            Err(e) => {
                error!("Status refresh failed, retrying in {:?}: {}", self.backoff, e);
                PollState::Backoff
            }
        };
        self.next_delay()
    }

    /// Poll forever. The first tick fires one interval after the call.
    pub async fn run<S, P>(mut self, module: Arc<DatetimeModule<S, P>>)
    where
        S: SunriseClient,
        P: PubSubClient,
    {
        info!(
            "Polling every {:?} (backoff {:?})",
            self.interval, self.backoff
        );

        let mut delay = self.next_delay();
        loop {
            tokio::time::sleep(delay).await;
            delay = self.poll_once(&module).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::module::testing::*;
    use crate::engine::module::DeviceModule;
    use crate::integrations::sunrise::{SunriseError, SunriseResponse};

    #[test]
    fn test_delays_follow_state() {
        let mut scheduler = Scheduler::new(&PollingConfig::default());
        assert_eq!(scheduler.state(), PollState::Running);
        assert_eq!(scheduler.next_delay(), Duration::from_millis(1000));

        scheduler.state = PollState::Backoff;
        assert_eq!(scheduler.next_delay(), Duration::from_millis(60_000));
    }

    #[tokio::test]
    async fn test_failed_tick_backs_off_and_keeps_last_snapshot() {
        let h = harness(Some(OSLO)).await;
        // Bootstrap gets no usable results, so the next tick asks again
        h.sunrise.push_response(Ok(SunriseResponse {
            results: None,
            status: Some("INVALID_REQUEST".to_string()),
        }));
        h.sunrise.push_response(Err(SunriseError::Status {
            status: 500,
            body: "Internal Server Error".to_string(),
        }));
        h.sunrise
            .push_times("2024-06-21T01:53:12+00:00", "2024-06-21T20:44:40+00:00");
        h.module.bootstrap().await.unwrap();

        let mut scheduler = Scheduler::new(&PollingConfig::default());

        h.clock.advance(chrono::Duration::seconds(1));
        let delay = scheduler.poll_once(&h.module).await;
        assert_eq!(delay, Duration::from_millis(60_000));
        assert_eq!(scheduler.state(), PollState::Backoff);

        let kept = h.module.get_device_status(TIMER_ID).await.unwrap().unwrap();
        assert_eq!(kept.time, "12:00:00");
        assert!(kept.sunrise.is_none());

        h.clock.advance(chrono::Duration::seconds(60));
        let delay = scheduler.poll_once(&h.module).await;
        assert_eq!(delay, Duration::from_millis(1000));
        assert_eq!(scheduler.state(), PollState::Running);

        let fresh = h.module.get_device_status(TIMER_ID).await.unwrap().unwrap();
        assert_eq!(fresh.time, "12:01:01");
        assert_eq!(fresh.day_time, Some(true));
        assert_eq!(h.sunrise.calls(), 3);
    }

    #[tokio::test]
    async fn test_same_day_ticks_fetch_once() {
        let h = harness(Some(OSLO)).await;
        h.sunrise
            .push_times("2024-06-21T01:53:12+00:00", "2024-06-21T20:44:40+00:00");
        h.module.bootstrap().await.unwrap();

        let mut scheduler = Scheduler::new(&PollingConfig::default());
        for _ in 0..2 {
            h.clock.advance(chrono::Duration::seconds(1));
            assert_eq!(
                scheduler.poll_once(&h.module).await,
                Duration::from_millis(1000)
            );
        }

        assert_eq!(h.sunrise.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_ticks_every_interval() {
        let h = harness(None).await;
        h.module.bootstrap().await.unwrap();
        assert_eq!(h.pubsub.published_on("sentinel.device.update").len(), 1);

        let task = tokio::spawn(Scheduler::new(&PollingConfig::default()).run(h.module.clone()));
        tokio::time::sleep(Duration::from_millis(3500)).await;
        task.abort();

        // Ticks at 1s, 2s and 3s
        assert_eq!(h.pubsub.published_on("sentinel.device.update").len(), 4);
    }
}
