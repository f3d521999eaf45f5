//! Builds the timer device's status snapshot.
//!
//! Each call formats the current instant in the configured timezone and, when
//! a location is configured, adds sunrise/sunset. The sunrise service is
//! queried at most once per local calendar day; the result is reused until
//! the snapshot's `date` changes.

use std::sync::Arc;

use chrono::{DateTime, Datelike, TimeZone, Timelike};
use chrono_tz::Tz;
use tokio::sync::Mutex;
use tracing::debug;
use tracing::warn;

use super::clock::Clock;
use super::status::{StatusSnapshot, SunEvent, Weekday};
use crate::config::{LocationConfig, StatusProfile};
use crate::integrations::sunrise::{SunTimes, SunriseClient, SunriseError};

#[derive(Debug, thiserror::Error)]
pub enum ComposeError {
    #[error(transparent)]
    Sunrise(#[from] SunriseError),
}

/// Sunrise/sunset data valid for one local date
#[derive(Debug, Clone)]
struct CachedSun {
    date: String,
    times: SunTimes,
}

pub struct Composer<S: SunriseClient> {
    clock: Arc<dyn Clock>,
    tz: Tz,
    profile: StatusProfile,
    location: Option<LocationConfig>,
    sunrise: S,
    last_sun: Mutex<Option<CachedSun>>,
}

impl<S: SunriseClient> Composer<S> {
    pub fn new(
        clock: Arc<dyn Clock>,
        tz: Tz,
        profile: StatusProfile,
        location: Option<LocationConfig>,
        sunrise: S,
    ) -> Self {
        Self {
            clock,
            tz,
            profile,
            location,
            sunrise,
            last_sun: Mutex::new(None),
        }
    }

    /// Compose a snapshot for the current instant.
    ///
    /// Fails only if the sunrise service has to be asked and the request fails.
    pub async fn compose(&self) -> Result<StatusSnapshot, ComposeError> {
        let now = truncate_to_second(self.clock.now_utc().with_timezone(&self.tz));
        let mut snapshot = self.time_fields(&now);

        let Some(location) = &self.location else {
            return Ok(snapshot);
        };

        let mut last_sun = self.last_sun.lock().await;
        let times = match last_sun.as_ref() {
            Some(cached) if cached.date == snapshot.date => Some(cached.times.clone()),
            _ => {
                debug!("Fetching sunrise/sunset for {}", snapshot.date);
                let response = self.sunrise.fetch(location).await?;
                match response.results {
                    Some(times) => {
                        *last_sun = Some(CachedSun {
                            date: snapshot.date.clone(),
                            times: times.clone(),
                        });
                        Some(times)
                    }
                    None => {
                        warn!(
                            "Sunrise service returned no results (status: {:?})",
                            response.status
                        );
                        None
                    }
                }
            }
        };
        drop(last_sun);

        if let Some(times) = times {
            self.add_sun(&mut snapshot, &now, &times);
        }

        Ok(snapshot)
    }

    fn time_fields(&self, now: &DateTime<Tz>) -> StatusSnapshot {
        let weekday = now.weekday().number_from_monday().to_string();

        StatusSnapshot {
            now: format_instant(now),
            date: now.format("%Y-%m-%d").to_string(),
            weekday: match self.profile {
                StatusProfile::Current => Weekday::DayOfWeek(weekday),
                StatusProfile::Legacy => Weekday::Day(weekday),
            },
            week: now.iso_week().week().to_string(),
            time: now.format("%H:%M:%S").to_string(),
            epoch: now.timestamp().to_string(),
            tz: self.tz.name().to_string(),
            sunrise: None,
            sunset: None,
            day_time: None,
        }
    }

    fn add_sun(&self, snapshot: &mut StatusSnapshot, now: &DateTime<Tz>, times: &SunTimes) {
        let sunrise = truncate_to_second(times.sunrise.at().with_timezone(&self.tz));
        let sunset = truncate_to_second(times.sunset.at().with_timezone(&self.tz));

        let (sunrise_event, sunset_event) = match self.profile {
            StatusProfile::Current => (
                SunEvent::Relative {
                    event: format_instant(&sunrise),
                    minutes: minutes_until(now, &sunrise),
                },
                SunEvent::Relative {
                    event: format_instant(&sunset),
                    minutes: minutes_until(now, &sunset),
                },
            ),
            StatusProfile::Legacy => (
                SunEvent::Raw(times.sunrise.raw().to_string()),
                SunEvent::Raw(times.sunset.raw().to_string()),
            ),
        };

        snapshot.sunrise = Some(sunrise_event);
        snapshot.sunset = Some(sunset_event);
        snapshot.day_time = Some(sunrise <= *now && *now <= sunset);
    }
}

/// `2024-06-21T12:00:00+02:00`
fn format_instant<T: TimeZone>(instant: &DateTime<T>) -> String
where
    T::Offset: std::fmt::Display,
{
    instant.format("%Y-%m-%dT%H:%M:%S%:z").to_string()
}

fn truncate_to_second<T: TimeZone>(instant: DateTime<T>) -> DateTime<T> {
    instant.with_nanosecond(0).unwrap_or(instant)
}

/// Whole minutes from `now` until `event`, halves rounded up; negative once passed.
fn minutes_until<T: TimeZone>(now: &DateTime<T>, event: &DateTime<T>) -> i64 {
    let seconds = event.clone().signed_duration_since(now.clone()).num_seconds();
    (seconds + 30).div_euclid(60)
}
