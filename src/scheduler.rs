// src/scheduler.rs

//! Daily cache refresh.
//!
//! One background task per process wakes at a fixed wall-clock time in the
//! configured timezone and re-crawls the day's readings.

use std::sync::Arc;

use chrono::{DateTime, Days, NaiveTime, TimeDelta, TimeZone, Utc};
use chrono_tz::Tz;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use crate::error::{AppError, Result};
use crate::models::ScheduleConfig;
use crate::services::ReadingsService;

/// Handle to the running daily refresh task.
pub struct DailyRefresh {
    shutdown: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl DailyRefresh {
    /// Spawn the refresh loop on the current tokio runtime.
    pub fn start(service: Arc<ReadingsService>, schedule: &ScheduleConfig) -> Result<Self> {
        let tz = schedule.timezone()?;
        let at = NaiveTime::from_hms_opt(schedule.hour, schedule.minute, 0).ok_or_else(|| {
            AppError::validation(format!(
                "schedule time {:02}:{:02} is out of range",
                schedule.hour, schedule.minute
            ))
        })?;

        let (shutdown, mut stopped) = oneshot::channel::<()>();
        let handle = tokio::spawn(async move {
            let mut after = Utc::now();
            loop {
                let next = next_fire_after(after, tz, at);
                let wait = (next - Utc::now()).to_std().unwrap_or_default();
                log::info!("Next daily refresh at {}", next.with_timezone(&tz));

                tokio::select! {
                    _ = &mut stopped => break,
                    _ = tokio::time::sleep(wait) => {
                        log::info!("Running daily refresh");
                        service.daily_refresh().await;
                    }
                }
                after = Utc::now().max(next);
            }
            log::info!("Daily refresh stopped");
        });

        Ok(Self {
            shutdown: Some(shutdown),
            handle: Some(handle),
        })
    }

    /// Stop the loop and wait for it to finish.
    ///
    /// A refresh already in progress is allowed to complete.
    pub async fn stop(mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        if let Some(handle) = self.handle.take() {
            if let Err(e) = handle.await {
                log::warn!("Daily refresh task ended abnormally: {}", e);
            }
        }
    }
}

impl Drop for DailyRefresh {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

/// First instant strictly after `now` whose local time in `tz` is `at`.
///
/// Days on which `at` does not exist (DST gap) are skipped; on days where it
/// occurs twice the earlier instant is used.
pub fn next_fire_after(now: DateTime<Utc>, tz: Tz, at: NaiveTime) -> DateTime<Utc> {
    let today = now.with_timezone(&tz).date_naive();
    (0..7)
        .filter_map(|offset| today.checked_add_days(Days::new(offset)))
        .filter_map(|day| tz.from_local_datetime(&day.and_time(at)).earliest())
        .map(|local| local.with_timezone(&Utc))
        .find(|candidate| *candidate > now)
        .unwrap_or(now + TimeDelta::days(1))
}
