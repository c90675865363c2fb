use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};

use crate::{Result, ShipperError};

/// Time range covered by one tick's range queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub step: Duration,
}

impl QueryWindow {
    /// Computes the window for a tick happening at `now`.
    ///
    /// The window spans `query_interval * 1.2` so consecutive ticks overlap by
    /// 20%, ends on the last whole minute, and both bounds are aligned to
    /// `step` with one extra step of padding on each side.
    pub fn compute(now: DateTime<Utc>, query_interval: Duration, step: Duration) -> Result<Self> {
        let step_secs = step.as_secs() as i64;
        if step_secs < 1 {
            return Err(ShipperError::Config(format!(
                "query step must be at least one second, got {:?}",
                step
            )));
        }

        let effective_secs = (query_interval.as_millis() * 6 / 5 / 1000) as i64;
        let end = now.timestamp().div_euclid(60) * 60;
        let start = end - effective_secs;

        let start = (start.div_euclid(step_secs) - 1) * step_secs;
        let end = (end.div_euclid(step_secs) + 1) * step_secs;

        Ok(Self {
            start: to_datetime(start)?,
            end: to_datetime(end)?,
            step: Duration::from_secs(step_secs as u64),
        })
    }

    pub fn start_secs(&self) -> i64 {
        self.start.timestamp()
    }

    pub fn end_secs(&self) -> i64 {
        self.end.timestamp()
    }

    pub fn step_secs(&self) -> u64 {
        self.step.as_secs()
    }
}

fn to_datetime(secs: i64) -> Result<DateTime<Utc>> {
    Utc.timestamp_opt(secs, 0)
        .single()
        .ok_or_else(|| ShipperError::Internal(format!("timestamp {} out of range", secs)))
}
