//! Time window resolution from configuration values.

use chrono::{Months, NaiveDate, Utc};
use tracing::debug;

use crate::errors::{StatsEngineConfigError, StatsEngineResult};
use crate::model::TimeWindow;

/// Raw window configuration: an explicit `YYYY-MM-DD:YYYY-MM-DD` range or a
/// relative "last N months" count. The explicit range wins when both are
/// present.
#[derive(Debug, Clone)]
pub struct WindowSpec {
    pub range: Option<String>,
    pub last_months: u32,
}

/// Resolves the configured window into absolute instants.
///
/// The explicit form spans `00:00:00Z` of the start date through
/// `23:59:59Z` of the end date. The relative form spans from
/// `now - last_months` months to `now`.
pub fn resolve(spec: &WindowSpec) -> StatsEngineResult<TimeWindow> {
    if let Some(range) = spec.range.as_deref().filter(|r| !r.trim().is_empty()) {
        let (start, end) = range
            .split_once(':')
            .ok_or_else(|| StatsEngineConfigError::MalformedTimeRange(range.to_string()))?;

        let since = parse_day(range, start.trim())?
            .and_hms_opt(0, 0, 0)
            .unwrap_or_default()
            .and_utc();
        let until = parse_day(range, end.trim())?
            .and_hms_opt(23, 59, 59)
            .unwrap_or_default()
            .and_utc();

        if since > until {
            return Err(StatsEngineConfigError::ReversedTimeRange(range.to_string()).into());
        }

        debug!(%since, %until, "resolved explicit time window");
        return Ok(TimeWindow { since, until });
    }

    let until = Utc::now();
    let since = until
        .checked_sub_months(Months::new(spec.last_months))
        .unwrap_or(until);

    debug!(%since, %until, months = spec.last_months, "resolved relative time window");
    Ok(TimeWindow { since, until })
}

fn parse_day(range: &str, day: &str) -> Result<NaiveDate, StatsEngineConfigError> {
    NaiveDate::parse_from_str(day, "%Y-%m-%d").map_err(|e| {
        StatsEngineConfigError::InvalidTimeRange {
            value: range.to_string(),
            source: e,
        }
    })
}
