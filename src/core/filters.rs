use crate::core::archetype::ArchetypeCode;
use crate::error::{ExchangeError, MatchRejection};
use crate::models::{CompatibilityResult, MatchFilter};
use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc, Weekday};

/// Check a host filter at request creation time
pub fn validate_filter(filter: &MatchFilter, floor: u8, ceiling: u8) -> Result<(), ExchangeError> {
    if filter.min_compatibility < floor || filter.min_compatibility > ceiling {
        return Err(ExchangeError::InvalidFilterRange {
            value: filter.min_compatibility,
            min: floor,
            max: ceiling,
        });
    }
    Ok(())
}

/// Check whether a scored candidate passes the host's filter
///
/// Archetype exclusion is checked before the score threshold.
#[inline]
pub fn check_candidate(
    filter: &MatchFilter,
    candidate_archetype: ArchetypeCode,
    compatibility: &CompatibilityResult,
) -> Result<(), MatchRejection> {
    if !filter.allows(candidate_archetype) {
        return Err(MatchRejection::ArchetypeExcluded {
            archetype: candidate_archetype,
        });
    }

    if compatibility.overall_score < filter.min_compatibility {
        return Err(MatchRejection::BelowThreshold {
            score: compatibility.overall_score,
            required: filter.min_compatibility,
        });
    }

    Ok(())
}

/// Preferred visit date must be today or later and fall on an allowed day
pub fn validate_preferred_date(
    date: NaiveDate,
    today: NaiveDate,
    allowed_days: &[Weekday],
) -> Result<(), ExchangeError> {
    if date < today {
        return Err(ExchangeError::InvalidPreferredDate(format!(
            "{} is in the past",
            date
        )));
    }

    if !allowed_days.is_empty() && !allowed_days.contains(&date.weekday()) {
        return Err(ExchangeError::InvalidPreferredDate(format!(
            "{} is a {}, which is not an allowed visit day",
            date,
            date.weekday()
        )));
    }

    Ok(())
}

/// Recurring open-matching window
///
/// With no weekday the window is always open. Otherwise it opens at 00:00 UTC
/// on the given weekday and stays open for `duration_hours`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchingWindow {
    pub weekday: Option<Weekday>,
    pub duration_hours: u32,
}

impl MatchingWindow {
    pub fn always_open() -> Self {
        Self {
            weekday: None,
            duration_hours: 24,
        }
    }

    pub fn is_open(&self, now: DateTime<Utc>) -> bool {
        let Some(weekday) = self.weekday else {
            return true;
        };

        let days_since = (7 + now.weekday().num_days_from_monday() as i64
            - weekday.num_days_from_monday() as i64)
            % 7;
        let start_date = now.date_naive() - Duration::days(days_since);
        let Some(start) = start_date.and_hms_opt(0, 0, 0) else {
            return false;
        };
        let start = start.and_utc();

        now >= start && now < start + Duration::hours(self.duration_hours as i64)
    }
}

impl Default for MatchingWindow {
    fn default() -> Self {
        Self::always_open()
    }
}
