use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use super::NewTimeEntry;

/// The single in-progress timing session, not yet durable as an entry
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ActiveTimer {
    pub company_id: String,
    pub start_time: DateTime<Utc>,
}

impl ActiveTimer {
    pub fn new(company_id: String, start_time: DateTime<Utc>) -> Self {
        Self {
            company_id,
            start_time,
        }
    }

    /// Whole seconds elapsed at `now`, never negative
    pub fn elapsed_seconds(&self, now: DateTime<Utc>) -> u64 {
        (now.signed_duration_since(self.start_time)
            .num_milliseconds()
            .max(0)
            / 1000) as u64
    }

    pub fn references(&self, company_id: &str) -> bool {
        self.company_id == company_id
    }

    /// Convert into an insert payload for a tracked entry ending at `end`
    pub fn finish<Tz: TimeZone>(&self, end: DateTime<Utc>, tz: &Tz, user_id: String) -> NewTimeEntry {
        NewTimeEntry::tracked(
            self.company_id.clone(),
            self.start_time,
            end,
            tz,
            user_id,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration as ChronoDuration, FixedOffset};

    #[test]
    fn test_elapsed_floors_to_seconds() {
        let start = Utc.with_ymd_and_hms(2024, 1, 15, 9, 0, 0).unwrap();
        let timer = ActiveTimer::new("A".to_string(), start);

        assert_eq!(timer.elapsed_seconds(start), 0);
        assert_eq!(
            timer.elapsed_seconds(start + ChronoDuration::milliseconds(5_999)),
            5
        );
        assert_eq!(timer.elapsed_seconds(start - ChronoDuration::seconds(3)), 0);
    }

    #[test]
    fn test_finish_produces_tracked_entry() {
        let start = Utc.with_ymd_and_hms(2024, 1, 15, 9, 0, 0).unwrap();
        let timer = ActiveTimer::new("A".to_string(), start);
        let offset = FixedOffset::east_opt(0).unwrap();

        let entry = timer.finish(start + ChronoDuration::seconds(90), &offset, "u1".into());
        assert_eq!(entry.company_id, "A");
        assert_eq!(entry.duration_minutes, 2);
        assert!(!entry.is_manual);
        assert_eq!(entry.date.to_string(), "2024-01-15");
    }

    #[test]
    fn test_persisted_shape() {
        let start = Utc.with_ymd_and_hms(2024, 1, 15, 9, 0, 0).unwrap();
        let timer = ActiveTimer::new("A".to_string(), start);
        let json = serde_json::to_string(&timer).unwrap();
        assert!(json.contains("\"companyId\":\"A\""));

        let back: ActiveTimer = serde_json::from_str(&json).unwrap();
        assert_eq!(back, timer);
    }
}
