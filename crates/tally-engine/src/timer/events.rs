//! Timer events

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Event emitted by the timer lifecycle
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TimerEvent {
    pub event_type: TimerEventType,
    pub company_id: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TimerEventType {
    Started { start_time: DateTime<Utc> },
    /// Timer flushed into a durable entry
    Stopped { entry_id: String, duration_minutes: u64 },
    /// Timer picked up from local storage after a restart or sign-in
    Restored { start_time: DateTime<Utc> },
    /// Periodic update while running
    Tick { elapsed_seconds: u64 },
}

impl TimerEvent {
    pub fn new(event_type: TimerEventType, company_id: String) -> Self {
        Self {
            event_type,
            company_id,
            timestamp: Utc::now(),
        }
    }

    pub fn started(company_id: String, start_time: DateTime<Utc>) -> Self {
        Self::new(TimerEventType::Started { start_time }, company_id)
    }

    pub fn stopped(company_id: String, entry_id: String, duration_minutes: u64) -> Self {
        Self::new(
            TimerEventType::Stopped {
                entry_id,
                duration_minutes,
            },
            company_id,
        )
    }

    pub fn restored(company_id: String, start_time: DateTime<Utc>) -> Self {
        Self::new(TimerEventType::Restored { start_time }, company_id)
    }

    pub fn tick(company_id: String, elapsed_seconds: u64) -> Self {
        Self::new(TimerEventType::Tick { elapsed_seconds }, company_id)
    }
}
