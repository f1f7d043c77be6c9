use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tally_core::models::{Company, Identity, TimeEntry};

use crate::timer::TimerEvent;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "category", rename_all = "snake_case")]
pub enum EngineEvent {
    Session(SessionEvent),
    Timer(TimerEvent),
    Company(CompanyEvent),
    Entry(EntryEvent),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionEvent {
    /// `None` after sign-out
    pub identity: Option<Identity>,
    pub timestamp: DateTime<Utc>,
}

impl SessionEvent {
    pub fn changed(identity: Option<Identity>) -> Self {
        Self {
            identity,
            timestamp: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompanyEvent {
    pub event_type: ChangeType,
    pub company_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company: Option<Company>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntryEvent {
    pub event_type: ChangeType,
    pub entry_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entry: Option<TimeEntry>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeType {
    Added,
    Updated,
    Deleted,
}

impl CompanyEvent {
    pub fn added(company: Company) -> Self {
        Self::with_company(ChangeType::Added, company)
    }

    pub fn updated(company: Company) -> Self {
        Self::with_company(ChangeType::Updated, company)
    }

    pub fn deleted(company_id: String) -> Self {
        Self {
            event_type: ChangeType::Deleted,
            company_id,
            company: None,
            timestamp: Utc::now(),
        }
    }

    fn with_company(event_type: ChangeType, company: Company) -> Self {
        Self {
            event_type,
            company_id: company.id.clone(),
            company: Some(company),
            timestamp: Utc::now(),
        }
    }
}

impl EntryEvent {
    pub fn added(entry: TimeEntry) -> Self {
        Self::with_entry(ChangeType::Added, entry)
    }

    pub fn updated(entry: TimeEntry) -> Self {
        Self::with_entry(ChangeType::Updated, entry)
    }

    pub fn deleted(entry_id: String) -> Self {
        Self {
            event_type: ChangeType::Deleted,
            entry_id,
            entry: None,
            timestamp: Utc::now(),
        }
    }

    fn with_entry(event_type: ChangeType, entry: TimeEntry) -> Self {
        Self {
            event_type,
            entry_id: entry.id.clone(),
            entry: Some(entry),
            timestamp: Utc::now(),
        }
    }
}
