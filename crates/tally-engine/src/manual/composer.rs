//! Manual entry composition: date plus start/end times into a time entry

use chrono::{NaiveDate, NaiveTime, TimeZone};
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::clock::Clock;
use crate::session::SessionManager;
use crate::store::{DomainStore, StoreError};
use tally_core::models::{Identity, NewTimeEntry, TimeEntry};

#[derive(Debug, thiserror::Error)]
pub enum ComposerError {
    #[error("Invalid entry: {0}")]
    Invalid(String),

    #[error("Could not record time entry: {0}")]
    Store(#[from] StoreError),
}

pub type Result<T> = std::result::Result<T, ComposerError>;

/// The working form; every field must be filled before submitting
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ManualEntryForm {
    pub company_id: Option<String>,
    pub date: Option<NaiveDate>,
    pub start_time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,
}

impl ManualEntryForm {
    /// Empty form dated `today`
    pub fn blank(today: NaiveDate) -> Self {
        Self {
            date: Some(today),
            ..Self::default()
        }
    }

    /// `HH:MM` or `HH:MM:SS`
    pub fn parse_time(value: &str) -> tally_core::Result<NaiveTime> {
        NaiveTime::parse_from_str(value.trim(), "%H:%M")
            .or_else(|_| NaiveTime::parse_from_str(value.trim(), "%H:%M:%S"))
            .map_err(|_| tally_core::Error::Validation(format!("Invalid time '{}'", value)))
    }

    /// `YYYY-MM-DD`
    pub fn parse_date(value: &str) -> tally_core::Result<NaiveDate> {
        NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
            .map_err(|_| tally_core::Error::Validation(format!("Invalid date '{}'", value)))
    }

    /// Build the insert payload, reading the times in `tz` as of the form's
    /// date. `Ok(None)` when a field is missing.
    pub fn compose<Tz: TimeZone>(
        &self,
        identity: &Identity,
        tz: &Tz,
    ) -> Result<Option<NewTimeEntry>> {
        let company_id = match self.company_id.as_deref() {
            Some(id) if !id.trim().is_empty() => id,
            _ => return Ok(None),
        };
        let (Some(date), Some(start), Some(end)) = (self.date, self.start_time, self.end_time)
        else {
            return Ok(None);
        };

        NewTimeEntry::manual(
            company_id.to_string(),
            date,
            start,
            end,
            tz,
            identity.id.clone(),
        )
        .map(Some)
        .map_err(|e| ComposerError::Invalid(e.to_string()))
    }
}

pub struct ManualEntryComposer {
    form: Mutex<ManualEntryForm>,
    store: Arc<DomainStore>,
    session: Arc<SessionManager>,
    clock: Arc<dyn Clock>,
}

impl ManualEntryComposer {
    pub fn new(store: Arc<DomainStore>, session: Arc<SessionManager>, clock: Arc<dyn Clock>) -> Self {
        Self {
            form: Mutex::new(ManualEntryForm::blank(clock.today())),
            store,
            session,
            clock,
        }
    }

    pub async fn form(&self) -> ManualEntryForm {
        self.form.lock().await.clone()
    }

    pub async fn edit<F>(&self, edit: F)
    where
        F: FnOnce(&mut ManualEntryForm),
    {
        let mut form = self.form.lock().await;
        edit(&mut form);
    }

    pub async fn reset(&self) {
        *self.form.lock().await = ManualEntryForm::blank(self.clock.today());
    }

    /// Record the working form and reset it on success
    pub async fn submit(&self) -> Result<Option<TimeEntry>> {
        let form = self.form().await;
        let entry = self.add(&form).await?;
        if entry.is_some() {
            self.reset().await;
        }
        Ok(entry)
    }

    /// Record `form` directly. `Ok(None)` when signed out or incomplete.
    pub async fn add(&self, form: &ManualEntryForm) -> Result<Option<TimeEntry>> {
        let Some(identity) = self.session.current() else {
            return Ok(None);
        };
        let Some(new_entry) = form.compose(&identity, &self.clock.zone())? else {
            return Ok(None);
        };

        let entry = self.store.add_entry(new_entry).await?;
        tracing::info!(
            "Recorded manual entry of {} minutes for company {}",
            entry.duration_minutes,
            entry.company_id
        );
        Ok(Some(entry))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::event_manager::EventManager;
    use crate::memory::MemoryBackend;
    use chrono::{FixedOffset, Utc};
    use tally_core::models::Zone;

    struct Fixture {
        session: Arc<SessionManager>,
        store: Arc<DomainStore>,
        composer: ManualEntryComposer,
    }

    fn fixture() -> Fixture {
        fixture_with(ManualClock::utc(
            Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap(),
        ))
    }

    fn fixture_with(clock: ManualClock) -> Fixture {
        let backend = Arc::new(MemoryBackend::new());
        let events = Arc::new(EventManager::new());
        let session = Arc::new(SessionManager::new(backend.clone(), events.clone()));
        let store = Arc::new(DomainStore::new(backend, session.clone(), events));
        let clock = Arc::new(clock);
        let composer = ManualEntryComposer::new(store.clone(), session.clone(), clock);
        Fixture {
            session,
            store,
            composer,
        }
    }

    fn form(company_id: &str, date: &str, start: &str, end: &str) -> ManualEntryForm {
        ManualEntryForm {
            company_id: Some(company_id.to_string()),
            date: Some(ManualEntryForm::parse_date(date).unwrap()),
            start_time: Some(ManualEntryForm::parse_time(start).unwrap()),
            end_time: Some(ManualEntryForm::parse_time(end).unwrap()),
        }
    }

    async fn signed_in_with_company(fx: &Fixture) -> String {
        let identity = Identity::new("u1");
        fx.session.publish(Some(identity.clone()));
        fx.store.load(&identity).await.unwrap();
        fx.store.add_company("Acme").await.unwrap().unwrap().id
    }

    #[tokio::test]
    async fn test_full_day_entry() {
        let fx = fixture();
        let company_id = signed_in_with_company(&fx).await;

        let entry = fx
            .composer
            .add(&form(&company_id, "2024-01-15", "09:00", "17:30"))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(entry.duration_minutes, 510);
        assert!(entry.is_manual);
        assert_eq!(entry.date.to_string(), "2024-01-15");
    }

    #[tokio::test]
    async fn test_winter_date_entered_in_summer() {
        let summer = Utc.with_ymd_and_hms(2024, 7, 1, 16, 0, 0).unwrap();
        let fx = fixture_with(ManualClock::new(
            summer,
            Zone::parse("America/New_York").unwrap(),
        ));
        let company_id = signed_in_with_company(&fx).await;

        let entry = fx
            .composer
            .add(&form(&company_id, "2024-01-15", "09:00", "17:30"))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(entry.start_time.to_rfc3339(), "2024-01-15T14:00:00+00:00");
        assert_eq!(entry.end_time.to_rfc3339(), "2024-01-15T22:30:00+00:00");
        assert_eq!(entry.duration_minutes, 510);
    }

    #[tokio::test]
    async fn test_compose_is_deterministic() {
        let identity = Identity::new("u1");
        let offset = FixedOffset::east_opt(0).unwrap();
        let f = form("c1", "2024-01-15", "08:15", "09:40");

        let first = f.compose(&identity, &offset).unwrap().unwrap();
        let second = f.compose(&identity, &offset).unwrap().unwrap();
        assert_eq!(first, second);
        assert_eq!(first.duration_minutes, 85);
    }

    #[tokio::test]
    async fn test_missing_fields_are_noop() {
        let fx = fixture();
        let company_id = signed_in_with_company(&fx).await;

        let mut incomplete = form(&company_id, "2024-01-15", "09:00", "10:00");
        incomplete.end_time = None;
        assert!(fx.composer.add(&incomplete).await.unwrap().is_none());

        let mut no_company = form(&company_id, "2024-01-15", "09:00", "10:00");
        no_company.company_id = Some(String::new());
        assert!(fx.composer.add(&no_company).await.unwrap().is_none());

        assert!(fx.store.entries().await.is_empty());
    }

    #[tokio::test]
    async fn test_signed_out_is_noop() {
        let fx = fixture();
        let result = fx
            .composer
            .add(&form("c1", "2024-01-15", "09:00", "10:00"))
            .await
            .unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_end_before_start_rejected() {
        let fx = fixture();
        let company_id = signed_in_with_company(&fx).await;

        let result = fx
            .composer
            .add(&form(&company_id, "2024-01-15", "17:00", "09:00"))
            .await;
        assert!(matches!(result, Err(ComposerError::Invalid(_))));
        assert!(fx.store.entries().await.is_empty());
    }

    #[tokio::test]
    async fn test_submit_resets_form() {
        let fx = fixture();
        let company_id = signed_in_with_company(&fx).await;

        fx.composer
            .edit(|f| *f = form(&company_id, "2024-01-15", "09:00", "09:45"))
            .await;
        let entry = fx.composer.submit().await.unwrap().unwrap();
        assert_eq!(entry.duration_minutes, 45);

        let reset = fx.composer.form().await;
        assert_eq!(
            reset,
            ManualEntryForm::blank(NaiveDate::from_ymd_opt(2024, 3, 1).unwrap())
        );
    }

    #[test]
    fn test_parse_helpers() {
        assert!(ManualEntryForm::parse_time("9:05").is_ok());
        assert!(ManualEntryForm::parse_time("09:05:30").is_ok());
        assert!(ManualEntryForm::parse_time("25:00").is_err());
        assert!(ManualEntryForm::parse_date("2024-02-30").is_err());
    }
}
