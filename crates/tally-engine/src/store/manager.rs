//! In-memory mirror of the signed-in identity's companies and entries

use std::sync::Arc;
use tokio::sync::RwLock;

use crate::event_manager::EventManager;
use crate::events::{CompanyEvent, EntryEvent};
use crate::gateway::Gateway;
use crate::session::SessionManager;
use chrono::{DateTime, Utc};
use tally_core::models::{
    Company, CompanyPatch, EntryPatch, Identity, NewCompany, NewTimeEntry, TimeEntry,
};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Gateway error: {0}")]
    Gateway(#[from] tally_core::Error),

    #[error("Invalid entry: {0}")]
    Invalid(String),
}

pub type Result<T> = std::result::Result<T, StoreError>;

#[derive(Default)]
struct Mirror {
    owner: Option<Identity>,
    /// Oldest first
    companies: Vec<Company>,
    /// Newest first
    entries: Vec<TimeEntry>,
}

impl Mirror {
    fn owned_by(&self, identity: &Identity) -> bool {
        self.owner.as_ref().map(|o| o.id == identity.id).unwrap_or(false)
    }
}

pub struct DomainStore {
    gateway: Arc<dyn Gateway>,
    session: Arc<SessionManager>,
    mirror: RwLock<Mirror>,
    event_manager: Arc<EventManager>,
}

impl DomainStore {
    pub fn new(
        gateway: Arc<dyn Gateway>,
        session: Arc<SessionManager>,
        event_manager: Arc<EventManager>,
    ) -> Self {
        Self {
            gateway,
            session,
            mirror: RwLock::new(Mirror::default()),
            event_manager,
        }
    }

    /// Reload for a newly signed-in identity, or clear on sign-out
    pub async fn on_identity_changed(&self, identity: Option<&Identity>) -> Result<()> {
        match identity {
            Some(identity) => self.load(identity).await,
            None => {
                self.clear().await;
                Ok(())
            }
        }
    }

    /// Replace the mirror with everything the gateway holds for `identity`.
    ///
    /// On failure the mirror is left empty for `identity` rather than showing
    /// another identity's rows.
    pub async fn load(&self, identity: &Identity) -> Result<()> {
        let loaded = async {
            let companies = self.gateway.list_companies(identity).await?;
            let entries = self.gateway.list_entries(identity).await?;
            Ok::<_, tally_core::Error>((companies, entries))
        }
        .await;

        let mut mirror = self.mirror.write().await;
        mirror.owner = Some(identity.clone());

        match loaded {
            Ok((companies, entries)) => {
                tracing::debug!(
                    "Loaded {} companies and {} entries for '{}'",
                    companies.len(),
                    entries.len(),
                    identity.id
                );
                mirror.companies = companies;
                mirror.entries = entries;
                Ok(())
            }
            Err(e) => {
                tracing::error!("Error loading data for '{}': {}", identity.id, e);
                mirror.companies.clear();
                mirror.entries.clear();
                Err(e.into())
            }
        }
    }

    pub async fn clear(&self) {
        let mut mirror = self.mirror.write().await;
        *mirror = Mirror::default();
    }

    pub async fn companies(&self) -> Vec<Company> {
        self.mirror.read().await.companies.clone()
    }

    pub async fn entries(&self) -> Vec<TimeEntry> {
        self.mirror.read().await.entries.clone()
    }

    pub async fn company(&self, company_id: &str) -> Option<Company> {
        let mirror = self.mirror.read().await;
        mirror.companies.iter().find(|c| c.id == company_id).cloned()
    }

    /// Look a company up by id, then by exact name
    pub async fn find_company(&self, id_or_name: &str) -> Option<Company> {
        let mirror = self.mirror.read().await;
        mirror
            .companies
            .iter()
            .find(|c| c.id == id_or_name)
            .or_else(|| mirror.companies.iter().find(|c| c.name == id_or_name))
            .cloned()
    }

    pub async fn company_total_minutes(&self, company_id: &str) -> u64 {
        let mirror = self.mirror.read().await;
        mirror
            .entries
            .iter()
            .filter(|e| e.company_id == company_id)
            .map(|e| e.duration_minutes)
            .sum()
    }

    /// Create a company. `Ok(None)` when signed out or the name is blank.
    pub async fn add_company(&self, name: &str) -> Result<Option<Company>> {
        let Some(identity) = self.session.current() else {
            return Ok(None);
        };
        let Some(name) = Company::normalize_name(name) else {
            return Ok(None);
        };

        let index = self.mirror.read().await.companies.len();
        let company = self
            .gateway
            .insert_company(NewCompany::new(name, index, identity.id.clone()))
            .await
            .map_err(|e| {
                tracing::error!("Error adding company: {}", e);
                e
            })?;

        {
            let mut mirror = self.mirror.write().await;
            if mirror.owned_by(&identity) {
                mirror.companies.push(company.clone());
            }
        }

        tracing::info!("Added company '{}' ({})", company.name, company.id);
        self.event_manager
            .emit_company(CompanyEvent::added(company.clone()));
        Ok(Some(company))
    }

    /// Rename a company. `Ok(None)` when the name is blank or the company is unknown.
    pub async fn rename_company(&self, company_id: &str, name: &str) -> Result<Option<Company>> {
        let Some(name) = Company::normalize_name(name) else {
            return Ok(None);
        };
        if self.company(company_id).await.is_none() {
            return Ok(None);
        }

        let patch = CompanyPatch::rename(name);
        self.gateway
            .update_company(company_id, &patch)
            .await
            .map_err(|e| {
                tracing::error!("Error updating company: {}", e);
                e
            })?;

        let updated = {
            let mut mirror = self.mirror.write().await;
            mirror
                .companies
                .iter_mut()
                .find(|c| c.id == company_id)
                .map(|company| {
                    company.apply(&patch);
                    company.clone()
                })
        };

        if let Some(ref company) = updated {
            self.event_manager
                .emit_company(CompanyEvent::updated(company.clone()));
        }
        Ok(updated)
    }

    /// Delete a company and, in the mirror, every entry that references it
    pub async fn delete_company(&self, company_id: &str) -> Result<bool> {
        if self.company(company_id).await.is_none() {
            return Ok(false);
        }

        self.gateway.delete_company(company_id).await.map_err(|e| {
            tracing::error!("Error deleting company: {}", e);
            e
        })?;

        {
            let mut mirror = self.mirror.write().await;
            mirror.companies.retain(|c| c.id != company_id);
            mirror.entries.retain(|e| e.company_id != company_id);
        }

        tracing::info!("Deleted company {}", company_id);
        self.event_manager
            .emit_company(CompanyEvent::deleted(company_id.to_string()));
        Ok(true)
    }

    /// Persist an entry and put it at the front of the mirror
    pub async fn add_entry(&self, entry: NewTimeEntry) -> Result<TimeEntry> {
        let entry = self.gateway.insert_entry(entry).await.map_err(|e| {
            tracing::error!("Error adding time entry: {}", e);
            e
        })?;

        {
            let mut mirror = self.mirror.write().await;
            if mirror.owner.as_ref().map(|o| o.id == entry.user_id).unwrap_or(false) {
                mirror.entries.insert(0, entry.clone());
            }
        }

        self.event_manager.emit_entry(EntryEvent::added(entry.clone()));
        Ok(entry)
    }

    /// Move an entry to a new interval, recomputing its duration
    pub async fn update_entry(
        &self,
        entry_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Option<TimeEntry>> {
        if !self.mirror.read().await.entries.iter().any(|e| e.id == entry_id) {
            return Ok(None);
        }

        let patch = EntryPatch::retimed(start, end).map_err(|e| StoreError::Invalid(e.to_string()))?;
        self.gateway
            .update_entry(entry_id, &patch)
            .await
            .map_err(|e| {
                tracing::error!("Error updating time entry: {}", e);
                e
            })?;

        let updated = {
            let mut mirror = self.mirror.write().await;
            mirror
                .entries
                .iter_mut()
                .find(|e| e.id == entry_id)
                .map(|entry| {
                    entry.apply(&patch);
                    entry.clone()
                })
        };

        if let Some(ref entry) = updated {
            self.event_manager.emit_entry(EntryEvent::updated(entry.clone()));
        }
        Ok(updated)
    }

    pub async fn delete_entry(&self, entry_id: &str) -> Result<bool> {
        if !self.mirror.read().await.entries.iter().any(|e| e.id == entry_id) {
            return Ok(false);
        }

        self.gateway.delete_entry(entry_id).await.map_err(|e| {
            tracing::error!("Error deleting time entry: {}", e);
            e
        })?;

        self.mirror
            .write()
            .await
            .entries
            .retain(|e| e.id != entry_id);

        self.event_manager
            .emit_entry(EntryEvent::deleted(entry_id.to_string()));
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryBackend;
    use chrono::{Duration as ChronoDuration, FixedOffset, TimeZone};

    struct Fixture {
        backend: Arc<MemoryBackend>,
        session: Arc<SessionManager>,
        store: DomainStore,
    }

    fn fixture() -> Fixture {
        let backend = Arc::new(MemoryBackend::new());
        let events = Arc::new(EventManager::new());
        let session = Arc::new(SessionManager::new(backend.clone(), events.clone()));
        let store = DomainStore::new(backend.clone(), session.clone(), events);
        Fixture {
            backend,
            session,
            store,
        }
    }

    async fn signed_in(fx: &Fixture, id: &str) -> Identity {
        let identity = Identity::new(id);
        fx.session.publish(Some(identity.clone()));
        fx.store.load(&identity).await.unwrap();
        identity
    }

    fn tracked(company_id: &str, user_id: &str, minutes: i64) -> NewTimeEntry {
        let start = Utc.with_ymd_and_hms(2024, 1, 15, 9, 0, 0).unwrap();
        NewTimeEntry::tracked(
            company_id.to_string(),
            start,
            start + ChronoDuration::minutes(minutes),
            &FixedOffset::east_opt(0).unwrap(),
            user_id.to_string(),
        )
    }

    #[tokio::test]
    async fn test_add_company_requires_identity_and_name() {
        let fx = fixture();
        assert!(fx.store.add_company("Acme").await.unwrap().is_none());

        signed_in(&fx, "u1").await;
        assert!(fx.store.add_company("   ").await.unwrap().is_none());

        let company = fx.store.add_company("  Acme ").await.unwrap().unwrap();
        assert_eq!(company.name, "Acme");
        assert_eq!(company.color, "#EF4444");
        assert_eq!(fx.store.companies().await.len(), 1);

        let second = fx.store.add_company("Globex").await.unwrap().unwrap();
        assert_eq!(second.color, "#F59E0B");
    }

    #[tokio::test]
    async fn test_gateway_failure_leaves_mirror_unchanged() {
        let fx = fixture();
        signed_in(&fx, "u1").await;
        let company = fx.store.add_company("Acme").await.unwrap().unwrap();

        fx.backend.set_unavailable(true);
        assert!(fx.store.add_company("Globex").await.is_err());
        assert!(fx.store.rename_company(&company.id, "Renamed").await.is_err());
        assert!(fx.store.delete_company(&company.id).await.is_err());

        let companies = fx.store.companies().await;
        assert_eq!(companies.len(), 1);
        assert_eq!(companies[0].name, "Acme");
    }

    #[tokio::test]
    async fn test_entries_newest_first_and_reload_order() {
        let fx = fixture();
        let identity = signed_in(&fx, "u1").await;
        let company = fx.store.add_company("Acme").await.unwrap().unwrap();

        let first = fx.store.add_entry(tracked(&company.id, "u1", 10)).await.unwrap();
        let second = fx.store.add_entry(tracked(&company.id, "u1", 20)).await.unwrap();

        let ids: Vec<String> = fx.store.entries().await.into_iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![second.id.clone(), first.id.clone()]);

        fx.store.clear().await;
        fx.store.load(&identity).await.unwrap();
        let ids: Vec<String> = fx.store.entries().await.into_iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![second.id, first.id]);
        assert_eq!(fx.store.company_total_minutes(&company.id).await, 30);
    }

    #[tokio::test]
    async fn test_delete_company_cascades_in_mirror() {
        let fx = fixture();
        signed_in(&fx, "u1").await;
        let acme = fx.store.add_company("Acme").await.unwrap().unwrap();
        let globex = fx.store.add_company("Globex").await.unwrap().unwrap();
        fx.store.add_entry(tracked(&acme.id, "u1", 10)).await.unwrap();
        fx.store.add_entry(tracked(&globex.id, "u1", 10)).await.unwrap();

        assert!(fx.store.delete_company(&acme.id).await.unwrap());

        let entries = fx.store.entries().await;
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].company_id, globex.id);
        assert!(!fx.store.delete_company(&acme.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_sign_out_clears_and_sign_in_scopes() {
        let fx = fixture();
        signed_in(&fx, "u1").await;
        fx.store.add_company("Mine").await.unwrap();

        fx.session.publish(None);
        fx.store.on_identity_changed(None).await.unwrap();
        assert!(fx.store.companies().await.is_empty());

        let other = Identity::new("u2");
        fx.session.publish(Some(other.clone()));
        fx.store.on_identity_changed(Some(&other)).await.unwrap();
        assert!(fx.store.companies().await.is_empty());
    }

    #[tokio::test]
    async fn test_update_entry_recomputes_duration() {
        let fx = fixture();
        signed_in(&fx, "u1").await;
        let company = fx.store.add_company("Acme").await.unwrap().unwrap();
        let entry = fx.store.add_entry(tracked(&company.id, "u1", 10)).await.unwrap();

        let start = entry.start_time;
        let updated = fx
            .store
            .update_entry(&entry.id, start, start + ChronoDuration::minutes(95))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.duration_minutes, 95);

        let reversed = fx
            .store
            .update_entry(&entry.id, start, start - ChronoDuration::minutes(1))
            .await;
        assert!(matches!(reversed, Err(StoreError::Invalid(_))));
        assert!(fx.store.update_entry("missing", start, start).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_find_company_by_id_or_name() {
        let fx = fixture();
        signed_in(&fx, "u1").await;
        let company = fx.store.add_company("Acme").await.unwrap().unwrap();

        assert_eq!(fx.store.find_company(&company.id).await, Some(company.clone()));
        assert_eq!(fx.store.find_company("Acme").await, Some(company));
        assert_eq!(fx.store.find_company("acme").await, None);
    }

    #[tokio::test]
    async fn test_delete_entry() {
        let fx = fixture();
        signed_in(&fx, "u1").await;
        let company = fx.store.add_company("Acme").await.unwrap().unwrap();
        let entry = fx.store.add_entry(tracked(&company.id, "u1", 10)).await.unwrap();

        assert!(fx.store.delete_entry(&entry.id).await.unwrap());
        assert!(fx.store.entries().await.is_empty());
        assert!(!fx.store.delete_entry(&entry.id).await.unwrap());
    }
}
