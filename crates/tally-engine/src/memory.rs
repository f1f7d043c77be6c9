//! In-process identity service and gateway

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::gateway::{Gateway, IdentityService, SignUpOutcome};
use tally_core::{
    models::{
        Company, CompanyPatch, Credentials, EntryPatch, Identity, NewCompany, NewTimeEntry,
        TimeEntry,
    },
    Error, Result,
};

#[derive(Default)]
struct Tables {
    accounts: HashMap<String, (String, Identity)>,
    current: Option<Identity>,
    /// Insertion order
    companies: Vec<Company>,
    /// Insertion order
    entries: Vec<TimeEntry>,
}

/// Backend that keeps everything in memory, with the same ordering and
/// cascade rules as the hosted one.
#[derive(Default)]
pub struct MemoryBackend {
    tables: RwLock<Tables>,
    unavailable: AtomicBool,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every gateway call fail until switched back
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(Error::Gateway("service unavailable".to_string()));
        }
        Ok(())
    }

    /// Number of stored entry rows across all owners
    pub async fn entry_count(&self) -> usize {
        self.tables.read().await.entries.len()
    }
}

#[async_trait]
impl IdentityService for MemoryBackend {
    async fn sign_up(&self, credentials: &Credentials) -> Result<SignUpOutcome> {
        let mut tables = self.tables.write().await;
        if tables.accounts.contains_key(&credentials.email) {
            return Err(Error::Auth("User already registered".to_string()));
        }

        let identity = Identity::new(Uuid::new_v4().to_string()).with_email(&credentials.email);
        tables.accounts.insert(
            credentials.email.clone(),
            (credentials.password.clone(), identity.clone()),
        );
        tables.current = Some(identity.clone());

        Ok(SignUpOutcome::SignedIn(identity))
    }

    async fn sign_in(&self, credentials: &Credentials) -> Result<Identity> {
        let mut tables = self.tables.write().await;
        let identity = match tables.accounts.get(&credentials.email) {
            Some((password, identity)) if *password == credentials.password => identity.clone(),
            _ => return Err(Error::Auth("Invalid login credentials".to_string())),
        };

        tables.current = Some(identity.clone());
        Ok(identity)
    }

    async fn sign_out(&self) -> Result<()> {
        self.tables.write().await.current = None;
        Ok(())
    }

    async fn current_identity(&self) -> Result<Option<Identity>> {
        Ok(self.tables.read().await.current.clone())
    }
}

#[async_trait]
impl Gateway for MemoryBackend {
    async fn list_companies(&self, owner: &Identity) -> Result<Vec<Company>> {
        self.check_available()?;
        let tables = self.tables.read().await;
        Ok(tables
            .companies
            .iter()
            .filter(|c| c.user_id == owner.id)
            .cloned()
            .collect())
    }

    async fn insert_company(&self, company: NewCompany) -> Result<Company> {
        self.check_available()?;
        let row = Company {
            id: Uuid::new_v4().to_string(),
            name: company.name,
            color: company.color,
            user_id: company.user_id,
            created_at: Utc::now(),
        };
        self.tables.write().await.companies.push(row.clone());
        Ok(row)
    }

    async fn update_company(&self, id: &str, patch: &CompanyPatch) -> Result<()> {
        self.check_available()?;
        let mut tables = self.tables.write().await;
        let company = tables
            .companies
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or_else(|| Error::NotFound(format!("company {}", id)))?;
        company.apply(patch);
        Ok(())
    }

    async fn delete_company(&self, id: &str) -> Result<()> {
        self.check_available()?;
        let mut tables = self.tables.write().await;
        tables.companies.retain(|c| c.id != id);
        tables.entries.retain(|e| e.company_id != id);
        Ok(())
    }

    async fn list_entries(&self, owner: &Identity) -> Result<Vec<TimeEntry>> {
        self.check_available()?;
        let tables = self.tables.read().await;
        Ok(tables
            .entries
            .iter()
            .rev()
            .filter(|e| e.user_id == owner.id)
            .cloned()
            .collect())
    }

    async fn insert_entry(&self, entry: NewTimeEntry) -> Result<TimeEntry> {
        self.check_available()?;
        let mut tables = self.tables.write().await;

        if !tables.companies.iter().any(|c| c.id == entry.company_id) {
            return Err(Error::Gateway(format!(
                "company {} does not exist",
                entry.company_id
            )));
        }

        let row = TimeEntry {
            id: Uuid::new_v4().to_string(),
            company_id: entry.company_id,
            start_time: entry.start_time,
            end_time: entry.end_time,
            duration_minutes: entry.duration_minutes,
            is_manual: entry.is_manual,
            date: entry.date,
            user_id: entry.user_id,
            created_at: Utc::now(),
        };
        tables.entries.push(row.clone());
        Ok(row)
    }

    async fn update_entry(&self, id: &str, patch: &EntryPatch) -> Result<()> {
        self.check_available()?;
        let mut tables = self.tables.write().await;
        let entry = tables
            .entries
            .iter_mut()
            .find(|e| e.id == id)
            .ok_or_else(|| Error::NotFound(format!("time entry {}", id)))?;
        entry.apply(patch);
        Ok(())
    }

    async fn delete_entry(&self, id: &str) -> Result<()> {
        self.check_available()?;
        self.tables.write().await.entries.retain(|e| e.id != id);
        Ok(())
    }
}
