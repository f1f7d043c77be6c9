//! Wires the session, store, timer and composer together

use std::io::Write;
use std::sync::Arc;

use crate::clock::Clock;
use crate::event_manager::EventManager;
use crate::gateway::{Gateway, IdentityService, SignUpOutcome};
use crate::manual::{ComposerError, ManualEntryComposer};
use crate::session::{SessionError, SessionManager};
use crate::store::{DomainStore, StoreError};
use crate::timer::{TimerManager, TimerManagerError};
use tally_core::{
    export, format,
    models::{Credentials, Identity, TimeEntry},
    storage::TimerStorage,
};

#[derive(Debug, thiserror::Error)]
pub enum TrackerError {
    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Timer(#[from] TimerManagerError),

    #[error(transparent)]
    Composer(#[from] ComposerError),

    #[error("Export failed: {0}")]
    Export(#[from] tally_core::Error),
}

pub type Result<T> = std::result::Result<T, TrackerError>;

/// What deleting a company did
#[derive(Debug, Clone, PartialEq)]
pub struct CompanyDeletion {
    /// The running timer, if it was timing this company
    pub flushed: Option<TimeEntry>,
    pub deleted: bool,
}

pub struct TimeTracker {
    events: Arc<EventManager>,
    session: Arc<SessionManager>,
    store: Arc<DomainStore>,
    timers: Arc<TimerManager>,
    composer: ManualEntryComposer,
    clock: Arc<dyn Clock>,
}

impl TimeTracker {
    pub fn new(
        identity: Arc<dyn IdentityService>,
        gateway: Arc<dyn Gateway>,
        timer_storage: TimerStorage,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let events = Arc::new(EventManager::new());
        let session = Arc::new(SessionManager::new(identity, events.clone()));
        let store = Arc::new(DomainStore::new(gateway, session.clone(), events.clone()));
        let timers = Arc::new(TimerManager::new(
            store.clone(),
            session.clone(),
            timer_storage,
            clock.clone(),
            events.clone(),
        ));
        let composer = ManualEntryComposer::new(store.clone(), session.clone(), clock.clone());

        Self {
            events,
            session,
            store,
            timers,
            composer,
            clock,
        }
    }

    pub fn events(&self) -> &Arc<EventManager> {
        &self.events
    }

    pub fn session(&self) -> &Arc<SessionManager> {
        &self.session
    }

    pub fn store(&self) -> &Arc<DomainStore> {
        &self.store
    }

    pub fn timers(&self) -> &Arc<TimerManager> {
        &self.timers
    }

    pub fn composer(&self) -> &ManualEntryComposer {
        &self.composer
    }

    /// Pick up whoever the identity service says is signed in
    pub async fn restore(&self) -> Result<Option<Identity>> {
        self.session.restore().await?;
        let identity = self.session.current();
        self.apply_identity(identity.as_ref()).await?;
        Ok(identity)
    }

    pub async fn sign_up(&self, credentials: &Credentials) -> Result<SignUpOutcome> {
        let outcome = self.session.sign_up(credentials).await?;
        if let SignUpOutcome::SignedIn(ref identity) = outcome {
            self.apply_identity(Some(identity)).await?;
        }
        Ok(outcome)
    }

    pub async fn sign_in(&self, credentials: &Credentials) -> Result<Identity> {
        let identity = self.session.sign_in(credentials).await?;
        self.apply_identity(Some(&identity)).await?;
        Ok(identity)
    }

    pub async fn sign_out(&self) -> Result<()> {
        let result = self.session.sign_out().await;
        self.apply_identity(None).await?;
        result?;
        Ok(())
    }

    async fn apply_identity(&self, identity: Option<&Identity>) -> Result<()> {
        self.timers.on_identity_changed(identity).await;
        self.store.on_identity_changed(identity).await?;
        Ok(())
    }

    /// Flush the timer if it is timing the company, then delete the company
    /// and its entries. A failed flush leaves the company in place.
    pub async fn delete_company(&self, company_id: &str) -> Result<CompanyDeletion> {
        let (flushed, deleted) = self.timers.remove_company(company_id).await?;
        Ok(CompanyDeletion { flushed, deleted })
    }

    /// CSV of every entry in the mirror, grouped by company
    pub async fn export_csv(&self) -> Result<String> {
        let companies = self.store.companies().await;
        let entries = self.store.entries().await;
        Ok(export::export_csv(&companies, &entries, &self.clock.zone())?)
    }

    /// Write the CSV export to `writer`; returns the number of entry rows
    pub async fn write_export<W: Write>(&self, writer: W) -> Result<usize> {
        let companies = self.store.companies().await;
        let entries = self.store.entries().await;
        Ok(export::write_csv(writer, &companies, &entries, &self.clock.zone())?)
    }

    pub fn export_file_name(&self) -> String {
        format::export_file_name(self.clock.today())
    }
}
