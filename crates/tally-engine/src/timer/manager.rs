//! Timer lifecycle: the single active timer per identity

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::interval;

use crate::clock::Clock;
use crate::event_manager::EventManager;
use crate::session::SessionManager;
use crate::store::{DomainStore, StoreError};
use tally_core::models::{ActiveTimer, Identity, TimeEntry};
use tally_core::storage::TimerStorage;

use super::events::TimerEvent;

/// Timer manager error
#[derive(Debug, thiserror::Error)]
pub enum TimerManagerError {
    #[error("Could not record time entry: {0}")]
    Store(#[from] StoreError),
}

pub type Result<T> = std::result::Result<T, TimerManagerError>;

/// Result of a start transition: what was flushed, then what was started
#[derive(Debug, Clone, PartialEq)]
pub struct StartOutcome {
    pub flushed: Option<TimeEntry>,
    pub started: ActiveTimer,
}

#[derive(Default)]
struct Slot {
    /// Identity the slot belongs to
    owner: Option<String>,
    active: Option<ActiveTimer>,
}

impl Slot {
    fn active_for(&self, identity: &Identity) -> Option<&ActiveTimer> {
        match self.owner {
            Some(ref owner) if *owner == identity.id => self.active.as_ref(),
            _ => None,
        }
    }
}

/// Owns the active-timer slot. Every transition holds the slot lock for its
/// whole duration, gateway call included, so transitions never interleave.
pub struct TimerManager {
    slot: Mutex<Slot>,
    store: Arc<DomainStore>,
    session: Arc<SessionManager>,
    storage: TimerStorage,
    clock: Arc<dyn Clock>,
    event_manager: Arc<EventManager>,
    tick_interval: Duration,
}

impl TimerManager {
    pub fn new(
        store: Arc<DomainStore>,
        session: Arc<SessionManager>,
        storage: TimerStorage,
        clock: Arc<dyn Clock>,
        event_manager: Arc<EventManager>,
    ) -> Self {
        Self {
            slot: Mutex::new(Slot::default()),
            store,
            session,
            storage,
            clock,
            event_manager,
            tick_interval: Duration::from_secs(1),
        }
    }

    /// Swap the slot over to a new identity, restoring its stored timer
    pub async fn on_identity_changed(&self, identity: Option<&Identity>) {
        let mut slot = self.slot.lock().await;

        let Some(identity) = identity else {
            // The stored file stays with its owner for their next sign-in
            *slot = Slot::default();
            return;
        };

        let restored = match self.storage.load(&identity.id) {
            Ok(timer) => timer,
            Err(e) => {
                tracing::warn!("Could not read stored timer for '{}': {}", identity.id, e);
                None
            }
        };

        if let Some(ref timer) = restored {
            tracing::info!(
                "Restored timer for company {} started at {}",
                timer.company_id,
                timer.start_time
            );
            self.event_manager.emit_timer(TimerEvent::restored(
                timer.company_id.clone(),
                timer.start_time,
            ));
        }

        *slot = Slot {
            owner: Some(identity.id.clone()),
            active: restored,
        };
    }

    /// The running timer of the signed-in identity
    pub async fn active(&self) -> Option<ActiveTimer> {
        let identity = self.session.current()?;
        let slot = self.slot.lock().await;
        slot.active_for(&identity).cloned()
    }

    /// Start timing `company_id`, flushing any running timer first.
    ///
    /// `Ok(None)` when signed out or the company is unknown. If the flush
    /// fails the running timer is kept and nothing new starts.
    pub async fn start(&self, company_id: &str) -> Result<Option<StartOutcome>> {
        let Some(identity) = self.session.current() else {
            return Ok(None);
        };

        // Company deletion holds the slot too, so the check cannot go stale
        let mut slot = self.slot.lock().await;
        if self.store.company(company_id).await.is_none() {
            return Ok(None);
        }
        if slot.owner.as_deref() != Some(identity.id.as_str()) {
            *slot = Slot {
                owner: Some(identity.id.clone()),
                active: None,
            };
        }

        let flushed = self.flush(&mut slot, &identity).await?;

        let started = ActiveTimer::new(company_id.to_string(), self.clock.now());
        slot.active = Some(started.clone());
        self.persist(&identity.id, Some(&started));

        tracing::info!("Timer started for company {}", company_id);
        self.event_manager.emit_timer(TimerEvent::started(
            started.company_id.clone(),
            started.start_time,
        ));

        Ok(Some(StartOutcome { flushed, started }))
    }

    /// Stop the running timer and record it. `Ok(None)` when nothing runs.
    pub async fn stop(&self) -> Result<Option<TimeEntry>> {
        let Some(identity) = self.session.current() else {
            return Ok(None);
        };

        let mut slot = self.slot.lock().await;
        self.flush(&mut slot, &identity).await
    }

    /// Delete a company and its entries, first recording the running timer if
    /// it is timing that company. The slot stays locked throughout, so no
    /// timer can start on the company meanwhile. A failed flush leaves the
    /// company in place.
    ///
    /// Returns the flushed entry, if any, and whether the company was deleted.
    pub async fn remove_company(&self, company_id: &str) -> Result<(Option<TimeEntry>, bool)> {
        let mut slot = self.slot.lock().await;

        let flushed = match self.session.current() {
            Some(identity) => {
                let timing = slot
                    .active_for(&identity)
                    .map(|timer| timer.references(company_id))
                    .unwrap_or(false);
                if timing {
                    self.flush(&mut slot, &identity).await?
                } else {
                    None
                }
            }
            None => None,
        };

        let deleted = self.store.delete_company(company_id).await?;
        Ok((flushed, deleted))
    }

    /// Whole seconds the running timer has been going, 0 when idle
    pub async fn elapsed_seconds(&self) -> u64 {
        match self.active().await {
            Some(timer) => timer.elapsed_seconds(self.clock.now()),
            None => 0,
        }
    }

    /// One display refresh: elapsed seconds, also broadcast while running
    pub async fn tick(&self) -> u64 {
        let Some(timer) = self.active().await else {
            return 0;
        };

        let elapsed = timer.elapsed_seconds(self.clock.now());
        tracing::trace!("Tick: {}s on {}", elapsed, timer.company_id);
        self.event_manager
            .emit_timer(TimerEvent::tick(timer.company_id, elapsed));
        elapsed
    }

    /// Drive [`tick`](Self::tick) once per second until the handle is aborted
    pub fn spawn_ticker(self: &Arc<Self>) -> JoinHandle<()> {
        let manager = self.clone();
        tokio::spawn(async move {
            let mut ticker = interval(manager.tick_interval);
            loop {
                ticker.tick().await;
                manager.tick().await;
            }
        })
    }

    async fn flush(&self, slot: &mut Slot, identity: &Identity) -> Result<Option<TimeEntry>> {
        let Some(timer) = slot.active_for(identity).cloned() else {
            return Ok(None);
        };

        let new_entry = timer.finish(self.clock.now(), &self.clock.zone(), identity.id.clone());
        let entry = match self.store.add_entry(new_entry).await {
            Ok(entry) => entry,
            Err(e) => {
                tracing::error!(
                    "Error stopping timer for company {}, timer keeps running: {}",
                    timer.company_id,
                    e
                );
                return Err(e.into());
            }
        };

        slot.active = None;
        self.persist(&identity.id, None);

        tracing::info!(
            "Timer stopped for company {} after {} minutes",
            timer.company_id,
            entry.duration_minutes
        );
        self.event_manager.emit_timer(TimerEvent::stopped(
            timer.company_id,
            entry.id.clone(),
            entry.duration_minutes,
        ));

        Ok(Some(entry))
    }

    /// Mirror the slot to disk. The in-memory slot stays authoritative if this fails.
    fn persist(&self, identity_id: &str, timer: Option<&ActiveTimer>) {
        if let Err(e) = self.storage.save(identity_id, timer) {
            tracing::warn!("Could not persist active timer for '{}': {}", identity_id, e);
        }
    }
}
