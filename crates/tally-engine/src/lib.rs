//! Tally engine
//!
//! Session, domain mirror, timer lifecycle and manual entry logic on top of
//! pluggable identity and persistence backends.

pub mod clock;
pub mod event_manager;
pub mod events;
pub mod gateway;
pub mod manual;
pub mod memory;
pub mod session;
pub mod store;
pub mod timer;
pub mod tracker;

pub use clock::{Clock, ManualClock, SystemClock};
pub use event_manager::EventManager;
pub use events::EngineEvent;
pub use gateway::{Gateway, IdentityService, SignUpOutcome};
pub use manual::{ManualEntryComposer, ManualEntryForm};
pub use memory::MemoryBackend;
pub use session::SessionManager;
pub use store::DomainStore;
pub use timer::{StartOutcome, TimerEvent, TimerManager};
pub use tracker::{CompanyDeletion, TimeTracker, TrackerError};
