pub mod company;
pub mod config;
pub mod entry;
pub mod identity;
pub mod timer;
pub mod zone;

pub use company::{Company, CompanyPatch, NewCompany, PALETTE};
pub use config::{BackendConfig, Config};
pub use entry::{EntryPatch, NewTimeEntry, TimeEntry};
pub use identity::{AuthSession, Credentials, Identity};
pub use timer::ActiveTimer;
pub use zone::Zone;
