pub mod events;
pub mod manager;

pub use events::{TimerEvent, TimerEventType};
pub use manager::{StartOutcome, TimerManager, TimerManagerError};
