pub mod composer;

pub use composer::{ComposerError, ManualEntryComposer, ManualEntryForm};
