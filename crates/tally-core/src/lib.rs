pub mod error;
pub mod export;
pub mod format;
pub mod models;
pub mod storage;

pub use error::{Error, Result};
