pub mod manager;

pub use manager::{DomainStore, StoreError};
