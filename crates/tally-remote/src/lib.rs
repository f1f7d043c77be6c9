//! Tally hosted backend
//!
//! Client for a hosted auth + REST data service (Supabase-style endpoints)
//! implementing the engine's identity and gateway seams.

pub mod auth;
pub mod client;
pub mod error;
pub mod types;

pub use client::HostedClient;
pub use error::{Error, Result};
