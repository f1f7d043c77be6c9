//! Seams to the external identity service and hosted data store

use async_trait::async_trait;
use tally_core::{
    models::{
        Company, CompanyPatch, Credentials, EntryPatch, Identity, NewCompany, NewTimeEntry,
        TimeEntry,
    },
    Result,
};

/// What a successful sign-up produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignUpOutcome {
    /// The service signed the new identity in right away
    SignedIn(Identity),
    /// The service wants the address confirmed before sign-in
    ConfirmationSent,
}

/// Third-party identity service.
///
/// Rejections come back as `Error::Auth` carrying the service's message.
#[async_trait]
pub trait IdentityService: Send + Sync {
    async fn sign_up(&self, credentials: &Credentials) -> Result<SignUpOutcome>;

    async fn sign_in(&self, credentials: &Credentials) -> Result<Identity>;

    async fn sign_out(&self) -> Result<()>;

    async fn current_identity(&self) -> Result<Option<Identity>>;
}

/// Hosted store for the `companies` and `time_entries` collections.
///
/// Rows are scoped to `owner`; deleting a company also deletes its entries.
#[async_trait]
pub trait Gateway: Send + Sync {
    /// All companies, oldest first
    async fn list_companies(&self, owner: &Identity) -> Result<Vec<Company>>;

    async fn insert_company(&self, company: NewCompany) -> Result<Company>;

    async fn update_company(&self, id: &str, patch: &CompanyPatch) -> Result<()>;

    async fn delete_company(&self, id: &str) -> Result<()>;

    /// All entries, newest first
    async fn list_entries(&self, owner: &Identity) -> Result<Vec<TimeEntry>>;

    async fn insert_entry(&self, entry: NewTimeEntry) -> Result<TimeEntry>;

    async fn update_entry(&self, id: &str, patch: &EntryPatch) -> Result<()>;

    async fn delete_entry(&self, id: &str) -> Result<()>;
}
