//! Session state cache: the currently signed-in identity

use std::sync::Arc;
use tokio::sync::watch;

use crate::event_manager::EventManager;
use crate::events::SessionEvent;
use crate::gateway::{IdentityService, SignUpOutcome};
use tally_core::models::{Credentials, Identity};

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Credentials failed the local checks; nothing was sent
    #[error("{0}")]
    Invalid(String),

    /// The identity service said no; its message is kept verbatim
    #[error("{0}")]
    Rejected(String),

    #[error("Identity service error: {0}")]
    Service(tally_core::Error),
}

impl From<tally_core::Error> for SessionError {
    fn from(err: tally_core::Error) -> Self {
        match err {
            tally_core::Error::Auth(message) => SessionError::Rejected(message),
            tally_core::Error::Validation(message) => SessionError::Invalid(message),
            other => SessionError::Service(other),
        }
    }
}

pub type Result<T> = std::result::Result<T, SessionError>;

pub struct SessionManager {
    service: Arc<dyn IdentityService>,
    identity_tx: watch::Sender<Option<Identity>>,
    event_manager: Arc<EventManager>,
}

impl SessionManager {
    pub fn new(service: Arc<dyn IdentityService>, event_manager: Arc<EventManager>) -> Self {
        let (identity_tx, _) = watch::channel(None);
        Self {
            service,
            identity_tx,
            event_manager,
        }
    }

    /// The signed-in identity, if any
    pub fn current(&self) -> Option<Identity> {
        self.identity_tx.borrow().clone()
    }

    /// Receiver that observes every identity change
    pub fn subscribe(&self) -> watch::Receiver<Option<Identity>> {
        self.identity_tx.subscribe()
    }

    /// Ask the identity service who is signed in and adopt the answer
    pub async fn restore(&self) -> Result<bool> {
        let identity = self.service.current_identity().await?;
        Ok(self.publish(identity))
    }

    pub async fn sign_up(&self, credentials: &Credentials) -> Result<SignUpOutcome> {
        credentials.validate_for_sign_up()?;

        let outcome = self.service.sign_up(credentials).await?;
        if let SignUpOutcome::SignedIn(ref identity) = outcome {
            self.publish(Some(identity.clone()));
        }

        tracing::info!("Signed up {}", credentials.email);
        Ok(outcome)
    }

    pub async fn sign_in(&self, credentials: &Credentials) -> Result<Identity> {
        credentials.validate()?;

        let identity = self.service.sign_in(credentials).await?;
        self.publish(Some(identity.clone()));

        tracing::info!("Signed in as {}", identity.id);
        Ok(identity)
    }

    /// Drop the local identity even if the service call fails
    pub async fn sign_out(&self) -> Result<()> {
        let result = self.service.sign_out().await;
        if let Err(ref e) = result {
            tracing::warn!("Identity service sign-out failed: {}", e);
        }

        self.publish(None);
        tracing::info!("Signed out");
        result.map_err(SessionError::from)
    }

    /// Store the identity and notify subscribers; returns whether it changed
    pub fn publish(&self, identity: Option<Identity>) -> bool {
        let changed = self.identity_tx.send_if_modified(|current| {
            if *current == identity {
                false
            } else {
                *current = identity.clone();
                true
            }
        });

        if changed {
            self.event_manager.emit_session(SessionEvent::changed(identity));
        }
        changed
    }
}
