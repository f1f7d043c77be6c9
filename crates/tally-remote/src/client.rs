//! Hosted backend client

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::{de::DeserializeOwned, Serialize};
use tokio::sync::RwLock;

use crate::{
    auth::ApiAuth,
    error::{Error, Result},
    types::{ApiErrorBody, ApiUser, PasswordGrant, RefreshGrant, SignUpResponse, TokenResponse},
};
use tally_core::models::{
    AuthSession, Company, CompanyPatch, Credentials, EntryPatch, Identity, NewCompany,
    NewTimeEntry, TimeEntry,
};
use tally_engine::{Gateway, IdentityService, SignUpOutcome};

const COMPANIES: &str = "companies";
const TIME_ENTRIES: &str = "time_entries";

/// Client for the hosted auth and REST endpoints.
///
/// Holds the signed-in session; data requests carry its access token.
pub struct HostedClient {
    http: Client,
    base_url: String,
    auth: ApiAuth,
    session: RwLock<Option<AuthSession>>,
}

impl HostedClient {
    pub fn new(base_url: impl Into<String>, anon_key: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            auth: ApiAuth::new(anon_key.into()),
            session: RwLock::new(None),
        }
    }

    /// Resume a session saved by an earlier run
    pub fn with_session(self, session: Option<AuthSession>) -> Self {
        Self {
            session: RwLock::new(session),
            ..self
        }
    }

    pub async fn session(&self) -> Option<AuthSession> {
        self.session.read().await.clone()
    }

    fn auth_url(&self, path: &str) -> String {
        format!("{}/auth/v1/{}", self.base_url, path)
    }

    fn rest_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    async fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        let session = self.session.read().await;
        let token = session.as_ref().map(|s| s.access_token.as_str());
        self.auth.apply(request, token)
    }

    async fn error_message(response: Response) -> (u16, String) {
        let status = response.status();
        let text = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ApiErrorBody>(&text)
            .ok()
            .and_then(ApiErrorBody::message)
            .unwrap_or_else(|| {
                if text.is_empty() {
                    status.to_string()
                } else {
                    text
                }
            });
        (status.as_u16(), message)
    }

    async fn check_auth(response: Response) -> Result<Response> {
        if response.status().is_success() {
            return Ok(response);
        }
        let (_, message) = Self::error_message(response).await;
        Err(Error::Auth(message))
    }

    async fn check_api(response: Response) -> Result<Response> {
        if response.status().is_success() {
            return Ok(response);
        }
        let (status, message) = Self::error_message(response).await;
        Err(Error::Api { status, message })
    }

    async fn require_session(&self) -> Result<()> {
        if self.session.read().await.is_none() {
            return Err(Error::NotSignedIn);
        }
        Ok(())
    }

    async fn select<T: DeserializeOwned>(
        &self,
        table: &str,
        owner: &Identity,
        ascending: bool,
    ) -> Result<Vec<T>> {
        self.require_session().await?;
        let order = if ascending {
            "created_at.asc"
        } else {
            "created_at.desc"
        };
        let owner_filter = format!("eq.{}", owner.id);

        let request = self.http.get(self.rest_url(table)).query(&[
            ("select", "*"),
            ("user_id", owner_filter.as_str()),
            ("order", order),
        ]);
        let response = self.authorized(request).await.send().await?;
        Ok(Self::check_api(response).await?.json().await?)
    }

    async fn insert<B: Serialize, T: DeserializeOwned>(&self, table: &str, body: &B) -> Result<T> {
        self.require_session().await?;
        let request = self
            .http
            .post(self.rest_url(table))
            .header("Prefer", "return=representation")
            .json(body);
        let response = self.authorized(request).await.send().await?;
        let mut rows: Vec<T> = Self::check_api(response).await?.json().await?;

        if rows.is_empty() {
            return Err(Error::Api {
                status: 200,
                message: format!("insert into {} returned no row", table),
            });
        }
        Ok(rows.swap_remove(0))
    }

    async fn update<B: Serialize>(&self, table: &str, id: &str, body: &B) -> Result<()> {
        self.require_session().await?;
        let id_filter = format!("eq.{}", id);
        let request = self
            .http
            .patch(self.rest_url(table))
            .query(&[("id", id_filter.as_str())])
            .json(body);
        let response = self.authorized(request).await.send().await?;
        Self::check_api(response).await?;
        Ok(())
    }

    async fn delete(&self, table: &str, id: &str) -> Result<()> {
        self.require_session().await?;
        let id_filter = format!("eq.{}", id);
        let request = self
            .http
            .delete(self.rest_url(table))
            .query(&[("id", id_filter.as_str())]);
        let response = self.authorized(request).await.send().await?;
        Self::check_api(response).await?;
        Ok(())
    }

    async fn password_grant(&self, credentials: &Credentials) -> Result<AuthSession> {
        let request = self
            .http
            .post(self.auth_url("token"))
            .query(&[("grant_type", "password")])
            .json(&PasswordGrant {
                email: &credentials.email,
                password: &credentials.password,
            });
        let response = self.auth.apply(request, None).send().await?;
        let token: TokenResponse = Self::check_auth(response).await?.json().await?;
        Ok(token.into())
    }

    /// Trade a refresh token for a new session
    async fn refresh_grant(&self, refresh_token: &str) -> Result<AuthSession> {
        let request = self
            .http
            .post(self.auth_url("token"))
            .query(&[("grant_type", "refresh_token")])
            .json(&RefreshGrant { refresh_token });
        let response = self.auth.apply(request, None).send().await?;
        // Only a refusal ends the session; outages leave it for the next run
        let response = if response.status().is_server_error() {
            Self::check_api(response).await?
        } else {
            Self::check_auth(response).await?
        };
        let token: TokenResponse = response.json().await?;

        let mut session: AuthSession = token.into();
        if session.refresh_token.is_none() {
            session.refresh_token = Some(refresh_token.to_string());
        }
        Ok(session)
    }

    async fn register(&self, credentials: &Credentials) -> Result<SignUpOutcome> {
        let request = self
            .http
            .post(self.auth_url("signup"))
            .json(&PasswordGrant {
                email: &credentials.email,
                password: &credentials.password,
            });
        let response = self.auth.apply(request, None).send().await?;
        let body: SignUpResponse = Self::check_auth(response).await?.json().await?;

        match (body.access_token, body.user) {
            (Some(access_token), Some(user)) => {
                let identity: Identity = user.into();
                *self.session.write().await = Some(AuthSession {
                    access_token,
                    refresh_token: body.refresh_token,
                    identity: identity.clone(),
                });
                Ok(SignUpOutcome::SignedIn(identity))
            }
            _ => Ok(SignUpOutcome::ConfirmationSent),
        }
    }

    /// `None` when the token was rejected as expired or invalid
    async fn get_user(&self, access_token: &str) -> Result<Option<ApiUser>> {
        let request = self.http.get(self.auth_url("user"));
        let response = self.auth.apply(request, Some(access_token)).send().await?;

        if response.status() == reqwest::StatusCode::UNAUTHORIZED {
            return Ok(None);
        }
        Ok(Some(Self::check_auth(response).await?.json().await?))
    }

    /// Validate the saved session, refreshing the access token once if it expired
    async fn fetch_user(&self) -> Result<Option<Identity>> {
        let Some(session) = self.session().await else {
            return Ok(None);
        };

        if let Some(user) = self.get_user(&session.access_token).await? {
            return Ok(Some(user.into()));
        }

        let Some(refresh_token) = session.refresh_token else {
            tracing::info!("Saved session expired and has no refresh token");
            *self.session.write().await = None;
            return Ok(None);
        };

        let refreshed = match self.refresh_grant(&refresh_token).await {
            Ok(refreshed) => refreshed,
            Err(Error::Auth(message)) => {
                tracing::info!("Saved session could not be refreshed: {}", message);
                *self.session.write().await = None;
                return Ok(None);
            }
            Err(e) => return Err(e),
        };
        tracing::debug!("Refreshed expired access token");

        // The old refresh token is spent once the grant succeeds
        let access_token = refreshed.access_token.clone();
        *self.session.write().await = Some(refreshed);

        match self.get_user(&access_token).await? {
            Some(user) => {
                let identity: Identity = user.into();
                if let Some(session) = self.session.write().await.as_mut() {
                    session.identity = identity.clone();
                }
                Ok(Some(identity))
            }
            None => {
                tracing::warn!("Refreshed session was rejected");
                *self.session.write().await = None;
                Ok(None)
            }
        }
    }
}

#[async_trait]
impl IdentityService for HostedClient {
    async fn sign_up(&self, credentials: &Credentials) -> tally_core::Result<SignUpOutcome> {
        Ok(self.register(credentials).await?)
    }

    async fn sign_in(&self, credentials: &Credentials) -> tally_core::Result<Identity> {
        let session = self.password_grant(credentials).await?;
        let identity = session.identity.clone();
        *self.session.write().await = Some(session);
        Ok(identity)
    }

    async fn sign_out(&self) -> tally_core::Result<()> {
        let Some(session) = self.session.write().await.take() else {
            return Ok(());
        };

        let request = self.http.post(self.auth_url("logout"));
        let response = self
            .auth
            .apply(request, Some(&session.access_token))
            .send()
            .await
            .map_err(Error::from)?;
        Self::check_auth(response).await?;
        Ok(())
    }

    async fn current_identity(&self) -> tally_core::Result<Option<Identity>> {
        Ok(self.fetch_user().await?)
    }
}

#[async_trait]
impl Gateway for HostedClient {
    async fn list_companies(&self, owner: &Identity) -> tally_core::Result<Vec<Company>> {
        Ok(self.select(COMPANIES, owner, true).await?)
    }

    async fn insert_company(&self, company: NewCompany) -> tally_core::Result<Company> {
        Ok(self.insert(COMPANIES, &company).await?)
    }

    async fn update_company(&self, id: &str, patch: &CompanyPatch) -> tally_core::Result<()> {
        Ok(self.update(COMPANIES, id, patch).await?)
    }

    async fn delete_company(&self, id: &str) -> tally_core::Result<()> {
        Ok(self.delete(COMPANIES, id).await?)
    }

    async fn list_entries(&self, owner: &Identity) -> tally_core::Result<Vec<TimeEntry>> {
        Ok(self.select(TIME_ENTRIES, owner, false).await?)
    }

    async fn insert_entry(&self, entry: NewTimeEntry) -> tally_core::Result<TimeEntry> {
        Ok(self.insert(TIME_ENTRIES, &entry).await?)
    }

    async fn update_entry(&self, id: &str, patch: &EntryPatch) -> tally_core::Result<()> {
        Ok(self.update(TIME_ENTRIES, id, patch).await?)
    }

    async fn delete_entry(&self, id: &str) -> tally_core::Result<()> {
        Ok(self.delete(TIME_ENTRIES, id).await?)
    }
}
