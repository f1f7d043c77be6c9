//! Request authentication for the hosted service

use reqwest::RequestBuilder;

/// Project key sent with every request; the user's access token, when there
/// is one, replaces it as the bearer.
pub struct ApiAuth {
    anon_key: String,
}

impl ApiAuth {
    pub fn new(anon_key: String) -> Self {
        Self { anon_key }
    }

    pub fn to_bearer(&self, access_token: Option<&str>) -> String {
        format!("Bearer {}", access_token.unwrap_or(&self.anon_key))
    }

    pub fn apply(&self, request: RequestBuilder, access_token: Option<&str>) -> RequestBuilder {
        request
            .header("apikey", &self.anon_key)
            .header(reqwest::header::AUTHORIZATION, self.to_bearer(access_token))
    }
}
