use reqwest::header::CONTENT_TYPE;

use super::HttpTransport;
use crate::{
    error::TransportError,
    types::{
        AuthResponse, ExchangeTokenRequest, RefreshTokenRequest, SpotifyLinkRequest,
        SpotifyLinkResponse,
    },
};

impl HttpTransport {
    /// Creates an anonymous user. No credential is sent.
    pub async fn post_guest(&self) -> Result<AuthResponse, TransportError> {
        let request = self
            .client
            .post(self.url("/v1/auth/guest"))
            .header(CONTENT_TYPE, "application/json");

        self.execute_json(request).await
    }

    /// Exchanges a third-party token and secret for a session.
    pub async fn post_token(
        &self,
        token: &str,
        secret: &str,
    ) -> Result<AuthResponse, TransportError> {
        let body = ExchangeTokenRequest {
            token: token.to_string(),
            secret: secret.to_string(),
        };
        let request = self.client.post(self.url("/v1/auth/token")).json(&body);

        self.execute_json(request).await
    }

    pub async fn post_refresh(&self, token: &str) -> Result<AuthResponse, TransportError> {
        let body = RefreshTokenRequest {
            token: token.to_string(),
        };
        let request = self.client.post(self.url("/v1/auth/refresh")).json(&body);

        self.execute_json(request).await
    }

    pub async fn post_spotify_link(
        &self,
        access_token: &str,
        code_challenge: &str,
    ) -> Result<String, TransportError> {
        let body = SpotifyLinkRequest {
            code_challenge: code_challenge.to_string(),
        };
        let request = self
            .client
            .post(self.url("/v1/auth/spotify/link"))
            .bearer_auth(access_token)
            .json(&body);

        let res: SpotifyLinkResponse = self.execute_json(request).await?;
        Ok(res.url)
    }
}
