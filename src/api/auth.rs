use super::envelope::{ItemEnvelope, LoginResponse};
use super::{ApiClient, ApiError};
use crate::models::{Role, User};
use reqwest::Method;
use secrecy::{ExposeSecret, SecretString};
use serde_json::json;

impl ApiClient {
    /// `POST /auth/login`, returning the bearer token.
    ///
    /// The token is not attached to `self`; callers build a new client with
    /// [`ApiClient::with_token`] once the session is established.
    pub async fn login(&self, username: &str, password: &SecretString) -> Result<SecretString, ApiError> {
        let url = self.endpoint(&["auth", "login"]);
        let body = json!({ "username": username, "password": password.expose_secret() });
        let response = self
            .execute(self.request(Method::POST, url).json(&body))
            .await?;
        let login: LoginResponse = Self::decode(response).await?;
        let token = login
            .token
            .filter(|t| !t.is_empty())
            .ok_or(ApiError::MissingField("token"))?;
        tracing::info!(username = %username, "Login succeeded");
        Ok(SecretString::from(token))
    }

    /// `POST /auth/register`.
    pub async fn register(
        &self,
        username: &str,
        password: &SecretString,
        role: Role,
    ) -> Result<(), ApiError> {
        let url = self.endpoint(&["auth", "register"]);
        let body = json!({
            "username": username,
            "password": password.expose_secret(),
            "role": role.as_str(),
        });
        self.execute(self.request(Method::POST, url).json(&body))
            .await?;
        tracing::info!(username = %username, role = %role, "Registered account");
        Ok(())
    }

    /// `GET /auth/profile` for the current token.
    pub async fn profile(&self) -> Result<User, ApiError> {
        let url = self.endpoint(&["auth", "profile"]);
        let response = self.execute(self.request(Method::GET, url)).await?;
        let envelope: ItemEnvelope<User> = Self::decode(response).await?;
        Ok(envelope.into_item())
    }
}
