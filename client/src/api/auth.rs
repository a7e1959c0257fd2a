use serde_json::Value;
use shared::{AuthResponse, CurrentUser, LoginRequest};

use super::endpoints;
use crate::http::{ApiError, HttpClient};

#[derive(Debug, Clone)]
pub struct AuthApi {
    http: HttpClient,
}

impl AuthApi {
    pub fn new(http: HttpClient) -> Self {
        Self { http }
    }

    /// Exchanges credentials for a bearer token and persists it in the session.
    ///
    /// Fails with [`ApiError::Session`] when the token cannot be stored.
    pub async fn login(&self, email: &str, password: &str) -> Result<AuthResponse, ApiError> {
        let request = LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        };
        let response: AuthResponse = self.http.post(endpoints::AUTH_LOGIN, &request).await?;

        if !response.access_token.is_empty() {
            self.http.session().set_token(&response.access_token)?;
        }
        log::info!("Logged in as {}", email);
        Ok(response)
    }

    /// Ends the remote session. The local credential is removed even when the
    /// call fails; the error is still returned.
    pub async fn logout(&self) -> Result<(), ApiError> {
        let outcome = self.http.post_empty::<Value>(endpoints::AUTH_LOGOUT).await;
        self.http.session().clear();

        match outcome {
            Ok(_) => {
                log::info!("Logged out");
                Ok(())
            }
            Err(e) => {
                log::warn!("Logout call failed, local session cleared anyway: {}", e);
                Err(e)
            }
        }
    }

    pub async fn me(&self) -> Result<CurrentUser, ApiError> {
        self.http.get(endpoints::AUTH_ME).await
    }

    pub fn is_authenticated(&self) -> bool {
        self.http.session().is_authenticated()
    }
}
