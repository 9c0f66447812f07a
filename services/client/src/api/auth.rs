//! services/client/src/api/auth.rs
//!
//! Authentication calls: login, signup, logout, account management and token
//! verification.

use super::client::ApiClient;
use super::endpoints;
use crate::error::ClientResult;
use reqwest::Method;
use serde::de::IgnoredAny;
use serde::Serialize;
use tracing::{error, info};
use weave_core::{AuthResponse, MessageResponse, User};

//=========================================================================================
// Request Types
//=========================================================================================

#[derive(Serialize)]
struct LoginRequest<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
struct SignupRequest<'a> {
    email: &'a str,
    username: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
struct DeleteAccountRequest<'a> {
    password: &'a str,
}

//=========================================================================================
// Calls
//=========================================================================================

impl ApiClient {
    /// POST /auth/login. On success the returned token is held and persisted
    /// before this returns.
    pub async fn login(&self, email: &str, password: &str) -> ClientResult<AuthResponse> {
        let response: AuthResponse = self
            .send_json(
                Method::POST,
                endpoints::AUTH_LOGIN,
                Some(&LoginRequest { email, password }),
            )
            .await?;

        self.set_token(&response.access_token).await;
        info!("Logged in as user {}", response.user.id);
        Ok(response)
    }

    /// POST /auth/register. Same token handling as [`ApiClient::login`].
    pub async fn signup(
        &self,
        email: &str,
        username: &str,
        password: &str,
    ) -> ClientResult<AuthResponse> {
        let response: AuthResponse = self
            .send_json(
                Method::POST,
                endpoints::AUTH_REGISTER,
                Some(&SignupRequest {
                    email,
                    username,
                    password,
                }),
            )
            .await?;

        self.set_token(&response.access_token).await;
        info!("Registered user {}", response.user.id);
        Ok(response)
    }

    /// POST /auth/logout, best effort. The local token is cleared no matter
    /// how the server call ends.
    /// Callers outside the crate go through `SessionHolder::logout` so the
    /// published session follows the token.
    pub(crate) async fn logout(&self) {
        if let Err(e) = self.send::<IgnoredAny>(Method::POST, endpoints::AUTH_LOGOUT).await {
            error!("Logout request failed: {}", e);
        }
        self.clear_token().await;
    }

    /// GET /auth/me
    pub async fn get_current_user(&self) -> ClientResult<User> {
        self.get(endpoints::AUTH_ME).await
    }

    /// DELETE /auth/account. Requires the current password.
    pub async fn delete_account(&self, password: &str) -> ClientResult<MessageResponse> {
        self.send_json(
            Method::DELETE,
            endpoints::AUTH_ACCOUNT,
            Some(&DeleteAccountRequest { password }),
        )
        .await
    }

    /// Checks the held token against `/auth/me`.
    ///
    /// No token means `false` without a network call. A rejected token
    /// triggers a full logout.
    pub(crate) async fn verify_token(&self) -> bool {
        if !self.is_authenticated() {
            return false;
        }
        match self.get_current_user().await {
            Ok(_) => true,
            Err(e) => {
                error!("Token verification failed: {}", e);
                self.logout().await;
                false
            }
        }
    }

    /// Re-validates the held token and returns the user it belongs to,
    /// clearing the token when the server rejects it.
    pub(crate) async fn refresh_token(&self) -> ClientResult<User> {
        match self.get_current_user().await {
            Ok(user) => Ok(user),
            Err(e) => {
                self.clear_token().await;
                Err(e)
            }
        }
    }
}
