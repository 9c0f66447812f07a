//! services/client/src/state/session.rs
//!
//! Single source of truth for who is logged in.
//!
//! `Unknown` at construction, then `Authenticated(user)` or `Unauthenticated`.
//! Every transition runs under one async lock, so operations never interleave
//! and the last one started decides the final state.

use crate::api::ApiClient;
use crate::error::ClientResult;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{watch, Mutex};
use tracing::{error, info};
use weave_core::User;

#[derive(Debug, Clone, PartialEq)]
pub enum SessionState {
    /// Startup check has not finished yet.
    Unknown,
    Authenticated(User),
    Unauthenticated,
}

impl SessionState {
    pub fn user(&self) -> Option<&User> {
        match self {
            SessionState::Authenticated(user) => Some(user),
            _ => None,
        }
    }
}

pub struct SessionHolder {
    api: Arc<ApiClient>,
    state: watch::Sender<SessionState>,
    loading: AtomicBool,
    last_error: RwLock<Option<String>>,
    op_lock: Mutex<()>,
}

impl SessionHolder {
    pub fn new(api: Arc<ApiClient>) -> Self {
        let (state, _) = watch::channel(SessionState::Unknown);
        Self {
            api,
            state,
            loading: AtomicBool::new(true),
            last_error: RwLock::new(None),
            op_lock: Mutex::new(()),
        }
    }

    //-------------------------------------------------------------------------------------
    // Readable state
    //-------------------------------------------------------------------------------------

    pub fn state(&self) -> SessionState {
        self.state.borrow().clone()
    }

    /// The cached user. Never hits the network.
    pub fn current_user(&self) -> Option<User> {
        self.state.borrow().user().cloned()
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(*self.state.borrow(), SessionState::Authenticated(_))
    }

    pub fn is_loading(&self) -> bool {
        self.loading.load(Ordering::SeqCst)
    }

    /// Message of the last failed operation. Cleared when the next one starts.
    pub fn last_error(&self) -> Option<String> {
        self.last_error.read().clone()
    }

    /// A receiver that observes every state transition.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    fn publish(&self, next: SessionState) {
        self.state.send_replace(next);
    }

    fn record_error(&self, message: String) {
        *self.last_error.write() = Some(message);
    }

    fn reset_error(&self) {
        *self.last_error.write() = None;
    }

    //-------------------------------------------------------------------------------------
    // Transitions
    //-------------------------------------------------------------------------------------

    /// Startup check: a stored token is verified against `/auth/me`.
    ///
    /// A rejected token is cleared and the session ends up unauthenticated.
    pub async fn restore(&self) -> SessionState {
        let _op = self.op_lock.lock().await;
        self.loading.store(true, Ordering::SeqCst);

        let next = match self.api.load_token().await {
            None => SessionState::Unauthenticated,
            Some(_) => match self.api.get_current_user().await {
                Ok(user) => {
                    info!("Restored session for user {}", user.id);
                    SessionState::Authenticated(user)
                }
                Err(e) => {
                    error!("Auth check failed: {}", e);
                    self.api.logout().await;
                    SessionState::Unauthenticated
                }
            },
        };

        self.publish(next.clone());
        self.loading.store(false, Ordering::SeqCst);
        next
    }

    /// Logs in. The token is stored before the user is published.
    pub async fn login(&self, email: &str, password: &str) -> ClientResult<User> {
        let _op = self.op_lock.lock().await;
        self.reset_error();
        self.loading.store(true, Ordering::SeqCst);

        let result = self.api.login(email, password).await;
        self.loading.store(false, Ordering::SeqCst);

        match result {
            Ok(response) => {
                self.publish(SessionState::Authenticated(response.user.clone()));
                Ok(response.user)
            }
            Err(e) => {
                self.record_error(e.to_string());
                Err(e)
            }
        }
    }

    pub async fn signup(&self, email: &str, username: &str, password: &str) -> ClientResult<User> {
        let _op = self.op_lock.lock().await;
        self.reset_error();
        self.loading.store(true, Ordering::SeqCst);

        let result = self.api.signup(email, username, password).await;
        self.loading.store(false, Ordering::SeqCst);

        match result {
            Ok(response) => {
                self.publish(SessionState::Authenticated(response.user.clone()));
                Ok(response.user)
            }
            Err(e) => {
                self.record_error(e.to_string());
                Err(e)
            }
        }
    }

    /// Logs out. Always ends unauthenticated with no token, whatever the server says.
    pub async fn logout(&self) {
        let _op = self.op_lock.lock().await;
        self.loading.store(true, Ordering::SeqCst);
        self.api.logout().await;
        self.reset_error();
        self.publish(SessionState::Unauthenticated);
        self.loading.store(false, Ordering::SeqCst);
    }

    /// Re-checks the held token against `/auth/me`. A missing or rejected
    /// token ends the session; a rejected one is also logged out server-side.
    pub async fn verify(&self) -> bool {
        let _op = self.op_lock.lock().await;
        self.loading.store(true, Ordering::SeqCst);
        let valid = self.api.verify_token().await;
        if !valid {
            self.publish(SessionState::Unauthenticated);
        }
        self.loading.store(false, Ordering::SeqCst);
        valid
    }

    /// Re-fetches the user behind the held token and republishes it. On
    /// failure the token is cleared and the session ends unauthenticated.
    pub async fn refresh(&self) -> ClientResult<User> {
        let _op = self.op_lock.lock().await;
        self.reset_error();
        self.loading.store(true, Ordering::SeqCst);

        let result = self.api.refresh_token().await;
        self.loading.store(false, Ordering::SeqCst);

        match result {
            Ok(user) => {
                self.publish(SessionState::Authenticated(user.clone()));
                Ok(user)
            }
            Err(e) => {
                error!("Session refresh failed: {}", e);
                self.record_error(e.to_string());
                self.publish(SessionState::Unauthenticated);
                Err(e)
            }
        }
    }

    /// Deletes the account. On success the user and the token are both dropped.
    pub async fn delete_account(&self, password: &str) -> ClientResult<()> {
        let _op = self.op_lock.lock().await;
        self.reset_error();
        self.loading.store(true, Ordering::SeqCst);

        let result = self.api.delete_account(password).await;
        self.loading.store(false, Ordering::SeqCst);

        match result {
            Ok(response) => {
                info!("Account deleted: {}", response.message);
                self.api.clear_token().await;
                self.publish(SessionState::Unauthenticated);
                Ok(())
            }
            Err(e) => {
                self.record_error(e.to_string());
                Err(e)
            }
        }
    }
}
