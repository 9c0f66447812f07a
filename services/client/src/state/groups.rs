//! services/client/src/state/groups.rs
//!
//! The signed-in user's groups plus pass-through reads for submissions and
//! compilations.
//!
//! Mutations apply their local effect first and then reconcile against the
//! server with a full refresh. A failed reconcile keeps the local effect.

use crate::api::ApiClient;
use crate::error::{ClientError, ClientResult};
use crate::state::session::SessionState;
use futures::future::join_all;
use parking_lot::RwLock;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use weave_core::{
    CompilationJob, CompilationStatusReport, Group, VideoSubmission, WeeklyCompilation,
};

pub struct GroupsCache {
    api: Arc<ApiClient>,
    groups: RwLock<Vec<Group>>,
    // Refreshes in flight; overlapping refreshes each hold one.
    loading: AtomicUsize,
    last_error: RwLock<Option<String>>,
}

impl GroupsCache {
    pub fn new(api: Arc<ApiClient>) -> Self {
        Self {
            api,
            groups: RwLock::new(Vec::new()),
            loading: AtomicUsize::new(0),
            last_error: RwLock::new(None),
        }
    }

    pub fn groups(&self) -> Vec<Group> {
        self.groups.read().clone()
    }

    pub fn group(&self, group_id: i64) -> Option<Group> {
        self.groups.read().iter().find(|g| g.id == group_id).cloned()
    }

    /// True while at least one refresh is in flight.
    pub fn is_loading(&self) -> bool {
        self.loading.load(Ordering::SeqCst) > 0
    }

    pub fn last_error(&self) -> Option<String> {
        self.last_error.read().clone()
    }

    /// Empties the cache, e.g. after logout.
    pub fn clear(&self) {
        self.groups.write().clear();
        *self.last_error.write() = None;
    }

    /// Clears the last error, runs `fut`, and records its error if it fails.
    async fn tracked<T, F>(&self, fut: F) -> ClientResult<T>
    where
        F: Future<Output = ClientResult<T>>,
    {
        *self.last_error.write() = None;
        let result = fut.await;
        if let Err(e) = &result {
            *self.last_error.write() = Some(e.to_string());
        }
        result
    }

    //-------------------------------------------------------------------------------------
    // Reload and mutations
    //-------------------------------------------------------------------------------------

    /// Replaces the whole list with the server's. Overlapping refreshes are
    /// not coalesced; the last response to land wins.
    pub async fn refresh(&self) -> ClientResult<()> {
        let result = {
            let _loading = InFlight::enter(&self.loading);
            self.tracked(async {
                let groups = self.api.get_groups().await?;
                debug!("Fetched {} groups", groups.len());
                Ok::<_, ClientError>(self.attach_stats(groups).await)
            })
            .await
        };

        let groups = result?;
        *self.groups.write() = groups;
        Ok(())
    }

    /// Fetches video stats for every group concurrently. A failing stats call
    /// leaves that group's stats empty.
    async fn attach_stats(&self, groups: Vec<Group>) -> Vec<Group> {
        let stats = join_all(groups.iter().map(|g| self.api.group_video_stats(g.id))).await;
        groups
            .into_iter()
            .zip(stats)
            .map(|(mut group, stats)| {
                group.video_stats = match stats {
                    Ok(stats) => Some(stats),
                    Err(e) => {
                        warn!("Failed to get video stats for group {}: {}", group.id, e);
                        None
                    }
                };
                group
            })
            .collect()
    }

    async fn reconcile(&self) {
        if let Err(e) = self.refresh().await {
            warn!("Reconcile after mutation failed, keeping local state: {}", e);
        }
    }

    /// Creates a group, puts it at the front of the list, then reconciles.
    pub async fn create(&self, name: &str, description: Option<&str>) -> ClientResult<Group> {
        let group = self.tracked(self.api.create_group(name, description)).await?;
        info!("Created group {} ({})", group.id, group.name);
        self.groups.write().insert(0, group.clone());
        self.reconcile().await;
        Ok(group)
    }

    /// Joins and then reloads the list.
    pub async fn join(&self, group_id: i64) -> ClientResult<()> {
        self.tracked(self.api.join_group(group_id)).await?;
        self.reconcile().await;
        Ok(())
    }

    /// Joins by invite code and then reloads the list.
    pub async fn join_with_code(&self, invite_code: &str) -> ClientResult<Group> {
        let group = self.tracked(self.api.join_group_by_code(invite_code)).await?;
        info!("Joined group {} ({})", group.id, group.name);
        self.reconcile().await;
        Ok(group)
    }

    /// Leaves a group, drops it from the list, then reconciles.
    pub async fn leave(&self, group_id: i64) -> ClientResult<()> {
        self.tracked(self.api.leave_group(group_id)).await?;
        self.groups.write().retain(|g| g.id != group_id);
        self.reconcile().await;
        Ok(())
    }

    //-------------------------------------------------------------------------------------
    // Pass-through reads (never cached)
    //-------------------------------------------------------------------------------------

    pub async fn submissions(&self, group_id: i64) -> ClientResult<Vec<VideoSubmission>> {
        self.tracked(self.api.video_submissions(group_id)).await
    }

    pub async fn compilations(&self, group_id: i64) -> ClientResult<Vec<WeeklyCompilation>> {
        self.tracked(self.api.compilations(group_id)).await
    }

    /// Starts a compilation job. Polling its status is up to the caller.
    pub async fn generate_compilation(&self, group_id: i64) -> ClientResult<CompilationJob> {
        self.tracked(self.api.generate_compilation(group_id)).await
    }

    pub async fn compilation_status(
        &self,
        compilation_id: i64,
    ) -> ClientResult<CompilationStatusReport> {
        self.tracked(self.api.compilation_status(compilation_id)).await
    }

    //-------------------------------------------------------------------------------------
    // Session coupling
    //-------------------------------------------------------------------------------------

    /// Keeps the cache in step with the session: reload on sign-in, empty on sign-out.
    /// The task ends when the session holder is dropped.
    pub fn follow_session(self: Arc<Self>, mut session: watch::Receiver<SessionState>) -> JoinHandle<()> {
        tokio::spawn(async move {
            loop {
                let state = session.borrow_and_update().clone();
                match state {
                    SessionState::Authenticated(user) => {
                        debug!("User {} authenticated, loading groups", user.id);
                        if let Err(e) = self.refresh().await {
                            warn!("Failed to load groups: {}", e);
                        }
                    }
                    SessionState::Unauthenticated => self.clear(),
                    SessionState::Unknown => {}
                }

                if session.changed().await.is_err() {
                    break;
                }
            }
        })
    }
}

/// Counts one in-flight operation for as long as it is held, including when
/// the operation's future is dropped mid-flight.
struct InFlight<'a>(&'a AtomicUsize);

impl<'a> InFlight<'a> {
    fn enter(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}
