//! services/client/src/api/groups.rs
//!
//! Group, membership, invite and prompt calls. All of them are plain
//! pass-throughs; caching lives in `state::groups`.

use super::client::ApiClient;
use super::endpoints;
use crate::error::ClientResult;
use reqwest::Method;
use serde::Serialize;
use tracing::debug;
use weave_core::{
    Group, GroupInvite, GroupMember, GroupVideoStats, InviteUsersResponse, MessageResponse, Prompt, UserSummary,
};

#[derive(Serialize)]
struct CreateGroupRequest<'a> {
    name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<&'a str>,
}

#[derive(Serialize)]
struct JoinByCodeRequest<'a> {
    invite_code: &'a str,
}

#[derive(Serialize)]
struct InviteRequest<'a> {
    usernames: &'a [String],
}

impl ApiClient {
    /// GET /groups/my-groups
    pub async fn get_groups(&self) -> ClientResult<Vec<Group>> {
        self.get(endpoints::GROUPS_MINE).await
    }

    /// POST /groups/create
    pub async fn create_group(&self, name: &str, description: Option<&str>) -> ClientResult<Group> {
        self.send_json(
            Method::POST,
            endpoints::GROUPS_CREATE,
            Some(&CreateGroupRequest { name, description }),
        )
        .await
    }

    /// GET /groups/{id}
    pub async fn get_group(&self, group_id: i64) -> ClientResult<Group> {
        self.get(&endpoints::group(group_id)).await
    }

    /// POST /groups/join without a body. The group id only scopes the caller's
    /// bookkeeping; the server decides which group is joined.
    pub async fn join_group(&self, group_id: i64) -> ClientResult<GroupMember> {
        debug!("Joining group {}", group_id);
        self.send(Method::POST, endpoints::GROUPS_JOIN).await
    }

    /// POST /groups/join with an invite code.
    pub async fn join_group_by_code(&self, invite_code: &str) -> ClientResult<Group> {
        self.send_json(
            Method::POST,
            endpoints::GROUPS_JOIN,
            Some(&JoinByCodeRequest { invite_code }),
        )
        .await
    }

    /// POST /groups/{id}/leave
    pub async fn leave_group(&self, group_id: i64) -> ClientResult<MessageResponse> {
        self.send(Method::POST, &endpoints::group_leave(group_id)).await
    }

    /// POST /groups/{id}/invite
    pub async fn invite_users(
        &self,
        group_id: i64,
        usernames: &[String],
    ) -> ClientResult<InviteUsersResponse> {
        self.send_json(
            Method::POST,
            &endpoints::group_invite(group_id),
            Some(&InviteRequest { usernames }),
        )
        .await
    }

    /// GET /groups/users
    pub async fn list_users(&self) -> ClientResult<Vec<UserSummary>> {
        self.get(endpoints::GROUPS_USERS).await
    }

    /// GET /groups/pending-invites
    pub async fn pending_invites(&self) -> ClientResult<Vec<GroupInvite>> {
        self.get(endpoints::GROUPS_PENDING_INVITES).await
    }

    pub async fn accept_invite(&self, invite_id: i64) -> ClientResult<MessageResponse> {
        self.send(Method::POST, &endpoints::invite_accept(invite_id)).await
    }

    pub async fn decline_invite(&self, invite_id: i64) -> ClientResult<MessageResponse> {
        self.send(Method::POST, &endpoints::invite_decline(invite_id)).await
    }

    /// GET /groups/{id}/video-stats
    pub async fn group_video_stats(&self, group_id: i64) -> ClientResult<GroupVideoStats> {
        self.get(&endpoints::group_video_stats(group_id)).await
    }

    /// GET /prompts/current
    pub async fn current_prompt(&self) -> ClientResult<Prompt> {
        self.get(endpoints::PROMPTS_CURRENT).await
    }
}
