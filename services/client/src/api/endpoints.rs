//! services/client/src/api/endpoints.rs
//!
//! Paths of the backend's HTTP contract, relative to the configured base URL.

pub const HEALTH: &str = "/health";

pub const AUTH_LOGIN: &str = "/auth/login";
pub const AUTH_REGISTER: &str = "/auth/register";
pub const AUTH_LOGOUT: &str = "/auth/logout";
pub const AUTH_ME: &str = "/auth/me";
pub const AUTH_ACCOUNT: &str = "/auth/account";

pub const GROUPS_MINE: &str = "/groups/my-groups";
pub const GROUPS_CREATE: &str = "/groups/create";
pub const GROUPS_JOIN: &str = "/groups/join";
pub const GROUPS_USERS: &str = "/groups/users";
pub const GROUPS_PENDING_INVITES: &str = "/groups/pending-invites";

pub const PROMPTS_CURRENT: &str = "/prompts/current";

pub const VIDEOS_UPLOAD: &str = "/videos/upload";
pub const VIDEOS_MUSIC_TRACKS: &str = "/videos/music-tracks";

pub fn group(group_id: i64) -> String {
    format!("/groups/{}", group_id)
}

pub fn group_leave(group_id: i64) -> String {
    format!("/groups/{}/leave", group_id)
}

pub fn group_invite(group_id: i64) -> String {
    format!("/groups/{}/invite", group_id)
}

pub fn group_video_stats(group_id: i64) -> String {
    format!("/groups/{}/video-stats", group_id)
}

pub fn invite_accept(invite_id: i64) -> String {
    format!("/groups/invites/{}/accept", invite_id)
}

pub fn invite_decline(invite_id: i64) -> String {
    format!("/groups/invites/{}/decline", invite_id)
}

pub fn submissions(group_id: i64) -> String {
    format!("/videos/submissions/{}", group_id)
}

pub fn compilations(group_id: i64) -> String {
    format!("/videos/compilations/{}", group_id)
}

pub fn generate_compilation(group_id: i64) -> String {
    format!("/videos/generate-compilation/{}", group_id)
}

pub fn compilation_status(compilation_id: i64) -> String {
    format!("/videos/compilation-status/{}", compilation_id)
}

pub fn download_url(submission_id: i64) -> String {
    format!("/videos/download-url/{}", submission_id)
}
