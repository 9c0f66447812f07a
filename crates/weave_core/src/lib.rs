pub mod domain;
pub mod ports;
pub mod token_store;
pub mod video_cache;

pub use domain::{
    AuthResponse, CompilationJob, CompilationStatus, CompilationStatusReport, DownloadUrl, Group,
    GroupInvite, GroupMember, GroupVideoStats, HealthStatus, InviteStatus, InviteUsersResponse,
    MessageResponse, MusicTrack, Prompt, User, UserSummary, VideoSubmission, WeeklyCompilation,
};
pub use ports::{KeyValueStore, MemoryKeyValueStore, PortError, PortResult};
pub use token_store::TokenStore;
pub use video_cache::{LocalVideo, Subscription, VideoCache, VideoMap};
