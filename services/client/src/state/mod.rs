pub mod app;
pub mod groups;
pub mod session;

pub use app::AppState;
pub use groups::GroupsCache;
pub use session::{SessionHolder, SessionState};
