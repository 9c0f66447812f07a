pub mod auth;
pub mod client;
pub mod endpoints;
pub mod groups;
pub mod videos;

pub use client::ApiClient;
pub use videos::VideoUpload;
