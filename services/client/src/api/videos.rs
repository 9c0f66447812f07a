//! services/client/src/api/videos.rs
//!
//! Video submission, compilation and music calls, plus the multipart upload.

use super::client::ApiClient;
use super::endpoints;
use crate::error::ClientResult;
use bytes::Bytes;
use reqwest::multipart::{Form, Part};
use reqwest::Method;
use std::path::Path;
use tracing::info;
use weave_core::{
    CompilationJob, CompilationStatusReport, DownloadUrl, HealthStatus, MusicTrack,
    VideoSubmission, WeeklyCompilation,
};

/// Prompt id used when the caller does not name one.
pub const DEFAULT_PROMPT_ID: i64 = 1;

/// A recorded video ready to be sent to `/videos/upload`.
#[derive(Debug, Clone)]
pub struct VideoUpload {
    pub data: Bytes,
    pub file_name: String,
    pub mime_type: String,
    pub duration: f64,
    pub prompt_id: i64,
}

impl VideoUpload {
    pub fn new(data: impl Into<Bytes>, file_name: impl Into<String>, duration: f64) -> Self {
        let file_name = file_name.into();
        Self {
            mime_type: mime_for(&file_name).to_string(),
            data: data.into(),
            file_name,
            duration,
            prompt_id: DEFAULT_PROMPT_ID,
        }
    }

    /// Reads a local video file into memory.
    pub async fn from_path(path: impl AsRef<Path>, duration: f64) -> ClientResult<Self> {
        let path = path.as_ref();
        let data = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("video.mp4")
            .to_string();
        Ok(Self::new(data, file_name, duration))
    }

    pub fn with_prompt(mut self, prompt_id: i64) -> Self {
        self.prompt_id = prompt_id;
        self
    }
}

fn mime_for(file_name: &str) -> &'static str {
    let ext = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "mp4" | "m4v" => "video/mp4",
        "mov" => "video/quicktime",
        "webm" => "video/webm",
        _ => "application/octet-stream",
    }
}

impl ApiClient {
    /// GET /videos/submissions/{groupId}
    pub async fn video_submissions(&self, group_id: i64) -> ClientResult<Vec<VideoSubmission>> {
        self.get(&endpoints::submissions(group_id)).await
    }

    /// POST /videos/upload as multipart form data.
    ///
    /// Only the auth header is set by hand; the transport writes the
    /// multipart content type and boundary itself.
    pub async fn submit_video(
        &self,
        group_id: i64,
        upload: VideoUpload,
    ) -> ClientResult<VideoSubmission> {
        let group_id_str = group_id.to_string();
        let duration_str = upload.duration.to_string();
        let prompt_id_str = upload.prompt_id.to_string();

        let len = upload.data.len() as u64;
        let file = Part::stream_with_length(upload.data, len)
            .file_name(upload.file_name)
            .mime_str(&upload.mime_type)?;
        let form = Form::new()
            .part("file", file)
            .text("group_id", group_id_str.clone())
            .text("duration", duration_str.clone())
            .text("prompt_id", prompt_id_str.clone());

        let request = self
            .http_request(Method::POST, endpoints::VIDEOS_UPLOAD)
            .headers(self.auth_headers()?)
            .query(&[
                ("group_id", group_id_str),
                ("prompt_id", prompt_id_str),
                ("duration", duration_str),
            ])
            .multipart(form);

        let submission: VideoSubmission = self.execute(request, endpoints::VIDEOS_UPLOAD).await?;
        info!("Uploaded video submission {} to group {}", submission.id, group_id);
        Ok(submission)
    }

    /// GET /videos/compilations/{groupId}
    pub async fn compilations(&self, group_id: i64) -> ClientResult<Vec<WeeklyCompilation>> {
        self.get(&endpoints::compilations(group_id)).await
    }

    /// POST /videos/generate-compilation/{groupId}. Returns the job id; the
    /// caller polls [`ApiClient::compilation_status`].
    pub async fn generate_compilation(&self, group_id: i64) -> ClientResult<CompilationJob> {
        self.send(Method::POST, &endpoints::generate_compilation(group_id))
            .await
    }

    /// GET /videos/compilation-status/{compilationId}
    pub async fn compilation_status(
        &self,
        compilation_id: i64,
    ) -> ClientResult<CompilationStatusReport> {
        self.get(&endpoints::compilation_status(compilation_id)).await
    }

    /// GET /videos/music-tracks
    pub async fn music_tracks(&self) -> ClientResult<Vec<MusicTrack>> {
        self.get(endpoints::VIDEOS_MUSIC_TRACKS).await
    }

    /// GET /videos/download-url/{submissionId}
    pub async fn submission_download_url(&self, submission_id: i64) -> ClientResult<DownloadUrl> {
        self.get(&endpoints::download_url(submission_id)).await
    }

    /// GET /health
    pub async fn health(&self) -> ClientResult<HealthStatus> {
        self.get(endpoints::HEALTH).await
    }
}
