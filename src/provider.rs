//! Media search/download via the yt-dlp subprocess
//!
//! Mirrors the two yt-dlp invocations the bot needs: an NDJSON
//! `ytsearchN:` query and an audio extraction (`-x --audio-format mp3`).
//! Both run under a configurable timeout; a hung yt-dlp must not pin a
//! dispatcher worker forever.

use crate::config::Settings;
use async_trait::async_trait;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::process::Output;
use std::time::Duration;
use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, warn};

/// One candidate search result
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Track {
    /// Stable collision-resistant id within one search response
    pub id: String,
    /// Track title
    pub title: String,
    /// Artist / channel name
    pub artist: String,
    /// Source URL passed back to yt-dlp for download
    pub url: String,
}

/// Errors from the external search/download tool
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The yt-dlp process could not be started at all
    #[error("failed to launch {tool}: {source}")]
    Launch {
        /// Configured executable path
        tool: String,
        /// Underlying spawn error
        #[source]
        source: std::io::Error,
    },

    /// yt-dlp ran but exited unsuccessfully
    #[error("yt-dlp failed: {stderr}")]
    Failed {
        /// Trimmed stderr of the failed invocation
        stderr: String,
    },

    /// The invocation exceeded the configured budget and was killed
    #[error("yt-dlp timed out after {0:?}")]
    Timeout(Duration),
}

impl ProviderError {
    /// Whether this error is the timeout boundary firing
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }
}

/// Search and download boundary, implemented by yt-dlp in production and
/// by mocks in tests.
#[async_trait]
pub trait MediaProvider: Send + Sync {
    /// Run a free-text search and return candidate tracks in source order
    async fn search(&self, query: &str) -> Result<Vec<Track>, ProviderError>;

    /// Download `track` as mp3 to `dest`
    async fn materialize(&self, track: &Track, dest: &Path) -> Result<(), ProviderError>;
}

/// [`MediaProvider`] backed by the yt-dlp executable
pub struct YtDlpProvider {
    path: String,
    limit: u32,
    timeout: Duration,
}

impl YtDlpProvider {
    /// Build the provider from loaded settings
    #[must_use]
    pub fn new(settings: &Settings) -> Self {
        Self {
            path: settings.yt_dlp_path.clone(),
            limit: settings.search_limit,
            timeout: Duration::from_secs(settings.provider_timeout_secs),
        }
    }

    /// Run yt-dlp with `args`, enforcing the timeout budget.
    ///
    /// `kill_on_drop` ensures the child does not outlive an expired
    /// timeout.
    async fn run(&self, args: &[&str]) -> Result<Output, ProviderError> {
        debug!(tool = %self.path, ?args, "running yt-dlp");
        let mut cmd = Command::new(&self.path);
        cmd.args(args).kill_on_drop(true);

        let output = tokio::time::timeout(self.timeout, cmd.output())
            .await
            .map_err(|_| ProviderError::Timeout(self.timeout))?
            .map_err(|source| ProviderError::Launch {
                tool: self.path.clone(),
                source,
            })?;

        if output.status.success() {
            Ok(output)
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            Err(ProviderError::Failed { stderr })
        }
    }
}

#[async_trait]
impl MediaProvider for YtDlpProvider {
    async fn search(&self, query: &str) -> Result<Vec<Track>, ProviderError> {
        let selector = format!("ytsearch{}:{}", self.limit, query);
        let output = self
            .run(&[&selector, "--dump-json", "--no-warnings"])
            .await?;
        let stdout = String::from_utf8_lossy(&output.stdout);
        Ok(parse_search_output(&stdout))
    }

    async fn materialize(&self, track: &Track, dest: &Path) -> Result<(), ProviderError> {
        let dest = dest.to_string_lossy();
        self.run(&[
            "-x",
            "--audio-format",
            "mp3",
            "--no-warnings",
            "--output",
            &dest,
            &track.url,
        ])
        .await?;
        Ok(())
    }
}

#[derive(Deserialize)]
struct SearchLine {
    id: String,
    #[serde(default)]
    title: String,
    #[serde(default, alias = "uploader")]
    channel: String,
    webpage_url: String,
}

/// Parse yt-dlp NDJSON search output, preserving source order.
///
/// Unparseable lines are skipped with a warning rather than failing the
/// whole search.
#[must_use]
pub fn parse_search_output(output: &str) -> Vec<Track> {
    let mut tracks = Vec::new();
    for line in output.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match serde_json::from_str::<SearchLine>(line) {
            Ok(parsed) => tracks.push(Track {
                id: parsed.id,
                title: parsed.title,
                artist: parsed.channel,
                url: parsed.webpage_url,
            }),
            Err(e) => warn!(error = %e, "skipping unparseable search result line"),
        }
    }
    tracks
}

/// Temporary audio file scoped to one selection attempt.
///
/// The file is removed when the guard drops, whatever happened to the
/// download or the subsequent send.
pub struct TempArtifact {
    path: PathBuf,
}

impl TempArtifact {
    /// Allocate a per-attempt path under the system temp directory, named
    /// from chat id and track id so concurrent selections never collide.
    #[must_use]
    pub fn for_track(chat_id: i64, track_id: &str) -> Self {
        let safe_id: String = track_id
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        let path = std::env::temp_dir().join(format!("music-bot-{chat_id}-{safe_id}.mp3"));
        Self { path }
    }

    /// Destination path for yt-dlp and the audio send
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for TempArtifact {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!(path = %self.path.display(), error = %e, "failed to remove temp audio file");
            }
        }
    }
}
