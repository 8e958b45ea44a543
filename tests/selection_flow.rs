//! Scenario tests for the search → select → download flow, driven through
//! the real session store, payload parser and temp-artifact guard with a
//! mock media provider.

use async_trait::async_trait;
use music_bot::bot::handlers::parse_selection;
use music_bot::i18n::Lang;
use music_bot::provider::{MediaProvider, ProviderError, TempArtifact, Track};
use music_bot::session::SessionStore;
use std::path::Path;
use std::time::Duration;

fn track(id: &str, title: &str, artist: &str) -> Track {
    Track {
        id: id.to_string(),
        title: title.to_string(),
        artist: artist.to_string(),
        url: format!("https://yt/{id}"),
    }
}

fn store() -> SessionStore {
    SessionStore::new(Lang::Ru, Duration::from_secs(3600), 10_000)
}

/// Mock provider returning a canned result set; `fail_materialize` makes
/// the download step fail like a broken yt-dlp run.
struct StaticProvider {
    tracks: Vec<Track>,
    fail_materialize: bool,
}

#[async_trait]
impl MediaProvider for StaticProvider {
    async fn search(&self, _query: &str) -> Result<Vec<Track>, ProviderError> {
        Ok(self.tracks.clone())
    }

    async fn materialize(&self, _track: &Track, dest: &Path) -> Result<(), ProviderError> {
        if self.fail_materialize {
            return Err(ProviderError::Failed {
                stderr: "simulated yt-dlp failure".to_string(),
            });
        }
        tokio::fs::write(dest, b"fake mp3 bytes")
            .await
            .map_err(|e| ProviderError::Failed {
                stderr: e.to_string(),
            })?;
        Ok(())
    }
}

fn daft_punk_results() -> Vec<Track> {
    vec![
        track("dp1", "One More Time", "Daft Punk"),
        track("dp2", "One More Time (Live)", "Daft Punk"),
        track("dp3", "One More Time (Cover)", "Somebody Else"),
    ]
}

#[tokio::test]
async fn three_track_search_then_payload_one_selects_the_middle_track() {
    let store = store();
    let provider = StaticProvider {
        tracks: daft_punk_results(),
        fail_materialize: false,
    };

    let results = provider
        .search("daft punk one more time")
        .await
        .expect("search succeeds");
    assert_eq!(results.len(), 3);
    store.set_results(42, results).await;

    let index = parse_selection("1").expect("numeric payload");
    let selected = store.track_at(42, index).await.expect("index 1 is valid");
    assert_eq!(selected.id, "dp2");
    assert_ne!(selected.id, "dp1");
    assert_ne!(selected.id, "dp3");
}

#[tokio::test]
async fn zero_result_search_leaves_previous_set_addressable() {
    let store = store();
    store.set_results(42, daft_punk_results()).await;

    // A later search that finds nothing never reaches set_results; the
    // controller only stores non-empty lists.
    let provider = StaticProvider {
        tracks: Vec::new(),
        fail_materialize: false,
    };
    let results = provider.search("zzzz").await.expect("search succeeds");
    assert!(results.is_empty());

    let still_there = store.track_at(42, 2).await.expect("old set untouched");
    assert_eq!(still_there.id, "dp3");
}

#[tokio::test]
async fn stale_payload_against_shrunk_set_is_rejected() {
    let store = store();
    store.set_results(42, daft_punk_results()).await;

    // A new one-track search completes before the user's old button press
    // arrives.
    store
        .set_results(42, vec![track("solo", "Around the World", "Daft Punk")])
        .await;

    // The old payload "1" must not map onto anything
    let stale = parse_selection("1").expect("numeric payload");
    assert!(store.track_at(42, stale).await.is_none());

    // While "0" resolves against the new set
    let fresh = parse_selection("0").expect("numeric payload");
    let selected = store.track_at(42, fresh).await.expect("new set index 0");
    assert_eq!(selected.id, "solo");
}

#[tokio::test]
async fn non_numeric_payload_is_dropped_without_state_change() {
    let store = store();
    store.set_results(42, daft_punk_results()).await;

    assert!(parse_selection("abc").is_none());

    // Nothing about the session moved
    assert_eq!(store.language(42).await, Lang::Ru);
    let untouched = store.track_at(42, 0).await.expect("set still present");
    assert_eq!(untouched.id, "dp1");
}

#[tokio::test]
async fn temp_artifact_is_removed_after_successful_materialize() {
    let provider = StaticProvider {
        tracks: daft_punk_results(),
        fail_materialize: false,
    };
    let selected = track("dp2", "One More Time (Live)", "Daft Punk");

    let artifact = TempArtifact::for_track(42, &selected.id);
    let path = artifact.path().to_path_buf();

    provider
        .materialize(&selected, artifact.path())
        .await
        .expect("materialize succeeds");
    assert!(path.exists(), "file must exist while the guard is alive");

    // Handler done (whatever the send outcome) — the guard drops
    drop(artifact);
    assert!(!path.exists(), "artifact must be removed after handling");
}

#[tokio::test]
async fn temp_artifact_is_removed_after_failed_materialize() {
    let provider = StaticProvider {
        tracks: daft_punk_results(),
        fail_materialize: true,
    };
    let selected = track("dp1", "One More Time", "Daft Punk");

    let artifact = TempArtifact::for_track(43, &selected.id);
    let path = artifact.path().to_path_buf();

    let err = provider
        .materialize(&selected, artifact.path())
        .await
        .expect_err("materialize fails");
    assert!(!err.is_timeout());

    drop(artifact);
    assert!(!path.exists());
}

#[tokio::test]
async fn timeout_errors_are_distinguished_from_failures() {
    let timeout = ProviderError::Timeout(Duration::from_secs(180));
    assert!(timeout.is_timeout());

    let failed = ProviderError::Failed {
        stderr: "ERROR: no video formats".to_string(),
    };
    assert!(!failed.is_timeout());
    assert!(failed.to_string().contains("no video formats"));
}
