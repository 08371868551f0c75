//! Asset publisher: pushes a job's artifacts into the blob store.
//!
//! Every upload is independent. A failed keyframe is logged and omitted from
//! the result instead of failing the batch; only configuration-level errors
//! abort, since retrying asset-by-asset cannot fix a missing credential.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{error, info, warn};
use vidnote_models::{AiContent, JobId};

use crate::client::BlobStore;
use crate::error::{StorageError, StorageResult};

const JPEG_CONTENT_TYPE: &str = "image/jpeg";
const TEXT_CONTENT_TYPE: &str = "text/plain; charset=utf-8";
const JSON_CONTENT_TYPE: &str = "application/json";

/// One captured frame queued for upload.
#[derive(Debug, Clone)]
pub struct KeyframeUpload {
    pub timestamp_secs: i64,
    pub path: PathBuf,
    pub thumbnail_path: Option<PathBuf>,
}

/// A keyframe confirmed in the blob store.
#[derive(Debug, Clone)]
pub struct PublishedKeyframe {
    pub timestamp_secs: i64,
    pub url: String,
    pub thumbnail_url: Option<String>,
    pub size: u64,
}

/// A single non-image artifact confirmed in the blob store.
#[derive(Debug, Clone)]
pub struct PublishedArtifact {
    pub url: String,
    pub key: String,
}

/// Everything the publish stage managed to push for one job.
#[derive(Debug, Clone, Default)]
pub struct PublishedAssets {
    pub keyframes: Vec<PublishedKeyframe>,
    pub transcript: Option<PublishedArtifact>,
    pub analysis: Option<PublishedArtifact>,
    /// Uploads that failed, as user-presentable notes.
    pub failures: Vec<String>,
}

impl PublishedAssets {
    pub fn is_empty(&self) -> bool {
        self.keyframes.is_empty() && self.transcript.is_none() && self.analysis.is_none()
    }
}

/// Publishes job artifacts under `{owner}/{job}/...` keys.
#[derive(Clone)]
pub struct AssetPublisher {
    store: Arc<dyn BlobStore>,
}

impl AssetPublisher {
    pub fn new(store: Arc<dyn BlobStore>) -> Self {
        Self { store }
    }

    fn keyframe_key(owner_id: &str, job_id: &JobId, timestamp_secs: i64) -> String {
        format!(
            "{}/{}/keyframes/keyframe_{:06}.jpg",
            owner_id, job_id, timestamp_secs
        )
    }

    fn thumbnail_key(owner_id: &str, job_id: &JobId, timestamp_secs: i64) -> String {
        format!(
            "{}/{}/keyframes/thumb_{:06}.jpg",
            owner_id, job_id, timestamp_secs
        )
    }

    fn transcript_key(owner_id: &str, job_id: &JobId) -> String {
        format!("{}/{}/transcript.txt", owner_id, job_id)
    }

    fn analysis_key(owner_id: &str, job_id: &JobId) -> String {
        format!("{}/{}/analysis.json", owner_id, job_id)
    }

    /// Upload captured keyframes one by one. Frames that fail to upload are
    /// recorded in `failures` and skipped; a configuration error aborts.
    pub async fn publish_keyframes(
        &self,
        owner_id: &str,
        job_id: &JobId,
        frames: &[KeyframeUpload],
    ) -> StorageResult<PublishedAssets> {
        let mut assets = PublishedAssets::default();

        for frame in frames {
            let key = Self::keyframe_key(owner_id, job_id, frame.timestamp_secs);
            let uploaded = match self
                .store
                .upload_file(&frame.path, &key, JPEG_CONTENT_TYPE)
                .await
            {
                Ok(obj) => obj,
                Err(e) if e.is_config() => {
                    error!(job_id = %job_id, "Storage misconfigured, aborting publish: {}", e);
                    return Err(e);
                }
                Err(e) => {
                    warn!(
                        job_id = %job_id,
                        timestamp = frame.timestamp_secs,
                        "Keyframe upload failed, skipping: {}", e
                    );
                    assets
                        .failures
                        .push(format!("keyframe at {}s not uploaded", frame.timestamp_secs));
                    continue;
                }
            };

            // Thumbnails ride along with their frame; losing one is cosmetic.
            let thumbnail_url = match &frame.thumbnail_path {
                Some(thumb) => {
                    let thumb_key = Self::thumbnail_key(owner_id, job_id, frame.timestamp_secs);
                    match self
                        .store
                        .upload_file(thumb, &thumb_key, JPEG_CONTENT_TYPE)
                        .await
                    {
                        Ok(obj) => Some(obj.url),
                        Err(e) if e.is_config() => return Err(e),
                        Err(e) => {
                            warn!(
                                job_id = %job_id,
                                timestamp = frame.timestamp_secs,
                                "Thumbnail upload failed: {}", e
                            );
                            None
                        }
                    }
                }
                None => None,
            };

            assets.keyframes.push(PublishedKeyframe {
                timestamp_secs: frame.timestamp_secs,
                url: uploaded.url,
                thumbnail_url,
                size: uploaded.size,
            });
        }

        info!(
            job_id = %job_id,
            uploaded = assets.keyframes.len(),
            failed = assets.failures.len(),
            "Keyframe publish finished"
        );
        Ok(assets)
    }

    /// Upload the transcript text. Returns `None` when the upload fails for a
    /// non-configuration reason.
    pub async fn publish_transcript(
        &self,
        owner_id: &str,
        job_id: &JobId,
        transcript: &str,
    ) -> StorageResult<Option<PublishedArtifact>> {
        let key = Self::transcript_key(owner_id, job_id);
        match self
            .store
            .upload_bytes(transcript.as_bytes().to_vec(), &key, TEXT_CONTENT_TYPE)
            .await
        {
            Ok(obj) => Ok(Some(PublishedArtifact {
                url: obj.url,
                key: obj.key,
            })),
            Err(e) if e.is_config() => Err(e),
            Err(e) => {
                warn!(job_id = %job_id, "Transcript upload failed: {}", e);
                Ok(None)
            }
        }
    }

    /// Upload the analysis document as JSON.
    pub async fn publish_analysis(
        &self,
        owner_id: &str,
        job_id: &JobId,
        content: &AiContent,
    ) -> StorageResult<Option<PublishedArtifact>> {
        let body = serde_json::to_vec_pretty(content).map_err(StorageError::from)?;
        let key = Self::analysis_key(owner_id, job_id);
        match self.store.upload_bytes(body, &key, JSON_CONTENT_TYPE).await {
            Ok(obj) => Ok(Some(PublishedArtifact {
                url: obj.url,
                key: obj.key,
            })),
            Err(e) if e.is_config() => Err(e),
            Err(e) => {
                warn!(job_id = %job_id, "Analysis upload failed: {}", e);
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::UploadedObject;
    use async_trait::async_trait;
    use std::collections::HashSet;
    use std::path::Path;
    use std::sync::Mutex;

    struct FakeStore {
        fail_keys: HashSet<String>,
        config_broken: bool,
        uploads: Mutex<Vec<String>>,
    }

    impl FakeStore {
        fn new() -> Self {
            Self {
                fail_keys: HashSet::new(),
                config_broken: false,
                uploads: Mutex::new(Vec::new()),
            }
        }

        fn failing(keys: &[&str]) -> Self {
            let mut store = Self::new();
            store.fail_keys = keys.iter().map(|k| k.to_string()).collect();
            store
        }

        fn record(&self, key: &str) -> StorageResult<UploadedObject> {
            if self.config_broken {
                return Err(StorageError::config_error("no credentials"));
            }
            if self.fail_keys.contains(key) {
                return Err(StorageError::upload_failed("simulated failure"));
            }
            self.uploads.lock().unwrap().push(key.to_string());
            Ok(UploadedObject {
                url: format!("https://cdn.example.com/{}", key),
                key: key.to_string(),
                size: 1024,
            })
        }
    }

    #[async_trait]
    impl BlobStore for FakeStore {
        async fn upload_file(
            &self,
            _path: &Path,
            key: &str,
            _content_type: &str,
        ) -> StorageResult<UploadedObject> {
            self.record(key)
        }

        async fn upload_bytes(
            &self,
            _data: Vec<u8>,
            key: &str,
            _content_type: &str,
        ) -> StorageResult<UploadedObject> {
            self.record(key)
        }
    }

    fn frame(ts: i64, with_thumb: bool) -> KeyframeUpload {
        KeyframeUpload {
            timestamp_secs: ts,
            path: PathBuf::from(format!("/tmp/keyframe_{:06}.jpg", ts)),
            thumbnail_path: with_thumb.then(|| PathBuf::from(format!("/tmp/thumb_{:06}.jpg", ts))),
        }
    }

    #[tokio::test]
    async fn publishes_all_frames_with_thumbnails() {
        let store = Arc::new(FakeStore::new());
        let publisher = AssetPublisher::new(store.clone());
        let job_id = JobId::from_string("job-1");

        let assets = publisher
            .publish_keyframes("owner-a", &job_id, &[frame(30, true), frame(120, true)])
            .await
            .unwrap();

        assert_eq!(assets.keyframes.len(), 2);
        assert!(assets.failures.is_empty());
        assert_eq!(
            assets.keyframes[0].url,
            "https://cdn.example.com/owner-a/job-1/keyframes/keyframe_000030.jpg"
        );
        assert!(assets.keyframes[0].thumbnail_url.is_some());
        // Two frames plus two thumbnails hit the store.
        assert_eq!(store.uploads.lock().unwrap().len(), 4);
    }

    #[tokio::test]
    async fn failed_frame_is_skipped_not_fatal() {
        let store = FakeStore::failing(&["owner-a/job-1/keyframes/keyframe_000030.jpg"]);
        let publisher = AssetPublisher::new(Arc::new(store));
        let job_id = JobId::from_string("job-1");

        let assets = publisher
            .publish_keyframes("owner-a", &job_id, &[frame(30, false), frame(120, false)])
            .await
            .unwrap();

        assert_eq!(assets.keyframes.len(), 1);
        assert_eq!(assets.keyframes[0].timestamp_secs, 120);
        assert_eq!(assets.failures, vec!["keyframe at 30s not uploaded"]);
    }

    #[tokio::test]
    async fn failed_thumbnail_keeps_the_frame() {
        let store = FakeStore::failing(&["owner-a/job-1/keyframes/thumb_000030.jpg"]);
        let publisher = AssetPublisher::new(Arc::new(store));
        let job_id = JobId::from_string("job-1");

        let assets = publisher
            .publish_keyframes("owner-a", &job_id, &[frame(30, true)])
            .await
            .unwrap();

        assert_eq!(assets.keyframes.len(), 1);
        assert!(assets.keyframes[0].thumbnail_url.is_none());
        assert!(assets.failures.is_empty());
    }

    #[tokio::test]
    async fn config_error_aborts_the_batch() {
        let mut store = FakeStore::new();
        store.config_broken = true;
        let publisher = AssetPublisher::new(Arc::new(store));
        let job_id = JobId::from_string("job-1");

        let result = publisher
            .publish_keyframes("owner-a", &job_id, &[frame(30, false)])
            .await;

        assert!(matches!(result, Err(StorageError::ConfigError(_))));
    }

    #[tokio::test]
    async fn transcript_and_analysis_keys() {
        let publisher = AssetPublisher::new(Arc::new(FakeStore::new()));
        let job_id = JobId::from_string("job-9");

        let transcript = publisher
            .publish_transcript("owner-b", &job_id, "hello world")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(transcript.key, "owner-b/job-9/transcript.txt");

        let content = AiContent {
            summary: vidnote_models::Summary {
                text: "A short summary".into(),
                key_points: vec![],
                topics: vec![],
                difficulty: vidnote_models::Difficulty::Beginner,
                estimated_read_minutes: 1,
            },
            keyframe_intervals: vec![],
            tags: vec![],
            categories: vec![],
        };
        let analysis = publisher
            .publish_analysis("owner-b", &job_id, &content)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(analysis.key, "owner-b/job-9/analysis.json");
    }

    #[tokio::test]
    async fn failed_transcript_upload_is_soft() {
        let store = FakeStore::failing(&["owner-b/job-9/transcript.txt"]);
        let publisher = AssetPublisher::new(Arc::new(store));
        let job_id = JobId::from_string("job-9");

        let result = publisher
            .publish_transcript("owner-b", &job_id, "hello")
            .await
            .unwrap();
        assert!(result.is_none());
    }
}
