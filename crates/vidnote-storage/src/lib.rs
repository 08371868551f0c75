//! Object storage layer: S3-compatible client and the asset publisher.

pub mod client;
pub mod error;
pub mod publisher;

pub use client::{BlobStore, S3Client, S3Config, UploadedObject};
pub use error::{StorageError, StorageResult};
pub use publisher::{
    AssetPublisher, KeyframeUpload, PublishedArtifact, PublishedAssets, PublishedKeyframe,
};
