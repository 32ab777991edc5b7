//! Resource listing backends.
//!
//! The calculator only depends on the [`ResourceLister`] trait. Two
//! implementations ship with the exporter:
//! - [`KubeLister`]: lists objects from the Kubernetes API server using the
//!   ambient kubeconfig or in-cluster service account.
//! - [`FileLister`]: reads a YAML/JSON snapshot file, for dry runs and demos
//!   without a cluster.

pub mod file;
pub mod kubernetes;

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

use crate::resource::{LabelSelector, ResourceItem, ResourceKind};

pub use self::file::{FileLister, SnapshotFile};
pub use self::kubernetes::KubeLister;

/// Failure to obtain a snapshot for one resource kind.
#[derive(Debug, Error)]
pub enum ListError {
    #[error("listing {kind} failed: {message}")]
    Backend { kind: ResourceKind, message: String },

    #[error("listing {kind} timed out after {timeout:?}")]
    Timeout { kind: ResourceKind, timeout: Duration },

    #[error("snapshot {path} unreadable: {message}")]
    Snapshot { path: String, message: String },
}

impl ListError {
    pub fn backend(kind: ResourceKind, err: impl std::fmt::Display) -> Self {
        ListError::Backend {
            kind,
            message: err.to_string(),
        }
    }
}

/// Capability to enumerate every current object of a kind.
///
/// Implementations return the full snapshot in one call. When a selector is
/// given only matching objects are returned.
#[async_trait]
pub trait ResourceLister: Send + Sync {
    async fn list(
        &self,
        kind: ResourceKind,
        selector: Option<&LabelSelector>,
    ) -> Result<Vec<ResourceItem>, ListError>;

    /// Short backend name for logs.
    fn describe(&self) -> String;
}
