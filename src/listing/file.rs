//! File-backed lister for running without a cluster.
//!
//! The snapshot file is re-read on every call, so editing it between cycles
//! changes the published values.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

use super::{ListError, ResourceLister};
use crate::resource::{LabelSelector, ResourceItem, ResourceKind};

/// On-disk snapshot layout (YAML or JSON).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SnapshotFile {
    #[serde(default)]
    pub cluster_deployments: Vec<ResourceItem>,
    #[serde(default)]
    pub jobs: Vec<ResourceItem>,
}

impl SnapshotFile {
    pub fn items(&self, kind: ResourceKind) -> &[ResourceItem] {
        match kind {
            ResourceKind::ClusterDeployment => &self.cluster_deployments,
            ResourceKind::Job => &self.jobs,
        }
    }

    /// Parses by file extension; anything other than `.json` is YAML.
    ///
    /// The read runs on tokio's blocking pool, so a caller's timeout still
    /// fires when the path never yields data (a FIFO, a hung mount).
    pub async fn load(path: &Path) -> Result<Self, ListError> {
        let snapshot_err = |message: String| ListError::Snapshot {
            path: path.display().to_string(),
            message,
        };

        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| snapshot_err(e.to_string()))?;

        match path.extension().and_then(|s| s.to_str()) {
            Some("json") => serde_json::from_str(&content).map_err(|e| snapshot_err(e.to_string())),
            _ => serde_yaml::from_str(&content).map_err(|e| snapshot_err(e.to_string())),
        }
    }
}

/// Serves listings from a snapshot file.
#[derive(Debug, Clone)]
pub struct FileLister {
    path: PathBuf,
}

impl FileLister {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl ResourceLister for FileLister {
    async fn list(
        &self,
        kind: ResourceKind,
        selector: Option<&LabelSelector>,
    ) -> Result<Vec<ResourceItem>, ListError> {
        let snapshot = SnapshotFile::load(&self.path).await?;
        let items: Vec<ResourceItem> = snapshot
            .items(kind)
            .iter()
            .filter(|item| selector.is_none_or(|s| s.matches(item)))
            .cloned()
            .collect();

        debug!(
            "Loaded {} {} item(s) from {}",
            items.len(),
            kind,
            self.path.display()
        );
        Ok(items)
    }

    fn describe(&self) -> String {
        format!("snapshot file {}", self.path.display())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::INSTALL_JOB_LABEL;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const SNAPSHOT_YAML: &str = r#"
cluster_deployments:
  - name: cd-1
    namespace: team-a
    installed: true
  - name: cd-2
jobs:
  - name: cd-1-install
    labels:
      hive.openshift.io/install: "true"
  - name: cd-2-uninstall
    labels:
      hive.openshift.io/uninstall: "true"
"#;

    fn write_snapshot(suffix: &str, content: &str) -> NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[tokio::test]
    async fn lists_all_items_of_kind() {
        let file = write_snapshot(".yaml", SNAPSHOT_YAML);
        let lister = FileLister::new(file.path());

        let cds = lister
            .list(ResourceKind::ClusterDeployment, None)
            .await
            .unwrap();
        assert_eq!(cds.len(), 2);
        assert!(cds[0].installed);
        assert!(!cds[1].installed);
    }

    #[tokio::test]
    async fn selector_filters_locally() {
        let file = write_snapshot(".yaml", SNAPSHOT_YAML);
        let lister = FileLister::new(file.path());
        let selector = LabelSelector::new(INSTALL_JOB_LABEL, "true");

        let jobs = lister
            .list(ResourceKind::Job, Some(&selector))
            .await
            .unwrap();
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].name, "cd-1-install");
    }

    #[tokio::test]
    async fn json_snapshot_with_missing_section() {
        let file = write_snapshot(".json", r#"{"cluster_deployments": [{"name": "x"}]}"#);
        let lister = FileLister::new(file.path());

        let jobs = lister.list(ResourceKind::Job, None).await.unwrap();
        assert!(jobs.is_empty());
    }

    #[tokio::test]
    async fn missing_file_is_a_list_error() {
        let lister = FileLister::new("/nonexistent/hive-snapshot.yaml");
        let err = lister
            .list(ResourceKind::ClusterDeployment, None)
            .await
            .unwrap_err();
        assert!(matches!(err, ListError::Snapshot { .. }));
    }

    #[tokio::test]
    async fn malformed_file_is_a_list_error() {
        let file = write_snapshot(".yaml", "cluster_deployments: [name: {");
        let lister = FileLister::new(file.path());
        assert!(lister.list(ResourceKind::Job, None).await.is_err());
    }

    #[cfg(unix)]
    fn make_fifo(dir: &Path) -> PathBuf {
        let path = dir.join("snapshot.yaml");
        let status = std::process::Command::new("mkfifo")
            .arg(&path)
            .status()
            .unwrap();
        assert!(status.success());
        path
    }

    /// Opens and closes a writer so a reader parked on the FIFO sees EOF.
    #[cfg(unix)]
    fn release_fifo(path: &Path) {
        drop(std::fs::OpenOptions::new().write(true).open(path).unwrap());
    }

    #[cfg(unix)]
    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn blocked_snapshot_read_yields_to_timeout() {
        let dir = tempfile::tempdir().unwrap();
        let fifo = make_fifo(dir.path());
        let lister = FileLister::new(&fifo);

        let result = tokio::time::timeout(
            std::time::Duration::from_millis(200),
            lister.list(ResourceKind::ClusterDeployment, None),
        )
        .await;

        assert!(result.is_err());
        release_fifo(&fifo);
    }
}
