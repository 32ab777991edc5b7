//! Resource model shared by the listers and the calculator.
//!
//! Items are a flattened view of cluster objects: just the fields the
//! aggregation predicates look at.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Label marking a Job as a Hive install job.
pub const INSTALL_JOB_LABEL: &str = "hive.openshift.io/install";

/// Label marking a Job as a Hive uninstall job. Reserved, not aggregated.
pub const UNINSTALL_JOB_LABEL: &str = "hive.openshift.io/uninstall";

/// Categories of cluster objects the calculator knows how to list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    ClusterDeployment,
    Job,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 2] = [ResourceKind::ClusterDeployment, ResourceKind::Job];

    /// API group, empty for the core group.
    pub fn group(&self) -> &'static str {
        match self {
            ResourceKind::ClusterDeployment => "hive.openshift.io",
            ResourceKind::Job => "batch",
        }
    }

    pub fn version(&self) -> &'static str {
        "v1"
    }

    /// Kind name as it appears in manifests.
    pub fn kind_name(&self) -> &'static str {
        match self {
            ResourceKind::ClusterDeployment => "ClusterDeployment",
            ResourceKind::Job => "Job",
        }
    }

    pub fn plural(&self) -> &'static str {
        match self {
            ResourceKind::ClusterDeployment => "clusterdeployments",
            ResourceKind::Job => "jobs",
        }
    }

    /// Short label value used in logs and telemetry.
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::ClusterDeployment => "cluster_deployment",
            ResourceKind::Job => "job",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Equality-based label selector (`key=value`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelSelector {
    pub key: String,
    pub value: String,
}

impl LabelSelector {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    /// True when the item carries `key` with exactly `value`.
    pub fn matches(&self, item: &ResourceItem) -> bool {
        item.labels.get(&self.key).is_some_and(|v| v == &self.value)
    }
}

impl fmt::Display for LabelSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.key, self.value)
    }
}

/// One listed object, reduced to what the predicates need.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceItem {
    pub name: String,
    #[serde(default)]
    pub namespace: Option<String>,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    /// `status.installed` for ClusterDeployments; always false for Jobs.
    #[serde(default)]
    pub installed: bool,
}

impl ResourceItem {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }

    pub fn installed(mut self, installed: bool) -> Self {
        self.installed = installed;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selector_matches_exact_value_only() {
        let selector = LabelSelector::new(INSTALL_JOB_LABEL, "true");

        let yes = ResourceItem::new("a").with_label(INSTALL_JOB_LABEL, "true");
        let no = ResourceItem::new("b").with_label(INSTALL_JOB_LABEL, "false");
        let other = ResourceItem::new("c").with_label(UNINSTALL_JOB_LABEL, "true");
        let bare = ResourceItem::new("d");

        assert!(selector.matches(&yes));
        assert!(!selector.matches(&no));
        assert!(!selector.matches(&other));
        assert!(!selector.matches(&bare));
    }

    #[test]
    fn selector_renders_as_api_string() {
        let selector = LabelSelector::new(INSTALL_JOB_LABEL, "true");
        assert_eq!(selector.to_string(), "hive.openshift.io/install=true");
    }

    #[test]
    fn kind_api_coordinates() {
        assert_eq!(ResourceKind::ClusterDeployment.group(), "hive.openshift.io");
        assert_eq!(ResourceKind::ClusterDeployment.plural(), "clusterdeployments");
        assert_eq!(ResourceKind::Job.group(), "batch");
        assert_eq!(ResourceKind::Job.kind_name(), "Job");
    }

    #[test]
    fn item_deserializes_with_defaults() {
        let item: ResourceItem = serde_yaml::from_str("name: cd-1\n").unwrap();
        assert_eq!(item.name, "cd-1");
        assert!(!item.installed);
        assert!(item.labels.is_empty());
        assert!(item.namespace.is_none());
    }
}
