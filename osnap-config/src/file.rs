use serde::Deserialize;

/// On-disk configuration (`osnap.yaml`). Every field is optional; anything
/// left out falls back to the built-in default.
///
/// ```yaml
/// api:
///   url: https://engine.example.com/ovirt-engine/api/
///   user: admin@internal
///   insecure_cert: false
///   timeout_secs: 60
/// cluster: production
/// vm: "^web"
/// skip: "-test$"
/// description: Nightly snapshot
/// keep: 7
/// poll_interval_secs: 30
/// ```
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub api: ApiFileConfig,
    pub cluster: Option<String>,
    pub vm: Option<String>,
    pub skip: Option<String>,
    pub description: Option<String>,
    pub keep: Option<usize>,
    pub purge_only: Option<bool>,
    pub poll_interval_secs: Option<u64>,
    pub max_wait_secs: Option<u64>,
    pub concurrency: Option<usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ApiFileConfig {
    pub url: Option<String>,
    pub user: Option<String>,
    pub password: Option<String>,
    pub insecure_cert: Option<bool>,
    pub timeout_secs: Option<u64>,
}
