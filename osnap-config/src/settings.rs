use std::time::Duration;

use osnap_core::error::{OsnapError, Result};
use url::Url;

use crate::file::FileConfig;

pub const DEFAULT_API_URL: &str = "https://localhost/ovirt-engine/api/";
pub const DEFAULT_API_USER: &str = "user@internal";
pub const DEFAULT_API_TIMEOUT: Duration = Duration::from_secs(60);
pub const DEFAULT_DESCRIPTION: &str = "oSnap generated snapshot";
pub const DEFAULT_KEEP: usize = 7;
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(30);

/// Environment variable holding the API password, so it stays out of `ps`.
pub const PASSWORD_ENV: &str = "OSNAP_API_PASS";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// Create, wait for, then purge.
    Normal,
    /// Only apply retention to the selected VMs.
    PurgeOnly,
}

impl RunMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunMode::Normal => "normal",
            RunMode::PurgeOnly => "purge-only",
        }
    }
}

/// How snapshot jobs are polled. `max_wait: None` waits forever.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    pub max_wait: Option<Duration>,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            max_wait: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfig {
    pub url: Url,
    pub username: String,
    pub password: String,
    pub insecure_cert: bool,
    pub timeout: Duration,
    /// Log every request and response status.
    pub debug: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionConfig {
    pub cluster: Option<String>,
    pub include: Option<String>,
    pub exclude: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfig {
    pub selection: SelectionConfig,
    pub description: String,
    pub keep: usize,
    pub mode: RunMode,
    pub poll: PollPolicy,
    /// Upper bound on concurrent create/purge calls. `None` lets the runner pick.
    pub concurrency: Option<usize>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            selection: SelectionConfig::default(),
            description: DEFAULT_DESCRIPTION.to_string(),
            keep: DEFAULT_KEEP,
            mode: RunMode::Normal,
            poll: PollPolicy::default(),
            concurrency: None,
        }
    }
}

/// Values given on the command line. They win over everything else.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub api_url: Option<String>,
    pub api_user: Option<String>,
    pub api_pass: Option<String>,
    pub api_insecure_cert: bool,
    pub api_timeout_secs: Option<u64>,
    pub cluster: Option<String>,
    pub vm: Option<String>,
    pub skip: Option<String>,
    pub description: Option<String>,
    pub keep: Option<usize>,
    pub purge_only: bool,
    pub poll_interval_secs: Option<u64>,
    pub max_wait_secs: Option<u64>,
    pub concurrency: Option<usize>,
    pub debug: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub api: ApiConfig,
    pub run: RunConfig,
}

impl Settings {
    /// Merges the layers and validates the result.
    pub fn resolve(
        file: FileConfig,
        overrides: ConfigOverrides,
        env_password: Option<String>,
    ) -> Result<Self> {
        let url_text = overrides
            .api_url
            .or(file.api.url)
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());
        let url = parse_api_url(&url_text)?;

        let timeout_secs = overrides.api_timeout_secs.or(file.api.timeout_secs);
        let timeout = match timeout_secs {
            Some(0) => {
                return Err(OsnapError::Config(
                    "API timeout must be greater than zero".to_string(),
                ))
            }
            Some(secs) => Duration::from_secs(secs),
            None => DEFAULT_API_TIMEOUT,
        };

        let api = ApiConfig {
            url,
            username: overrides
                .api_user
                .or(file.api.user)
                .unwrap_or_else(|| DEFAULT_API_USER.to_string()),
            password: overrides
                .api_pass
                .or(env_password)
                .or(file.api.password)
                .unwrap_or_default(),
            insecure_cert: overrides.api_insecure_cert || file.api.insecure_cert.unwrap_or(false),
            timeout,
            debug: overrides.debug,
        };

        let description = overrides
            .description
            .or(file.description)
            .unwrap_or_else(|| DEFAULT_DESCRIPTION.to_string());
        if description.trim().is_empty() {
            return Err(OsnapError::Config(
                "Snapshot description must not be empty".to_string(),
            ));
        }

        let interval = match overrides.poll_interval_secs.or(file.poll_interval_secs) {
            Some(0) => {
                return Err(OsnapError::Config(
                    "Poll interval must be greater than zero".to_string(),
                ))
            }
            Some(secs) => Duration::from_secs(secs),
            None => DEFAULT_POLL_INTERVAL,
        };
        let max_wait = match overrides.max_wait_secs.or(file.max_wait_secs) {
            Some(0) => {
                return Err(OsnapError::Config(
                    "Maximum wait must be greater than zero".to_string(),
                ))
            }
            other => other.map(Duration::from_secs),
        };

        let concurrency = overrides.concurrency.or(file.concurrency);
        if concurrency == Some(0) {
            return Err(OsnapError::Config(
                "Concurrency must be at least 1".to_string(),
            ));
        }

        let purge_only = overrides.purge_only || file.purge_only.unwrap_or(false);

        let run = RunConfig {
            selection: SelectionConfig {
                cluster: non_empty(overrides.cluster.or(file.cluster)),
                include: non_empty(overrides.vm.or(file.vm)),
                exclude: non_empty(overrides.skip.or(file.skip)),
            },
            description,
            keep: overrides.keep.or(file.keep).unwrap_or(DEFAULT_KEEP),
            mode: if purge_only {
                RunMode::PurgeOnly
            } else {
                RunMode::Normal
            },
            poll: PollPolicy { interval, max_wait },
            concurrency,
        };

        Ok(Self { api, run })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}

/// Parses the endpoint and makes sure it ends in `/` so relative joins keep
/// the `/ovirt-engine/api` prefix.
fn parse_api_url(text: &str) -> Result<Url> {
    let mut url = Url::parse(text)
        .map_err(|e| OsnapError::Config(format!("Invalid API URL '{}': {}", text, e)))?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(OsnapError::Config(format!(
            "API URL must use http or https, got '{}'",
            url.scheme()
        )));
    }

    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }

    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::file::ApiFileConfig;

    #[test]
    fn test_defaults() {
        let settings =
            Settings::resolve(FileConfig::default(), ConfigOverrides::default(), None).unwrap();
        assert_eq!(settings.api.url.as_str(), DEFAULT_API_URL);
        assert_eq!(settings.api.username, DEFAULT_API_USER);
        assert_eq!(settings.api.password, "");
        assert!(!settings.api.insecure_cert);
        assert_eq!(settings.api.timeout, DEFAULT_API_TIMEOUT);
        assert_eq!(settings.run, RunConfig::default());
    }

    #[test]
    fn test_cli_beats_env_beats_file() {
        let file = FileConfig {
            api: ApiFileConfig {
                password: Some("from-file".into()),
                user: Some("file-user@internal".into()),
                ..Default::default()
            },
            keep: Some(3),
            description: Some("file description".into()),
            ..Default::default()
        };

        let settings = Settings::resolve(
            file.clone(),
            ConfigOverrides::default(),
            Some("from-env".into()),
        )
        .unwrap();
        assert_eq!(settings.api.password, "from-env");
        assert_eq!(settings.api.username, "file-user@internal");
        assert_eq!(settings.run.keep, 3);
        assert_eq!(settings.run.description, "file description");

        let overrides = ConfigOverrides {
            api_pass: Some("from-cli".into()),
            keep: Some(0),
            ..Default::default()
        };
        let settings = Settings::resolve(file, overrides, Some("from-env".into())).unwrap();
        assert_eq!(settings.api.password, "from-cli");
        assert_eq!(settings.run.keep, 0);
    }

    #[test]
    fn test_empty_filters_are_unset() {
        let overrides = ConfigOverrides {
            cluster: Some(String::new()),
            vm: Some("  ".into()),
            skip: Some("-test$".into()),
            ..Default::default()
        };
        let settings = Settings::resolve(FileConfig::default(), overrides, None).unwrap();
        assert_eq!(settings.run.selection.cluster, None);
        assert_eq!(settings.run.selection.include, None);
        assert_eq!(settings.run.selection.exclude.as_deref(), Some("-test$"));
    }

    #[test]
    fn test_purge_only_from_either_layer() {
        let file = FileConfig {
            purge_only: Some(true),
            ..Default::default()
        };
        let settings = Settings::resolve(file, ConfigOverrides::default(), None).unwrap();
        assert_eq!(settings.run.mode, RunMode::PurgeOnly);

        let overrides = ConfigOverrides {
            purge_only: true,
            ..Default::default()
        };
        let settings = Settings::resolve(FileConfig::default(), overrides, None).unwrap();
        assert_eq!(settings.run.mode, RunMode::PurgeOnly);
    }

    #[test]
    fn test_poll_policy() {
        let overrides = ConfigOverrides {
            poll_interval_secs: Some(5),
            max_wait_secs: Some(600),
            ..Default::default()
        };
        let settings = Settings::resolve(FileConfig::default(), overrides, None).unwrap();
        assert_eq!(settings.run.poll.interval, Duration::from_secs(5));
        assert_eq!(settings.run.poll.max_wait, Some(Duration::from_secs(600)));
    }

    #[test]
    fn test_zero_values_rejected() {
        for overrides in [
            ConfigOverrides {
                poll_interval_secs: Some(0),
                ..Default::default()
            },
            ConfigOverrides {
                max_wait_secs: Some(0),
                ..Default::default()
            },
            ConfigOverrides {
                concurrency: Some(0),
                ..Default::default()
            },
            ConfigOverrides {
                api_timeout_secs: Some(0),
                ..Default::default()
            },
            ConfigOverrides {
                description: Some(" ".into()),
                ..Default::default()
            },
        ] {
            let err = Settings::resolve(FileConfig::default(), overrides, None).unwrap_err();
            assert!(err.is_setup(), "unexpected error kind: {err}");
        }
    }

    #[test]
    fn test_api_url_validation() {
        let overrides = ConfigOverrides {
            api_url: Some("not a url".into()),
            ..Default::default()
        };
        assert!(Settings::resolve(FileConfig::default(), overrides, None).is_err());

        let overrides = ConfigOverrides {
            api_url: Some("ftp://engine/api".into()),
            ..Default::default()
        };
        assert!(Settings::resolve(FileConfig::default(), overrides, None).is_err());
    }

    #[test]
    fn test_api_url_gets_trailing_slash() {
        let overrides = ConfigOverrides {
            api_url: Some("https://engine.example.com/ovirt-engine/api".into()),
            ..Default::default()
        };
        let settings = Settings::resolve(FileConfig::default(), overrides, None).unwrap();
        assert_eq!(
            settings.api.url.as_str(),
            "https://engine.example.com/ovirt-engine/api/"
        );
    }
}
