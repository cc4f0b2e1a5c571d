// CLI argument parsing and definitions

use clap::Parser;
use osnap_config::ConfigOverrides;
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(name = "osnap")]
#[command(about = "Create oVirt VM snapshots and rotate old ones")]
#[command(disable_version_flag = true)]
pub struct Args {
    /// Path to a configuration file (default: ./osnap.yaml, then the user config dir)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// oVirt engine API endpoint [default: https://localhost/ovirt-engine/api/]
    #[arg(long, value_name = "URL")]
    pub api_url: Option<String>,

    /// API user, including the auth domain [default: user@internal]
    #[arg(long, value_name = "USER")]
    pub api_user: Option<String>,

    /// API password. Prefer the OSNAP_API_PASS environment variable
    #[arg(long, value_name = "PASSWORD")]
    pub api_pass: Option<String>,

    /// Accept any TLS certificate from the engine
    #[arg(long)]
    pub api_insecure_cert: bool,

    /// Per-request timeout in seconds [default: 60]
    #[arg(long, value_name = "SECS")]
    pub api_timeout: Option<u64>,

    /// Only snapshot VMs in this cluster
    #[arg(long)]
    pub cluster: Option<String>,

    /// Only snapshot VMs whose name matches this regex
    #[arg(long, value_name = "REGEX")]
    pub vm: Option<String>,

    /// Skip VMs whose name matches this regex
    #[arg(long, value_name = "REGEX")]
    pub skip: Option<String>,

    /// Snapshot description [default: "oSnap generated snapshot"]
    #[arg(long, value_name = "TEXT")]
    pub desc: Option<String>,

    /// Number of tool-created snapshots to keep per VM [default: 7]
    #[arg(long, value_name = "N")]
    pub keep: Option<usize>,

    /// Only delete old snapshots, create none
    #[arg(long)]
    pub purge_only: bool,

    /// Seconds between status polls of a running snapshot [default: 30]
    #[arg(long, value_name = "SECS")]
    pub poll_interval: Option<u64>,

    /// Give up on a snapshot still running after this many seconds [default: wait forever]
    #[arg(long, value_name = "SECS")]
    pub max_wait: Option<u64>,

    /// Maximum VMs processed at once [default: CPU count, 2 to 8]
    #[arg(long, value_name = "N")]
    pub concurrency: Option<usize>,

    /// Log API requests and responses
    #[arg(short, long)]
    pub debug: bool,

    /// Print version information
    #[arg(short = 'V', long)]
    pub version: bool,
}

impl Args {
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            api_url: self.api_url.clone(),
            api_user: self.api_user.clone(),
            api_pass: self.api_pass.clone(),
            api_insecure_cert: self.api_insecure_cert,
            api_timeout_secs: self.api_timeout,
            cluster: self.cluster.clone(),
            vm: self.vm.clone(),
            skip: self.skip.clone(),
            description: self.desc.clone(),
            keep: self.keep,
            purge_only: self.purge_only,
            poll_interval_secs: self.poll_interval,
            max_wait_secs: self.max_wait,
            concurrency: self.concurrency,
            debug: self.debug,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_args_are_consistent() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_flags_map_to_overrides() {
        let args = Args::parse_from([
            "osnap",
            "--api-url",
            "https://engine/ovirt-engine/api",
            "--cluster",
            "prod",
            "--vm",
            "^web",
            "--skip=-test$",
            "--keep",
            "3",
            "--purge-only",
            "--max-wait",
            "900",
        ]);
        let overrides = args.overrides();

        assert_eq!(overrides.api_url.as_deref(), Some("https://engine/ovirt-engine/api"));
        assert_eq!(overrides.cluster.as_deref(), Some("prod"));
        assert_eq!(overrides.vm.as_deref(), Some("^web"));
        assert_eq!(overrides.skip.as_deref(), Some("-test$"));
        assert_eq!(overrides.keep, Some(3));
        assert!(overrides.purge_only);
        assert_eq!(overrides.max_wait_secs, Some(900));
        assert_eq!(overrides.description, None);
    }
}
