// External crates
use anyhow::{Context, Result};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

// Internal imports
use osnap_client::OvirtClient;
use osnap_config::{ConfigLoader, RunMode};
use osnap_core::OsnapError;
use osnap_core::{
    osnap_error, osnap_error_with_details, osnap_println, osnap_success, osnap_warning,
};
use osnap_logging::LogSettings;
use osnap_messages::{msg, MESSAGES};
use osnap_snapshot::{Coordinator, RunReport, VmFailure};

// Local modules
mod cli;

use cli::Args;

const EXIT_SETUP: i32 = 1;
const EXIT_PARTIAL: i32 = 2;

#[tokio::main]
async fn main() {
    let args = Args::parse();

    if args.version {
        osnap_println!(
            "{}",
            msg!(MESSAGES.common.version_banner, version = env!("CARGO_PKG_VERSION"))
        );
        return;
    }

    let log_guard = osnap_logging::init_subscriber(&LogSettings::from_env(args.debug));

    let code = match run(args).await {
        Ok(report) => {
            print_summary(&report);
            if report.is_success() {
                0
            } else {
                EXIT_PARTIAL
            }
        }
        Err(e) => {
            let is_setup = e
                .downcast_ref::<OsnapError>()
                .is_some_and(OsnapError::is_setup);
            let template = if is_setup {
                MESSAGES.common.error_setup
            } else {
                MESSAGES.common.error_generic
            };
            osnap_error!("{}", msg!(template, error = format!("{:#}", e)));
            EXIT_SETUP
        }
    };

    // `process::exit` skips destructors; flush the file appender first.
    drop(log_guard);
    std::process::exit(code);
}

async fn run(args: Args) -> Result<RunReport> {
    let settings = ConfigLoader::new(args.config.clone())
        .resolve(args.overrides())
        .context("Failed to load configuration")?;
    debug!(api_url = %settings.api.url, user = %settings.api.username, "Resolved settings");

    let client = OvirtClient::new(&settings.api)?;

    let cancel = CancellationToken::new();
    let coordinator = Coordinator::new(&client, &settings.run, cancel.clone())?;

    let signal_token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            osnap_warning!("{}", MESSAGES.run.cancel_requested);
            signal_token.cancel();
        }
    });

    info!(mode = settings.run.mode.as_str(), keep = settings.run.keep, "Starting osnap");
    Ok(coordinator.run().await?)
}

fn print_summary(report: &RunReport) {
    if report.selected == 0 {
        osnap_println!("{}", MESSAGES.run.no_vms_selected);
        return;
    }

    let messages = &MESSAGES.run;
    osnap_println!("{}", msg!(messages.summary_header, mode = report.mode.as_str()));
    osnap_println!("{}", msg!(messages.summary_selected, count = report.selected));
    if report.mode == RunMode::Normal {
        osnap_println!("{}", msg!(messages.summary_snapshotted, count = report.snapshotted));
    }
    osnap_println!("{}", msg!(messages.summary_purged, count = report.purged_clean));
    osnap_println!("{}", msg!(messages.summary_deleted, count = report.deleted));
    osnap_println!();

    if !report.failures.is_empty() {
        let lines: Vec<String> = report.failures.iter().map(failure_line).collect();
        osnap_error_with_details!(
            msg!(messages.summary_failures_header, count = report.failures.len()),
            lines
        );
    }

    if report.is_success() {
        osnap_success!("{}", msg!(messages.run_succeeded, count = report.selected));
    } else {
        osnap_error!("{}", messages.run_failed);
    }
}

fn failure_line(failure: &VmFailure) -> String {
    match &failure.snapshot_id {
        Some(snapshot) => msg!(
            MESSAGES.run.summary_failure_line_snapshot,
            vm = &failure.vm_name,
            operation = failure.operation,
            snapshot = snapshot,
            detail = &failure.detail
        ),
        None => msg!(
            MESSAGES.run.summary_failure_line,
            vm = &failure.vm_name,
            operation = failure.operation,
            detail = &failure.detail
        ),
    }
}
