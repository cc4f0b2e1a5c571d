//! Snapshot run messages

pub struct RunMessages {
    // ============================================================================
    // Progress
    // ============================================================================
    pub cancel_requested: &'static str,
    pub no_vms_selected: &'static str,

    // ============================================================================
    // Summary (alphabetically sorted)
    // ============================================================================
    pub summary_deleted: &'static str,
    pub summary_failure_line: &'static str,
    pub summary_failure_line_snapshot: &'static str,
    pub summary_failures_header: &'static str,
    pub summary_header: &'static str,
    pub summary_purged: &'static str,
    pub summary_selected: &'static str,
    pub summary_snapshotted: &'static str,

    // ============================================================================
    // Verdict
    // ============================================================================
    pub run_failed: &'static str,
    pub run_succeeded: &'static str,
}

pub const RUN_MESSAGES: RunMessages = RunMessages {
    cancel_requested: "Interrupt received, finishing in-flight requests...",
    no_vms_selected: "No VMs matched the selection filters, nothing to do",

    summary_deleted: "  Deleted snapshots:  {count}",
    summary_failure_line: "{vm}: {operation} failed - {detail}",
    summary_failure_line_snapshot: "{vm}: {operation} of snapshot {snapshot} failed - {detail}",
    summary_failures_header: "{count} problem(s) reported:",
    summary_header: "\n📋 Run summary ({mode})",
    summary_purged: "  Purged cleanly:     {count}",
    summary_selected: "  Selected VMs:       {count}",
    summary_snapshotted: "  Snapshots created:  {count}",

    run_failed: "One or more errors occurred. See output above for more detail.",
    run_succeeded: "All {count} VM(s) processed successfully",
};
