//! Common/shared messages

pub struct CommonMessages {
    pub error_generic: &'static str,
    pub error_setup: &'static str,
    pub version_banner: &'static str,
}

pub const COMMON_MESSAGES: CommonMessages = CommonMessages {
    error_generic: "Error: {error}",
    error_setup: "Setup failed, no VM was touched: {error}",
    version_banner: "oSnap - oVirt Snapshot Creator\nVersion: {version}",
};
