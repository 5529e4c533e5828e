//! Shared helpers for the `palisade` binary.

use palisade_core::{RejectReason, ValidationVerdict};
use tracing_subscriber::{
    fmt::format::Format, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter,
};

/// File accepted (or dry run passed).
pub const EXIT_ACCEPTED: u8 = 0;
/// Content or name rejected; retrying the same upload will not help.
pub const EXIT_REJECTED: u8 = 1;
/// Storage or timeout failure; the upload may succeed on retry.
pub const EXIT_RETRYABLE: u8 = 2;
/// Bad configuration, unreadable input or other setup failure.
pub const EXIT_SETUP_ERROR: u8 = 3;

/// Process exit status for a rejection.
pub fn exit_code_for(reason: RejectReason) -> u8 {
    if reason.is_content_failure() {
        EXIT_REJECTED
    } else {
        EXIT_RETRYABLE
    }
}

/// Process exit status for a verdict.
pub fn verdict_exit_code(verdict: &ValidationVerdict) -> u8 {
    match verdict.reason() {
        None => EXIT_ACCEPTED,
        Some(reason) => exit_code_for(reason),
    }
}

/// Initialize tracing for the CLI. Logs go to stderr so stdout stays valid JSON.
pub fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| "palisade=info".into());

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .event_format(Format::default().compact().with_target(false))
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}
