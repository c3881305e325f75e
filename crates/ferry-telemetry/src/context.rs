//! Span helpers for the process and for individual transfer jobs.
//!
//! # Design
//! - A process-wide `app` span carries the run mode and build SHA.
//! - Each job task runs inside a `job` span so nested logs inherit `job_id`.

use std::fmt::Display;

use tracing::{Span, span::Entered};

use crate::init::build_sha;

/// Guard that keeps the application-level span entered for the lifetime of the process.
pub struct GlobalContextGuard {
    _guard: Entered<'static>,
}

impl GlobalContextGuard {
    #[must_use]
    /// Enter the `app` span; `mode` names the entry point (`service`, `cli`).
    pub fn new(mode: impl Into<String>) -> Self {
        let mode = mode.into();
        let span: &'static Span = Box::leak(Box::new(tracing::info_span!(
            "app",
            service = "ferry",
            mode = %mode,
            build_sha = %build_sha()
        )));
        Self {
            _guard: span.enter(),
        }
    }
}

/// Record the current run mode on the active span.
pub fn record_app_mode(mode: &str) {
    Span::current().record("mode", tracing::field::display(mode));
}

/// Span wrapping the lifetime of one transfer job.
#[must_use]
pub fn job_span(job_id: impl Display, source: &str) -> Span {
    tracing::info_span!("job", job_id = %job_id, source = %source)
}
