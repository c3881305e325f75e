//! Command handlers grouped by concern.

pub(crate) mod catalog;
pub(crate) mod metadata;
pub(crate) mod upload;
