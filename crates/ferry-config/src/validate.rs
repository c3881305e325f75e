//! Validation helpers and parsing utilities for configuration values.

use std::time::Duration;

use url::Url;

use crate::defaults::UPLOAD_REQUEST_LIMIT_BYTES;
use crate::error::{ConfigError, ConfigResult};
use crate::model::{MetadataEndpoint, UploadConfig};

/// Parse an unsigned integer field.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidField`] when the value is not a base-10 integer.
pub fn parse_u64(section: &'static str, field: &'static str, raw: &str) -> ConfigResult<u64> {
    raw.trim()
        .replace('_', "")
        .parse::<u64>()
        .map_err(|_| ConfigError::invalid(section, field, raw, "must_be_integer"))
}

/// Parse a strictly positive integer field.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidField`] when the value is not an integer or is zero.
pub fn parse_positive(section: &'static str, field: &'static str, raw: &str) -> ConfigResult<u64> {
    let value = parse_u64(section, field, raw)?;
    if value == 0 {
        return Err(ConfigError::invalid(section, field, raw, "must_be_positive"));
    }
    Ok(value)
}

/// Parse a positive duration expressed in seconds.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidField`] when the value is not a positive integer.
pub fn parse_secs(section: &'static str, field: &'static str, raw: &str) -> ConfigResult<Duration> {
    parse_positive(section, field, raw).map(Duration::from_secs)
}

/// Parse a positive duration expressed in milliseconds.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidField`] when the value is not a positive integer.
pub fn parse_millis(
    section: &'static str,
    field: &'static str,
    raw: &str,
) -> ConfigResult<Duration> {
    parse_positive(section, field, raw).map(Duration::from_millis)
}

/// Validate an absolute HTTP(S) URL and drop any trailing slash.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidField`] when the value does not parse or uses
/// a scheme other than `http`/`https`.
pub fn parse_http_url(
    section: &'static str,
    field: &'static str,
    raw: &str,
) -> ConfigResult<String> {
    let trimmed = raw.trim();
    let parsed =
        Url::parse(trimmed).map_err(|_| ConfigError::invalid(section, field, raw, "invalid_url"))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(ConfigError::invalid(
            section,
            field,
            raw,
            "unsupported_scheme",
        ));
    }
    Ok(trimmed.trim_end_matches('/').to_string())
}

/// Validate a remote folder path. The store root is the empty string.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidField`] when the path is not absolute.
pub fn parse_folder(section: &'static str, field: &'static str, raw: &str) -> ConfigResult<String> {
    let trimmed = raw.trim();
    if !trimmed.starts_with('/') {
        return Err(ConfigError::invalid(section, field, raw, "must_be_absolute"));
    }
    Ok(trimmed.trim_end_matches('/').to_string())
}

/// Parse a comma-separated extension allow-list into lowercase, dot-less labels.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidField`] when no extension remains.
pub fn parse_extensions(raw: &str) -> ConfigResult<Vec<String>> {
    let extensions: Vec<String> = raw
        .split(',')
        .map(|item| item.trim().trim_start_matches('.').to_ascii_lowercase())
        .filter(|item| !item.is_empty())
        .collect();
    if extensions.is_empty() {
        return Err(ConfigError::invalid(
            "acquisition",
            "allowed_extensions",
            raw,
            "empty",
        ));
    }
    Ok(extensions)
}

/// Parse ranked metadata sources from `name=url` pairs separated by commas.
///
/// An empty string yields no sources.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidField`] when a pair is malformed or its URL is invalid.
pub fn parse_sources(raw: &str) -> ConfigResult<Vec<MetadataEndpoint>> {
    raw.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(|item| {
            let (name, url) = item.split_once('=').ok_or_else(|| {
                ConfigError::invalid("metadata", "sources", item, "expected_name_equals_url")
            })?;
            let name = name.trim();
            if name.is_empty() {
                return Err(ConfigError::invalid(
                    "metadata",
                    "sources",
                    item,
                    "missing_name",
                ));
            }
            Ok(MetadataEndpoint {
                name: name.to_string(),
                url: parse_http_url("metadata", "sources", url)?,
            })
        })
        .collect()
}

/// Accept `json` or `pretty` (case-insensitive).
///
/// # Errors
///
/// Returns [`ConfigError::InvalidField`] for any other value.
pub fn parse_log_format(raw: &str) -> ConfigResult<String> {
    let normalized = raw.trim().to_ascii_lowercase();
    match normalized.as_str() {
        "json" | "pretty" => Ok(normalized),
        _ => Err(ConfigError::invalid(
            "logging",
            "format",
            raw,
            "unknown_format",
        )),
    }
}

/// Cross-field checks for upload tuning.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidField`] when a chunk or direct write would
/// exceed the store's per-request limit.
pub fn validate_upload(upload: &UploadConfig) -> ConfigResult<()> {
    if upload.chunk_bytes > UPLOAD_REQUEST_LIMIT_BYTES {
        return Err(ConfigError::invalid(
            "upload",
            "chunk_bytes",
            &upload.chunk_bytes.to_string(),
            "exceeds_request_limit",
        ));
    }
    if upload.threshold_bytes > UPLOAD_REQUEST_LIMIT_BYTES {
        return Err(ConfigError::invalid(
            "upload",
            "threshold_bytes",
            &upload.threshold_bytes.to_string(),
            "exceeds_request_limit",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integers_accept_digit_separators() {
        assert_eq!(parse_u64("upload", "chunk_bytes", "8_388_608").ok(), Some(8_388_608));
        assert!(matches!(
            parse_positive("upload", "chunk_bytes", "0"),
            Err(ConfigError::InvalidField {
                reason: "must_be_positive",
                ..
            })
        ));
        assert!(matches!(
            parse_u64("upload", "chunk_bytes", "eight"),
            Err(ConfigError::InvalidField {
                reason: "must_be_integer",
                ..
            })
        ));
    }

    #[test]
    fn extensions_are_normalised() {
        let parsed = parse_extensions(" .NSP, xci ,,nsz").expect("extensions");
        assert_eq!(parsed, vec!["nsp", "xci", "nsz"]);
        assert!(parse_extensions(" , ").is_err());
    }

    #[test]
    fn sources_keep_declared_order() {
        let parsed =
            parse_sources("primary=https://a.example/titles.json, backup=http://b.example/")
                .expect("sources");
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0].name, "primary");
        assert_eq!(parsed[1].url, "http://b.example");
        assert!(parse_sources("").expect("empty").is_empty());
    }

    #[test]
    fn malformed_sources_are_rejected() {
        assert!(matches!(
            parse_sources("https://a.example/titles.json"),
            Err(ConfigError::InvalidField {
                reason: "expected_name_equals_url",
                ..
            })
        ));
        assert!(matches!(
            parse_sources("ftp=ftp://a.example/titles.json"),
            Err(ConfigError::InvalidField {
                reason: "unsupported_scheme",
                ..
            })
        ));
    }

    #[test]
    fn folders_must_be_absolute() {
        assert_eq!(parse_folder("store", "root_folder", "/games/").ok(), Some("/games".into()));
        assert_eq!(parse_folder("store", "root_folder", "/").ok(), Some(String::new()));
        assert!(parse_folder("store", "root_folder", "games").is_err());
    }

    #[test]
    fn upload_limits_respect_request_cap() {
        let oversized = UploadConfig {
            threshold_bytes: 10,
            chunk_bytes: UPLOAD_REQUEST_LIMIT_BYTES + 1,
        };
        assert!(validate_upload(&oversized).is_err());
        assert!(validate_upload(&UploadConfig::default()).is_ok());
    }
}
