//! Backup location configuration.
//!
//! A location is exactly one of: a directory on the server filesystem, a
//! directory on the monitored client host, or an S3-compatible bucket. The
//! enum makes "exactly one" structural; [`LocationConfig::validate`] checks
//! the contents of whichever variant is set.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;

/// Discriminant stored alongside the location row.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LocationType {
    Filesystem,
    S3,
    Client,
}

impl LocationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Filesystem => "filesystem",
            Self::S3 => "s3",
            Self::Client => "client",
        }
    }

    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "filesystem" => Ok(Self::Filesystem),
            "s3" => Ok(Self::S3),
            "client" => Ok(Self::Client),
            other => Err(Error::InvalidLocationConfig(format!(
                "unknown location type {other:?}"
            ))),
        }
    }
}

impl fmt::Display for LocationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Directory-backed location (server or client side).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilesystemLocationConfig {
    pub path: String,
}

/// S3-compatible object store location.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct S3LocationConfig {
    pub endpoint: String,
    pub access_key: String,
    pub secret_key: String,
    pub bucket_name: String,
    #[serde(default)]
    pub bucket_region: String,
}

impl fmt::Debug for S3LocationConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("S3LocationConfig")
            .field("endpoint", &self.endpoint)
            .field("access_key", &self.access_key)
            .field("secret_key", &"<redacted>")
            .field("bucket_name", &self.bucket_name)
            .field("bucket_region", &self.bucket_region)
            .finish()
    }
}

/// Validation switches for [`LocationConfig::validate`].
#[derive(Clone, Copy, Debug, Default)]
pub struct LocationValidation {
    /// Require `bucket_region` for S3 locations.
    pub with_bucket_region: bool,
}

/// Configuration of a backup location.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum LocationConfig {
    Filesystem(FilesystemLocationConfig),
    S3(S3LocationConfig),
    Client(FilesystemLocationConfig),
}

impl LocationConfig {
    pub fn location_type(&self) -> LocationType {
        match self {
            Self::Filesystem(_) => LocationType::Filesystem,
            Self::S3(_) => LocationType::S3,
            Self::Client(_) => LocationType::Client,
        }
    }

    pub fn validate(&self, params: LocationValidation) -> Result<()> {
        match self {
            Self::Filesystem(c) | Self::Client(c) => check_filesystem_config(c),
            Self::S3(c) => check_s3_config(c, params.with_bucket_region),
        }
    }
}

fn invalid(msg: impl Into<String>) -> Error {
    Error::InvalidLocationConfig(msg.into())
}

fn check_filesystem_config(c: &FilesystemLocationConfig) -> Result<()> {
    if c.path.is_empty() {
        return Err(invalid("path field is empty"));
    }

    let canonical = clean_path(&c.path);
    if canonical != c.path {
        return Err(invalid(format!(
            "folder is not in canonical format, canonical would be {canonical:?}"
        )));
    }

    if !c.path.starts_with('/') {
        return Err(invalid("folder must be an absolute path"));
    }

    let allowed = |ch: char| ch.is_ascii_alphanumeric() || matches!(ch, '.' | ':' | '/' | '_' | '-');
    if !c.path.chars().all(allowed) {
        return Err(invalid(
            "path may contain only dots, colons, slashes, letters, digits, underscores and dashes",
        ));
    }

    Ok(())
}

fn check_s3_config(c: &S3LocationConfig, with_bucket_region: bool) -> Result<()> {
    if c.endpoint.is_empty() {
        return Err(invalid("S3 endpoint field is empty"));
    }
    if c.access_key.is_empty() {
        return Err(invalid("S3 access_key field is empty"));
    }
    if c.secret_key.is_empty() {
        return Err(invalid("S3 secret_key field is empty"));
    }
    if c.bucket_name.is_empty() {
        return Err(invalid("S3 bucket_name field is empty"));
    }
    if with_bucket_region && c.bucket_region.is_empty() {
        return Err(invalid("S3 bucket_region field is empty"));
    }

    let url = parse_endpoint(&c.endpoint)?;
    if url.host_str().is_none_or(str::is_empty) {
        return Err(invalid("no host found in the endpoint"));
    }
    if !matches!(url.path(), "" | "/") {
        return Err(invalid("path is not allowed for endpoint"));
    }
    if url.query().is_some() {
        return Err(invalid("query is not allowed for endpoint"));
    }
    match url.scheme() {
        "http" | "https" => Ok(()),
        other => Err(invalid(format!("invalid scheme {other:?}"))),
    }
}

/// Parse an S3 endpoint, assuming `https` when no scheme is given.
pub fn parse_endpoint(endpoint: &str) -> Result<Url> {
    // "minio:9000" parses as scheme "minio" with no host
    match Url::parse(endpoint) {
        Ok(url) if url.has_host() => Ok(url),
        _ => Url::parse(&format!("https://{endpoint}")).map_err(|e| invalid(e.to_string())),
    }
}

/// Lexically normalize a slash-separated path.
fn clean_path(path: &str) -> String {
    if path.is_empty() {
        return ".".to_string();
    }
    let rooted = path.starts_with('/');
    let mut parts: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                if parts.last().is_some_and(|p| *p != "..") {
                    parts.pop();
                } else if !rooted {
                    parts.push("..");
                }
            }
            s => parts.push(s),
        }
    }

    let joined = parts.join("/");
    if rooted {
        format!("/{joined}")
    } else if joined.is_empty() {
        ".".to_string()
    } else {
        joined
    }
}
