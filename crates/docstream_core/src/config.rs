//! Store connection configuration.
//!
//! # Responsibility
//! - Parse store URIs into a typed `StoreConfig`.
//! - Validate collection names before they reach storage.
//!
//! Accepted URIs:
//! - `sqlite::memory:` for a private in-memory database;
//! - `sqlite:///absolute/path.db` or `sqlite:relative/path.db` for a file;
//! - an optional `?collection=<name>` query on either form.

use once_cell::sync::Lazy;
use regex::Regex;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;
use std::str::FromStr;
use url::Url;

/// Scheme accepted by `StoreConfig::parse`.
pub const STORE_SCHEME: &str = "sqlite";

/// Collection used when the URI names none.
pub const DEFAULT_COLLECTION: &str = "records";

const MEMORY_PATH: &str = ":memory:";
const COLLECTION_OPTION: &str = "collection";

static COLLECTION_NAME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_.\-]{0,63}$").expect("valid collection name regex")
});

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Errors raised while parsing a store URI.
#[derive(Debug)]
pub enum ConfigError {
    /// The URI is not syntactically valid.
    InvalidUri { uri: String, message: String },
    /// The URI uses a scheme other than `sqlite`.
    UnsupportedScheme(String),
    /// The URI names a remote host.
    RemoteHost(String),
    /// The URI has no database path.
    MissingPath,
    /// The collection name is empty or has unsupported characters.
    InvalidCollection(String),
    /// The URI carries a query option this crate does not know.
    UnsupportedOption(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidUri { uri, message } => write!(f, "invalid store uri `{uri}`: {message}"),
            Self::UnsupportedScheme(scheme) => write!(
                f,
                "unsupported store scheme `{scheme}`; expected `{STORE_SCHEME}`"
            ),
            Self::RemoteHost(host) => write!(f, "remote store host `{host}` is not supported"),
            Self::MissingPath => write!(f, "store uri has no database path"),
            Self::InvalidCollection(name) => write!(f, "invalid collection name `{name}`"),
            Self::UnsupportedOption(option) => write!(f, "unsupported store option `{option}`"),
        }
    }
}

impl Error for ConfigError {}

/// Where the database lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreLocation {
    Memory,
    File(PathBuf),
}

/// Parsed store connection settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    pub location: StoreLocation,
    pub collection: String,
}

impl StoreConfig {
    pub fn in_memory() -> Self {
        Self {
            location: StoreLocation::Memory,
            collection: DEFAULT_COLLECTION.to_string(),
        }
    }

    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self {
            location: StoreLocation::File(path.into()),
            collection: DEFAULT_COLLECTION.to_string(),
        }
    }

    /// Replaces the collection after validating its name.
    pub fn with_collection(mut self, collection: &str) -> ConfigResult<Self> {
        self.collection = validate_collection(collection)?;
        Ok(self)
    }

    /// Parses a store URI.
    ///
    /// # Errors
    /// - Any `ConfigError` variant; see the module docs for accepted forms.
    pub fn parse(uri: &str) -> ConfigResult<Self> {
        let trimmed = uri.trim();
        let url = Url::parse(trimmed).map_err(|err| ConfigError::InvalidUri {
            uri: trimmed.to_string(),
            message: err.to_string(),
        })?;

        if url.scheme() != STORE_SCHEME {
            return Err(ConfigError::UnsupportedScheme(url.scheme().to_string()));
        }

        match url.host_str() {
            None | Some("") | Some("localhost") => {}
            Some(host) => return Err(ConfigError::RemoteHost(host.to_string())),
        }

        let location = match url.path() {
            "" | "/" => return Err(ConfigError::MissingPath),
            MEMORY_PATH => StoreLocation::Memory,
            path => StoreLocation::File(
                url.to_file_path()
                    .unwrap_or_else(|()| PathBuf::from(path)),
            ),
        };

        let mut collection = DEFAULT_COLLECTION.to_string();
        for (key, value) in url.query_pairs() {
            if key != COLLECTION_OPTION {
                return Err(ConfigError::UnsupportedOption(key.into_owned()));
            }
            collection = validate_collection(&value)?;
        }

        Ok(Self {
            location,
            collection,
        })
    }
}

impl FromStr for StoreConfig {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::parse(value)
    }
}

fn validate_collection(name: &str) -> ConfigResult<String> {
    let trimmed = name.trim();
    if !COLLECTION_NAME_RE.is_match(trimmed) {
        return Err(ConfigError::InvalidCollection(name.to_string()));
    }
    Ok(trimmed.to_string())
}
