//! Connection configuration and target resolution.
//!
//! A [`ConnectionConfig`] carries either a composite connection string or the
//! discrete parts of one. A composite string, when present, is authoritative and
//! the discrete fields are ignored entirely.
//!
//! # Environment
//!
//! [`ConnectionConfig::from_env`] reads these variables, after loading a `.env`
//! file if one exists:
//!
//! ```text
//! DB_URI     composite connection string, e.g. mongodb://user:pw@host:27017/app
//! DB_SCHEME  scheme for the discrete form, e.g. mongodb
//! DB_USER    user name
//! DB_PW      password
//! DB_HOST    host name
//! DB_PORT    port (optional)
//! DB_OPTS    raw query options, e.g. authSource=admin&tls=true
//! DB_NAME    database name
//! ```
//!
//! # TOML
//!
//! ```toml
//! scheme = "mongodb"
//! user = "app"
//! password = "secret"
//! host = "localhost"
//! port = 27017
//! name = "app"
//! ```

use serde::{Deserialize, Serialize};
use std::{env, fmt, path::Path};
use url::Url;

use crate::error::{DocumentStoreError, DocumentStoreResult};

pub const DB_URI: &str = "DB_URI";
pub const DB_SCHEME: &str = "DB_SCHEME";
pub const DB_USER: &str = "DB_USER";
pub const DB_PW: &str = "DB_PW";
pub const DB_HOST: &str = "DB_HOST";
pub const DB_PORT: &str = "DB_PORT";
pub const DB_OPTS: &str = "DB_OPTS";
pub const DB_NAME: &str = "DB_NAME";

/// Where to connect, as either a composite string or its discrete parts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    /// Composite connection string; wins over every other field when set.
    pub uri: Option<String>,
    pub scheme: String,
    pub user: String,
    pub password: String,
    pub host: String,
    pub port: Option<u16>,
    /// Raw query string appended to the URL, without the leading `?`.
    pub options: String,
    /// Database name.
    pub name: String,
}

impl ConnectionConfig {
    /// Configuration consisting of a single composite connection string.
    pub fn from_uri(uri: impl Into<String>) -> Self {
        Self { uri: Some(uri.into()), ..Self::default() }
    }

    pub fn builder() -> ConnectionConfigBuilder {
        ConnectionConfigBuilder::default()
    }

    /// Reads the `DB_*` environment variables, loading `.env` first if present.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::Config`] if `DB_PORT` is set but not a port number.
    pub fn from_env() -> DocumentStoreResult<Self> {
        if let Err(e) = dotenvy::dotenv() {
            if !e.not_found() {
                return Err(DocumentStoreError::Config(e.to_string()));
            }
        }

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary variable source.
    ///
    /// Unset variables are treated as empty, except `DB_URI` and `DB_PORT`
    /// which stay absent.
    pub fn from_lookup<F>(lookup: F) -> DocumentStoreResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let port = match lookup(DB_PORT) {
            Some(raw) => Some(raw.trim().parse::<u16>().map_err(|e| {
                DocumentStoreError::Config(format!("{DB_PORT} {raw:?} is not a valid port: {e}"))
            })?),
            None => None,
        };

        Ok(Self {
            uri: lookup(DB_URI),
            scheme: lookup(DB_SCHEME).unwrap_or_default(),
            user: lookup(DB_USER).unwrap_or_default(),
            password: lookup(DB_PW).unwrap_or_default(),
            host: lookup(DB_HOST).unwrap_or_default(),
            port,
            options: lookup(DB_OPTS).unwrap_or_default(),
            name: lookup(DB_NAME).unwrap_or_default(),
        })
    }

    /// Loads the configuration from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> DocumentStoreResult<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            DocumentStoreError::Config(format!("{}: {e}", path.as_ref().display()))
        })?;

        Self::from_toml(&content)
    }

    /// Parses the configuration from TOML text.
    pub fn from_toml(content: &str) -> DocumentStoreResult<Self> {
        toml::from_str(content).map_err(|e| DocumentStoreError::Config(e.to_string()))
    }

    /// Resolves the configuration into a connection URL and database name.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::Config`] if the composite string is not a
    /// valid URI, the discrete parts do not form one, or no database name can be
    /// derived.
    pub fn resolve_target(&self) -> DocumentStoreResult<ConnectionTarget> {
        match &self.uri {
            Some(uri) => Self::resolve_uri(uri),
            None => self.resolve_parts(),
        }
    }

    fn resolve_uri(uri: &str) -> DocumentStoreResult<ConnectionTarget> {
        let invalid = |reason: &str| {
            DocumentStoreError::Config(format!("invalid connection string: {reason}"))
        };

        let (scheme, rest) = uri.split_once("://").ok_or_else(|| invalid("missing scheme"))?;
        let valid_scheme = scheme.starts_with(|c: char| c.is_ascii_alphabetic())
            && scheme.chars().all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));
        if !valid_scheme {
            return Err(invalid("malformed scheme"));
        }

        let authority_end = rest.find(['/', '?']).unwrap_or(rest.len());
        let authority = &rest[..authority_end];
        if authority.is_empty() || authority.chars().any(char::is_whitespace) {
            return Err(invalid("malformed host list"));
        }

        // The database is the path between the host list and the options.
        let database = rest[authority_end..]
            .strip_prefix('/')
            .map(|path| path.split('?').next().unwrap_or_default())
            .unwrap_or_default();

        ConnectionTarget::new(uri.to_string(), database.to_string())
    }

    fn resolve_parts(&self) -> DocumentStoreResult<ConnectionTarget> {
        let authority = match self.port {
            Some(port) => format!("{}:{}", self.host, port),
            None => self.host.clone(),
        };
        let mut url = Url::parse(&format!("{}://{}/", self.scheme, authority))
            .map_err(|e| DocumentStoreError::Config(format!("invalid connection parts: {e}")))?;

        url.set_username(&self.user)
            .map_err(|_| DocumentStoreError::Config("connection URL cannot carry a user".into()))?;
        if !self.password.is_empty() {
            url.set_password(Some(&self.password)).map_err(|_| {
                DocumentStoreError::Config("connection URL cannot carry a password".into())
            })?;
        }
        url.set_path(&format!("/{}", self.name));
        if !self.options.is_empty() {
            url.set_query(Some(&self.options));
        }

        ConnectionTarget::new(url.into(), self.name.clone())
    }
}

/// Incremental construction of a discrete [`ConnectionConfig`].
#[derive(Debug, Default)]
pub struct ConnectionConfigBuilder {
    config: ConnectionConfig,
}

impl ConnectionConfigBuilder {
    pub fn scheme(mut self, scheme: impl Into<String>) -> Self {
        self.config.scheme = scheme.into();
        self
    }

    pub fn credentials(mut self, user: impl Into<String>, password: impl Into<String>) -> Self {
        self.config.user = user.into();
        self.config.password = password.into();
        self
    }

    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.config.host = host.into();
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.config.port = Some(port);
        self
    }

    pub fn options(mut self, options: impl Into<String>) -> Self {
        self.config.options = options.into();
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.config.name = name.into();
        self
    }

    pub fn build(self) -> ConnectionConfig {
        self.config
    }
}

/// A resolved connection string and the database to use on it.
///
/// The connection string is kept verbatim so drivers receive every host of a
/// multi-host or replica-set string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionTarget {
    connection_string: String,
    database: String,
}

impl ConnectionTarget {
    fn new(connection_string: String, database: String) -> DocumentStoreResult<Self> {
        if database.is_empty() {
            return Err(DocumentStoreError::Config(
                "no database name could be derived from the configuration".into(),
            ));
        }

        Ok(Self { connection_string, database })
    }

    pub fn connection_string(&self) -> &str {
        &self.connection_string
    }

    pub fn scheme(&self) -> &str {
        self.connection_string
            .split_once("://")
            .map_or("", |(scheme, _)| scheme)
    }

    /// The `host[:port]` entries of the connection string, in order.
    pub fn hosts(&self) -> Vec<&str> {
        let authority = self.authority();
        let hosts = authority.rsplit_once('@').map_or(authority, |(_, hosts)| hosts);

        hosts.split(',').collect()
    }

    pub fn database(&self) -> &str {
        &self.database
    }

    /// The connection string with any password masked, safe for logs.
    pub fn redacted(&self) -> String {
        let authority = self.authority();
        let Some((user_info, hosts)) = authority.rsplit_once('@') else {
            return self.connection_string.clone();
        };
        let Some((user, _)) = user_info.split_once(':') else {
            return self.connection_string.clone();
        };

        let prefix_len = self.scheme().len() + "://".len();
        format!(
            "{}{user}:xxxxx@{hosts}{}",
            &self.connection_string[..prefix_len],
            &self.connection_string[prefix_len + authority.len()..],
        )
    }

    fn authority(&self) -> &str {
        let rest = self
            .connection_string
            .split_once("://")
            .map_or(self.connection_string.as_str(), |(_, rest)| rest);

        rest.find(['/', '?']).map_or(rest, |end| &rest[..end])
    }
}

impl fmt::Display for ConnectionTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.redacted())
    }
}
