//! Session configuration.

use std::time::Duration;

use tds_protocol::version::TdsVersion;

use crate::error::Error;

/// Default login timeout.
pub const DEFAULT_LOGIN_TIMEOUT: Duration = Duration::from_secs(60);

/// Default application name reported at login.
pub const DEFAULT_APPLICATION_NAME: &str = "mssql-session";

/// Session options applied right after login by [`Config::with_default_options`].
pub const DEFAULT_SESSION_OPTIONS: &str = "SET ARITHABORT ON;\
SET CONCAT_NULL_YIELDS_NULL ON;\
SET ANSI_NULLS ON;\
SET ANSI_NULL_DFLT_ON ON;\
SET ANSI_PADDING ON;\
SET ANSI_WARNINGS ON;\
SET ANSI_NULL_DFLT_ON ON;\
SET CURSOR_CLOSE_ON_COMMIT ON;\
SET QUOTED_IDENTIFIER ON;\
SET TEXTSIZE 2147483647;";

/// Configuration for opening a session.
///
/// This struct is marked `#[non_exhaustive]`. Use [`Config::new()`] with the
/// builder methods, or [`Config::from_connection_string()`].
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct Config {
    /// Server name, optionally with a `\instance` suffix.
    ///
    /// `.` and `(local)` mean `localhost`.
    pub server: String,

    /// Server port, appended to the host as `host:port`.
    pub port: Option<u16>,

    /// Login name.
    pub user: String,

    /// Login password.
    pub password: String,

    /// Database to use after login.
    pub database: Option<String>,

    /// Client charset, such as `utf8` or `cp1252`.
    ///
    /// Character columns decode to text only when a charset is set; without
    /// one they are returned as raw bytes.
    pub charset: Option<String>,

    /// Requested protocol version: one of `4.2`, `5.0`, `7.0`, `7.1`, `7.2`,
    /// `7.3` or `7.4`. Checked when the session opens.
    pub tds_version: String,

    /// Application name reported at login.
    pub application_name: String,

    /// Time allowed for the login.
    pub login_timeout: Duration,

    /// SQL run once right after login, if any.
    pub init_sql: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: "localhost".to_string(),
            port: None,
            user: "sa".to_string(),
            password: String::new(),
            database: None,
            charset: None,
            tds_version: TdsVersion::default().to_string(),
            application_name: DEFAULT_APPLICATION_NAME.to_string(),
            login_timeout: DEFAULT_LOGIN_TIMEOUT,
            init_sql: None,
        }
    }
}

impl Config {
    /// Create a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a connection string into configuration.
    ///
    /// Supports ADO.NET-style connection strings:
    /// ```text
    /// Server=myhost\SYB1;Database=mydb;User Id=sa;Password=secret;Charset=utf8;
    /// ```
    ///
    /// Keys are case-insensitive. Unknown keys are ignored.
    pub fn from_connection_string(conn_str: &str) -> Result<Self, Error> {
        let mut config = Self::default();

        for part in conn_str.split(';') {
            let part = part.trim();
            if part.is_empty() {
                continue;
            }

            let (key, value) = part
                .split_once('=')
                .ok_or_else(|| Error::Config(format!("invalid key-value: {part}")))?;

            let key = key.trim().to_lowercase();
            let value = value.trim();

            match key.as_str() {
                "server" | "data source" | "host" => {
                    // host,port is the ADO.NET spelling of a port
                    if let Some((host, port)) = value.split_once(',') {
                        config.server = host.trim().to_string();
                        config.port = Some(parse_port(port.trim())?);
                    } else {
                        config.server = value.to_string();
                    }
                }
                "port" => {
                    config.port = Some(parse_port(value)?);
                }
                "database" | "initial catalog" => {
                    config.database = non_empty(value);
                }
                "user id" | "uid" | "user" => {
                    config.user = value.to_string();
                }
                "password" | "pwd" => {
                    config.password = value.to_string();
                }
                "application name" | "app" => {
                    config.application_name = value.to_string();
                }
                "charset" | "client charset" => {
                    config.charset = non_empty(value);
                }
                "tds version" | "tdsversion" => {
                    config.tds_version = value.to_string();
                }
                "login timeout" | "connect timeout" => {
                    let secs: u64 = value
                        .parse()
                        .map_err(|_| Error::Config(format!("invalid timeout: {value}")))?;
                    config.login_timeout = Duration::from_secs(secs);
                }
                _ => {
                    tracing::debug!(key = key, "ignoring unknown connection string option");
                }
            }
        }

        Ok(config)
    }

    /// Set the server.
    #[must_use]
    pub fn server(mut self, server: impl Into<String>) -> Self {
        self.server = server.into();
        self
    }

    /// Set the port.
    #[must_use]
    pub fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Set the login name and password.
    #[must_use]
    pub fn credentials(mut self, user: impl Into<String>, password: impl Into<String>) -> Self {
        self.user = user.into();
        self.password = password.into();
        self
    }

    /// Set the database.
    #[must_use]
    pub fn database(mut self, database: impl Into<String>) -> Self {
        self.database = non_empty(&database.into());
        self
    }

    /// Set the client charset.
    #[must_use]
    pub fn charset(mut self, charset: impl Into<String>) -> Self {
        self.charset = non_empty(&charset.into());
        self
    }

    /// Set the protocol version string.
    #[must_use]
    pub fn tds_version(mut self, version: impl Into<String>) -> Self {
        self.tds_version = version.into();
        self
    }

    /// Set the application name.
    #[must_use]
    pub fn application_name(mut self, name: impl Into<String>) -> Self {
        self.application_name = name.into();
        self
    }

    /// Set the login timeout.
    #[must_use]
    pub fn login_timeout(mut self, timeout: Duration) -> Self {
        self.login_timeout = timeout;
        self
    }

    /// Run `sql` right after login.
    #[must_use]
    pub fn init_sql(mut self, sql: impl Into<String>) -> Self {
        self.init_sql = Some(sql.into());
        self
    }

    /// Apply [`DEFAULT_SESSION_OPTIONS`] right after login.
    #[must_use]
    pub fn with_default_options(self) -> Self {
        self.init_sql(DEFAULT_SESSION_OPTIONS)
    }

    /// The host specification handed to the transport.
    ///
    /// `.` and `(local)` become `localhost`; a named instance is kept as
    /// `host\instance`, otherwise a port is appended as `host:port`.
    #[must_use]
    pub fn host_spec(&self) -> String {
        let (host, instance) = match self.server.split_once('\\') {
            Some((host, instance)) => (host, Some(instance)),
            None => (self.server.as_str(), None),
        };
        let host = if host == "." || host.eq_ignore_ascii_case("(local)") {
            "localhost"
        } else {
            host
        };

        match (instance.filter(|i| !i.is_empty()), self.port) {
            (Some(instance), _) => format!("{host}\\{instance}"),
            (None, Some(port)) => format!("{host}:{port}"),
            (None, None) => host.to_string(),
        }
    }

    /// Validate the configuration and build the login record.
    pub fn login(&self) -> Result<Login, Error> {
        let tds_version = TdsVersion::parse(&self.tds_version)
            .ok_or_else(|| Error::UnsupportedVersion(self.tds_version.clone()))?;

        if let Some(charset) = &self.charset {
            mssql_types::charset::encoding_for(charset)
                .map_err(|_| Error::Config(format!("unknown charset: {charset}")))?;
        }

        let application_name = if self.application_name.is_empty() {
            DEFAULT_APPLICATION_NAME.to_string()
        } else {
            self.application_name.clone()
        };

        Ok(Login {
            user: self.user.clone(),
            password: self.password.clone(),
            database: self.database.clone(),
            charset: self.charset.clone(),
            application_name,
            tds_version,
            login_timeout: self.login_timeout,
        })
    }
}

/// Login record handed to [`Transport::open`](crate::Transport::open).
#[derive(Clone, PartialEq, Eq)]
#[non_exhaustive]
pub struct Login {
    /// Login name.
    pub user: String,
    /// Login password.
    pub password: String,
    /// Database to use after login.
    pub database: Option<String>,
    /// Client charset.
    pub charset: Option<String>,
    /// Application name.
    pub application_name: String,
    /// Negotiated protocol version.
    pub tds_version: TdsVersion,
    /// Time allowed for the login.
    pub login_timeout: Duration,
}

impl std::fmt::Debug for Login {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Login")
            .field("user", &self.user)
            .field("password", &"[REDACTED]")
            .field("database", &self.database)
            .field("charset", &self.charset)
            .field("application_name", &self.application_name)
            .field("tds_version", &self.tds_version)
            .field("login_timeout", &self.login_timeout)
            .finish()
    }
}

fn parse_port(value: &str) -> Result<u16, Error> {
    value
        .parse()
        .map_err(|_| Error::Config(format!("invalid port: {value}")))
}

fn non_empty(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_string())
}
