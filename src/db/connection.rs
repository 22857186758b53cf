use anyhow::{Context, Result};
use postgres_native_tls::MakeTlsConnector;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio_postgres::{Client, NoTls};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionConfig {
    pub name: String,
    pub host: String,
    pub port: u16,
    pub database: String,
    pub username: String,
    #[serde(skip_serializing, default)]
    pub password: String,
    #[serde(default)]
    pub ssl_mode: SslMode,
    /// Accept invalid/self-signed certificates. Only honoured in Prefer/Require mode.
    #[serde(default)]
    pub accept_invalid_certs: bool,
    /// Optional path to a custom CA certificate file (PEM format).
    #[serde(default)]
    pub ca_cert_path: Option<String>,
}

/// SSL/TLS connection modes, matching the PostgreSQL sslmode parameter.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq)]
pub enum SslMode {
    Disable,
    #[default]
    Prefer,
    Require,
}

impl ConnectionConfig {
    pub fn connection_string(&self) -> String {
        let sslmode = match self.ssl_mode {
            SslMode::Disable => "disable",
            SslMode::Prefer => "prefer",
            SslMode::Require => "require",
        };
        format!(
            "host={} port={} dbname={} user={} password={} sslmode={} connect_timeout=10",
            quote_conn_value(&self.host),
            self.port,
            quote_conn_value(&self.database),
            quote_conn_value(&self.username),
            quote_conn_value(&self.password),
            sslmode
        )
    }

    pub fn display_string(&self) -> String {
        format!(
            "{}@{}:{}/{}",
            self.username, self.host, self.port, self.database
        )
    }

    /// Fill in an empty password from `PGPASSWORD`, falling back to an
    /// interactive prompt.
    pub fn resolve_password(&mut self) -> Result<()> {
        if !self.password.is_empty() {
            return Ok(());
        }
        if let Ok(pw) = std::env::var("PGPASSWORD") {
            self.password = pw;
        } else {
            let prompt = format!("Password for {}: ", self.display_string());
            self.password = rpassword::read_password_from_tty(Some(&prompt))?;
        }
        Ok(())
    }
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            name: String::from("Local PostgreSQL"),
            host: String::from("localhost"),
            port: 5432,
            database: String::from("postgres"),
            username: String::from("postgres"),
            password: String::new(),
            ssl_mode: SslMode::default(),
            accept_invalid_certs: false,
            ca_cert_path: None,
        }
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct SavedConnections {
    #[serde(default)]
    pub connections: Vec<ConnectionConfig>,
}

impl SavedConnections {
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("sqlgrade")
            .join("connections.toml")
    }

    /// Load saved connections; a missing file yields an empty list.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("Invalid connection file {}", path.display()))
    }

    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn find(&self, name: &str) -> Option<&ConnectionConfig> {
        self.connections
            .iter()
            .find(|c| c.name.eq_ignore_ascii_case(name))
    }
}

/// Create a PostgreSQL client. The connection task is spawned onto the
/// current tokio runtime.
pub async fn create_client(config: &ConnectionConfig) -> Result<Client> {
    let conn_string = config.connection_string();
    let timeout = Duration::from_secs(15);

    let client = match config.ssl_mode {
        SslMode::Disable => {
            let (client, connection) =
                tokio::time::timeout(timeout, tokio_postgres::connect(&conn_string, NoTls))
                    .await
                    .map_err(|_| anyhow::anyhow!("Connection timed out after 15s"))?
                    .context("Failed to connect to PostgreSQL")?;
            tokio::spawn(async move {
                if let Err(e) = connection.await {
                    tracing::error!("Connection error: {}", e);
                }
            });
            client
        }
        SslMode::Prefer | SslMode::Require => {
            let tls = build_tls_connector(config)?;
            let (client, connection) =
                tokio::time::timeout(timeout, tokio_postgres::connect(&conn_string, tls))
                    .await
                    .map_err(|_| anyhow::anyhow!("Connection timed out after 15s"))?
                    .context("Failed to connect to PostgreSQL")?;
            tokio::spawn(async move {
                if let Err(e) = connection.await {
                    tracing::error!("Connection error: {}", e);
                }
            });
            client
        }
    };

    Ok(client)
}

fn build_tls_connector(config: &ConnectionConfig) -> Result<MakeTlsConnector> {
    let mut builder = native_tls::TlsConnector::builder();

    if config.accept_invalid_certs {
        builder.danger_accept_invalid_certs(true);
        builder.danger_accept_invalid_hostnames(true);
    } else if let Some(ca_path) = &config.ca_cert_path {
        let ca_data = std::fs::read(ca_path)
            .with_context(|| format!("Failed to read CA certificate file: {}", ca_path))?;
        let cert = native_tls::Certificate::from_pem(&ca_data)
            .context("Failed to parse CA certificate")?;
        builder.add_root_certificate(cert);
    }

    let connector = builder.build().context("Failed to build TLS connector")?;

    Ok(MakeTlsConnector::new(connector))
}

/// Quote a value for use in a libpq key=value connection string.
/// Wraps in single quotes and escapes backslashes and single quotes.
fn quote_conn_value(value: &str) -> String {
    let escaped = value.replace('\\', "\\\\").replace('\'', "\\'");
    format!("'{}'", escaped)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_conn_value() {
        assert_eq!(quote_conn_value("plain"), "'plain'");
        assert_eq!(quote_conn_value("it's"), "'it\\'s'");
        assert_eq!(quote_conn_value("a\\b"), "'a\\\\b'");
    }

    #[test]
    fn test_connection_string() {
        let config = ConnectionConfig {
            password: "secret".to_string(),
            ssl_mode: SslMode::Disable,
            ..ConnectionConfig::default()
        };
        let conn = config.connection_string();
        assert!(conn.contains("host='localhost'"));
        assert!(conn.contains("port=5432"));
        assert!(conn.contains("password='secret'"));
        assert!(conn.contains("sslmode=disable"));
    }

    #[test]
    fn test_parse_saved_connections() {
        let content = r#"
            [[connections]]
            name = "grading"
            host = "db.example.org"
            port = 5433
            database = "coursework"
            username = "grader"
            ssl_mode = "Require"
        "#;
        let saved = SavedConnections::parse(content).unwrap();
        let config = saved.find("GRADING").unwrap();
        assert_eq!(config.port, 5433);
        assert_eq!(config.ssl_mode, SslMode::Require);
        assert!(config.password.is_empty());
        assert_eq!(config.display_string(), "grader@db.example.org:5433/coursework");
    }

    #[test]
    fn test_password_is_never_serialized() {
        let saved = SavedConnections {
            connections: vec![ConnectionConfig {
                password: "secret".to_string(),
                ..ConnectionConfig::default()
            }],
        };
        let content = toml::to_string_pretty(&saved).unwrap();
        assert!(!content.contains("secret"));
    }

    #[test]
    fn test_missing_connection_file_is_empty() {
        let saved = SavedConnections::load(Path::new("/nonexistent/sqlgrade/connections.toml"))
            .unwrap();
        assert!(saved.connections.is_empty());
    }
}
