use clap::{Args, ValueEnum};
use rdkafka::config::{ClientConfig, RDKafkaLogLevel};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::error::ConfigError;

pub const DEFAULT_BROKERS: &str = "localhost:9092";
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_METADATA_TIMEOUT_SECS: u64 = 60;

/// Connection flags shared by every binary.
#[derive(Debug, Clone, Args)]
pub struct ConnectionArgs {
    /// Kafka broker addresses (comma-separated)
    #[arg(long, env = "KAFKA_BROKERS", default_value = DEFAULT_BROKERS)]
    pub brokers: String,

    /// Socket timeout for broker requests, in seconds
    #[arg(long, default_value_t = DEFAULT_TIMEOUT_SECS)]
    pub timeout_secs: u64,

    /// Timeout for metadata requests, in seconds
    #[arg(long, default_value_t = DEFAULT_METADATA_TIMEOUT_SECS)]
    pub metadata_timeout_secs: u64,

    /// Log filter used when RUST_LOG is not set
    #[arg(long, default_value = "info")]
    pub log_level: String,

    #[command(flatten)]
    pub security: SecurityArgs,
}

#[derive(Debug, Clone, Args)]
pub struct SecurityArgs {
    /// Security protocol (PLAINTEXT when omitted)
    #[arg(long, value_enum, ignore_case = true)]
    pub security_protocol: Option<SecurityProtocol>,

    /// SASL mechanism
    #[arg(long, value_enum, ignore_case = true, default_value = "PLAIN")]
    pub sasl_mechanism: SaslMechanism,

    /// SASL username
    #[arg(long, env = "KAFKA_SASL_USERNAME")]
    pub sasl_username: Option<String>,

    /// SASL password
    #[arg(long, env = "KAFKA_SASL_PASSWORD", hide_env_values = true)]
    pub sasl_password: Option<String>,

    /// Path to CA certificate file (for SSL/TLS)
    #[arg(long)]
    pub tls_ca_cert: Option<PathBuf>,

    /// Path to client certificate file (for mTLS)
    #[arg(long)]
    pub tls_client_cert: Option<PathBuf>,

    /// Path to client key file (for mTLS)
    #[arg(long)]
    pub tls_client_key: Option<PathBuf>,

    /// Skip TLS certificate verification (insecure, for development only)
    #[arg(long)]
    pub tls_skip_verify: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SecurityProtocol {
    #[value(name = "PLAINTEXT")]
    Plaintext,
    #[value(name = "SSL")]
    Ssl,
    #[value(name = "SASL_PLAINTEXT")]
    SaslPlaintext,
    #[value(name = "SASL_SSL")]
    SaslSsl,
}

impl SecurityProtocol {
    pub fn as_str(&self) -> &'static str {
        match self {
            SecurityProtocol::Plaintext => "PLAINTEXT",
            SecurityProtocol::Ssl => "SSL",
            SecurityProtocol::SaslPlaintext => "SASL_PLAINTEXT",
            SecurityProtocol::SaslSsl => "SASL_SSL",
        }
    }

    pub fn uses_sasl(&self) -> bool {
        matches!(
            self,
            SecurityProtocol::SaslPlaintext | SecurityProtocol::SaslSsl
        )
    }

    pub fn uses_tls(&self) -> bool {
        matches!(self, SecurityProtocol::Ssl | SecurityProtocol::SaslSsl)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SaslMechanism {
    #[value(name = "PLAIN")]
    Plain,
    #[value(name = "SCRAM-SHA-256")]
    ScramSha256,
    #[value(name = "SCRAM-SHA-512")]
    ScramSha512,
}

impl SaslMechanism {
    pub fn as_str(&self) -> &'static str {
        match self {
            SaslMechanism::Plain => "PLAIN",
            SaslMechanism::ScramSha256 => "SCRAM-SHA-256",
            SaslMechanism::ScramSha512 => "SCRAM-SHA-512",
        }
    }

    fn login_module(&self) -> &'static str {
        match self {
            SaslMechanism::Plain => "org.apache.kafka.common.security.plain.PlainLoginModule",
            SaslMechanism::ScramSha256 | SaslMechanism::ScramSha512 => {
                "org.apache.kafka.common.security.scram.ScramLoginModule"
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaslCredentials {
    pub mechanism: SaslMechanism,
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TlsSettings {
    pub ca_cert: Option<PathBuf>,
    pub client_cert: Option<PathBuf>,
    pub client_key: Option<PathBuf>,
    pub skip_verify: bool,
}

/// Validated security configuration, rendered for librdkafka and for the
/// Java command-line tools.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecuritySettings {
    pub protocol: SecurityProtocol,
    pub sasl: Option<SaslCredentials>,
    pub tls: TlsSettings,
}

impl Default for SecuritySettings {
    fn default() -> Self {
        Self {
            protocol: SecurityProtocol::Plaintext,
            sasl: None,
            tls: TlsSettings::default(),
        }
    }
}

impl SecuritySettings {
    pub fn is_plaintext(&self) -> bool {
        self.protocol == SecurityProtocol::Plaintext
    }

    pub fn apply(&self, config: &mut ClientConfig) {
        config.set("security.protocol", self.protocol.as_str().to_lowercase());

        if let Some(sasl) = &self.sasl {
            config
                .set("sasl.mechanisms", sasl.mechanism.as_str())
                .set("sasl.username", &sasl.username)
                .set("sasl.password", &sasl.password);
        }

        if self.protocol.uses_tls() {
            if let Some(ca_cert) = &self.tls.ca_cert {
                config.set("ssl.ca.location", ca_cert.to_string_lossy());
            }
            if let (Some(cert), Some(key)) = (&self.tls.client_cert, &self.tls.client_key) {
                config
                    .set("ssl.certificate.location", cert.to_string_lossy())
                    .set("ssl.key.location", key.to_string_lossy());
            }
            if self.tls.skip_verify {
                config
                    .set("enable.ssl.certificate.verification", "false")
                    .set("ssl.endpoint.identification.algorithm", "none");
            }
        }
    }

    /// Properties for `--command-config`; `None` when no authentication is needed.
    pub fn command_config_lines(&self) -> Option<Vec<String>> {
        if self.is_plaintext() {
            return None;
        }

        let mut lines = vec![format!("security.protocol={}", self.protocol.as_str())];

        if let Some(sasl) = &self.sasl {
            lines.push(format!("sasl.mechanism={}", sasl.mechanism.as_str()));
            lines.push(format!(
                "sasl.jaas.config={} required username=\"{}\" password=\"{}\";",
                sasl.mechanism.login_module(),
                escape_jaas(&sasl.username),
                escape_jaas(&sasl.password)
            ));
        }

        if self.protocol.uses_tls() {
            if let Some(ca_cert) = &self.tls.ca_cert {
                lines.push("ssl.truststore.type=PEM".to_string());
                lines.push(format!("ssl.truststore.location={}", ca_cert.display()));
            }
            if self.tls.skip_verify {
                lines.push("ssl.endpoint.identification.algorithm=".to_string());
            }
        }

        Some(lines)
    }
}

fn escape_jaas(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Everything a client needs to reach the cluster.
#[derive(Debug, Clone)]
pub struct ClientSettings {
    pub brokers: Vec<String>,
    pub security: SecuritySettings,
    pub timeout: Duration,
    pub metadata_timeout: Duration,
}

impl ClientSettings {
    pub fn bootstrap_servers(&self) -> String {
        self.brokers.join(",")
    }

    pub fn client_config(&self) -> ClientConfig {
        let mut config = ClientConfig::new();
        config
            .set("bootstrap.servers", self.bootstrap_servers())
            .set("socket.timeout.ms", self.timeout.as_millis().to_string())
            .set_log_level(RDKafkaLogLevel::Warning);
        self.security.apply(&mut config);
        config
    }
}

impl ConnectionArgs {
    pub fn settings(&self) -> Result<ClientSettings, ConfigError> {
        let brokers = parse_list(&self.brokers);
        if brokers.is_empty() {
            return Err(ConfigError::NoBrokers);
        }

        Ok(ClientSettings {
            brokers,
            security: self.security.settings()?,
            timeout: Duration::from_secs(self.timeout_secs),
            metadata_timeout: Duration::from_secs(self.metadata_timeout_secs),
        })
    }
}

impl SecurityArgs {
    pub fn settings(&self) -> Result<SecuritySettings, ConfigError> {
        let protocol = self
            .security_protocol
            .unwrap_or(SecurityProtocol::Plaintext);

        let sasl = if protocol.uses_sasl() {
            match (&self.sasl_username, &self.sasl_password) {
                (Some(username), Some(password)) if !username.is_empty() && !password.is_empty() => {
                    Some(SaslCredentials {
                        mechanism: self.sasl_mechanism,
                        username: username.clone(),
                        password: password.clone(),
                    })
                }
                _ => return Err(ConfigError::MissingSaslCredentials),
            }
        } else {
            None
        };

        if self.tls_client_cert.is_some() != self.tls_client_key.is_some() {
            return Err(ConfigError::IncompleteClientCertificate);
        }

        Ok(SecuritySettings {
            protocol,
            sasl,
            tls: TlsSettings {
                ca_cert: self.tls_ca_cert.clone(),
                client_cert: self.tls_client_cert.clone(),
                client_key: self.tls_client_key.clone(),
                skip_verify: self.tls_skip_verify,
            },
        })
    }
}

/// Splits a comma-separated flag, dropping blanks.
pub fn parse_list(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

/// Installs the global tracing subscriber. `RUST_LOG` wins over `default_filter`.
pub fn init_tracing(default_filter: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();
}
