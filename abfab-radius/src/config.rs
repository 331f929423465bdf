//! Server definitions and the TOML configuration surface.

use std::fmt;
use std::fs;
use std::io;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use getset::{CopyGetters, Getters};
use serde::Deserialize;
use thiserror::Error;

use abfab_radius_protocol::{AttributeType, DictionaryEntry, ServerCapabilities, StandardType};

use crate::{Authenticator, AuthenticatorBuilder, Transport};

#[cfg(test)]
mod tests;

/// The default port for authentication requests ([RFC2865 section 3]).
///
/// [RFC2865 section 3]: https://www.rfc-editor.org/rfc/rfc2865.html#section-3
pub const DEFAULT_AUTHENTICATION_PORT: u16 = 1812;

/// The default port for accounting requests ([RFC2866 section 3]).
///
/// [RFC2866 section 3]: https://www.rfc-editor.org/rfc/rfc2866.html#section-3
pub const DEFAULT_ACCOUNTING_PORT: u16 = 1813;

/// How long to wait for each reply before resending a request.
pub const DEFAULT_SOCKET_TIMEOUT: Duration = Duration::from_secs(5);

/// How many times a request is resent after the first attempt goes unanswered.
pub const DEFAULT_RETRIES: u32 = 3;

/// The inner protocol tunnelled EAP methods would use. Unused, since no supported protocol tunnels.
pub const DEFAULT_EAP_INNER_PROTOCOL: &str = "pap";

/// Error when configuration can't be loaded or is inconsistent.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read configuration: {0}")]
    Io(#[from] io::Error),

    /// The configuration is not valid TOML, or doesn't have the expected shape.
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),

    /// A value was out of range or referred to something unknown.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// The authentication protocol used towards a server.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Protocol {
    /// Password Authentication Protocol: the password travels hidden in User-Password.
    Pap,

    /// Challenge-Handshake Authentication Protocol with a client-chosen challenge.
    Chap,

    /// EAP with the MD5-Challenge method, relayed through EAP-Message attributes.
    EapMd5,
}

/// Configuration tags of every supported protocol.
const PROTOCOLS: &[(&str, Protocol)] = &[
    ("pap", Protocol::Pap),
    ("chap", Protocol::Chap),
    ("eap-md5", Protocol::EapMd5),
];

impl Protocol {
    /// The tag used for this protocol in configuration.
    pub fn tag(self) -> &'static str {
        PROTOCOLS
            .iter()
            .find(|(_, protocol)| *protocol == self)
            .map_or("unknown", |(tag, _)| tag)
    }
}

impl FromStr for Protocol {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PROTOCOLS
            .iter()
            .find(|(tag, _)| tag.eq_ignore_ascii_case(s.trim()))
            .map(|(_, protocol)| *protocol)
            .ok_or_else(|| ConfigError::Invalid(format!("unknown authentication protocol {s:?}")))
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// The kind of RADIUS server, which determines the ABFAB behaviour used with it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ServerKind {
    /// An ABFAB (Moonshot) server: GSS acceptor attributes are sent and SAML assertions are mapped.
    #[default]
    Abfab,

    /// A plain RADIUS server that only gives an accept/reject verdict.
    Classic,
}

impl ServerKind {
    /// The capabilities servers of this kind take part in.
    pub fn capabilities(self) -> ServerCapabilities {
        match self {
            Self::Abfab => ServerCapabilities::GSS_ACCEPTOR | ServerCapabilities::SAML_ASSERTION,
            Self::Classic => ServerCapabilities::empty(),
        }
    }
}

impl FromStr for ServerKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "abfab" => Ok(Self::Abfab),
            "classic" => Ok(Self::Classic),
            _ => Err(ConfigError::Invalid(format!("unknown server kind {s:?}"))),
        }
    }
}

/// Everything needed to talk to one RADIUS server.
///
/// Built through [`ServerConfigBuilder`] and immutable afterwards, so it can be shared between concurrent requests.
#[derive(Clone, PartialEq, Eq, Getters, CopyGetters)]
pub struct ServerConfig {
    /// The host name or address of the server.
    #[getset(get = "pub")]
    host: String,

    /// The shared secret.
    #[getset(get = "pub")]
    secret: Vec<u8>,

    /// The authentication protocol used with this server.
    #[getset(get_copy = "pub")]
    protocol: Protocol,

    /// The server kind.
    #[getset(get_copy = "pub")]
    kind: ServerKind,

    /// The UDP port authentication requests are sent to.
    #[getset(get_copy = "pub")]
    authentication_port: u16,

    /// The UDP port for accounting; kept for completeness, as this client doesn't do accounting.
    #[getset(get_copy = "pub")]
    accounting_port: u16,

    /// How long to wait for a reply to each transmission.
    #[getset(get_copy = "pub")]
    socket_timeout: Duration,

    /// How many times an unanswered request is resent.
    #[getset(get_copy = "pub")]
    retries: u32,

    /// The inner protocol for tunnelled EAP methods.
    ///
    /// No supported protocol tunnels, so nothing reads this yet beyond logging it.
    #[getset(get = "pub")]
    eap_inner_protocol: String,
}

impl ServerConfig {
    /// Starts building a server definition with default ports, timeout and retries.
    pub fn builder<H: Into<String>, S: AsRef<[u8]>>(host: H, secret: S) -> ServerConfigBuilder {
        ServerConfigBuilder::new(host, secret)
    }

    /// The ABFAB capabilities of this server, derived from its kind.
    pub fn capabilities(&self) -> ServerCapabilities {
        self.kind.capabilities()
    }
}

// the shared secret is left out on purpose
impl fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerConfig")
            .field("host", &self.host)
            .field("secret", &"<redacted>")
            .field("protocol", &self.protocol)
            .field("kind", &self.kind)
            .field("authentication_port", &self.authentication_port)
            .field("accounting_port", &self.accounting_port)
            .field("socket_timeout", &self.socket_timeout)
            .field("retries", &self.retries)
            .field("eap_inner_protocol", &self.eap_inner_protocol)
            .finish()
    }
}

impl fmt::Display for ServerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{} ({})",
            self.host, self.authentication_port, self.protocol
        )
    }
}

/// Builder for [`ServerConfig`] objects.
#[derive(Clone)]
pub struct ServerConfigBuilder {
    host: String,
    secret: Vec<u8>,
    protocol: Protocol,
    kind: ServerKind,
    authentication_port: u16,
    accounting_port: u16,
    socket_timeout: Duration,
    retries: u32,
    eap_inner_protocol: String,
}

impl ServerConfigBuilder {
    /// Creates a new builder with default values for everything but the host and secret.
    pub fn new<H: Into<String>, S: AsRef<[u8]>>(host: H, secret: S) -> Self {
        Self {
            host: host.into(),
            secret: secret.as_ref().to_owned(),
            protocol: Protocol::Pap,
            kind: ServerKind::default(),
            authentication_port: DEFAULT_AUTHENTICATION_PORT,
            accounting_port: DEFAULT_ACCOUNTING_PORT,
            socket_timeout: DEFAULT_SOCKET_TIMEOUT,
            retries: DEFAULT_RETRIES,
            eap_inner_protocol: DEFAULT_EAP_INNER_PROTOCOL.to_owned(),
        }
    }

    /// Sets the authentication protocol.
    pub fn protocol(&mut self, protocol: Protocol) -> &mut Self {
        self.protocol = protocol;
        self
    }

    /// Sets the server kind.
    pub fn kind(&mut self, kind: ServerKind) -> &mut Self {
        self.kind = kind;
        self
    }

    /// Sets the authentication port.
    pub fn authentication_port(&mut self, port: u16) -> &mut Self {
        self.authentication_port = port;
        self
    }

    /// Sets the accounting port.
    pub fn accounting_port(&mut self, port: u16) -> &mut Self {
        self.accounting_port = port;
        self
    }

    /// Sets how long to wait for each reply.
    pub fn socket_timeout(&mut self, timeout: Duration) -> &mut Self {
        self.socket_timeout = timeout;
        self
    }

    /// Sets how many times an unanswered request is resent.
    pub fn retries(&mut self, retries: u32) -> &mut Self {
        self.retries = retries;
        self
    }

    /// Sets the inner protocol for tunnelled EAP methods.
    ///
    /// No supported protocol tunnels, so the value is only recorded and logged.
    pub fn eap_inner_protocol<P: Into<String>>(&mut self, protocol: P) -> &mut Self {
        self.eap_inner_protocol = protocol.into();
        self
    }

    /// Validates the collected values and turns them into a [`ServerConfig`].
    pub fn build(&self) -> Result<ServerConfig, ConfigError> {
        if self.host.trim().is_empty() {
            return Err(ConfigError::Invalid("server host must not be empty".to_owned()));
        }

        if self.secret.is_empty() {
            return Err(ConfigError::Invalid(format!(
                "shared secret for {} must not be empty",
                self.host
            )));
        }

        if self.socket_timeout.is_zero() {
            return Err(ConfigError::Invalid(format!(
                "socket timeout for {} must be positive",
                self.host
            )));
        }

        Ok(ServerConfig {
            host: self.host.trim().to_owned(),
            secret: self.secret.clone(),
            protocol: self.protocol,
            kind: self.kind,
            authentication_port: self.authentication_port,
            accounting_port: self.accounting_port,
            socket_timeout: self.socket_timeout,
            retries: self.retries,
            eap_inner_protocol: self.eap_inner_protocol.clone(),
        })
    }
}

/// A complete, validated configuration for an [`Authenticator`].
#[derive(Debug, Clone, Getters, CopyGetters)]
pub struct Config {
    /// The servers to try, in order.
    #[getset(get = "pub")]
    servers: Vec<ServerConfig>,

    /// Whether an Access-Reject moves on to the next server.
    #[getset(get_copy = "pub")]
    failover_on_authentication_failure: bool,

    /// Whether a failed exchange moves on to the next server.
    #[getset(get_copy = "pub")]
    failover_on_exception: bool,

    /// The SAML attribute name (prefix) holding the principal identifier.
    #[getset(get = "pub")]
    principal_identifier_urn: String,

    /// Extra attributes to register with [`init_with`](crate::init_with).
    #[getset(get = "pub")]
    dictionary_entries: Vec<DictionaryEntry>,
}

impl Config {
    /// Parses and validates a TOML configuration.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let raw: RawConfig = toml::from_str(text)?;
        raw.try_into()
    }

    /// Reads, parses and validates a TOML configuration file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Builds an authenticator for this configuration that exchanges packets over `transport`.
    pub fn authenticator(&self, transport: Arc<dyn Transport>) -> Authenticator {
        let mut builder = AuthenticatorBuilder::new(self.principal_identifier_urn.clone());
        builder
            .servers(self.servers.iter().cloned())
            .failover_on_authentication_failure(self.failover_on_authentication_failure)
            .failover_on_exception(self.failover_on_exception);

        builder.build(transport)
    }
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    #[serde(default)]
    failover_on_authentication_failure: bool,

    #[serde(default)]
    failover_on_exception: bool,

    principal_identifier_urn: String,

    #[serde(default)]
    servers: Vec<RawServer>,

    #[serde(default)]
    dictionary: Vec<RawDictionaryEntry>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawServer {
    host: String,
    secret: String,

    #[serde(default = "default_protocol")]
    protocol: String,

    #[serde(default = "default_kind")]
    kind: String,

    #[serde(default = "default_authentication_port")]
    authentication_port: u16,

    #[serde(default = "default_accounting_port")]
    accounting_port: u16,

    /// Seconds.
    #[serde(default = "default_socket_timeout")]
    socket_timeout: u64,

    #[serde(default = "default_retries")]
    retries: u32,

    #[serde(default = "default_eap_inner_protocol")]
    eap_inner_protocol: String,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawDictionaryEntry {
    name: String,
    vendor: Option<u32>,
    code: u8,
}

fn default_protocol() -> String {
    Protocol::Pap.tag().to_owned()
}

fn default_kind() -> String {
    "abfab".to_owned()
}

fn default_authentication_port() -> u16 {
    DEFAULT_AUTHENTICATION_PORT
}

fn default_accounting_port() -> u16 {
    DEFAULT_ACCOUNTING_PORT
}

fn default_socket_timeout() -> u64 {
    DEFAULT_SOCKET_TIMEOUT.as_secs()
}

fn default_retries() -> u32 {
    DEFAULT_RETRIES
}

fn default_eap_inner_protocol() -> String {
    DEFAULT_EAP_INNER_PROTOCOL.to_owned()
}

impl TryFrom<RawServer> for ServerConfig {
    type Error = ConfigError;

    fn try_from(raw: RawServer) -> Result<Self, Self::Error> {
        ServerConfigBuilder::new(raw.host, raw.secret)
            .protocol(raw.protocol.parse()?)
            .kind(raw.kind.parse()?)
            .authentication_port(raw.authentication_port)
            .accounting_port(raw.accounting_port)
            .socket_timeout(Duration::from_secs(raw.socket_timeout))
            .retries(raw.retries)
            .eap_inner_protocol(raw.eap_inner_protocol)
            .build()
    }
}

impl TryFrom<RawDictionaryEntry> for DictionaryEntry {
    type Error = ConfigError;

    fn try_from(raw: RawDictionaryEntry) -> Result<Self, Self::Error> {
        if raw.name.is_empty() {
            return Err(ConfigError::Invalid(
                "dictionary entry name must not be empty".to_owned(),
            ));
        }

        let attribute_type = match raw.vendor {
            Some(vendor_id) => AttributeType::Vendor {
                vendor_id,
                code: raw.code,
            },
            // a bare Vendor-Specific would shadow every vendor attribute
            None if raw.code == u8::from(StandardType::VendorSpecific) => {
                return Err(ConfigError::Invalid(format!(
                    "dictionary entry {} cannot use type 26 without a vendor",
                    raw.name
                )))
            }
            None => AttributeType::Standard(raw.code),
        };

        Ok(DictionaryEntry::new(raw.name, attribute_type))
    }
}

impl TryFrom<RawConfig> for Config {
    type Error = ConfigError;

    fn try_from(raw: RawConfig) -> Result<Self, Self::Error> {
        if raw.servers.is_empty() {
            return Err(ConfigError::Invalid(
                "at least one server must be configured".to_owned(),
            ));
        }

        if raw.principal_identifier_urn.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "principal_identifier_urn must not be empty".to_owned(),
            ));
        }

        let servers = raw
            .servers
            .into_iter()
            .map(ServerConfig::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        let dictionary_entries = raw
            .dictionary
            .into_iter()
            .map(DictionaryEntry::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            servers,
            failover_on_authentication_failure: raw.failover_on_authentication_failure,
            failover_on_exception: raw.failover_on_exception,
            principal_identifier_urn: raw.principal_identifier_urn,
            dictionary_entries,
        })
    }
}
