use std::fmt;
use std::sync::Arc;

use getset::{CopyGetters, Getters};
use thiserror::Error;
use tracing::{debug, error, info, warn};

use abfab_radius_protocol::{AssertionError, AttributeList, SamlAssertionFilter, ServerCapabilities};

use crate::saml::{SamlAssertionExtractor, SamlError};
use crate::{local_host_name, AuthRequest, AuthResult, ClientError, RadiusClient, ServerConfig, Transport};


/// Where a [`Principal`]'s identifier came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrincipalSource {
    /// The username the user authenticated with.
    Credential,

    /// An attribute of the SAML assertion returned by the accepting server.
    Assertion,
}

/// The identity of a successfully authenticated user.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Getters, CopyGetters)]
pub struct Principal {
    /// The principal identifier.
    #[getset(get = "pub")]
    id: String,

    /// Where the identifier came from.
    #[getset(get_copy = "pub")]
    source: PrincipalSource,
}

impl Principal {
    fn credential(username: &str) -> Self {
        Self {
            id: username.to_owned(),
            source: PrincipalSource::Credential,
        }
    }

    fn assertion(id: String) -> Self {
        Self {
            id,
            source: PrincipalSource::Assertion,
        }
    }

    /// Consumes the principal, returning its identifier.
    pub fn into_id(self) -> String {
        self.id
    }
}

impl fmt::Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.id)
    }
}

/// Why [`Authenticator::authenticate`] didn't produce a principal.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum AuthenticationError {
    /// The credentials were rejected, or no server accepted them.
    #[error("authentication failed")]
    Failed,

    /// A server could not be asked, and failover on errors is disabled.
    #[error("authentication against {server} could not be completed")]
    Prevented {
        /// The server the exchange was attempted with.
        server: String,

        /// What went wrong.
        #[source]
        source: ClientError,
    },
}

/// Authenticates users against an ordered list of RADIUS servers.
///
/// Servers are tried strictly in order, and the first Access-Accept wins. Whether an Access-Reject or a failed
/// exchange moves on to the next server is configurable; by default neither does. When an ABFAB server accepts,
/// the principal is taken from the returned SAML assertion if possible.
#[derive(Clone)]
pub struct Authenticator {
    clients: Vec<RadiusClient>,
    failover_on_authentication_failure: bool,
    failover_on_exception: bool,
    principal_identifier_urn: String,
    acceptor_host_name: String,
}

impl Authenticator {
    /// Returns a builder for an authenticator mapping principals from the SAML attribute named (by prefix) `urn`.
    pub fn builder<U: Into<String>>(principal_identifier_urn: U) -> AuthenticatorBuilder {
        AuthenticatorBuilder::new(principal_identifier_urn)
    }

    /// The per-server clients, in the order they are tried.
    pub fn clients(&self) -> &[RadiusClient] {
        &self.clients
    }

    /// Authenticates a user, returning the principal they map to.
    ///
    /// Fails with [`AuthenticationError::Prevented`] on the first failed exchange unless failover on errors is
    /// enabled, and with [`AuthenticationError::Failed`] once the credentials were rejected.
    pub async fn authenticate(
        &self,
        username: &str,
        password: &str,
    ) -> Result<Principal, AuthenticationError> {
        for client in &self.clients {
            let server = client.server();
            let request =
                AuthRequest::with_host_name(username, password, self.acceptor_host_name.as_str());

            debug!(user = %username, %server, "attempting authentication");

            match client.authenticate(request).await {
                AuthResult::Accept(attributes) => {
                    debug!(user = %username, %server, "server accepted credentials");
                    return Ok(self.resolve_principal(server, username, &attributes));
                }
                AuthResult::Reject if self.failover_on_authentication_failure => {
                    debug!(user = %username, %server, "server rejected credentials, failing over to next server");
                }
                AuthResult::Reject => {
                    debug!(user = %username, %server, "server rejected credentials");
                    return Err(AuthenticationError::Failed);
                }
                AuthResult::Error(err) if self.failover_on_exception => {
                    warn!(user = %username, %server, error = %err, "failover enabled, trying next server");
                }
                AuthResult::Error(err) => {
                    warn!(user = %username, %server, error = %err, "failover disabled, giving up");
                    return Err(AuthenticationError::Prevented {
                        server: server.to_string(),
                        source: err,
                    });
                }
            }
        }

        debug!(user = %username, "no server accepted the credentials");
        Err(AuthenticationError::Failed)
    }

    fn resolve_principal(
        &self,
        server: &ServerConfig,
        username: &str,
        attributes: &AttributeList,
    ) -> Principal {
        if !server.capabilities().contains(ServerCapabilities::SAML_ASSERTION) {
            return Principal::credential(username);
        }

        // a server can only have accepted once the dictionary is installed
        let Some(dictionary) = crate::dictionary() else {
            return Principal::credential(username);
        };

        let assertion = match SamlAssertionFilter::new(attributes, dictionary).assertion() {
            Ok(assertion) if !assertion.is_empty() => assertion,
            Ok(_) | Err(AssertionError::Unknown(_)) => {
                error!(user = %username, "Authentication was successful, but SAML assertion was not present in RADIUS response!");
                return Principal::credential(username);
            }
            Err(err) => {
                error!(user = %username, error = %err, "Authentication was successful, but the SAML assertion could not be read!");
                return Principal::credential(username);
            }
        };

        debug!(user = %username, %assertion, "extracted SAML assertion from RADIUS response");

        match self.principal_from_assertion(&assertion) {
            Ok(id) if !id.is_empty() => {
                info!(user = %username, principal = %id, "Authentication was successful, credential mapped");
                Principal::assertion(id)
            }
            Ok(_) => {
                info!(user = %username, "Authentication was successful, credential mapping failed; continuing with existing credentials");
                Principal::credential(username)
            }
            Err(err) if err.is_attribute_not_found() => {
                error!(
                    user = %username,
                    urn = %self.principal_identifier_urn,
                    error = %err,
                    "Authentication was successful, unable to retrieve attribute from SAML assertion!"
                );
                Principal::credential(username)
            }
            Err(err) => {
                error!(user = %username, error = %err, "Authentication was successful, but parsing the included SAML assertion failed!");
                Principal::credential(username)
            }
        }
    }

    fn principal_from_assertion(&self, assertion: &str) -> Result<String, SamlError> {
        let extractor = SamlAssertionExtractor::parse(assertion)?;
        if !extractor.is_empty() {
            debug!("parsed SAML assertion into XML document");
        }

        if extractor.attribute_statement()?.has_children() {
            debug!("found attribute statement in SAML assertion");
        }

        extractor.attribute_value(&self.principal_identifier_urn)
    }
}

impl fmt::Debug for Authenticator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let servers: Vec<&ServerConfig> = self.clients.iter().map(RadiusClient::server).collect();

        f.debug_struct("Authenticator")
            .field("servers", &servers)
            .field(
                "failover_on_authentication_failure",
                &self.failover_on_authentication_failure,
            )
            .field("failover_on_exception", &self.failover_on_exception)
            .field("principal_identifier_urn", &self.principal_identifier_urn)
            .field("acceptor_host_name", &self.acceptor_host_name)
            .finish()
    }
}

/// Builder for [`Authenticator`]s.
#[derive(Debug, Clone)]
pub struct AuthenticatorBuilder {
    servers: Vec<ServerConfig>,
    failover_on_authentication_failure: bool,
    failover_on_exception: bool,
    principal_identifier_urn: String,
    acceptor_host_name: Option<String>,
}

impl AuthenticatorBuilder {
    /// Creates a builder with no servers and failover disabled.
    pub fn new<U: Into<String>>(principal_identifier_urn: U) -> Self {
        Self {
            servers: Vec::new(),
            failover_on_authentication_failure: false,
            failover_on_exception: false,
            principal_identifier_urn: principal_identifier_urn.into(),
            acceptor_host_name: None,
        }
    }

    /// Appends a server to try.
    pub fn server(&mut self, server: ServerConfig) -> &mut Self {
        self.servers.push(server);
        self
    }

    /// Appends several servers to try, in iteration order.
    pub fn servers<I: IntoIterator<Item = ServerConfig>>(&mut self, servers: I) -> &mut Self {
        self.servers.extend(servers);
        self
    }

    /// Sets whether an Access-Reject moves on to the next server.
    pub fn failover_on_authentication_failure(&mut self, failover: bool) -> &mut Self {
        self.failover_on_authentication_failure = failover;
        self
    }

    /// Sets whether a failed exchange moves on to the next server.
    pub fn failover_on_exception(&mut self, failover: bool) -> &mut Self {
        self.failover_on_exception = failover;
        self
    }

    /// Overrides the GSS acceptor host name sent to ABFAB servers, which defaults to the local host name.
    pub fn acceptor_host_name<H: Into<String>>(&mut self, host_name: H) -> &mut Self {
        self.acceptor_host_name = Some(host_name.into());
        self
    }

    /// Builds an authenticator whose clients exchange packets over `transport`.
    pub fn build(&self, transport: Arc<dyn Transport>) -> Authenticator {
        let clients = self
            .servers
            .iter()
            .map(|server| RadiusClient::new(server.clone(), Arc::clone(&transport)))
            .collect();

        Authenticator {
            clients,
            failover_on_authentication_failure: self.failover_on_authentication_failure,
            failover_on_exception: self.failover_on_exception,
            principal_identifier_urn: self.principal_identifier_urn.clone(),
            acceptor_host_name: self
                .acceptor_host_name
                .clone()
                .unwrap_or_else(local_host_name),
        }
    }
}
