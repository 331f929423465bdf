use std::fmt;

use abfab_radius_protocol::{
    Attribute, AttributeList, Dictionary, ServerCapabilities, UnknownAttribute,
};
use abfab_radius_protocol::{GSS_ACCEPTOR_HOST_NAME, GSS_ACCEPTOR_SERVICE_NAME, USER_NAME};

#[cfg(test)]
mod tests;

/// The GSS acceptor service name sent to ABFAB servers.
pub const GSS_ACCEPTOR_SERVICE: &str = "cas";

/// Host name used when the local one can't be determined.
pub const FALLBACK_HOST_NAME: &str = "localhost";

/// The credentials and acceptor identity for one authentication attempt.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthRequest {
    username: String,
    password: String,
    acceptor_host_name: String,
}

impl AuthRequest {
    /// Creates a request, using the local host name as the GSS acceptor host name.
    pub fn new<U: Into<String>, P: Into<String>>(username: U, password: P) -> Self {
        Self::with_host_name(username, password, local_host_name())
    }

    /// Creates a request with an explicit GSS acceptor host name.
    pub fn with_host_name<U, P, H>(username: U, password: P, acceptor_host_name: H) -> Self
    where
        U: Into<String>,
        P: Into<String>,
        H: Into<String>,
    {
        Self {
            username: username.into(),
            password: password.into(),
            acceptor_host_name: acceptor_host_name.into(),
        }
    }

    /// The user being authenticated.
    pub fn username(&self) -> &str {
        &self.username
    }

    pub(crate) fn password(&self) -> &str {
        &self.password
    }

    /// The host name sent as GSS-Acceptor-Host-Name.
    pub fn acceptor_host_name(&self) -> &str {
        &self.acceptor_host_name
    }

    /// Builds User-Name and, for servers acting as GSS acceptors, the acceptor identity attributes.
    pub(crate) fn identity_attributes(
        &self,
        dictionary: &Dictionary,
        capabilities: ServerCapabilities,
    ) -> Result<AttributeList, UnknownAttribute> {
        let mut attributes = AttributeList::new();
        attributes.push(Attribute::new(
            dictionary.type_by_name(USER_NAME)?,
            self.username.as_bytes(),
        ));

        if capabilities.contains(ServerCapabilities::GSS_ACCEPTOR) {
            attributes.push(Attribute::new(
                dictionary.type_by_name(GSS_ACCEPTOR_SERVICE_NAME)?,
                GSS_ACCEPTOR_SERVICE,
            ));
            attributes.push(Attribute::new(
                dictionary.type_by_name(GSS_ACCEPTOR_HOST_NAME)?,
                self.acceptor_host_name.as_bytes(),
            ));
        }

        Ok(attributes)
    }
}

impl fmt::Debug for AuthRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthRequest")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("acceptor_host_name", &self.acceptor_host_name)
            .finish()
    }
}

/// The name of this host, or [`FALLBACK_HOST_NAME`] if the system doesn't report a usable one.
///
/// This is the name the system reports as is. It is not resolved to a canonical (reverse DNS) name, so it
/// may be a short name where the acceptor expects a fully qualified one; set the acceptor host name
/// explicitly in that case.
pub fn local_host_name() -> String {
    hostname::get()
        .ok()
        .and_then(|name| name.into_string().ok())
        .filter(|name| !name.trim().is_empty())
        .unwrap_or_else(|| FALLBACK_HOST_NAME.to_owned())
}
