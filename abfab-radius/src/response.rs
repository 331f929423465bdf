use abfab_radius_protocol::AttributeList;

use crate::ClientError;

/// The outcome of authenticating against a single server.
#[must_use = "An Access-Reject is not reported as an error, so the variant must be checked."]
#[derive(Debug)]
pub enum AuthResult {
    /// The server accepted the credentials; holds the attributes of the Access-Accept in reply order.
    Accept(AttributeList),

    /// The server rejected the credentials.
    Reject,

    /// The exchange could not be completed.
    Error(ClientError),
}

impl AuthResult {
    /// Whether the server accepted the credentials.
    pub fn is_accept(&self) -> bool {
        matches!(self, Self::Accept(_))
    }

    /// Whether the server rejected the credentials.
    pub fn is_reject(&self) -> bool {
        matches!(self, Self::Reject)
    }

    /// Whether the exchange failed before the server gave a verdict.
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }
}

impl From<ClientError> for AuthResult {
    fn from(value: ClientError) -> Self {
        Self::Error(value)
    }
}
