use std::io;

use thiserror::Error;

use abfab_radius_protocol as protocol;
use abfab_radius_protocol::{eap, UnknownAttribute};

/// An error during a RADIUS exchange with a single server.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum ClientError {
    /// An error occurred when resolving the server or using its socket.
    #[error(transparent)]
    IOError(#[from] io::Error),

    /// An attribute needed for the request is not registered in the active dictionary.
    ///
    /// This is also what every request fails with before [`init`](crate::init) has been called.
    #[error("cannot build request: {0}")]
    InvalidAttribute(#[from] UnknownAttribute),

    /// Supplied data could not be encoded into a request.
    #[error("request could not be constructed: {0}")]
    InvalidPacketData(String),

    /// The password was longer than the 128 bytes User-Password can carry.
    #[error("password was longer than 128 bytes")]
    PasswordTooLong,

    /// The server's reply was malformed, unauthenticated or didn't fit the exchange.
    #[error("RADIUS protocol violation: {0}")]
    ProtocolViolation(String),

    /// No reply arrived within the socket timeout on any attempt.
    #[error("no reply from server after {attempts} attempt(s)")]
    Timeout {
        /// The number of times the request was sent.
        attempts: u32,
    },
}

#[doc(hidden)]
impl From<protocol::EncodeError> for ClientError {
    fn from(value: protocol::EncodeError) -> Self {
        Self::InvalidPacketData(value.to_string())
    }
}

// malformed attributes in a reply are the server's fault, not ours
#[doc(hidden)]
impl From<protocol::DecodeError> for ClientError {
    fn from(value: protocol::DecodeError) -> Self {
        Self::ProtocolViolation(format!("malformed reply attributes: {value}"))
    }
}

#[doc(hidden)]
impl From<eap::DecodeError> for ClientError {
    fn from(value: eap::DecodeError) -> Self {
        Self::ProtocolViolation(format!("malformed EAP message: {value}"))
    }
}
