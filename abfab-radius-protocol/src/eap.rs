//! EAP ([RFC3748]) message framing and its transport in RADIUS EAP-Message attributes ([RFC3579]).
//!
//! Only the pieces a RADIUS client needs to drive EAP-MD5 are provided; computing the MD5 response
//! itself is left to the caller.
//!
//! [RFC3748]: https://www.rfc-editor.org/rfc/rfc3748.html
//! [RFC3579]: https://www.rfc-editor.org/rfc/rfc3579.html

use alloc::vec::Vec;
use core::fmt;

use byteorder::{ByteOrder, NetworkEndian};
use getset::{CopyGetters, Getters};
use num_enum::{IntoPrimitive, TryFromPrimitive, TryFromPrimitiveError};

use crate::{Attribute, AttributeList, StandardType, MAX_ATTRIBUTE_VALUE_LEN};

#[cfg(test)]
mod tests;

/// The Identity method type.
pub const IDENTITY: u8 = 1;

/// The Notification method type.
pub const NOTIFICATION: u8 = 2;

/// The legacy Nak method type, only valid in responses.
pub const NAK: u8 = 3;

/// The MD5-Challenge method type ([RFC3748 section 5.4]).
///
/// [RFC3748 section 5.4]: https://www.rfc-editor.org/rfc/rfc3748.html#section-5.4
pub const MD5_CHALLENGE: u8 = 4;

/// Code + identifier + length.
const HEADER_SIZE: usize = 4;

/// The size of the MD5 response value.
pub const MD5_RESPONSE_SIZE: usize = 16;

/// The code of an EAP message.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, TryFromPrimitive, IntoPrimitive)]
pub enum Code {
    /// Request from the authenticator.
    Request = 1,

    /// Response from the peer.
    Response = 2,

    /// Authentication succeeded.
    Success = 3,

    /// Authentication failed.
    Failure = 4,
}

impl Code {
    fn has_method(self) -> bool {
        matches!(self, Self::Request | Self::Response)
    }
}

/// Error when decoding an EAP message.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// The buffer or the declared length is shorter than the message header requires.
    TooShort {
        /// The minimum size for this message.
        expected: usize,
        /// The size actually available.
        actual: usize,
    },

    /// The message code was not one of the four defined by RFC3748.
    InvalidCode(u8),

    /// The length field exceeds the buffer.
    LengthMismatch {
        /// The length declared in the header.
        declared: u16,
        /// The size of the buffer.
        actual: usize,
    },

    /// An MD5-Challenge request whose value size doesn't fit in its data.
    InvalidChallenge,
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TooShort { expected, actual } => write!(
                f,
                "EAP message too short: expected at least {expected} bytes, got {actual}"
            ),
            Self::InvalidCode(code) => write!(f, "invalid EAP code {code}"),
            Self::LengthMismatch { declared, actual } => write!(
                f,
                "EAP length field {declared} exceeds buffer of {actual} bytes"
            ),
            Self::InvalidChallenge => write!(f, "malformed EAP-MD5 challenge value"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for DecodeError {}

impl From<TryFromPrimitiveError<Code>> for DecodeError {
    fn from(value: TryFromPrimitiveError<Code>) -> Self {
        Self::InvalidCode(value.number)
    }
}

/// A single EAP message.
#[derive(Debug, Clone, PartialEq, Eq, Getters, CopyGetters)]
pub struct Message {
    /// The message code.
    #[getset(get_copy = "pub")]
    code: Code,

    /// The identifier used to match responses to requests.
    #[getset(get_copy = "pub")]
    identifier: u8,

    /// The method type, present for requests and responses only.
    #[getset(get_copy = "pub")]
    method: Option<u8>,

    /// The method-specific data following the type octet.
    #[getset(get = "pub")]
    data: Vec<u8>,
}

impl Message {
    /// Builds a response to the request with `identifier`.
    pub fn response<D: Into<Vec<u8>>>(identifier: u8, method: u8, data: D) -> Self {
        Self {
            code: Code::Response,
            identifier,
            method: Some(method),
            data: data.into(),
        }
    }

    /// Builds an Identity response announcing `identity`.
    pub fn identity_response(identifier: u8, identity: &str) -> Self {
        Self::response(identifier, IDENTITY, identity.as_bytes())
    }

    /// Builds an MD5-Challenge response carrying the 16-byte digest.
    pub fn md5_challenge_response(identifier: u8, digest: &[u8; MD5_RESPONSE_SIZE]) -> Self {
        let mut data = Vec::with_capacity(1 + MD5_RESPONSE_SIZE);
        data.push(MD5_RESPONSE_SIZE as u8);
        data.extend_from_slice(digest);

        Self::response(identifier, MD5_CHALLENGE, data)
    }

    /// Builds a request; mostly useful for servers and tests.
    pub fn request<D: Into<Vec<u8>>>(identifier: u8, method: u8, data: D) -> Self {
        Self {
            code: Code::Request,
            identifier,
            method: Some(method),
            data: data.into(),
        }
    }

    /// Builds a Success or Failure message, which carry no method or data.
    pub fn outcome(code: Code, identifier: u8) -> Self {
        Self {
            code,
            identifier,
            method: None,
            data: Vec::new(),
        }
    }

    /// Parses a message; bytes past the declared length are ignored as padding.
    pub fn decode(buffer: &[u8]) -> Result<Self, DecodeError> {
        if buffer.len() < HEADER_SIZE {
            return Err(DecodeError::TooShort {
                expected: HEADER_SIZE,
                actual: buffer.len(),
            });
        }

        let code = Code::try_from(buffer[0])?;
        let identifier = buffer[1];
        let declared = NetworkEndian::read_u16(&buffer[2..HEADER_SIZE]);
        let length = usize::from(declared);

        if length > buffer.len() {
            return Err(DecodeError::LengthMismatch {
                declared,
                actual: buffer.len(),
            });
        }

        let minimum = if code.has_method() {
            HEADER_SIZE + 1
        } else {
            HEADER_SIZE
        };

        if length < minimum {
            return Err(DecodeError::TooShort {
                expected: minimum,
                actual: length,
            });
        }

        let (method, data) = if code.has_method() {
            (Some(buffer[HEADER_SIZE]), buffer[HEADER_SIZE + 1..length].to_vec())
        } else {
            (None, Vec::new())
        };

        Ok(Self {
            code,
            identifier,
            method,
            data,
        })
    }

    /// The full wire size of this message.
    pub fn wire_size(&self) -> usize {
        HEADER_SIZE + self.method.map_or(0, |_| 1 + self.data.len())
    }

    /// Serializes the message.
    pub fn encode(&self) -> Vec<u8> {
        let mut buffer = Vec::with_capacity(self.wire_size());
        buffer.push(self.code.into());
        buffer.push(self.identifier);
        buffer.extend_from_slice(&[0, 0]);
        NetworkEndian::write_u16(&mut buffer[2..HEADER_SIZE], self.wire_size() as u16);

        if let Some(method) = self.method {
            buffer.push(method);
            buffer.extend_from_slice(&self.data);
        }

        buffer
    }

    /// Returns the challenge value of an MD5-Challenge request.
    ///
    /// Any trailing name is ignored.
    pub fn md5_challenge(&self) -> Result<&[u8], DecodeError> {
        if self.code != Code::Request || self.method != Some(MD5_CHALLENGE) {
            return Err(DecodeError::InvalidChallenge);
        }

        let (&value_size, rest) = self
            .data
            .split_first()
            .ok_or(DecodeError::InvalidChallenge)?;
        let value_size = usize::from(value_size);

        if value_size == 0 || value_size > rest.len() {
            return Err(DecodeError::InvalidChallenge);
        }

        Ok(&rest[..value_size])
    }
}

/// Splits an encoded EAP message over as many EAP-Message attributes as needed.
pub fn to_attributes(encoded: &[u8]) -> impl Iterator<Item = Attribute> + '_ {
    encoded
        .chunks(MAX_ATTRIBUTE_VALUE_LEN)
        .map(|chunk| Attribute::new(StandardType::EapMessage.into(), chunk))
}

/// Reassembles the EAP message spread across the EAP-Message attributes of a packet.
///
/// Returns `None` if the packet carries no EAP-Message attribute.
pub fn from_attributes(attributes: &AttributeList) -> Option<Vec<u8>> {
    let mut fragments = attributes
        .values(StandardType::EapMessage.into())
        .peekable();
    fragments.peek()?;

    Some(fragments.fold(Vec::new(), |mut message, fragment| {
        message.extend_from_slice(fragment);
        message
    }))
}
