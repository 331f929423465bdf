//! # abfab-radius-protocol
//!
//! I/O-free building blocks for ABFAB ([RFC7831](https://www.rfc-editor.org/rfc/rfc7831)) RADIUS clients:
//! an attribute dictionary, ordered attribute lists with Vendor-Specific framing, attribute filters
//! (including reassembly of the Moonshot `SAML-AAA-Assertion` attribute) and EAP message framing.
//!
//! Packet encoding, authenticators and socket handling are left to a RADIUS library; this crate only
//! deals with the attribute values that travel inside those packets.

#![no_std]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]
#![warn(missing_docs)]

extern crate alloc;

#[cfg(feature = "std")]
extern crate std;

mod attributes;
pub use attributes::{Attribute, AttributeList, DecodeError, EncodeError};

mod capabilities;
pub use capabilities::ServerCapabilities;

mod dictionary;
pub use dictionary::{
    AttributeType, Dictionary, DictionaryConflict, DictionaryEntry, StandardType, UnknownAttribute,
};
pub use dictionary::{
    CHAP_CHALLENGE, CHAP_PASSWORD, EAP_MESSAGE, GSS_ACCEPTOR_HOST_NAME,
    GSS_ACCEPTOR_REALM_NAME, GSS_ACCEPTOR_SERVICE_NAME, GSS_ACCEPTOR_SERVICE_SPECIFICS,
    MESSAGE_AUTHENTICATOR, REPLY_MESSAGE, SAML_AAA_ASSERTION, STATE, UKERNA_VENDOR_ID, USER_NAME,
    USER_PASSWORD,
};

pub mod eap;

mod filter;
pub use filter::{AssertionError, AttributeFilter, SamlAssertionFilter};

/// The maximum number of value bytes a single RADIUS attribute can carry.
///
/// The length octet covers the type and length octets as well, hence 255 - 2.
pub const MAX_ATTRIBUTE_VALUE_LEN: usize = 253;
