//! RADIUS attribute dictionary, mapping attribute names to wire types.

use alloc::borrow::Cow;
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use core::fmt;

use getset::{CopyGetters, Getters};
use num_enum::{IntoPrimitive, TryFromPrimitive};


/// Name of the User-Name attribute ([RFC2865 section 5.1]).
///
/// [RFC2865 section 5.1]: https://www.rfc-editor.org/rfc/rfc2865.html#section-5.1
pub const USER_NAME: &str = "User-Name";

/// Name of the User-Password attribute ([RFC2865 section 5.2]).
///
/// [RFC2865 section 5.2]: https://www.rfc-editor.org/rfc/rfc2865.html#section-5.2
pub const USER_PASSWORD: &str = "User-Password";

/// Name of the CHAP-Password attribute.
pub const CHAP_PASSWORD: &str = "CHAP-Password";

/// Name of the Reply-Message attribute.
pub const REPLY_MESSAGE: &str = "Reply-Message";

/// Name of the State attribute, echoed back to the server during challenge exchanges.
pub const STATE: &str = "State";

/// Name of the CHAP-Challenge attribute.
pub const CHAP_CHALLENGE: &str = "CHAP-Challenge";

/// Name of the EAP-Message attribute ([RFC3579 section 3.1]).
///
/// [RFC3579 section 3.1]: https://www.rfc-editor.org/rfc/rfc3579.html#section-3.1
pub const EAP_MESSAGE: &str = "EAP-Message";

/// Name of the Message-Authenticator attribute ([RFC3579 section 3.2]).
///
/// [RFC3579 section 3.2]: https://www.rfc-editor.org/rfc/rfc3579.html#section-3.2
pub const MESSAGE_AUTHENTICATOR: &str = "Message-Authenticator";

/// Name of the GSS-Acceptor-Service-Name attribute ([RFC7055 section 3.4]).
///
/// [RFC7055 section 3.4]: https://www.rfc-editor.org/rfc/rfc7055.html#section-3.4
pub const GSS_ACCEPTOR_SERVICE_NAME: &str = "GSS-Acceptor-Service-Name";

/// Name of the GSS-Acceptor-Host-Name attribute.
pub const GSS_ACCEPTOR_HOST_NAME: &str = "GSS-Acceptor-Host-Name";

/// Name of the GSS-Acceptor-Service-Specifics attribute.
pub const GSS_ACCEPTOR_SERVICE_SPECIFICS: &str = "GSS-Acceptor-Service-Specifics";

/// Name of the GSS-Acceptor-Realm-Name attribute.
pub const GSS_ACCEPTOR_REALM_NAME: &str = "GSS-Acceptor-Realm-Name";

/// Name of the Moonshot attribute carrying a (possibly fragmented) SAML assertion.
pub const SAML_AAA_ASSERTION: &str = "SAML-AAA-Assertion";

/// IANA private enterprise number of UKERNA (Janet), which owns the Moonshot vendor attributes.
pub const UKERNA_VENDOR_ID: u32 = 25622;

/// Standard (non vendor-specific) RADIUS attribute types known to this crate.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, TryFromPrimitive, IntoPrimitive)]
pub enum StandardType {
    /// User-Name (1).
    UserName = 1,
    /// User-Password (2).
    UserPassword = 2,
    /// CHAP-Password (3).
    ChapPassword = 3,
    /// Reply-Message (18).
    ReplyMessage = 18,
    /// State (24).
    State = 24,
    /// Vendor-Specific (26).
    VendorSpecific = 26,
    /// CHAP-Challenge (60).
    ChapChallenge = 60,
    /// EAP-Message (79).
    EapMessage = 79,
    /// Message-Authenticator (80).
    MessageAuthenticator = 80,
    /// GSS-Acceptor-Service-Name (164).
    GssAcceptorServiceName = 164,
    /// GSS-Acceptor-Host-Name (165).
    GssAcceptorHostName = 165,
    /// GSS-Acceptor-Service-Specifics (166).
    GssAcceptorServiceSpecifics = 166,
    /// GSS-Acceptor-Realm-Name (167).
    GssAcceptorRealmName = 167,
}

/// The wire identity of an attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttributeType {
    /// A top-level attribute, identified by its type octet.
    Standard(u8),

    /// A sub-attribute carried inside Vendor-Specific (26), identified by vendor and vendor type.
    Vendor {
        /// The vendor's private enterprise number.
        vendor_id: u32,
        /// The vendor-assigned attribute type.
        code: u8,
    },
}

impl AttributeType {
    /// Returns the matching [`StandardType`] if this is a top-level attribute known to this crate.
    pub fn standard(self) -> Option<StandardType> {
        match self {
            Self::Standard(code) => StandardType::try_from(code).ok(),
            Self::Vendor { .. } => None,
        }
    }
}

impl From<StandardType> for AttributeType {
    fn from(value: StandardType) -> Self {
        Self::Standard(value.into())
    }
}

impl fmt::Display for AttributeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Standard(code) => write!(f, "{code}"),
            Self::Vendor { vendor_id, code } => write!(f, "26/{vendor_id}/{code}"),
        }
    }
}

/// A named attribute registered in a [`Dictionary`].
#[derive(Debug, Clone, PartialEq, Eq, Getters, CopyGetters)]
pub struct DictionaryEntry {
    /// The attribute name, e.g. `User-Name`.
    #[getset(get = "pub")]
    name: Cow<'static, str>,

    /// The wire type the name resolves to.
    #[getset(get_copy = "pub")]
    attribute_type: AttributeType,
}

impl DictionaryEntry {
    /// Creates a dictionary entry.
    pub fn new<N: Into<Cow<'static, str>>>(name: N, attribute_type: AttributeType) -> Self {
        Self {
            name: name.into(),
            attribute_type,
        }
    }

    const fn builtin(name: &'static str, attribute_type: AttributeType) -> Self {
        Self {
            name: Cow::Borrowed(name),
            attribute_type,
        }
    }
}

const fn standard(code: StandardType) -> AttributeType {
    AttributeType::Standard(code as u8)
}

/// Attributes every client dictionary starts out with.
const BUILTIN_ENTRIES: [DictionaryEntry; 13] = [
    DictionaryEntry::builtin(USER_NAME, standard(StandardType::UserName)),
    DictionaryEntry::builtin(USER_PASSWORD, standard(StandardType::UserPassword)),
    DictionaryEntry::builtin(CHAP_PASSWORD, standard(StandardType::ChapPassword)),
    DictionaryEntry::builtin(REPLY_MESSAGE, standard(StandardType::ReplyMessage)),
    DictionaryEntry::builtin(STATE, standard(StandardType::State)),
    DictionaryEntry::builtin(CHAP_CHALLENGE, standard(StandardType::ChapChallenge)),
    DictionaryEntry::builtin(EAP_MESSAGE, standard(StandardType::EapMessage)),
    DictionaryEntry::builtin(
        MESSAGE_AUTHENTICATOR,
        standard(StandardType::MessageAuthenticator),
    ),
    DictionaryEntry::builtin(
        GSS_ACCEPTOR_SERVICE_NAME,
        standard(StandardType::GssAcceptorServiceName),
    ),
    DictionaryEntry::builtin(
        GSS_ACCEPTOR_HOST_NAME,
        standard(StandardType::GssAcceptorHostName),
    ),
    DictionaryEntry::builtin(
        GSS_ACCEPTOR_SERVICE_SPECIFICS,
        standard(StandardType::GssAcceptorServiceSpecifics),
    ),
    DictionaryEntry::builtin(
        GSS_ACCEPTOR_REALM_NAME,
        standard(StandardType::GssAcceptorRealmName),
    ),
    // Moonshot places the assertion in the UKERNA vendor space rather than the RFC7833 extended types
    DictionaryEntry::builtin(
        SAML_AAA_ASSERTION,
        AttributeType::Vendor {
            vendor_id: UKERNA_VENDOR_ID,
            code: 132,
        },
    ),
];

/// Error returned when a name is not registered in a [`Dictionary`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownAttribute {
    name: String,
}

impl UnknownAttribute {
    /// Creates an error for the given attribute name.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
        }
    }

    /// The name that failed to resolve.
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for UnknownAttribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "attribute {} is not registered in the dictionary",
            self.name
        )
    }
}

#[cfg(feature = "std")]
impl std::error::Error for UnknownAttribute {}

/// Error returned when a registration clashes with an existing dictionary entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DictionaryConflict {
    /// The entry that was being registered.
    pub requested: DictionaryEntry,

    /// The entry already present under the same name or wire type.
    pub existing: DictionaryEntry,
}

impl fmt::Display for DictionaryConflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "cannot register {} as {}: conflicts with {} ({})",
            self.requested.name,
            self.requested.attribute_type,
            self.existing.name,
            self.existing.attribute_type
        )
    }
}

#[cfg(feature = "std")]
impl std::error::Error for DictionaryConflict {}

/// A set of named attributes.
///
/// Names are matched exactly (case-sensitive), and each name and wire type can only be registered once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dictionary {
    entries: Vec<DictionaryEntry>,
}

impl Dictionary {
    /// A dictionary with no registered attributes.
    pub fn empty() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// The dictionary holding the standard, GSS acceptor and Moonshot attributes used by ABFAB clients.
    pub fn standard() -> Self {
        Self {
            entries: BUILTIN_ENTRIES.to_vec(),
        }
    }

    /// Registers an attribute.
    ///
    /// Registering an identical entry twice is a no-op.
    pub fn register(&mut self, entry: DictionaryEntry) -> Result<(), DictionaryConflict> {
        let clash = self
            .entries
            .iter()
            .find(|existing| {
                existing.name == entry.name || existing.attribute_type == entry.attribute_type
            })
            .cloned();

        match clash {
            Some(existing) if existing == entry => Ok(()),
            Some(existing) => Err(DictionaryConflict {
                requested: entry,
                existing,
            }),
            None => {
                self.entries.push(entry);
                Ok(())
            }
        }
    }

    /// Resolves an attribute name to its wire type.
    pub fn type_by_name(&self, name: &str) -> Result<AttributeType, UnknownAttribute> {
        self.entries
            .iter()
            .find(|entry| entry.name == name)
            .map(DictionaryEntry::attribute_type)
            .ok_or_else(|| UnknownAttribute::new(name))
    }

    /// Looks up the registered name of a wire type.
    pub fn name_by_type(&self, attribute_type: AttributeType) -> Option<&str> {
        self.entries
            .iter()
            .find(|entry| entry.attribute_type == attribute_type)
            .map(|entry| entry.name.as_ref())
    }

    /// Iterates over registered entries in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &DictionaryEntry> {
        self.entries.iter()
    }

    /// The number of registered attributes.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no attributes are registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for Dictionary {
    fn default() -> Self {
        Self::standard()
    }
}
