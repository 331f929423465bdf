//! Name-based access to the attributes of a RADIUS reply.

use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;

use crate::{AttributeList, Dictionary, UnknownAttribute, SAML_AAA_ASSERTION};


/// Looks up reply attributes by their dictionary name.
#[derive(Debug, Clone, Copy)]
pub struct AttributeFilter<'a> {
    attributes: &'a AttributeList,
    dictionary: &'a Dictionary,
}

impl<'a> AttributeFilter<'a> {
    /// Creates a filter over a list of attributes, resolving names through `dictionary`.
    pub fn new(attributes: &'a AttributeList, dictionary: &'a Dictionary) -> Self {
        Self {
            attributes,
            dictionary,
        }
    }

    /// Returns every value of the named attribute, in the order they appear in the list.
    ///
    /// A registered attribute that is not present yields an empty vector.
    pub fn get(&self, name: &str) -> Result<Vec<&'a [u8]>, UnknownAttribute> {
        let attribute_type = self.dictionary.type_by_name(name)?;
        Ok(self.attributes.values(attribute_type).collect())
    }

    /// The underlying attribute list.
    pub fn attributes(&self) -> &'a AttributeList {
        self.attributes
    }
}

/// Error returned when the SAML assertion can't be taken from a reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssertionError {
    /// The dictionary doesn't define the assertion attribute.
    Unknown(UnknownAttribute),

    /// The reassembled fragments are not valid UTF-8.
    NotText,
}

impl fmt::Display for AssertionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unknown(unknown) => write!(f, "SAML assertion unavailable: {unknown}"),
            Self::NotText => write!(f, "SAML assertion is not valid UTF-8 text"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for AssertionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Unknown(unknown) => Some(unknown),
            Self::NotText => None,
        }
    }
}

impl From<UnknownAttribute> for AssertionError {
    fn from(value: UnknownAttribute) -> Self {
        Self::Unknown(value)
    }
}

/// Reassembles a SAML assertion that a server split over several `SAML-AAA-Assertion` attributes.
#[derive(Debug, Clone, Copy)]
pub struct SamlAssertionFilter<'a> {
    inner: AttributeFilter<'a>,
}

impl<'a> SamlAssertionFilter<'a> {
    /// Creates a filter over the attributes of an Access-Accept.
    pub fn new(attributes: &'a AttributeList, dictionary: &'a Dictionary) -> Self {
        Self {
            inner: AttributeFilter::new(attributes, dictionary),
        }
    }

    /// Concatenates the assertion fragments, in reply order, and decodes the result as UTF-8.
    ///
    /// Fragments are joined as raw bytes before decoding, since servers may split in the middle of a
    /// multi-byte character. A reply without the attribute yields an empty string.
    pub fn assertion(&self) -> Result<String, AssertionError> {
        let fragments = self.inner.get(SAML_AAA_ASSERTION)?;

        let mut assertion = Vec::with_capacity(fragments.iter().map(|f| f.len()).sum());
        for fragment in fragments {
            assertion.extend_from_slice(fragment);
        }

        String::from_utf8(assertion).map_err(|_| AssertionError::NotText)
    }
}
