//! Ordered attribute lists and their Vendor-Specific framing.

use alloc::vec::Vec;
use core::fmt;

use byteorder::{ByteOrder, NetworkEndian};
use getset::{CopyGetters, Getters};

use crate::{AttributeType, StandardType, MAX_ATTRIBUTE_VALUE_LEN};


/// Size of the vendor id at the start of a Vendor-Specific value ([RFC2865 section 5.26]).
///
/// [RFC2865 section 5.26]: https://www.rfc-editor.org/rfc/rfc2865.html#section-5.26
const VENDOR_ID_SIZE: usize = 4;

/// Vendor type + vendor length octets preceding each vendor sub-attribute value.
const VENDOR_HEADER_SIZE: usize = 2;

/// Type + length octets preceding each top-level attribute value.
const ATTRIBUTE_HEADER_SIZE: usize = 2;

/// The largest value a vendor sub-attribute can carry inside one Vendor-Specific attribute.
pub(crate) const MAX_VENDOR_VALUE_LEN: usize =
    MAX_ATTRIBUTE_VALUE_LEN - VENDOR_ID_SIZE - VENDOR_HEADER_SIZE;

/// A single RADIUS attribute value together with its wire type.
#[derive(Clone, PartialEq, Eq, Debug, Hash, Getters, CopyGetters)]
pub struct Attribute {
    /// The attribute's wire type.
    #[getset(get_copy = "pub")]
    attribute_type: AttributeType,

    /// The raw attribute value, without any Vendor-Specific framing.
    #[getset(get = "pub")]
    value: Vec<u8>,
}

/// Error when an attribute cannot be put on the wire.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EncodeError {
    /// The value does not fit in a single attribute.
    ValueTooLong {
        /// The type of the offending attribute.
        attribute_type: AttributeType,
        /// The length of the value that was supplied.
        length: usize,
    },
}

impl fmt::Display for EncodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ValueTooLong {
                attribute_type,
                length,
            } => write!(
                f,
                "value of attribute {attribute_type} is {length} bytes, which does not fit in one attribute"
            ),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for EncodeError {}

/// Error when the attribute section of a packet is malformed.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// An attribute length octet pointed past the end of the buffer, or was smaller than the header.
    BadAttributeLength {
        /// The type octet of the offending attribute.
        attribute_type: u8,
        /// The length octet that was read.
        length: u8,
    },

    /// A Vendor-Specific value was too short to hold a vendor id and a sub-attribute header.
    TruncatedVendorSpecific,

    /// A vendor sub-attribute length didn't match the space left in its Vendor-Specific attribute.
    BadVendorLength {
        /// The vendor the sub-attribute belongs to.
        vendor_id: u32,
        /// The vendor length octet that was read.
        length: u8,
    },
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BadAttributeLength {
                attribute_type,
                length,
            } => write!(f, "attribute {attribute_type} has invalid length {length}"),
            Self::TruncatedVendorSpecific => {
                write!(f, "Vendor-Specific attribute too short for its header")
            }
            Self::BadVendorLength { vendor_id, length } => write!(
                f,
                "sub-attribute of vendor {vendor_id} has invalid length {length}"
            ),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for DecodeError {}

impl Attribute {
    /// Creates an attribute from a wire type and a raw value.
    pub fn new<V: Into<Vec<u8>>>(attribute_type: AttributeType, value: V) -> Self {
        Self {
            attribute_type,
            value: value.into(),
        }
    }

    /// Consumes the attribute, returning its value.
    pub fn into_value(self) -> Vec<u8> {
        self.value
    }

    /// Returns the top-level type octet and value as they appear on the wire.
    ///
    /// Vendor attributes are wrapped in a Vendor-Specific (26) value in the format
    /// suggested by RFC2865: vendor id, vendor type, vendor length, value.
    pub fn to_wire(&self) -> Result<(u8, Vec<u8>), EncodeError> {
        match self.attribute_type {
            AttributeType::Standard(code) => {
                if self.value.len() > MAX_ATTRIBUTE_VALUE_LEN {
                    return Err(self.too_long());
                }

                Ok((code, self.value.clone()))
            }
            AttributeType::Vendor { vendor_id, code } => {
                if self.value.len() > MAX_VENDOR_VALUE_LEN {
                    return Err(self.too_long());
                }

                let mut wire = Vec::with_capacity(VENDOR_ID_SIZE + VENDOR_HEADER_SIZE + self.value.len());
                wire.resize(VENDOR_ID_SIZE, 0);
                NetworkEndian::write_u32(&mut wire[..VENDOR_ID_SIZE], vendor_id);

                // length check above keeps this within a u8
                wire.push(code);
                wire.push((VENDOR_HEADER_SIZE + self.value.len()) as u8);
                wire.extend_from_slice(&self.value);

                Ok((StandardType::VendorSpecific.into(), wire))
            }
        }
    }

    /// Parses one top-level attribute value, unwrapping Vendor-Specific framing.
    ///
    /// A single Vendor-Specific attribute may hold several sub-attributes, so this can yield more than one attribute.
    pub fn from_wire(code: u8, value: &[u8]) -> Result<Vec<Attribute>, DecodeError> {
        if code != u8::from(StandardType::VendorSpecific) {
            return Ok(alloc::vec![Attribute::new(AttributeType::Standard(code), value)]);
        }

        if value.len() < VENDOR_ID_SIZE + VENDOR_HEADER_SIZE {
            return Err(DecodeError::TruncatedVendorSpecific);
        }

        let vendor_id = NetworkEndian::read_u32(&value[..VENDOR_ID_SIZE]);
        let mut remaining = &value[VENDOR_ID_SIZE..];
        let mut attributes = Vec::new();

        while !remaining.is_empty() {
            if remaining.len() < VENDOR_HEADER_SIZE {
                return Err(DecodeError::TruncatedVendorSpecific);
            }

            let vendor_code = remaining[0];
            let length = remaining[1];
            let length_usize = usize::from(length);

            if length_usize < VENDOR_HEADER_SIZE || length_usize > remaining.len() {
                return Err(DecodeError::BadVendorLength { vendor_id, length });
            }

            attributes.push(Attribute::new(
                AttributeType::Vendor {
                    vendor_id,
                    code: vendor_code,
                },
                &remaining[VENDOR_HEADER_SIZE..length_usize],
            ));
            remaining = &remaining[length_usize..];
        }

        Ok(attributes)
    }

    fn too_long(&self) -> EncodeError {
        EncodeError::ValueTooLong {
            attribute_type: self.attribute_type,
            length: self.value.len(),
        }
    }
}

/// An ordered multi-map of attributes.
///
/// Attributes keep the order they were added or received in; values of a repeated attribute are never
/// reordered relative to each other.
#[derive(Clone, Default, PartialEq, Eq, Debug)]
pub struct AttributeList {
    attributes: Vec<Attribute>,
}

impl AttributeList {
    /// Creates an empty attribute list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses the attribute section of a RADIUS packet (everything after the 20-byte header).
    pub fn from_wire(mut buffer: &[u8]) -> Result<Self, DecodeError> {
        let mut list = Self::new();

        while !buffer.is_empty() {
            if buffer.len() < ATTRIBUTE_HEADER_SIZE {
                return Err(DecodeError::BadAttributeLength {
                    attribute_type: buffer[0],
                    length: 0,
                });
            }

            let code = buffer[0];
            let length = buffer[1];
            let length_usize = usize::from(length);

            if length_usize < ATTRIBUTE_HEADER_SIZE || length_usize > buffer.len() {
                return Err(DecodeError::BadAttributeLength {
                    attribute_type: code,
                    length,
                });
            }

            list.attributes.extend(Attribute::from_wire(
                code,
                &buffer[ATTRIBUTE_HEADER_SIZE..length_usize],
            )?);
            buffer = &buffer[length_usize..];
        }

        Ok(list)
    }

    /// Appends an attribute.
    pub fn push(&mut self, attribute: Attribute) {
        self.attributes.push(attribute);
    }

    /// Iterates over all attributes in order.
    pub fn iter(&self) -> core::slice::Iter<'_, Attribute> {
        self.attributes.iter()
    }

    /// Iterates over the values of every attribute with the given type, in container order.
    pub fn values(&self, attribute_type: AttributeType) -> impl Iterator<Item = &[u8]> {
        self.attributes
            .iter()
            .filter(move |attribute| attribute.attribute_type == attribute_type)
            .map(|attribute| attribute.value.as_slice())
    }

    /// The value of the first attribute with the given type, if any.
    pub fn first(&self, attribute_type: AttributeType) -> Option<&[u8]> {
        self.values(attribute_type).next()
    }

    /// Whether an attribute with the given type is present.
    pub fn contains(&self, attribute_type: AttributeType) -> bool {
        self.first(attribute_type).is_some()
    }

    /// The number of attributes in the list.
    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    /// Whether the list holds no attributes.
    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }
}

impl Extend<Attribute> for AttributeList {
    fn extend<T: IntoIterator<Item = Attribute>>(&mut self, iter: T) {
        self.attributes.extend(iter);
    }
}

impl FromIterator<Attribute> for AttributeList {
    fn from_iter<T: IntoIterator<Item = Attribute>>(iter: T) -> Self {
        Self {
            attributes: iter.into_iter().collect(),
        }
    }
}

impl<'list> IntoIterator for &'list AttributeList {
    type Item = &'list Attribute;
    type IntoIter = core::slice::Iter<'list, Attribute>;

    fn into_iter(self) -> Self::IntoIter {
        self.attributes.iter()
    }
}
