//! Extraction of attribute values from SAML 2.0 assertions.
//!
//! Only as much of the SAML schema is understood as principal mapping needs: the `Assertion` root element,
//! its first `AttributeStatement`, and the `Attribute`s inside it with their typed values.

use std::sync::OnceLock;

use getset::Getters;
use roxmltree::{Document, Node, ParsingOptions};
use thiserror::Error;
use tracing::trace;


/// The SAML 2.0 assertion namespace.
pub const SAML2_ASSERTION_NS: &str = "urn:oasis:names:tc:SAML:2.0:assertion";

/// The XML Schema instance namespace, home of `xsi:type`.
pub const XSI_NS: &str = "http://www.w3.org/2001/XMLSchema-instance";

/// The XML Schema namespace, home of `xs:string`.
pub const XS_NS: &str = "http://www.w3.org/2001/XMLSchema";

const ASSERTION: &str = "Assertion";
const ATTRIBUTE_STATEMENT: &str = "AttributeStatement";
const ATTRIBUTE: &str = "Attribute";
const ATTRIBUTE_VALUE: &str = "AttributeValue";

// parsed once by bootstrap() to check the parser setup end to end
const SELF_CHECK_ASSERTION: &str = r#"<saml:Assertion xmlns:saml="urn:oasis:names:tc:SAML:2.0:assertion" xmlns:xs="http://www.w3.org/2001/XMLSchema" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance" ID="self-check" Version="2.0"><saml:AttributeStatement><saml:Attribute Name="urn:self-check"><saml:AttributeValue xsi:type="xs:string">ok</saml:AttributeValue></saml:Attribute></saml:AttributeStatement></saml:Assertion>"#;

static BOOTSTRAPPED: OnceLock<()> = OnceLock::new();

/// An error when reading a SAML assertion.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SamlError {
    /// SAML support has not been initialized with [`init`](crate::init), or initialization failed.
    #[error("SAML parsing is not initialized")]
    Schema,

    /// The text is not well-formed XML, or uses a disallowed construct such as a DTD.
    #[error("malformed SAML assertion: {0}")]
    Parse(String),

    /// The document's root element is not a SAML 2.0 `Assertion`.
    #[error("document is not a SAML 2.0 assertion")]
    NotAnAssertion,

    /// The assertion has no `AttributeStatement`.
    #[error("no AttributeStatement found in the SAML assertion")]
    NoAttributeStatement,

    /// No attribute with the requested name prefix carries a string value.
    #[error("attribute {0} not found in SAML AttributeStatement")]
    AttributeNotFound(String),
}

impl SamlError {
    /// Whether this error means the requested attribute couldn't be located, as opposed to
    /// the document being unreadable.
    pub fn is_attribute_not_found(&self) -> bool {
        matches!(
            self,
            Self::AttributeNotFound(_) | Self::NoAttributeStatement | Self::NotAnAssertion
        )
    }
}

/// Readies SAML parsing, checking the parser setup against a known-good assertion.
pub(crate) fn bootstrap() -> Result<(), SamlError> {
    if BOOTSTRAPPED.get().is_some() {
        return Ok(());
    }

    let checked = parse_document(SELF_CHECK_ASSERTION)?;
    let statement = checked.attribute_statement()?;
    if statement.attribute_value("urn:self-check")? != "ok" {
        return Err(SamlError::Schema);
    }

    // a concurrent bootstrap may have won; either way it's done
    let _ = BOOTSTRAPPED.set(());
    trace!("SAML parsing bootstrapped");

    Ok(())
}

/// A typed `AttributeValue`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttributeValue {
    /// A value declared as `xs:string`.
    XsString(String),

    /// An untyped value, or one of a type outside the XML Schema namespace; holds its text content.
    XsAny(String),

    /// A value of some other XML Schema type, which isn't read.
    Other {
        /// The `xsi:type` as written in the document.
        xsi_type: String,
    },
}

impl AttributeValue {
    fn from_node(node: Node<'_, '_>) -> Self {
        let text = text_content(node);

        let Some(xsi_type) = node.attribute((XSI_NS, "type")) else {
            return Self::XsAny(text);
        };

        let (prefix, local) = match xsi_type.split_once(':') {
            Some((prefix, local)) => (Some(prefix), local),
            None => (None, xsi_type),
        };

        // only XML Schema types are known; anything else is read as untyped content
        match (node.lookup_namespace_uri(prefix), local) {
            (Some(XS_NS), "string") => Self::XsString(text),
            (Some(XS_NS), _) => Self::Other {
                xsi_type: xsi_type.to_owned(),
            },
            _ => Self::XsAny(text),
        }
    }

    /// The value as text, if it is a string or untyped value.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::XsString(text) | Self::XsAny(text) => Some(text),
            Self::Other { .. } => None,
        }
    }
}

/// A named attribute with its values in document order.
#[derive(Debug, Clone, PartialEq, Eq, Getters)]
pub struct SamlAttribute {
    /// The attribute's `Name`, usually a URN.
    #[getset(get = "pub")]
    name: String,

    /// The attribute's values.
    #[getset(get = "pub")]
    values: Vec<AttributeValue>,
}

impl SamlAttribute {
    /// Creates an attribute.
    pub fn new<N: Into<String>>(name: N, values: Vec<AttributeValue>) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }
}

/// The attributes of an `AttributeStatement`, in document order. Names may repeat.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttributeStatement {
    attributes: Vec<SamlAttribute>,
}

impl AttributeStatement {
    /// Creates a statement from its attributes.
    pub fn new(attributes: Vec<SamlAttribute>) -> Self {
        Self { attributes }
    }

    fn from_node(node: Node<'_, '_>) -> Self {
        let attributes = saml_children(node, ATTRIBUTE)
            .map(|attribute| {
                SamlAttribute::new(
                    attribute.attribute("Name").unwrap_or_default(),
                    saml_children(attribute, ATTRIBUTE_VALUE)
                        .map(AttributeValue::from_node)
                        .collect(),
                )
            })
            .collect();

        Self { attributes }
    }

    /// The statement's attributes.
    pub fn attributes(&self) -> &[SamlAttribute] {
        &self.attributes
    }

    /// Whether the statement holds any attributes.
    pub fn has_children(&self) -> bool {
        !self.attributes.is_empty()
    }

    /// Looks up an attribute by name prefix.
    ///
    /// Attributes are checked in document order, and the first one whose name starts with `urn` and whose first
    /// value is a string or untyped value provides the result. Further values of that attribute are ignored.
    /// A matching attribute with no values at all ends the search.
    pub fn attribute_value(&self, urn: &str) -> Result<String, SamlError> {
        let matching = self
            .attributes
            .iter()
            .filter(|attribute| attribute.name.starts_with(urn));

        for attribute in matching {
            let Some(first) = attribute.values.first() else {
                break;
            };

            if let Some(text) = first.as_text() {
                return Ok(text.to_owned());
            }
        }

        Err(SamlError::AttributeNotFound(urn.to_owned()))
    }
}

/// A parsed SAML assertion.
#[derive(Debug, Clone)]
pub struct SamlAssertionExtractor {
    empty: bool,
    statement: Result<AttributeStatement, SamlError>,
}

impl SamlAssertionExtractor {
    /// Parses an assertion from its XML text.
    ///
    /// Fails with [`SamlError::Schema`] if [`init`](crate::init) hasn't been called.
    pub fn parse(text: &str) -> Result<Self, SamlError> {
        if BOOTSTRAPPED.get().is_none() {
            return Err(SamlError::Schema);
        }

        parse_document(text)
    }

    /// Whether the root element has no content at all.
    pub fn is_empty(&self) -> bool {
        self.empty
    }

    /// The assertion's first `AttributeStatement`.
    pub fn attribute_statement(&self) -> Result<&AttributeStatement, SamlError> {
        self.statement.as_ref().map_err(Clone::clone)
    }

    /// Looks up an attribute by name prefix in the first `AttributeStatement`.
    ///
    /// See [`AttributeStatement::attribute_value`]. Every error this returns satisfies
    /// [`SamlError::is_attribute_not_found`].
    pub fn attribute_value(&self, urn: &str) -> Result<String, SamlError> {
        self.attribute_statement()?.attribute_value(urn)
    }
}

fn parse_document(text: &str) -> Result<SamlAssertionExtractor, SamlError> {
    let options = ParsingOptions {
        allow_dtd: false,
        ..ParsingOptions::default()
    };
    let document =
        Document::parse_with_options(text, options).map_err(|err| SamlError::Parse(err.to_string()))?;

    let root = document.root_element();
    let empty = !root.has_children();

    let statement = if is_saml_element(root, ASSERTION) {
        // SAML 2.0 allows any number of statements; only the first is consulted
        saml_children(root, ATTRIBUTE_STATEMENT)
            .next()
            .map(AttributeStatement::from_node)
            .ok_or(SamlError::NoAttributeStatement)
    } else {
        Err(SamlError::NotAnAssertion)
    };

    Ok(SamlAssertionExtractor { empty, statement })
}

fn is_saml_element(node: Node<'_, '_>, name: &str) -> bool {
    node.is_element()
        && node.tag_name().name() == name
        && node.tag_name().namespace() == Some(SAML2_ASSERTION_NS)
}

fn saml_children<'a, 'input: 'a>(
    node: Node<'a, 'input>,
    name: &'static str,
) -> impl Iterator<Item = Node<'a, 'input>> {
    node.children().filter(move |child| is_saml_element(*child, name))
}

fn text_content(node: Node<'_, '_>) -> String {
    node.descendants()
        .filter(Node::is_text)
        .filter_map(|text| text.text())
        .collect()
}
