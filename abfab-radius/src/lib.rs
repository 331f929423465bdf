//! # abfab-radius
//!
//! Client side of ABFAB ([RFC7831](https://www.rfc-editor.org/rfc/rfc7831)) authentication over RADIUS:
//! credentials are checked against an ordered list of servers with configurable failover, and the
//! `SAML-AAA-Assertion` returned by an accepting Moonshot server is mapped to a local principal.
//!
//! [`init`] must be called once per process before authenticating; it installs the attribute dictionary
//! and readies SAML parsing.

#![cfg_attr(feature = "docsrs", feature(doc_auto_cfg))]
#![warn(missing_docs)]

use std::sync::OnceLock;

use thiserror::Error;
use tracing::debug;

use abfab_radius_protocol::{Dictionary, DictionaryConflict, DictionaryEntry};

mod authenticator;
pub use authenticator::{
    AuthenticationError, Authenticator, AuthenticatorBuilder, Principal, PrincipalSource,
};

mod client;
pub use client::RadiusClient;

pub mod config;
pub use config::{Config, ConfigError, Protocol, ServerConfig, ServerConfigBuilder, ServerKind};

mod error;
pub use error::ClientError;

mod request;
pub use request::{local_host_name, AuthRequest, GSS_ACCEPTOR_SERVICE};

mod response;
pub use response::AuthResult;

pub mod saml;

mod transport;
pub use transport::{ExchangeFuture, Reply, ReplyCode, Transport, UdpTransport};

// reexported for ease of access
pub use abfab_radius_protocol as protocol;

static DICTIONARY: OnceLock<Dictionary> = OnceLock::new();

/// An error during process-wide initialization.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum InitError {
    /// An extra dictionary entry clashed with an existing one.
    #[error(transparent)]
    Dictionary(#[from] DictionaryConflict),

    /// The SAML parser could not be readied.
    #[error(transparent)]
    Saml(#[from] saml::SamlError),
}

/// Installs the standard attribute dictionary and readies SAML parsing.
///
/// Equivalent to `init_with(&[])`.
pub fn init() -> Result<(), InitError> {
    init_with(&[])
}

/// Installs the standard attribute dictionary extended with `extra`, and readies SAML parsing.
///
/// Only the first successful call installs a dictionary; later calls leave it as it is, so this can be called
/// from every component that needs it.
pub fn init_with(extra: &[DictionaryEntry]) -> Result<(), InitError> {
    if DICTIONARY.get().is_none() {
        let mut dictionary = Dictionary::standard();
        for entry in extra {
            dictionary.register(entry.clone())?;
        }

        if DICTIONARY.set(dictionary).is_err() {
            debug!("attribute dictionary was installed concurrently, keeping the first one");
        }
    } else {
        debug!("attribute dictionary already installed");
    }

    saml::bootstrap()?;
    Ok(())
}

/// The process-wide attribute dictionary, if [`init`] has been called.
pub fn dictionary() -> Option<&'static Dictionary> {
    DICTIONARY.get()
}
