#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use abfab_radius::protocol::{Attribute, AttributeList, AttributeType, UKERNA_VENDOR_ID};
use abfab_radius::{Authenticator, ClientError, ExchangeFuture, Reply, ReplyCode};
use abfab_radius::{ServerConfig, ServerKind, Transport};

/// The SAML attribute holding the eduPersonPrincipalName.
pub const EPPN_URN: &str = "urn:oid:1.3.6.1.4.1.5923.1.1.1.6";

/// Wire type of SAML-AAA-Assertion.
pub const SAML_AAA_ASSERTION: AttributeType = AttributeType::Vendor {
    vendor_id: UKERNA_VENDOR_ID,
    code: 132,
};

/// How a scripted server answers.
#[derive(Clone)]
pub enum Outcome {
    Accept(AttributeList),
    Reject,
    Timeout,
}

/// In-memory transport answering per host, recording which hosts were contacted.
#[derive(Default)]
pub struct ScriptedTransport {
    outcomes: HashMap<String, Outcome>,
    contacted: Mutex<Vec<String>>,
}

impl ScriptedTransport {
    pub fn new<'a, I: IntoIterator<Item = (&'a str, Outcome)>>(outcomes: I) -> Arc<Self> {
        Arc::new(Self {
            outcomes: outcomes
                .into_iter()
                .map(|(host, outcome)| (host.to_owned(), outcome))
                .collect(),
            contacted: Mutex::new(Vec::new()),
        })
    }

    /// Hosts in the order they were sent requests.
    pub fn contacted(&self) -> Vec<String> {
        self.contacted.lock().unwrap().clone()
    }
}

impl Transport for ScriptedTransport {
    fn exchange<'a>(
        &'a self,
        server: &'a ServerConfig,
        _attributes: AttributeList,
    ) -> ExchangeFuture<'a> {
        self.contacted.lock().unwrap().push(server.host().clone());

        let reply = match self.outcomes.get(server.host()) {
            Some(Outcome::Accept(attributes)) => Ok(Reply::new(ReplyCode::Accept, attributes.clone())),
            Some(Outcome::Reject) => Ok(Reply::new(ReplyCode::Reject, AttributeList::new())),
            Some(Outcome::Timeout) | None => Err(ClientError::Timeout {
                attempts: server.retries() + 1,
            }),
        };

        Box::pin(async move { reply })
    }
}

pub fn server(host: &str) -> ServerConfig {
    ServerConfig::builder(host, "testing123")
        .kind(ServerKind::Abfab)
        .build()
        .expect("server config should be valid")
}

/// Builds an authenticator trying `hosts` in order.
pub fn authenticator(
    hosts: &[&str],
    failover_on_authentication_failure: bool,
    failover_on_exception: bool,
    transport: Arc<ScriptedTransport>,
) -> Authenticator {
    abfab_radius::init().expect("init should succeed");

    let mut builder = Authenticator::builder(EPPN_URN);
    builder
        .servers(hosts.iter().map(|host| server(host)))
        .failover_on_authentication_failure(failover_on_authentication_failure)
        .failover_on_exception(failover_on_exception)
        .acceptor_host_name("cas.example.org");

    builder.build(transport)
}

/// A SAML assertion carrying `attributes` as `(name, value)` string pairs.
pub fn assertion(attributes: &[(&str, &str)]) -> String {
    let attributes: String = attributes
        .iter()
        .map(|(name, value)| {
            format!(
                r#"<saml:Attribute Name="{name}"><saml:AttributeValue xsi:type="xs:string">{value}</saml:AttributeValue></saml:Attribute>"#
            )
        })
        .collect();

    format!(
        r#"<saml:Assertion xmlns:saml="urn:oasis:names:tc:SAML:2.0:assertion" xmlns:xs="http://www.w3.org/2001/XMLSchema" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance" ID="_6c3a4f8b" IssueInstant="2024-01-01T00:00:00Z" Version="2.0"><saml:Issuer>https://idp.example.org/idp/shibboleth</saml:Issuer><saml:AttributeStatement>{attributes}</saml:AttributeStatement></saml:Assertion>"#
    )
}

/// Splits `assertion` into SAML-AAA-Assertion attributes of at most `fragment_size` bytes.
pub fn assertion_fragments(assertion: &[u8], fragment_size: usize) -> AttributeList {
    assertion
        .chunks(fragment_size)
        .map(|chunk| Attribute::new(SAML_AAA_ASSERTION, chunk))
        .collect()
}
