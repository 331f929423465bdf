use std::sync::Arc;

use md5::{Digest, Md5};
use rand::Rng;
use tracing::{debug, trace};

use abfab_radius_protocol::eap::{self, Code as EapCode};
use abfab_radius_protocol::{Attribute, AttributeList, Dictionary, UnknownAttribute};
use abfab_radius_protocol::{CHAP_CHALLENGE, CHAP_PASSWORD, STATE, USER_NAME, USER_PASSWORD};

use crate::{AuthRequest, AuthResult, ClientError, Protocol, Reply, ReplyCode, ServerConfig, Transport};

#[cfg(test)]
mod tests;

/// Upper bound on Access-Challenge round trips in one EAP conversation.
const MAX_EAP_ROUNDS: usize = 8;

/// Authenticates users against a single RADIUS server.
#[derive(Clone)]
pub struct RadiusClient {
    server: ServerConfig,
    transport: Arc<dyn Transport>,
}

impl RadiusClient {
    /// Creates a client for `server`, exchanging packets through `transport`.
    pub fn new(server: ServerConfig, transport: Arc<dyn Transport>) -> Self {
        Self { server, transport }
    }

    /// The server this client talks to.
    pub fn server(&self) -> &ServerConfig {
        &self.server
    }

    /// Authenticates a user with the server's configured protocol.
    ///
    /// Fails with [`ClientError::InvalidAttribute`] if [`init`](crate::init) hasn't been called yet.
    pub async fn authenticate(&self, request: AuthRequest) -> AuthResult {
        let result = match crate::dictionary() {
            Some(dictionary) => self.authenticate_with(dictionary, &request).await,
            None => Err(UnknownAttribute::new(USER_NAME).into()),
        };

        result.unwrap_or_else(AuthResult::Error)
    }

    pub(crate) async fn authenticate_with(
        &self,
        dictionary: &Dictionary,
        request: &AuthRequest,
    ) -> Result<AuthResult, ClientError> {
        let protocol = self.server.protocol();
        debug!(server = %self.server, user = %request.username(), %protocol, "authenticating");

        let identity = request.identity_attributes(dictionary, self.server.capabilities())?;

        match protocol {
            Protocol::Pap => {
                let attributes = self.pap_attributes(dictionary, identity, request.password())?;
                let reply = self.transport.exchange(&self.server, attributes).await?;
                single_round_verdict(reply, protocol)
            }
            Protocol::Chap => {
                let attributes = self.chap_attributes(dictionary, identity, request.password())?;
                let reply = self.transport.exchange(&self.server, attributes).await?;
                single_round_verdict(reply, protocol)
            }
            Protocol::EapMd5 => self.eap_md5(dictionary, identity, request).await,
        }
    }

    fn pap_attributes(
        &self,
        dictionary: &Dictionary,
        mut attributes: AttributeList,
        password: &str,
    ) -> Result<AttributeList, ClientError> {
        // hidden with the shared secret by the transport
        attributes.push(Attribute::new(
            dictionary.type_by_name(USER_PASSWORD)?,
            password.as_bytes(),
        ));

        Ok(attributes)
    }

    fn chap_attributes(
        &self,
        dictionary: &Dictionary,
        mut attributes: AttributeList,
        password: &str,
    ) -> Result<AttributeList, ClientError> {
        let password_type = dictionary.type_by_name(CHAP_PASSWORD)?;
        let challenge_type = dictionary.type_by_name(CHAP_CHALLENGE)?;

        // rand::ThreadRng is a CSPRNG, and UUIDv4s are random too
        let chap_id: u8 = rand::thread_rng().gen();
        let challenge = uuid::Uuid::new_v4();

        // "The Response Value is the one-way hash calculated over a stream of octets consisting of the Identifier,
        // followed by (concatenated with) the "secret", followed by (concatenated with) the Challenge Value."
        // RFC1994 section 4.1: https://www.rfc-editor.org/rfc/rfc1994.html#section-4.1
        let response = chap_response(chap_id, password.as_bytes(), challenge.as_bytes());

        // CHAP-Password is the CHAP ident followed by the response (RFC2865 section 5.3)
        let mut chap_password = vec![chap_id];
        chap_password.extend(response);

        attributes.push(Attribute::new(password_type, chap_password));
        attributes.push(Attribute::new(challenge_type, challenge.as_bytes().as_slice()));

        Ok(attributes)
    }

    async fn eap_md5(
        &self,
        dictionary: &Dictionary,
        identity: AttributeList,
        request: &AuthRequest,
    ) -> Result<AuthResult, ClientError> {
        let state_type = dictionary.type_by_name(STATE)?;

        // only tunnelled methods have an inner protocol
        trace!(
            server = %self.server,
            inner = %self.server.eap_inner_protocol(),
            "EAP-MD5 does not use the configured inner protocol"
        );

        let mut response = eap::Message::identity_response(rand::thread_rng().gen(), request.username());
        let mut state: Option<Vec<u8>> = None;

        for round in 1..=MAX_EAP_ROUNDS {
            let mut attributes = identity.clone();
            attributes.extend(eap::to_attributes(&response.encode()));
            if let Some(state) = &state {
                attributes.push(Attribute::new(state_type, state.as_slice()));
            }

            let reply = self.transport.exchange(&self.server, attributes).await?;
            trace!(server = %self.server, round, code = ?reply.code(), "EAP round finished");

            match reply.code() {
                ReplyCode::Accept => return Ok(AuthResult::Accept(reply.into_attributes())),
                ReplyCode::Reject => return Ok(AuthResult::Reject),
                ReplyCode::Challenge => {}
            }

            let encoded = eap::from_attributes(reply.attributes()).ok_or_else(|| {
                ClientError::ProtocolViolation("Access-Challenge without EAP-Message".to_owned())
            })?;
            let challenge = eap::Message::decode(&encoded)?;

            if challenge.code() != EapCode::Request {
                return Err(ClientError::ProtocolViolation(format!(
                    "expected an EAP request in Access-Challenge, got {:?}",
                    challenge.code()
                )));
            }

            match challenge.method() {
                Some(eap::MD5_CHALLENGE) => {}
                Some(method) => {
                    return Err(ClientError::ProtocolViolation(format!(
                        "server proposed unsupported EAP method {method}"
                    )))
                }
                None => {
                    return Err(ClientError::ProtocolViolation(
                        "EAP request without a method".to_owned(),
                    ))
                }
            }

            let digest = chap_response(
                challenge.identifier(),
                request.password().as_bytes(),
                challenge.md5_challenge()?,
            );
            response = eap::Message::md5_challenge_response(challenge.identifier(), &digest);
            state = reply.attributes().first(state_type).map(<[u8]>::to_vec);
        }

        Err(ClientError::ProtocolViolation(format!(
            "EAP conversation did not finish within {MAX_EAP_ROUNDS} rounds"
        )))
    }
}

/// MD5(identifier ‖ secret ‖ challenge), as used by both CHAP and EAP-MD5.
fn chap_response(identifier: u8, secret: &[u8], challenge: &[u8]) -> [u8; eap::MD5_RESPONSE_SIZE] {
    let mut hasher = Md5::new();
    hasher.update([identifier]);
    hasher.update(secret);
    hasher.update(challenge);

    let mut response = [0; eap::MD5_RESPONSE_SIZE];
    response.copy_from_slice(&hasher.finalize());
    response
}

fn single_round_verdict(reply: Reply, protocol: Protocol) -> Result<AuthResult, ClientError> {
    match reply.code() {
        ReplyCode::Accept => Ok(AuthResult::Accept(reply.into_attributes())),
        ReplyCode::Reject => Ok(AuthResult::Reject),
        ReplyCode::Challenge => Err(ClientError::ProtocolViolation(format!(
            "unexpected Access-Challenge for {protocol}"
        ))),
    }
}
