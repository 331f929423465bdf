//! Delivery of Access-Requests to a RADIUS server.
//!
//! The [`Transport`] trait is the seam between the authentication logic and the network, so the former stays
//! runtime independent and can be driven by an in-memory transport. [`UdpTransport`] is the real implementation,
//! built on the `radius` crate's UDP client and a tokio runtime.

use std::io;
use std::net::SocketAddr;

use futures::future::BoxFuture;
use getset::{CopyGetters, Getters};
use hmac::{Hmac, Mac};
use md5::{Digest, Md5};
use radius::client::Client;
use radius::core::avp::AVP;
use radius::core::code::Code;
use radius::core::packet::Packet;
use radius::core::{rfc2865, rfc2869};
use tracing::{debug, trace};

use abfab_radius_protocol::{AttributeList, StandardType};

use crate::{ClientError, ServerConfig};


type HmacMd5 = Hmac<Md5>;

// RADIUS packet header layout (RFC2865 section 3)
const AUTHENTICATOR_OFFSET: usize = 4;
const HEADER_SIZE: usize = 20;

/// The largest password User-Password can hide ([RFC2865 section 5.2]).
///
/// [RFC2865 section 5.2]: https://www.rfc-editor.org/rfc/rfc2865.html#section-5.2
const MAX_PASSWORD_LEN: usize = 128;

/// The kind of reply a server sent to an Access-Request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReplyCode {
    /// Access-Accept.
    Accept,
    /// Access-Reject.
    Reject,
    /// Access-Challenge.
    Challenge,
}

/// A verified reply from a server.
#[derive(Debug, Clone, PartialEq, Eq, Getters, CopyGetters)]
pub struct Reply {
    /// The kind of reply.
    #[getset(get_copy = "pub")]
    code: ReplyCode,

    /// The reply's attributes, in the order the server sent them.
    #[getset(get = "pub")]
    attributes: AttributeList,
}

impl Reply {
    /// Creates a reply; transports other than [`UdpTransport`] use this to hand back what they received.
    pub fn new(code: ReplyCode, attributes: AttributeList) -> Self {
        Self { code, attributes }
    }

    /// Consumes the reply, returning its attributes.
    pub fn into_attributes(self) -> AttributeList {
        self.attributes
    }
}

/// A (pinned, boxed) future resolving to a server's reply, as returned from a [`Transport`].
pub type ExchangeFuture<'a> = BoxFuture<'a, Result<Reply, ClientError>>;

/// Sends Access-Requests and waits for the matching reply.
pub trait Transport: Send + Sync {
    /// Sends an Access-Request carrying `attributes` to `server`.
    ///
    /// User-Password values are passed in the clear; hiding them with the shared secret is up to the transport,
    /// as is adding Message-Authenticator to requests carrying EAP-Message. Implementations resend unanswered
    /// requests up to [`ServerConfig::retries`] times, waiting [`ServerConfig::socket_timeout`] for each.
    fn exchange<'a>(&'a self, server: &'a ServerConfig, attributes: AttributeList)
        -> ExchangeFuture<'a>;
}

/// Exchanges packets over UDP, opening a fresh socket for every transmission.
///
/// This needs to be used from within a tokio runtime.
#[derive(Debug, Clone, Copy, Default)]
pub struct UdpTransport {
    _private: (),
}

impl UdpTransport {
    /// Creates a UDP transport.
    pub fn new() -> Self {
        Self::default()
    }
}

impl Transport for UdpTransport {
    fn exchange<'a>(
        &'a self,
        server: &'a ServerConfig,
        attributes: AttributeList,
    ) -> ExchangeFuture<'a> {
        Box::pin(async move {
            let request = encode_request(server, &attributes)?;
            let carries_eap = attributes.contains(StandardType::EapMessage.into());

            let reply = send_with_retries(server, &request).await?;
            let encoded = verify_reply(&request, &reply, carries_eap)?;

            let code = match reply.get_code() {
                Code::AccessAccept => ReplyCode::Accept,
                Code::AccessReject => ReplyCode::Reject,
                Code::AccessChallenge => ReplyCode::Challenge,
                other => {
                    return Err(ClientError::ProtocolViolation(format!(
                        "unexpected reply code {other:?}"
                    )))
                }
            };

            let attributes = AttributeList::from_wire(&encoded[HEADER_SIZE..])?;
            debug!(server = %server, code = ?code, attributes = attributes.len(), "received reply");

            Ok(Reply::new(code, attributes))
        })
    }
}

async fn resolve(server: &ServerConfig) -> Result<SocketAddr, ClientError> {
    let mut addresses =
        tokio::net::lookup_host((server.host().as_str(), server.authentication_port())).await?;

    addresses.next().ok_or_else(|| {
        ClientError::IOError(io::Error::new(
            io::ErrorKind::NotFound,
            format!("{} did not resolve to any address", server.host()),
        ))
    })
}

async fn send_with_retries(server: &ServerConfig, request: &Packet) -> Result<Packet, ClientError> {
    let address = resolve(server).await?;

    // no library timeouts; each attempt is bounded below instead
    let client = Client::new(None, None);
    let attempts = server.retries().saturating_add(1);

    for attempt in 1..=attempts {
        trace!(server = %server, %address, attempt, "sending Access-Request");

        match tokio::time::timeout(server.socket_timeout(), client.send_packet(&address, request))
            .await
        {
            Ok(Ok(reply)) => return Ok(reply),
            Ok(Err(err)) => return Err(exchange_error(err)),
            Err(_) => debug!(server = %server, attempt, "no reply within socket timeout"),
        }
    }

    Err(ClientError::Timeout { attempts })
}

fn exchange_error(err: radius::client::ClientError) -> ClientError {
    use radius::client::ClientError as RadiusError;

    match err {
        // the datagram arrived but isn't a RADIUS packet
        RadiusError::FailedDecodingRadiusResponseError(message) => {
            ClientError::ProtocolViolation(format!("malformed reply: {message}"))
        }
        RadiusError::FailedRadiusPacketEncodingError(message) => {
            ClientError::InvalidPacketData(message)
        }
        other => ClientError::IOError(io::Error::new(
            io::ErrorKind::Other,
            format!("RADIUS exchange failed: {other}"),
        )),
    }
}

fn encode_request(server: &ServerConfig, attributes: &AttributeList) -> Result<Packet, ClientError> {
    let mut packet = Packet::new(Code::AccessRequest, server.secret());

    for attribute in attributes {
        let (code, value) = attribute.to_wire()?;

        if code == u8::from(StandardType::UserPassword) {
            if value.len() > MAX_PASSWORD_LEN {
                return Err(ClientError::PasswordTooLong);
            }

            rfc2865::add_user_password(&mut packet, &value).map_err(|err| {
                ClientError::InvalidPacketData(format!("cannot hide User-Password: {err:?}"))
            })?;
        } else {
            packet.add(AVP::from_bytes(code, &value));
        }
    }

    if attributes.contains(StandardType::EapMessage.into()) {
        set_message_authenticator(&mut packet)?;
    }

    Ok(packet)
}

fn encode_packet(packet: &Packet) -> Result<Vec<u8>, ClientError> {
    packet
        .encode()
        .map_err(|err| ClientError::InvalidPacketData(format!("{err:?}")))
}

fn hmac_md5(secret: &[u8]) -> Result<HmacMd5, ClientError> {
    HmacMd5::new_from_slice(secret)
        .map_err(|_| ClientError::InvalidPacketData("unusable shared secret".to_owned()))
}

/// Message-Authenticator = HMAC-MD5(Type, Identifier, Length, Request Authenticator, Attributes),
/// computed with the attribute itself set to sixteen zero octets ([RFC3579 section 3.2]).
///
/// [RFC3579 section 3.2]: https://www.rfc-editor.org/rfc/rfc3579.html#section-3.2
fn set_message_authenticator(packet: &mut Packet) -> Result<(), ClientError> {
    rfc2869::add_message_authenticator(packet, &[0; 16]);

    let mut mac = hmac_md5(packet.get_secret())?;
    mac.update(&encode_packet(packet)?);

    rfc2869::delete_message_authenticator(packet);
    rfc2869::add_message_authenticator(packet, &mac.finalize().into_bytes());

    Ok(())
}

/// Checks the reply against its request, returning the reply's wire encoding.
fn verify_reply(request: &Packet, reply: &Packet, carries_eap: bool) -> Result<Vec<u8>, ClientError> {
    if request.get_identifier() != reply.get_identifier() {
        return Err(ClientError::ProtocolViolation(format!(
            "reply identifier {} does not match request identifier {}",
            reply.get_identifier(),
            request.get_identifier()
        )));
    }

    let encoded = encode_packet(reply)?;
    if encoded.len() < HEADER_SIZE {
        return Err(ClientError::ProtocolViolation(
            "reply shorter than a RADIUS header".to_owned(),
        ));
    }

    // ResponseAuth = MD5(Code + ID + Length + RequestAuth + Attributes + Secret)
    let mut hasher = Md5::new();
    hasher.update(&encoded[..AUTHENTICATOR_OFFSET]);
    hasher.update(request.get_authenticator());
    hasher.update(&encoded[HEADER_SIZE..]);
    hasher.update(request.get_secret());

    if hasher.finalize()[..] != reply.get_authenticator()[..] {
        return Err(ClientError::ProtocolViolation(
            "response authenticator mismatch (wrong shared secret?)".to_owned(),
        ));
    }

    let mut signed = encoded.clone();
    signed.splice(
        AUTHENTICATOR_OFFSET..HEADER_SIZE,
        request.get_authenticator().iter().copied(),
    );

    match take_message_authenticator(&mut signed[HEADER_SIZE..])? {
        Some(received) => {
            let mut mac = hmac_md5(request.get_secret())?;
            mac.update(&signed);
            mac.verify_slice(&received).map_err(|_| {
                ClientError::ProtocolViolation("Message-Authenticator mismatch".to_owned())
            })?;
        }
        None if carries_eap => {
            return Err(ClientError::ProtocolViolation(
                "reply to an EAP request lacks Message-Authenticator".to_owned(),
            ))
        }
        None => {}
    }

    Ok(encoded)
}

/// Zeroes the Message-Authenticator value in an attribute section, returning the value it held.
fn take_message_authenticator(attributes: &mut [u8]) -> Result<Option<Vec<u8>>, ClientError> {
    let mut received = None;
    let mut offset = 0;

    while offset < attributes.len() {
        let length = attributes
            .get(offset + 1)
            .map(|&length| usize::from(length))
            .filter(|&length| length >= 2 && offset + length <= attributes.len())
            .ok_or_else(|| {
                ClientError::ProtocolViolation("malformed attribute in reply".to_owned())
            })?;

        if attributes[offset] == u8::from(StandardType::MessageAuthenticator) {
            let value = &mut attributes[offset + 2..offset + length];
            received = Some(value.to_vec());
            value.fill(0);
        }

        offset += length;
    }

    Ok(received)
}
