use std::collections::VecDeque;
use std::sync::Mutex;

use abfab_radius_protocol::{AttributeType, ServerCapabilities, StandardType};

use super::*;
use crate::{ExchangeFuture, ServerKind};

/// Replays canned replies and remembers every request.
#[derive(Default)]
struct ScriptedTransport {
    replies: Mutex<VecDeque<Result<Reply, ClientError>>>,
    sent: Mutex<Vec<AttributeList>>,
}

impl ScriptedTransport {
    fn replying<I: IntoIterator<Item = Result<Reply, ClientError>>>(replies: I) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into_iter().collect()),
            sent: Mutex::new(Vec::new()),
        })
    }

    fn sent(&self) -> Vec<AttributeList> {
        self.sent.lock().unwrap().clone()
    }
}

impl Transport for ScriptedTransport {
    fn exchange<'a>(
        &'a self,
        _server: &'a ServerConfig,
        attributes: AttributeList,
    ) -> ExchangeFuture<'a> {
        self.sent.lock().unwrap().push(attributes);
        let reply = self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Err(ClientError::Timeout { attempts: 1 }));

        Box::pin(async move { reply })
    }
}

fn server(protocol: Protocol, kind: ServerKind) -> ServerConfig {
    ServerConfig::builder("radius.example.org", "secret")
        .protocol(protocol)
        .kind(kind)
        .build()
        .expect("server config should be valid")
}

fn request() -> AuthRequest {
    AuthRequest::with_host_name("alice", "hunter2", "cas.example.org")
}

fn accept() -> Result<Reply, ClientError> {
    let attributes = [Attribute::new(StandardType::ReplyMessage.into(), "welcome")]
        .into_iter()
        .collect();
    Ok(Reply::new(ReplyCode::Accept, attributes))
}

fn challenge(eap_message: eap::Message, state: &[u8]) -> Result<Reply, ClientError> {
    let mut attributes: AttributeList = eap::to_attributes(&eap_message.encode()).collect();
    attributes.push(Attribute::new(StandardType::State.into(), state));
    Ok(Reply::new(ReplyCode::Challenge, attributes))
}

fn value(attributes: &AttributeList, standard: StandardType) -> Option<Vec<u8>> {
    attributes.first(standard.into()).map(<[u8]>::to_vec)
}

async fn authenticate(client: &RadiusClient) -> AuthResult {
    client
        .authenticate_with(&Dictionary::standard(), &request())
        .await
        .unwrap_or_else(AuthResult::Error)
}

#[tokio::test]
async fn pap_accept() {
    let transport = ScriptedTransport::replying([accept()]);
    let client = RadiusClient::new(server(Protocol::Pap, ServerKind::Abfab), transport.clone());

    let AuthResult::Accept(attributes) = authenticate(&client).await else {
        panic!("server accepted");
    };
    assert_eq!(
        value(&attributes, StandardType::ReplyMessage),
        Some(b"welcome".to_vec())
    );

    let sent = transport.sent();
    assert_eq!(sent.len(), 1);

    let types: Vec<AttributeType> = sent[0].iter().map(Attribute::attribute_type).collect();
    assert_eq!(
        types,
        [
            AttributeType::from(StandardType::UserName),
            AttributeType::from(StandardType::GssAcceptorServiceName),
            AttributeType::from(StandardType::GssAcceptorHostName),
            AttributeType::from(StandardType::UserPassword),
        ]
    );
    assert_eq!(
        value(&sent[0], StandardType::GssAcceptorServiceName),
        Some(b"cas".to_vec())
    );
    assert_eq!(
        value(&sent[0], StandardType::UserPassword),
        Some(b"hunter2".to_vec())
    );
}

#[tokio::test]
async fn classic_server_gets_no_acceptor_attributes() {
    let transport = ScriptedTransport::replying([Ok(Reply::new(
        ReplyCode::Reject,
        AttributeList::new(),
    ))]);
    let client = RadiusClient::new(server(Protocol::Pap, ServerKind::Classic), transport.clone());
    assert_eq!(client.server().capabilities(), ServerCapabilities::empty());

    assert!(authenticate(&client).await.is_reject());

    let sent = transport.sent();
    assert!(!sent[0].contains(StandardType::GssAcceptorServiceName.into()));
    assert!(!sent[0].contains(StandardType::GssAcceptorHostName.into()));
}

#[tokio::test]
async fn chap_response_matches_challenge() {
    let transport = ScriptedTransport::replying([accept()]);
    let client = RadiusClient::new(server(Protocol::Chap, ServerKind::Abfab), transport.clone());

    assert!(authenticate(&client).await.is_accept());

    let sent = transport.sent();
    assert!(!sent[0].contains(StandardType::UserPassword.into()));

    let chap_password =
        value(&sent[0], StandardType::ChapPassword).expect("CHAP-Password should be sent");
    let chap_challenge =
        value(&sent[0], StandardType::ChapChallenge).expect("CHAP-Challenge should be sent");
    assert_eq!(chap_password.len(), 17);
    assert_eq!(chap_challenge.len(), 16);

    let mut hasher = Md5::new();
    hasher.update(&chap_password[..1]);
    hasher.update(b"hunter2");
    hasher.update(&chap_challenge);
    assert_eq!(chap_password[1..], hasher.finalize()[..]);
}

#[tokio::test]
async fn challenge_is_a_violation_outside_eap() {
    let transport = ScriptedTransport::replying([Ok(Reply::new(
        ReplyCode::Challenge,
        AttributeList::new(),
    ))]);
    let client = RadiusClient::new(server(Protocol::Pap, ServerKind::Abfab), transport);

    let result = authenticate(&client).await;
    assert!(matches!(
        result,
        AuthResult::Error(ClientError::ProtocolViolation(_))
    ));
}

#[tokio::test]
async fn transport_errors_are_reported() {
    let transport = ScriptedTransport::replying([Err(ClientError::Timeout { attempts: 4 })]);
    let client = RadiusClient::new(server(Protocol::Pap, ServerKind::Abfab), transport);

    let result = authenticate(&client).await;
    assert!(matches!(
        result,
        AuthResult::Error(ClientError::Timeout { attempts: 4 })
    ));
}

#[tokio::test]
async fn eap_md5_conversation() {
    let md5_request = eap::Message::request(42, eap::MD5_CHALLENGE, {
        let mut data = vec![16u8];
        data.extend_from_slice(&[7; 16]);
        data
    });

    let transport = ScriptedTransport::replying([challenge(md5_request, b"state-1"), accept()]);
    let client = RadiusClient::new(server(Protocol::EapMd5, ServerKind::Abfab), transport.clone());

    assert!(authenticate(&client).await.is_accept());

    let sent = transport.sent();
    assert_eq!(sent.len(), 2);

    // identity round
    let identity = eap::from_attributes(&sent[0]).expect("EAP-Message should be sent");
    let identity = eap::Message::decode(&identity).expect("identity response should decode");
    assert_eq!(identity.code(), EapCode::Response);
    assert_eq!(identity.method(), Some(eap::IDENTITY));
    assert_eq!(identity.data().as_slice(), b"alice");
    assert!(!sent[0].contains(StandardType::State.into()));

    // challenge round echoes State and answers with MD5(id, password, challenge)
    assert_eq!(value(&sent[1], StandardType::State), Some(b"state-1".to_vec()));
    let response = eap::from_attributes(&sent[1]).expect("EAP-Message should be sent");
    let response = eap::Message::decode(&response).expect("MD5 response should decode");
    assert_eq!(response.identifier(), 42);
    assert_eq!(response.method(), Some(eap::MD5_CHALLENGE));

    let expected = chap_response(42, b"hunter2", &[7; 16]);
    assert_eq!(response.data()[0], 16);
    assert_eq!(response.data()[1..], expected);
}

#[tokio::test]
async fn eap_rejects_other_methods() {
    // 21 = EAP-TTLS
    let ttls_start = eap::Message::request(1, 21, [0x20u8]);
    let transport = ScriptedTransport::replying([challenge(ttls_start, b"s")]);
    let client = RadiusClient::new(server(Protocol::EapMd5, ServerKind::Abfab), transport);

    let result = authenticate(&client).await;
    assert!(matches!(
        result,
        AuthResult::Error(ClientError::ProtocolViolation(_))
    ));
}

#[tokio::test]
async fn eap_challenge_without_eap_message() {
    let transport = ScriptedTransport::replying([Ok(Reply::new(
        ReplyCode::Challenge,
        AttributeList::new(),
    ))]);
    let client = RadiusClient::new(server(Protocol::EapMd5, ServerKind::Abfab), transport);

    let result = authenticate(&client).await;
    assert!(matches!(
        result,
        AuthResult::Error(ClientError::ProtocolViolation(_))
    ));
}

#[tokio::test]
async fn eap_gives_up_after_too_many_rounds() {
    let md5_request = || {
        eap::Message::request(1, eap::MD5_CHALLENGE, {
            let mut data = vec![16u8];
            data.extend_from_slice(&[1; 16]);
            data
        })
    };
    let transport = ScriptedTransport::replying(
        (0..MAX_EAP_ROUNDS + 1).map(|_| challenge(md5_request(), b"again")),
    );
    let client = RadiusClient::new(server(Protocol::EapMd5, ServerKind::Abfab), transport.clone());

    let result = authenticate(&client).await;
    assert!(matches!(
        result,
        AuthResult::Error(ClientError::ProtocolViolation(_))
    ));
    assert_eq!(transport.sent().len(), MAX_EAP_ROUNDS);
}
