use tinyvec::array_vec;

use super::*;
use crate::{AttributeType, EAP_MESSAGE};

#[test]
fn identity_response_encoding() {
    let message = Message::identity_response(0, "alice");

    assert_eq!(
        message.encode(),
        [
            2, // response
            0, // identifier
            0, 10, // length
            1,  // identity
            b'a', b'l', b'i', b'c', b'e'
        ]
    );
}

#[test]
fn decode_md5_challenge_request() {
    let mut buffer = array_vec!([u8; 32]);
    buffer.extend_from_slice(&[1, 7, 0, 25, 4, 16]);
    buffer.extend_from_slice(&[0xab; 16]);
    buffer.extend_from_slice(b"srv");
    buffer.extend_from_slice(&[0, 0]); // trailing padding

    let message = Message::decode(&buffer).expect("challenge should decode");

    assert_eq!(message.code(), Code::Request);
    assert_eq!(message.identifier(), 7);
    assert_eq!(message.method(), Some(MD5_CHALLENGE));
    assert_eq!(message.md5_challenge(), Ok(&[0xab; 16][..]));
}

#[test]
fn decode_success_has_no_method() {
    let message = Message::decode(&[3, 9, 0, 4]).expect("success should decode");

    assert_eq!(message, Message::outcome(Code::Success, 9));
    assert_eq!(message.method(), None);
}

#[test]
fn decode_errors() {
    assert_eq!(
        Message::decode(&[1, 0]),
        Err(DecodeError::TooShort {
            expected: 4,
            actual: 2
        })
    );
    assert_eq!(
        Message::decode(&[9, 0, 0, 4]),
        Err(DecodeError::InvalidCode(9))
    );
    assert_eq!(
        Message::decode(&[1, 0, 0, 30, 4]),
        Err(DecodeError::LengthMismatch {
            declared: 30,
            actual: 5
        })
    );
    // request without a type octet
    assert_eq!(
        Message::decode(&[1, 0, 0, 4]),
        Err(DecodeError::TooShort {
            expected: 5,
            actual: 4
        })
    );
}

#[test]
fn md5_challenge_rejects_other_methods() {
    let identity = Message::request(1, IDENTITY, "");
    assert_eq!(identity.md5_challenge(), Err(DecodeError::InvalidChallenge));

    // value size larger than data
    let truncated = Message::request(1, MD5_CHALLENGE, [16u8, 1, 2, 3]);
    assert_eq!(truncated.md5_challenge(), Err(DecodeError::InvalidChallenge));
}

#[test]
fn md5_challenge_response_layout() {
    let digest = [0x11; MD5_RESPONSE_SIZE];
    let encoded = Message::md5_challenge_response(3, &digest).encode();

    assert_eq!(encoded[..6], [2, 3, 0, 22, 4, 16]);
    assert_eq!(encoded[6..], digest);
}

#[test]
fn large_message_splits_over_attributes() {
    let message = Message::response(5, NOTIFICATION, [b'n'; 400]);
    let encoded = message.encode();

    let attributes: AttributeList = to_attributes(&encoded).collect();

    assert_eq!(attributes.len(), 2);
    assert!(attributes
        .iter()
        .all(|a| a.attribute_type() == AttributeType::Standard(79)));
    assert_eq!(attributes.iter().next().map(|a| a.value().len()), Some(253));

    let reassembled = from_attributes(&attributes).expect("EAP-Message attributes are present");
    assert_eq!(reassembled, encoded);
    assert_eq!(Message::decode(&reassembled), Ok(message));
}

#[test]
fn no_eap_message_attribute() {
    let attributes = AttributeList::new();
    assert_eq!(from_attributes(&attributes), None);

    // the constant and the standard type agree
    assert_eq!(
        crate::Dictionary::standard().type_by_name(EAP_MESSAGE),
        Ok(StandardType::EapMessage.into())
    );
}
