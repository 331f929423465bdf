use abfab_radius_protocol::{AttributeType, StandardType};

use super::*;

fn request() -> AuthRequest {
    AuthRequest::with_host_name("alice", "hunter2", "cas.example.org")
}

#[test]
fn abfab_server_gets_acceptor_identity() {
    let attributes = request()
        .identity_attributes(&Dictionary::standard(), ServerCapabilities::all())
        .expect("standard dictionary has every attribute");

    let values: Vec<(AttributeType, &[u8])> = attributes
        .iter()
        .map(|a| (a.attribute_type(), a.value().as_slice()))
        .collect();

    assert_eq!(
        values,
        [
            (AttributeType::from(StandardType::UserName), &b"alice"[..]),
            (AttributeType::from(StandardType::GssAcceptorServiceName), &b"cas"[..]),
            (
                AttributeType::from(StandardType::GssAcceptorHostName),
                &b"cas.example.org"[..]
            ),
        ]
    );
}

#[test]
fn classic_server_gets_user_name_only() {
    let attributes = request()
        .identity_attributes(&Dictionary::standard(), ServerCapabilities::empty())
        .expect("standard dictionary has User-Name");

    assert_eq!(attributes.len(), 1);
    assert_eq!(
        attributes.first(StandardType::UserName.into()),
        Some(&b"alice"[..])
    );
}

#[test]
fn empty_dictionary_cannot_build_attributes() {
    let error = request()
        .identity_attributes(&Dictionary::empty(), ServerCapabilities::all())
        .expect_err("nothing is registered");

    assert_eq!(error.name(), USER_NAME);
}

#[test]
fn debug_output_hides_password() {
    let debug = format!("{:?}", request());

    assert!(debug.contains("alice"));
    assert!(!debug.contains("hunter2"));
}

#[test]
fn local_host_name_is_never_empty() {
    assert!(!local_host_name().is_empty());
}

#[test]
fn local_host_name_is_the_reported_name() {
    let reported = hostname::get()
        .ok()
        .and_then(|name| name.into_string().ok())
        .filter(|name| !name.trim().is_empty());

    match reported {
        Some(name) => assert_eq!(local_host_name(), name),
        None => assert_eq!(local_host_name(), FALLBACK_HOST_NAME),
    }
}
