use super::*;

const FULL_CONFIG: &str = r#"
failover_on_authentication_failure = true
failover_on_exception = true
principal_identifier_urn = "urn:oid:1.3.6.1.4.1.5923.1.1.1.6"

[[servers]]
host = "radius1.example.org"
secret = "testing123"
protocol = "CHAP"
authentication_port = 11812
socket_timeout = 2
retries = 0

[[servers]]
host = "radius2.example.org"
secret = "other"
kind = "classic"

[[dictionary]]
name = "Moonshot-Host-TargetedId"
vendor = 25622
code = 134
"#;

#[test]
fn parse_full_config() {
    let config = Config::from_toml_str(FULL_CONFIG).expect("configuration should be valid");

    assert!(config.failover_on_authentication_failure());
    assert!(config.failover_on_exception());
    assert_eq!(
        config.principal_identifier_urn(),
        "urn:oid:1.3.6.1.4.1.5923.1.1.1.6"
    );

    let servers = config.servers();
    assert_eq!(servers.len(), 2);

    let first = &servers[0];
    assert_eq!(first.host(), "radius1.example.org");
    assert_eq!(first.secret().as_slice(), b"testing123");
    assert_eq!(first.protocol(), Protocol::Chap);
    assert_eq!(first.authentication_port(), 11812);
    assert_eq!(first.accounting_port(), DEFAULT_ACCOUNTING_PORT);
    assert_eq!(first.socket_timeout(), Duration::from_secs(2));
    assert_eq!(first.retries(), 0);
    assert_eq!(first.kind(), ServerKind::Abfab);

    let second = &servers[1];
    assert_eq!(second.protocol(), Protocol::Pap);
    assert_eq!(second.kind(), ServerKind::Classic);
    assert_eq!(second.authentication_port(), DEFAULT_AUTHENTICATION_PORT);
    assert_eq!(second.socket_timeout(), DEFAULT_SOCKET_TIMEOUT);
    assert_eq!(second.retries(), DEFAULT_RETRIES);
    assert_eq!(second.eap_inner_protocol(), "pap");
    assert!(second.capabilities().is_empty());

    assert_eq!(config.dictionary_entries().len(), 1);
    assert_eq!(
        config.dictionary_entries()[0].attribute_type(),
        AttributeType::Vendor {
            vendor_id: 25622,
            code: 134
        }
    );
}

#[test]
fn failover_flags_default_to_off() {
    let config = Config::from_toml_str(
        r#"
        principal_identifier_urn = "urn:x:eppn"

        [[servers]]
        host = "127.0.0.1"
        secret = "s"
        "#,
    )
    .expect("minimal configuration should be valid");

    assert!(!config.failover_on_authentication_failure());
    assert!(!config.failover_on_exception());
    assert!(config.dictionary_entries().is_empty());
}

#[test]
fn no_servers() {
    let result = Config::from_toml_str(r#"principal_identifier_urn = "urn:x:eppn""#);
    assert!(matches!(result, Err(ConfigError::Invalid(_))));
}

#[test]
fn unknown_protocol() {
    let result = Config::from_toml_str(
        r#"
        principal_identifier_urn = "urn:x:eppn"

        [[servers]]
        host = "127.0.0.1"
        secret = "s"
        protocol = "mschapv2"
        "#,
    );

    let Err(ConfigError::Invalid(message)) = result else {
        panic!("unknown protocol should be rejected");
    };
    assert!(message.contains("mschapv2"));
}

#[test]
fn unknown_field_is_a_parse_error() {
    let result = Config::from_toml_str(
        r#"
        principal_identifier_urn = "urn:x:eppn"
        failover = true
        "#,
    );
    assert!(matches!(result, Err(ConfigError::Parse(_))));
}

#[test]
fn empty_secret_rejected() {
    let result = ServerConfig::builder("radius.example.org", "").build();
    assert!(matches!(result, Err(ConfigError::Invalid(_))));
}

#[test]
fn empty_host_rejected() {
    let result = ServerConfig::builder("  ", "secret").build();
    assert!(matches!(result, Err(ConfigError::Invalid(_))));
}

#[test]
fn protocol_tags() {
    assert_eq!("pap".parse::<Protocol>().ok(), Some(Protocol::Pap));
    assert_eq!("EAP-MD5".parse::<Protocol>().ok(), Some(Protocol::EapMd5));
    assert!("ttls".parse::<Protocol>().is_err());

    for (tag, protocol) in PROTOCOLS {
        assert_eq!(protocol.tag(), *tag);
    }
}

#[test]
fn kinds_map_to_capabilities() {
    assert_eq!(ServerKind::Abfab.capabilities(), ServerCapabilities::all());
    assert_eq!(ServerKind::Classic.capabilities(), ServerCapabilities::empty());
}

#[test]
fn debug_output_hides_secret() {
    let server = ServerConfig::builder("radius.example.org", "very secret")
        .build()
        .expect("server config should be valid");

    let debug = format!("{server:?}");
    assert!(!debug.contains("very secret"));
    assert_eq!(server.to_string(), "radius.example.org:1812 (pap)");
}

#[test]
fn vendor_specific_without_vendor_rejected() {
    let result = Config::from_toml_str(
        r#"
        principal_identifier_urn = "urn:x:eppn"

        [[servers]]
        host = "127.0.0.1"
        secret = "s"

        [[dictionary]]
        name = "Broken"
        code = 26
        "#,
    );
    assert!(matches!(result, Err(ConfigError::Invalid(_))));
}

#[test]
fn authenticator_keeps_server_order() {
    let config = Config::from_toml_str(FULL_CONFIG).expect("configuration should be valid");
    let authenticator = config.authenticator(Arc::new(crate::UdpTransport::new()));

    let hosts: Vec<&str> = authenticator
        .clients()
        .iter()
        .map(|client| client.server().host().as_str())
        .collect();
    assert_eq!(hosts, ["radius1.example.org", "radius2.example.org"]);
}

#[test]
fn eap_inner_protocol_is_only_recorded() {
    let server = ServerConfig::builder("radius.example.org", "secret")
        .protocol(Protocol::EapMd5)
        .eap_inner_protocol("mschapv2")
        .build()
        .expect("server config should be valid");

    assert_eq!(server.eap_inner_protocol(), "mschapv2");
    assert_eq!(server.protocol(), Protocol::EapMd5);
    assert_eq!(server.to_string(), "radius.example.org:1812 (eap-md5)");
}
