use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use abfab_radius::{AuthenticationError, Config, UdpTransport};

#[tokio::main]
async fn main() {
    // RUST_LOG=abfab_radius=debug shows each server attempt
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let path = std::env::var("ABFAB_CONFIG")
        .unwrap_or(String::from("abfab-radius/examples/abfab_login.toml"));
    let username = std::env::var("ABFAB_USER").unwrap_or(String::from("someuser"));
    let password = std::env::var("ABFAB_PASSWORD").unwrap_or(String::from("hunter2"));

    let config = match Config::load(&path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error loading {path}: {e}");
            return;
        }
    };

    if let Err(e) = abfab_radius::init_with(config.dictionary_entries()) {
        eprintln!("Error initializing: {e}");
        return;
    }

    let authenticator = config.authenticator(Arc::new(UdpTransport::new()));

    match authenticator.authenticate(&username, &password).await {
        Ok(principal) => println!(
            "Authentication successful! Principal: {principal} ({:?})",
            principal.source()
        ),
        Err(AuthenticationError::Failed) => println!("Authentication failed."),
        Err(e) => eprintln!("Error: {e}"),
    }
}
