mod authz;
mod config;
mod error;
mod gateway;
mod handlers;
mod iam;
mod secrets;
mod sms;
#[cfg(test)]
mod testing;
mod types;
mod validate;

use std::sync::Arc;

use log::info;

use config::Config;
use gateway::Gateway;
use handlers::AppState;
use iam::IamTokenExchanger;
use secrets::SecretsManagerClient;
use sms::TwilioSender;

fn init_logging(level: &str) {
    let mut builder = pretty_env_logger::formatted_timed_builder();
    match std::env::var("RUST_LOG") {
        Ok(filters) => builder.parse_filters(&filters),
        Err(_) => builder.parse_filters(level),
    };
    builder.init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Arc::new(Config::from_env());
    init_logging(&config.log_level);

    info!("Log level is {}", config.log_level);
    info!("App version is {}", env!("CARGO_PKG_VERSION"));
    info!("Upstream timeout is {:?}", config.upstream_timeout);

    let client = reqwest::Client::builder()
        .timeout(config.upstream_timeout)
        .build()?;

    let tokens = match &config.iam_url {
        Some(url) => IamTokenExchanger::with_base_url(client.clone(), url),
        None => IamTokenExchanger::new(client.clone(), &config.cloud_domain),
    };
    info!("IAM token endpoint is {}", tokens.token_url());
    let secrets = match &config.secrets_manager_url {
        Some(url) => {
            info!("Secrets Manager endpoint is {}", url);
            SecretsManagerClient::with_base_url(client.clone(), url)
        }
        None => SecretsManagerClient::new(client.clone(), &config.secrets_manager_domain),
    };
    let sender = TwilioSender::new(client, config.clone());

    let gateway = Gateway::new(
        config.clone(),
        Arc::new(tokens),
        Arc::new(secrets),
        Arc::new(sender),
    );
    let app = handlers::router(Arc::new(AppState { gateway }));

    let addr = format!("0.0.0.0:{}", config.port);
    info!("Starting server on {}", addr);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
