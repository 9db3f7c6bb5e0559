use std::sync::Arc;
use std::time::Duration;

use donorlink_common::config::AppConfig;
use donorlink_notifier::PushGateway;
use donorlink_notifier::auth::{AccessTokenProvider, ServiceAccountKey};
use donorlink_notifier::fcm::{FcmGateway, FcmOptions};

/// Build the FCM gateway from configuration.
///
/// `FCM_ACCESS_TOKEN` wins over `GOOGLE_APPLICATION_CREDENTIALS`; one of the
/// two is required.
pub fn build_gateway(config: &AppConfig) -> anyhow::Result<Arc<dyn PushGateway>> {
    let options = FcmOptions {
        project_id: config.require_fcm_project_id()?.to_string(),
        base_url: config.fcm_base_url.clone(),
        concurrency: config.fcm_send_concurrency,
        request_timeout: Duration::from_secs(config.fcm_request_timeout_secs),
    };

    let auth = match (
        &config.fcm_access_token,
        &config.google_application_credentials,
    ) {
        (Some(token), _) => {
            tracing::warn!("Using static FCM_ACCESS_TOKEN, it will not be refreshed");
            AccessTokenProvider::fixed(token.clone())
        }
        (None, Some(path)) => {
            let key = ServiceAccountKey::from_file(path)?;
            tracing::info!(client_email = %key.client_email, "Loaded FCM service account");
            let client = reqwest::Client::builder()
                .timeout(options.request_timeout)
                .build()?;
            AccessTokenProvider::service_account(key, client)?
        }
        (None, None) => anyhow::bail!(
            "Either FCM_ACCESS_TOKEN or GOOGLE_APPLICATION_CREDENTIALS must be set"
        ),
    };

    Ok(Arc::new(FcmGateway::new(options, auth)?))
}
