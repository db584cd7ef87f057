use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use wreq::Client;

use crate::auth::{AccessToken, CredentialCache};
use crate::config::ProviderConfig;
use crate::error::{self, FlightError};
use crate::model::{Flight, SearchParams};
use crate::parse;

/// Source of normalized flight offers. Implementations must stop work and
/// return `FlightError::Cancelled` once `cancel` fires.
#[async_trait]
pub trait FlightProvider: Send + Sync {
    async fn search(
        &self,
        params: &SearchParams,
        cancel: CancellationToken,
    ) -> Result<Vec<Flight>, FlightError>;
}

pub struct AmadeusClient {
    client: Client,
    config: ProviderConfig,
    credentials: Arc<CredentialCache>,
}

impl AmadeusClient {
    pub fn new(
        config: ProviderConfig,
        credentials: Arc<CredentialCache>,
    ) -> Result<Self, FlightError> {
        let mut builder = Client::builder().timeout(Duration::from_secs(config.timeout_secs));

        if let Some(ref proxy) = config.proxy {
            builder = builder.proxy(wreq::Proxy::all(proxy).map_err(error::from_http_error)?);
        }

        let client = builder.build().map_err(error::from_http_error)?;

        Ok(Self {
            client,
            config,
            credentials,
        })
    }

    async fn fetch_token(&self) -> Result<AccessToken, FlightError> {
        let body = url::form_urlencoded::Serializer::new(String::new())
            .append_pair("grant_type", "client_credentials")
            .append_pair("client_id", &self.config.api_key)
            .append_pair("client_secret", &self.config.api_secret)
            .finish();

        let token_url = self.config.token_url();
        let response = self
            .client
            .post(token_url.as_str())
            .header("content-type", "application/x-www-form-urlencoded")
            .body(body)
            .send()
            .await
            .map_err(error::from_http_error)?;

        let status = response.status().as_u16();
        let text = response.text().await.map_err(error::from_http_error)?;

        if !(200..300).contains(&status) {
            tracing::warn!(
                status,
                detail = parse::provider_error_detail(&text).as_deref(),
                "token request rejected"
            );
            return Err(FlightError::Auth(format!("HTTP {status}")));
        }

        parse::parse_token(&text)
    }

    async fn fetch_offers(&self, params: &SearchParams) -> Result<Vec<Flight>, FlightError> {
        let token = self
            .credentials
            .get_or_refresh(|| self.fetch_token())
            .await?;

        let query = params.to_provider_params(&self.config.currency, self.config.max_results);
        let offers_url = self.config.offers_url();

        tracing::debug!(
            origin = %params.origin,
            destination = %params.destination,
            date = %params.date,
            "requesting flight offers"
        );

        let response = self
            .client
            .get(offers_url.as_str())
            .query(&query)
            .header("authorization", format!("Bearer {token}"))
            .send()
            .await
            .map_err(error::from_http_error)?;

        let status = response.status().as_u16();
        let text = response.text().await.map_err(error::from_http_error)?;

        match status {
            200..=299 => {}
            401 => {
                self.credentials.invalidate().await;
                return Err(FlightError::Auth("access token rejected".into()));
            }
            429 => return Err(FlightError::RateLimited),
            _ => {
                tracing::warn!(
                    status,
                    detail = parse::provider_error_detail(&text).as_deref(),
                    "flight offers request failed"
                );
                return Err(FlightError::HttpStatus(status));
            }
        }

        parse::parse_offers(&text)
    }
}

#[async_trait]
impl FlightProvider for AmadeusClient {
    async fn search(
        &self,
        params: &SearchParams,
        cancel: CancellationToken,
    ) -> Result<Vec<Flight>, FlightError> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(FlightError::Cancelled),
            result = self.fetch_offers(params) => result,
        }
    }
}
