use serde::Deserialize;

use crate::error::FlightError;

pub const DEFAULT_BASE_URL: &str = "https://test.api.amadeus.com";
pub const DEFAULT_SHARE_BASE_URL: &str = "http://localhost:3000/";

#[derive(Debug, Clone, Deserialize)]
pub struct ProviderConfig {
    pub base_url: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub api_secret: String,
    pub currency: String,
    pub max_results: u32,
    pub timeout_secs: u64,
    pub proxy: Option<String>,
    /// Page that shared query strings are appended to.
    pub share_base_url: String,
}

impl ProviderConfig {
    /// Defaults, then an optional `skyfare.toml` in the working directory,
    /// then `SKYFARE_*` environment variables (e.g. `SKYFARE_API_KEY`).
    pub fn load() -> Result<Self, FlightError> {
        let settings = ::config::Config::builder()
            .set_default("base_url", DEFAULT_BASE_URL)?
            .set_default("currency", "USD")?
            .set_default("max_results", 20)?
            .set_default("timeout_secs", 30)?
            .set_default("share_base_url", DEFAULT_SHARE_BASE_URL)?
            .add_source(::config::File::with_name("skyfare").required(false))
            .add_source(::config::Environment::with_prefix("SKYFARE"))
            .build()?;

        let config: Self = settings.try_deserialize()?;
        config.check()?;
        Ok(config)
    }

    fn check(&self) -> Result<(), FlightError> {
        if self.api_key.is_empty() || self.api_secret.is_empty() {
            return Err(FlightError::Config(
                "SKYFARE_API_KEY and SKYFARE_API_SECRET must be set".into(),
            ));
        }
        if self.max_results == 0 {
            return Err(FlightError::Config("max_results must be at least 1".into()));
        }
        Ok(())
    }

    pub fn token_url(&self) -> String {
        format!("{}/v1/security/oauth2/token", self.base_url.trim_end_matches('/'))
    }

    pub fn share_url(&self, query: &str) -> String {
        format!("{}{query}", self.share_base_url)
    }

    pub fn offers_url(&self) -> String {
        format!("{}/v2/shopping/flight-offers", self.base_url.trim_end_matches('/'))
    }
}
