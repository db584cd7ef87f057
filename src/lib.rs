pub mod auth;
pub mod chart;
pub mod config;
pub mod error;
pub mod fetch;
pub mod filter;
pub mod mcp;
pub mod model;
pub mod page;
pub mod parse;
pub mod query;
pub mod session;
pub mod table;
pub mod url_state;

use std::sync::Arc;

use auth::CredentialCache;
use config::ProviderConfig;
use error::FlightError;
use fetch::AmadeusClient;
use model::SortState;
use page::{PageView, SearchPage};

/// Runs the search described by `query` (a shared query string or URL) to
/// completion and returns the resulting page.
pub async fn resume(
    query: &str,
    sort: Option<SortState>,
    config: ProviderConfig,
) -> Result<PageView, FlightError> {
    let provider = AmadeusClient::new(config, Arc::new(CredentialCache::new()))?;
    let mut page = SearchPage::new(Arc::new(provider), query);

    if page.load().is_none() {
        return Err(FlightError::Validation(
            "no complete search in URL (origin, destination and date are required)".into(),
        ));
    }

    page.settle().await;
    if let Some(sort) = sort {
        page.set_sort(sort);
    }

    let view = page.view();
    if view.status == model::SearchStatus::Error {
        return Err(FlightError::LoadFailed);
    }
    Ok(view)
}
