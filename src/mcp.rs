use rmcp::handler::server::tool::ToolRouter;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::model::*;
use rmcp::schemars;
use rmcp::{tool, tool_handler, tool_router, ErrorData as McpError, ServerHandler, ServiceExt};
use serde::Deserialize;

use crate::config::ProviderConfig;
use crate::error::FlightError;
use crate::filter::UrlFilters;
use crate::model::{SearchParams, SortKey, SortOrder, SortState, StopsFilter};
use crate::query::validate_price;
use crate::url_state::{initial_query, parse_airlines, parse_query};

#[derive(Debug, Deserialize, schemars::JsonSchema)]
struct SearchArgs {
    #[schemars(description = "Origin airport IATA code, 3 letters. Example: EZE")]
    origin: String,
    #[schemars(description = "Destination airport IATA code, 3 letters. Example: JFK")]
    destination: String,
    #[schemars(description = "Departure date in YYYY-MM-DD format. Example: 2026-02-03")]
    date: String,
    #[schemars(description = "Stops filter: any, 0, 1 or 2 (2 means two or more). Default: any")]
    stops: Option<String>,
    #[schemars(description = "Only these airlines, comma-separated, as named in results")]
    airlines: Option<String>,
    #[schemars(description = "Minimum price, inclusive")]
    min_price: Option<f64>,
    #[schemars(description = "Maximum price, inclusive")]
    max_price: Option<f64>,
    #[schemars(description = "Sort key: price, duration, departure or airline. Default: price")]
    sort: Option<String>,
    #[schemars(description = "Sort order: asc or desc. Default: asc")]
    order: Option<String>,
    #[schemars(description = "Return only the first N results after sorting")]
    top: Option<usize>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
struct ResumeArgs {
    #[schemars(
        description = "Shared URL or query string, e.g. ?origin=EZE&destination=JFK&date=2026-02-03&stops=0"
    )]
    query: String,
    #[schemars(description = "Sort key: price, duration, departure or airline. Default: price")]
    sort: Option<String>,
    #[schemars(description = "Sort order: asc or desc. Default: asc")]
    order: Option<String>,
    #[schemars(description = "Return only the first N results after sorting")]
    top: Option<usize>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
struct OpenUrlArgs {
    #[schemars(description = "URL to open. Must start with http:// or https://")]
    url: String,
}

fn tool_error(msg: impl Into<String>) -> Result<CallToolResult, McpError> {
    Ok(CallToolResult::error(vec![Content::text(msg.into())]))
}

fn parse_sort(sort: Option<&str>, order: Option<&str>) -> Result<SortState, FlightError> {
    let key = match sort {
        None => SortKey::Price,
        Some(s) => SortKey::from_str_loose(s)
            .ok_or_else(|| FlightError::Validation(format!("invalid sort key: {s}")))?,
    };
    let order = match order {
        None | Some("asc") => SortOrder::Asc,
        Some("desc") => SortOrder::Desc,
        Some(o) => return Err(FlightError::Validation(format!("invalid sort order: {o}"))),
    };
    Ok(SortState { key, order })
}

fn search_query(args: &SearchArgs) -> Result<String, FlightError> {
    let search = SearchParams::from_input(&args.origin, &args.destination, &args.date)?;

    let stops = match args.stops.as_deref() {
        None => None,
        Some(s) => Some(
            StopsFilter::from_str_loose(s)
                .ok_or_else(|| FlightError::Validation(format!("invalid stops filter: {s}")))?,
        ),
    };

    for price in [args.min_price, args.max_price].into_iter().flatten() {
        validate_price(price)?;
    }

    let filters = UrlFilters {
        stops,
        airlines: parse_airlines(args.airlines.as_deref()),
        min_price: args.min_price,
        max_price: args.max_price,
    };

    Ok(initial_query(&search, &filters))
}

async fn run_query(query: &str, sort: SortState, top: Option<usize>) -> Result<CallToolResult, McpError> {
    let config = match ProviderConfig::load() {
        Ok(c) => c,
        Err(e) => return tool_error(e.user_message()),
    };

    match crate::resume(query, Some(sort), config).await {
        Ok(mut view) => {
            if let Some(n) = top {
                view.flights.truncate(n);
            }
            match serde_json::to_string_pretty(&view) {
                Ok(json) => Ok(CallToolResult::success(vec![Content::text(json)])),
                Err(e) => tool_error(e.to_string()),
            }
        }
        Err(e) => tool_error(e.user_message()),
    }
}

#[derive(Debug, Clone)]
struct SkyfareMcp {
    tool_router: ToolRouter<Self>,
}

#[tool_router]
impl SkyfareMcp {
    fn new() -> Self {
        Self {
            tool_router: Self::tool_router(),
        }
    }

    #[tool(
        description = "Search one-way flight offers for one adult and return them as JSON, filtered and sorted. The response includes a 'query' field: a shareable query string that reproduces this exact search and filter state with skyfare_resume."
    )]
    async fn skyfare_search(
        &self,
        Parameters(args): Parameters<SearchArgs>,
    ) -> Result<CallToolResult, McpError> {
        let sort = match parse_sort(args.sort.as_deref(), args.order.as_deref()) {
            Ok(s) => s,
            Err(e) => return tool_error(e.to_string()),
        };
        let query = match search_query(&args) {
            Ok(q) => q,
            Err(e) => return tool_error(e.to_string()),
        };
        run_query(&query, sort, args.top).await
    }

    #[tool(
        description = "Re-run a search from a shared query string or URL (as returned in the 'query' field of skyfare_search), restoring its stops, airline and price filters."
    )]
    async fn skyfare_resume(
        &self,
        Parameters(args): Parameters<ResumeArgs>,
    ) -> Result<CallToolResult, McpError> {
        let sort = match parse_sort(args.sort.as_deref(), args.order.as_deref()) {
            Ok(s) => s,
            Err(e) => return tool_error(e.to_string()),
        };
        if parse_query(&args.query).search.is_none() {
            return tool_error(
                "query must contain origin, destination and date (e.g. ?origin=EZE&destination=JFK&date=2026-02-03)",
            );
        }
        run_query(&args.query, sort, args.top).await
    }

    #[tool(description = "Open a URL in the default web browser.")]
    async fn open_url(
        &self,
        Parameters(args): Parameters<OpenUrlArgs>,
    ) -> Result<CallToolResult, McpError> {
        if !args.url.starts_with("http://") && !args.url.starts_with("https://") {
            return tool_error("URL must start with http:// or https://");
        }

        match open::that(&args.url) {
            Ok(()) => Ok(CallToolResult::success(vec![Content::text(format!(
                "Opened: {}",
                args.url
            ))])),
            Err(e) => tool_error(format!("failed to open browser: {e}")),
        }
    }
}

#[tool_handler]
impl ServerHandler for SkyfareMcp {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2024_11_05,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "skyfare".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Default::default()
            },
            instructions: Some(
                "Flight search tool. Use skyfare_search to find and filter flights; pass the returned 'query' to skyfare_resume to reproduce a search later.".into(),
            ),
        }
    }
}

pub async fn run() {
    let service = match SkyfareMcp::new().serve(rmcp::transport::stdio()).await {
        Ok(s) => s,
        Err(e) => {
            tracing::error!(error = %e, "failed to start MCP server");
            return;
        }
    };
    if let Err(e) = service.waiting().await {
        tracing::error!(error = %e, "MCP server error");
    }
}
