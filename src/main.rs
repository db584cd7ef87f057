use std::process;

use clap::{Args, Parser};
use tracing_subscriber::EnvFilter;

use skyfare::config::ProviderConfig;
use skyfare::error::FlightError;
use skyfare::filter::UrlFilters;
use skyfare::model::{SearchParams, SortKey, SortOrder, SortState, StopsFilter};
use skyfare::page::PageView;
use skyfare::query::validate_price;
use skyfare::table;
use skyfare::url_state::{initial_query, parse_airlines, parse_query};

#[derive(Parser)]
#[command(
    name = "skyfare",
    about = "Search flight offers, filter and sort them, and share the search as a URL",
    version,
    after_help = "\
Examples:
  skyfare search -f EZE -t JFK -d 2026-02-03
  skyfare search -f EZE -t JFK -d 2026-02-03 --stops 0 --sort duration
  skyfare search -f MAD -t LIM -d 2026-05-01 --airlines IBERIA --max-price 900 --json
  skyfare resume \"?origin=EZE&destination=JFK&date=2026-02-03&stops=1\"

Credentials: set SKYFARE_API_KEY and SKYFARE_API_SECRET (or skyfare.toml)."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand)]
enum Commands {
    #[command(
        about = "Search for flights",
        long_about = "Search one-way flight offers for one adult between two airports on a date.\n\
            Filters and sort are applied locally; the shareable query string is printed \
            after the results.",
        after_help = "\
Examples:
  Basic:        skyfare search -f EZE -t JFK -d 2026-02-03
  Nonstop:      skyfare search -f EZE -t JFK -d 2026-02-03 --stops 0
  Price range:  skyfare search -f EZE -t JFK -d 2026-02-03 --min-price 150 --max-price 250
  Airlines:     skyfare search -f EZE -t JFK -d 2026-02-03 --airlines \"AMERICAN AIRLINES,DELTA\"
  Fastest:      skyfare search -f EZE -t JFK -d 2026-02-03 --sort duration
  JSON output:  skyfare search -f EZE -t JFK -d 2026-02-03 --json --pretty"
    )]
    Search(SearchArgs),

    #[command(
        about = "Resume a shared search from its URL or query string",
        after_help = "\
Examples:
  skyfare resume \"?origin=EZE&destination=JFK&date=2026-02-03\"
  skyfare resume \"http://localhost:3000/?origin=EZE&destination=JFK&date=2026-02-03&stops=0\""
    )]
    Resume(ResumeArgs),

    #[command(about = "Start MCP server (for AI assistants like Claude Desktop)")]
    Mcp,
}

#[derive(Args)]
struct SearchArgs {
    #[arg(
        short, long,
        value_name = "IATA",
        help = "Origin airport code",
        long_help = "Origin airport IATA code (3 letters, e.g. EZE, JFK, MAD)."
    )]
    from: String,

    #[arg(
        short, long,
        value_name = "IATA",
        help = "Destination airport code",
        long_help = "Destination airport IATA code (3 letters, e.g. JFK, LIM, BCN)."
    )]
    to: String,

    #[arg(
        short, long,
        value_name = "YYYY-MM-DD",
        help = "Departure date",
        long_help = "Departure date in YYYY-MM-DD format."
    )]
    date: String,

    #[arg(
        long,
        value_name = "N",
        value_parser = ["any", "0", "1", "2"],
        help = "Stops filter [any, 0, 1, 2] (2 = two or more)"
    )]
    stops: Option<String>,

    #[arg(
        long,
        value_name = "NAME,NAME,...",
        help = "Only show these airlines (comma-separated, as printed in results)"
    )]
    airlines: Option<String>,

    #[arg(long, value_name = "PRICE", help = "Minimum price")]
    min_price: Option<f64>,

    #[arg(long, value_name = "PRICE", help = "Maximum price")]
    max_price: Option<f64>,

    #[command(flatten)]
    output: OutputArgs,
}

#[derive(Args)]
struct ResumeArgs {
    #[arg(value_name = "URL", help = "Shared URL or query string")]
    query: String,

    #[command(flatten)]
    output: OutputArgs,
}

#[derive(Args)]
struct OutputArgs {
    #[arg(
        long,
        default_value = "price",
        value_name = "KEY",
        value_parser = ["price", "duration", "departure", "airline"],
        help = "Sort key [price, duration, departure, airline]"
    )]
    sort: String,

    #[arg(long, help = "Sort descending")]
    desc: bool,

    #[arg(long, value_name = "N", help = "Show only the first N results")]
    top: Option<usize>,

    #[arg(long, help = "One-line-per-flight output")]
    compact: bool,

    #[arg(long, help = "Output as JSON")]
    json: bool,

    #[arg(long, help = "Output as pretty-printed JSON")]
    pretty: bool,

    #[arg(long, help = "Also print average price per airline")]
    chart: bool,

    #[arg(long, help = "Open the shareable URL in a browser")]
    open: bool,

    #[arg(long, value_name = "URL", help = "HTTP or SOCKS5 proxy")]
    proxy: Option<String>,

    #[arg(long, value_name = "SECS", help = "Request timeout (default 30)")]
    timeout: Option<u64>,
}

impl OutputArgs {
    fn is_json(&self) -> bool {
        self.json || self.pretty
    }

    fn sort_state(&self) -> SortState {
        SortState {
            key: SortKey::from_str_loose(&self.sort).unwrap_or_default(),
            order: if self.desc {
                SortOrder::Desc
            } else {
                SortOrder::Asc
            },
        }
    }
}

fn error_code(err: &FlightError) -> i32 {
    match err {
        FlightError::InvalidAirport(_)
        | FlightError::InvalidDate(_)
        | FlightError::Validation(_) => 2,
        FlightError::Timeout
        | FlightError::ConnectionFailed(_)
        | FlightError::ProxyError(_)
        | FlightError::LoadFailed
        | FlightError::Cancelled => 3,
        FlightError::RateLimited => 4,
        FlightError::HttpStatus(_) | FlightError::Auth(_) => 5,
        FlightError::Parse(_) => 6,
        FlightError::Config(_) => 7,
    }
}

fn error_kind(err: &FlightError) -> &'static str {
    match err {
        FlightError::InvalidAirport(_) => "invalid_airport",
        FlightError::InvalidDate(_) => "invalid_date",
        FlightError::Validation(_) => "validation_error",
        FlightError::Timeout => "timeout",
        FlightError::ConnectionFailed(_) => "connection_failed",
        FlightError::ProxyError(_) => "proxy_error",
        FlightError::RateLimited => "rate_limited",
        FlightError::HttpStatus(_) => "http_error",
        FlightError::Auth(_) => "auth_error",
        FlightError::Parse(_) => "parse_error",
        FlightError::LoadFailed => "load_failed",
        FlightError::Cancelled => "cancelled",
        FlightError::Config(_) => "config_error",
    }
}

fn die(err: &FlightError, json_mode: bool) -> ! {
    if json_mode {
        let json = serde_json::json!({
            "error": {
                "kind": error_kind(err),
                "message": err.user_message(),
            }
        });
        println!("{json}");
    } else {
        eprintln!("error: {}", err.user_message());
    }
    process::exit(error_code(err));
}

fn build_query(args: &SearchArgs) -> Result<String, FlightError> {
    let search = SearchParams::from_input(&args.from, &args.to, &args.date)?;

    for price in [args.min_price, args.max_price].into_iter().flatten() {
        validate_price(price)?;
    }

    let filters = UrlFilters {
        stops: args.stops.as_deref().and_then(StopsFilter::from_str_loose),
        airlines: parse_airlines(args.airlines.as_deref()),
        min_price: args.min_price,
        max_price: args.max_price,
    };

    Ok(initial_query(&search, &filters))
}

fn load_config(output: &OutputArgs) -> Result<ProviderConfig, FlightError> {
    let mut config = ProviderConfig::load()?;
    if let Some(timeout) = output.timeout {
        config.timeout_secs = timeout;
    }
    if output.proxy.is_some() {
        config.proxy = output.proxy.clone();
    }
    Ok(config)
}

fn print_compact(view: &PageView, currency: &str) {
    for flight in &view.flights {
        println!(
            "{} | {} | {}>{} | {} | {}",
            table::format_price(flight.price, currency),
            flight.airline,
            table::format_date_time(&flight.departure_time),
            table::format_time(&flight.arrival_time),
            table::format_duration(&flight.duration),
            table::format_stops(flight.stops),
        );
    }
}

fn print_view(view: &PageView, output: &OutputArgs, config: &ProviderConfig) {
    if output.is_json() {
        let rendered = if output.pretty {
            serde_json::to_string_pretty(view)
        } else {
            serde_json::to_string(view)
        };
        match rendered {
            Ok(json) => println!("{json}"),
            Err(e) => die(&FlightError::Parse(e.to_string()), true),
        }
        return;
    }

    if view.flights.is_empty() {
        println!("No flights match your search criteria.");
    } else if output.compact {
        print_compact(view, &config.currency);
    } else {
        println!("{}", table::render(&view.flights, &config.currency));
        println!("{} of {} flights shown", view.flights.len(), view.total);
    }

    if output.chart && !view.chart.is_empty() {
        println!("{}", table::render_chart(&view.chart, &config.currency));
    }

    println!("Share: {}", config.share_url(&view.query));
}

async fn run(query: &str, output: &OutputArgs) {
    let json_mode = output.is_json();

    let config = match load_config(output) {
        Ok(c) => c,
        Err(e) => die(&e, json_mode),
    };

    let mut view = match skyfare::resume(query, Some(output.sort_state()), config.clone()).await {
        Ok(v) => v,
        Err(e) => die(&e, json_mode),
    };

    if let Some(n) = output.top {
        view.flights.truncate(n);
    }

    print_view(&view, output, &config);

    if output.open {
        let url = config.share_url(&view.query);
        if let Err(e) = open::that(&url) {
            die(
                &FlightError::Validation(format!("failed to open browser: {e}")),
                json_mode,
            );
        }
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Mcp => skyfare::mcp::run().await,
        Commands::Search(args) => {
            let query = match build_query(&args) {
                Ok(q) => q,
                Err(e) => die(&e, args.output.is_json()),
            };
            run(&query, &args.output).await;
        }
        Commands::Resume(args) => {
            if parse_query(&args.query).search.is_none() {
                die(
                    &FlightError::Validation(
                        "no complete search in URL (origin, destination and date are required)"
                            .into(),
                    ),
                    args.output.is_json(),
                );
            }
            run(&args.query, &args.output).await;
        }
    }
}
