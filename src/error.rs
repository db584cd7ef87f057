use std::fmt;

/// Message shown for any failure that happened after the request left.
pub const LOAD_FAILED_MESSAGE: &str = "Unable to load flights";

#[derive(Debug)]
pub enum FlightError {
    Timeout,
    ConnectionFailed(String),
    ProxyError(String),
    RateLimited,
    HttpStatus(u16),
    Auth(String),
    Parse(String),
    Cancelled,
    LoadFailed,
    InvalidAirport(String),
    InvalidDate(String),
    Validation(String),
    Config(String),
}

impl fmt::Display for FlightError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timeout => write!(
                f,
                "request timed out, the provider may be slow or unreachable. \
                 Try increasing --timeout or check your connection"
            ),
            Self::ConnectionFailed(detail) => write!(
                f,
                "connection failed, check your internet connection ({detail})"
            ),
            Self::ProxyError(detail) => write!(
                f,
                "proxy error, check your --proxy URL is correct ({detail})"
            ),
            Self::RateLimited => write!(
                f,
                "rate limited by the flight provider (HTTP 429), wait a moment before retrying"
            ),
            Self::HttpStatus(status) => write!(
                f,
                "unexpected HTTP status {status} from the flight provider"
            ),
            Self::Auth(detail) => write!(
                f,
                "failed to authenticate with the flight provider ({detail})"
            ),
            Self::Parse(detail) => write!(
                f,
                "failed to parse flight offers from the provider response: {detail}"
            ),
            Self::Cancelled => write!(f, "search was superseded by a newer search"),
            Self::LoadFailed => write!(f, "{LOAD_FAILED_MESSAGE}"),
            Self::InvalidAirport(code) => write!(
                f,
                "invalid airport code \"{code}\", must be exactly 3 letters (e.g. EZE, JFK, MAD)"
            ),
            Self::InvalidDate(date) => write!(
                f,
                "invalid date \"{date}\", must be YYYY-MM-DD format (e.g. 2026-02-03)"
            ),
            Self::Validation(msg) => write!(f, "{msg}"),
            Self::Config(msg) => write!(f, "configuration error: {msg}"),
        }
    }
}

impl std::error::Error for FlightError {}

impl FlightError {
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::InvalidAirport(_) | Self::InvalidDate(_) | Self::Validation(_)
        )
    }

    /// Text safe to put in front of a user. Provider and transport detail stays
    /// in the logs.
    pub fn user_message(&self) -> String {
        if self.is_validation() || matches!(self, Self::Config(_)) {
            return self.to_string();
        }
        LOAD_FAILED_MESSAGE.to_string()
    }
}

pub fn from_http_error(err: wreq::Error) -> FlightError {
    let msg = err.to_string();
    let lower = msg.to_lowercase();

    if err.is_timeout() {
        return FlightError::Timeout;
    }

    if err.is_connect() {
        return FlightError::ConnectionFailed(msg);
    }

    if lower.contains("proxy") || lower.contains("socks") {
        return FlightError::ProxyError(msg);
    }

    if lower.contains("builder error") && lower.contains("uri") {
        return FlightError::ProxyError(msg);
    }

    FlightError::ConnectionFailed(msg)
}

impl From<::config::ConfigError> for FlightError {
    fn from(err: ::config::ConfigError) -> Self {
        FlightError::Config(err.to_string())
    }
}
