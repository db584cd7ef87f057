use serde::Deserialize;
use serde_json::Value;
use tokio::time::Duration;

use crate::auth::AccessToken;
use crate::error::FlightError;
use crate::model::Flight;

fn get_str<'a>(val: &'a Value, pointer: &str) -> Option<&'a str> {
    val.pointer(pointer).and_then(Value::as_str)
}

fn get_price(val: &Value) -> Option<f64> {
    let price = match val.pointer("/price/total")? {
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        Value::Number(n) => n.as_f64()?,
        _ => return None,
    };
    (price.is_finite() && price >= 0.0).then_some(price)
}

fn carrier_name(carriers: Option<&Value>, code: &str) -> String {
    carriers
        .and_then(|c| c.get(code))
        .and_then(Value::as_str)
        .unwrap_or(code)
        .to_string()
}

pub fn parse_offer(offer: &Value, carriers: Option<&Value>) -> Option<Flight> {
    let id = get_str(offer, "/id")?.to_string();
    let itinerary = offer.pointer("/itineraries/0")?;
    let segments = itinerary.get("segments")?.as_array()?;
    let first = segments.first()?;
    let last = segments.last()?;

    let code = get_str(offer, "/validatingAirlineCodes/0")
        .or_else(|| get_str(first, "/carrierCode"))?;

    Some(Flight {
        id,
        airline: carrier_name(carriers, code),
        price: get_price(offer)?,
        stops: (segments.len() - 1) as u32,
        departure_time: get_str(first, "/departure/at")?.to_string(),
        arrival_time: get_str(last, "/arrival/at")?.to_string(),
        duration: get_str(itinerary, "/duration").unwrap_or_default().to_string(),
    })
}

/// Normalizes a flight-offers payload. A payload without `data` is an empty
/// result, not an error; offers missing required fields are skipped.
pub fn parse_payload(payload: &Value) -> Vec<Flight> {
    let Some(offers) = payload.get("data").and_then(Value::as_array) else {
        return Vec::new();
    };
    let carriers = payload.pointer("/dictionaries/carriers");

    let flights: Vec<Flight> = offers
        .iter()
        .filter_map(|offer| parse_offer(offer, carriers))
        .collect();

    if flights.len() < offers.len() {
        tracing::debug!(
            skipped = offers.len() - flights.len(),
            "skipped malformed flight offers"
        );
    }

    flights
}

pub fn parse_offers(body: &str) -> Result<Vec<Flight>, FlightError> {
    let payload: Value =
        serde_json::from_str(body).map_err(|e| FlightError::Parse(e.to_string()))?;
    Ok(parse_payload(&payload))
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

pub fn parse_token(body: &str) -> Result<AccessToken, FlightError> {
    let token: TokenResponse =
        serde_json::from_str(body).map_err(|e| FlightError::Auth(e.to_string()))?;
    Ok(AccessToken {
        value: token.access_token,
        expires_in: Duration::from_secs(token.expires_in),
    })
}

/// First `errors[].detail` (or `title`) from a provider error body, for logs.
pub fn provider_error_detail(body: &str) -> Option<String> {
    let payload: Value = serde_json::from_str(body).ok()?;
    let first = payload.pointer("/errors/0")?;
    get_str(first, "/detail")
        .or_else(|| get_str(first, "/title"))
        .map(String::from)
}
