use chrono::{Datelike, NaiveDate};

use crate::error::FlightError;
use crate::model::SearchParams;

fn validate_airport(code: &str) -> Result<(), FlightError> {
    if code.len() != 3 || !code.chars().all(|c| c.is_ascii_uppercase()) {
        return Err(FlightError::InvalidAirport(code.to_string()));
    }
    Ok(())
}

/// Strict `YYYY-MM-DD`: zero-padded, a real calendar day, year 2000 or later.
fn validate_date(date: &str) -> Result<(), FlightError> {
    let invalid = || FlightError::InvalidDate(date.to_string());

    let shape_ok = date.len() == 10
        && date.bytes().enumerate().all(|(i, b)| match i {
            4 | 7 => b == b'-',
            _ => b.is_ascii_digit(),
        });
    if !shape_ok {
        return Err(invalid());
    }

    let day = NaiveDate::parse_from_str(date, "%Y-%m-%d").map_err(|_| invalid())?;
    if day.year() < 2000 {
        return Err(invalid());
    }
    Ok(())
}

/// Price filter values must be finite and non-negative.
pub fn validate_price(price: f64) -> Result<(), FlightError> {
    if !price.is_finite() || price < 0.0 {
        return Err(FlightError::Validation(format!(
            "invalid price {price}, must be a non-negative number"
        )));
    }
    Ok(())
}

impl SearchParams {
    /// Builds params the way the search form does: codes trimmed and
    /// uppercased, then validated.
    pub fn from_input(origin: &str, destination: &str, date: &str) -> Result<Self, FlightError> {
        let origin = origin.trim();
        let destination = destination.trim();
        let date = date.trim();

        if origin.is_empty() || destination.is_empty() || date.is_empty() {
            return Err(FlightError::Validation(
                "origin, destination and date are required".into(),
            ));
        }

        let params = Self::new(origin.to_uppercase(), destination.to_uppercase(), date);
        params.validate()?;
        Ok(params)
    }

    pub fn validate(&self) -> Result<(), FlightError> {
        validate_airport(&self.origin)?;
        validate_airport(&self.destination)?;
        validate_date(&self.date)?;

        if self.origin == self.destination {
            return Err(FlightError::Validation(format!(
                "origin and destination must differ (both {})",
                self.origin
            )));
        }

        Ok(())
    }

    /// Query parameters for the provider's flight-offers endpoint.
    pub fn to_provider_params(&self, currency: &str, max_results: u32) -> Vec<(String, String)> {
        vec![
            ("originLocationCode".to_string(), self.origin.clone()),
            ("destinationLocationCode".to_string(), self.destination.clone()),
            ("departureDate".to_string(), self.date.clone()),
            ("adults".to_string(), "1".to_string()),
            ("currencyCode".to_string(), currency.to_string()),
            ("max".to_string(), max_results.to_string()),
        ]
    }
}
