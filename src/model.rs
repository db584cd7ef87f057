use serde::{Deserialize, Serialize};

/// A single normalized flight offer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Flight {
    pub id: String,
    pub airline: String,
    pub price: f64,
    pub stops: u32,
    pub departure_time: String,
    pub arrival_time: String,
    pub duration: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchParams {
    pub origin: String,
    pub destination: String,
    pub date: String,
}

impl SearchParams {
    pub fn new(
        origin: impl Into<String>,
        destination: impl Into<String>,
        date: impl Into<String>,
    ) -> Self {
        Self {
            origin: origin.into(),
            destination: destination.into(),
            date: date.into(),
        }
    }

    /// Identity of the search that produced a result set.
    pub fn search_key(&self) -> String {
        format!("{}-{}-{}", self.origin, self.destination, self.date)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchStatus {
    #[default]
    Idle,
    Loading,
    Success,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct PriceBounds {
    pub min: f64,
    pub max: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct PriceRange {
    pub min: f64,
    pub max: f64,
}

impl From<PriceBounds> for PriceRange {
    fn from(bounds: PriceBounds) -> Self {
        Self {
            min: bounds.min,
            max: bounds.max,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StopsFilter {
    #[default]
    Any,
    Nonstop,
    OneStop,
    /// Two or more stops.
    TwoPlus,
}

impl StopsFilter {
    pub fn from_str_loose(s: &str) -> Option<Self> {
        match s.trim() {
            "any" => Some(Self::Any),
            "0" => Some(Self::Nonstop),
            "1" => Some(Self::OneStop),
            "2" => Some(Self::TwoPlus),
            _ => None,
        }
    }

    /// Query-string value; `None` for `Any`, which is never written.
    pub fn as_param(&self) -> Option<&'static str> {
        match self {
            Self::Any => None,
            Self::Nonstop => Some("0"),
            Self::OneStop => Some("1"),
            Self::TwoPlus => Some("2"),
        }
    }
}

impl Serialize for StopsFilter {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.as_param() {
            Some(n) => serializer.serialize_str(n),
            None => serializer.serialize_str("any"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FlightFilters {
    pub stops: StopsFilter,
    pub price_range: PriceRange,
    pub airlines: Vec<String>,
}

impl FlightFilters {
    pub fn defaults(bounds: PriceBounds) -> Self {
        Self {
            stops: StopsFilter::Any,
            price_range: bounds.into(),
            airlines: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SortKey {
    #[default]
    Price,
    Duration,
    Departure,
    Airline,
}

impl SortKey {
    pub fn from_str_loose(s: &str) -> Option<Self> {
        match s {
            "price" => Some(Self::Price),
            "duration" => Some(Self::Duration),
            "departure" => Some(Self::Departure),
            "airline" => Some(Self::Airline),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct SortState {
    pub key: SortKey,
    pub order: SortOrder,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceChartItem {
    pub airline: String,
    pub average_price: f64,
}
