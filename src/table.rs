use chrono::NaiveDateTime;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};

use crate::filter::duration_minutes;
use crate::model::{Flight, PriceChartItem};

pub fn format_price(price: f64, currency: &str) -> String {
    let p = if price.fract() == 0.0 {
        format!("{price:.0}")
    } else {
        format!("{price:.2}")
    };
    match currency {
        "USD" => format!("${p}"),
        "EUR" => format!("€{p}"),
        "GBP" => format!("£{p}"),
        "JPY" | "CNY" => format!("¥{p}"),
        "KRW" => format!("₩{p}"),
        "INR" => format!("₹{p}"),
        "THB" => format!("฿{p}"),
        _ => format!("{p} {currency}"),
    }
}

/// `PT29H55M` → `29h 55m`, `PT14H` → `14h`, `PT45M` → `45m`.
pub fn format_duration(duration: &str) -> String {
    let total = duration_minutes(duration);
    let (hours, minutes) = (total / 60, total % 60);

    let mut parts = Vec::new();
    if hours > 0 {
        parts.push(format!("{hours}h"));
    }
    if minutes > 0 {
        parts.push(format!("{minutes}m"));
    }

    if parts.is_empty() {
        "0m".to_string()
    } else {
        parts.join(" ")
    }
}

fn parse_local(timestamp: &str) -> Option<NaiveDateTime> {
    let local = timestamp.get(..19).unwrap_or(timestamp);
    NaiveDateTime::parse_from_str(local, "%Y-%m-%dT%H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(local, "%Y-%m-%dT%H:%M"))
        .ok()
}

/// `2026-02-03T15:25:00` → `03 Feb · 15:25`, in the airport's local time.
pub fn format_date_time(timestamp: &str) -> String {
    parse_local(timestamp)
        .map(|dt| dt.format("%d %b · %H:%M").to_string())
        .unwrap_or_else(|| timestamp.to_string())
}

/// `2026-02-03T06:10:00` → `06:10`.
pub fn format_time(timestamp: &str) -> String {
    parse_local(timestamp)
        .map(|dt| dt.format("%H:%M").to_string())
        .unwrap_or_else(|| timestamp.to_string())
}

pub fn format_stops(stops: u32) -> String {
    match stops {
        0 => "Nonstop".to_string(),
        1 => "1 stop".to_string(),
        n => format!("{n} stops"),
    }
}

pub fn render(flights: &[Flight], currency: &str) -> String {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["Airline", "Depart", "Arrive", "Duration", "Stops", "Price"]);

    for flight in flights {
        table.add_row(vec![
            flight.airline.clone(),
            format_date_time(&flight.departure_time),
            format_date_time(&flight.arrival_time),
            format_duration(&flight.duration),
            format_stops(flight.stops),
            format_price(flight.price, currency),
        ]);
    }

    table.to_string()
}

pub fn render_chart(chart: &[PriceChartItem], currency: &str) -> String {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["Airline", "Avg price"]);

    for item in chart {
        table.add_row(vec![
            item.airline.clone(),
            format_price(item.average_price.round(), currency),
        ]);
    }

    table.to_string()
}
