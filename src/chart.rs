use crate::model::{Flight, PriceChartItem};

/// Average price per airline, airlines in first-seen order.
pub fn build_price_chart(flights: &[&Flight]) -> Vec<PriceChartItem> {
    let mut grouped: Vec<(&str, f64, usize)> = Vec::new();

    for flight in flights {
        match grouped.iter_mut().find(|(airline, _, _)| *airline == flight.airline) {
            Some((_, sum, count)) => {
                *sum += flight.price;
                *count += 1;
            }
            None => grouped.push((flight.airline.as_str(), flight.price, 1)),
        }
    }

    grouped
        .into_iter()
        .map(|(airline, sum, count)| PriceChartItem {
            airline: airline.to_string(),
            average_price: sum / count as f64,
        })
        .collect()
}
