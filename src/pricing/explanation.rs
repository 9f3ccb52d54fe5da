use crate::models::PriceHistoryRecord;
use rust_decimal::Decimal;

pub const INITIAL_ENTRY: &str = "Initial price entry.";

const DEMAND_UP: &str = "Demand increased, signaling stronger buyer interest.";
const DEMAND_DOWN: &str = "Demand fell, reducing upward pressure on price.";
const SUPPLY_DOWN: &str = "Available supply decreased, contributing to a price rise.";
const SUPPLY_UP: &str = "Supply increased, easing scarcity effects.";
const MOMENTUM_UP: &str = "Market momentum grew, reflecting positive sentiment.";
const MOMENTUM_DOWN: &str = "Momentum slowed down, weakening bullish trends.";

/// Percentage rendered with at least one decimal place (`12.0`, `3.33`)
pub fn format_percent(value: Decimal) -> String {
    let text = value.normalize().to_string();
    if text.contains('.') {
        text
    } else {
        format!("{}.0", text)
    }
}

/// Describe the move from `prior` to the new values
pub fn explain_change(
    prior: Option<&PriceHistoryRecord>,
    price: i64,
    demand: i64,
    supply: i64,
    momentum: i64,
) -> Vec<String> {
    let prior = match prior {
        Some(prior) => prior,
        None => return vec![INITIAL_ENTRY.to_string()],
    };

    let percent_change = if prior.price == 0 {
        Decimal::ZERO
    } else {
        Decimal::from(price.saturating_sub(prior.price)) * Decimal::ONE_HUNDRED / Decimal::from(prior.price)
    };

    let direction = if percent_change > Decimal::ZERO {
        "increased"
    } else {
        "decreased"
    };

    let mut text = format!(
        "Price {} by {}%.",
        direction,
        format_percent(percent_change.round_dp(2).abs())
    );

    let clauses = [
        (demand > prior.demand_number, DEMAND_UP),
        (demand < prior.demand_number, DEMAND_DOWN),
        (supply < prior.supply_number, SUPPLY_DOWN),
        (supply > prior.supply_number, SUPPLY_UP),
        (momentum > prior.momentum, MOMENTUM_UP),
        (momentum < prior.momentum, MOMENTUM_DOWN),
    ];

    for (_, clause) in clauses.iter().filter(|(applies, _)| *applies) {
        text.push(' ');
        text.push_str(clause);
    }

    vec![text.trim_end().to_string()]
}
