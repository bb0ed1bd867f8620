//! Pure valuation arithmetic shared by the store and the views.
//!
//! All functions are total: absent or non-finite inputs degrade to zero
//! instead of panicking, so a half-filled record still renders.

use crate::core::investment::Tenor;

fn sanitize(value: f64) -> f64 {
    if value.is_finite() { value } else { 0.0 }
}

/// Cost basis of a market holding.
pub fn buy_value(buy_price: f64, quantity: f64) -> f64 {
    sanitize(buy_price) * sanitize(quantity)
}

/// Market value from the latest quote, zero when no usable quote exists.
pub fn current_value(current_price: Option<f64>, quantity: f64) -> f64 {
    match current_price {
        Some(price) if price.is_finite() && price > 0.0 => price * sanitize(quantity),
        _ => 0.0,
    }
}

pub fn profit_loss(current_value: f64, buy_value: f64) -> f64 {
    sanitize(current_value) - sanitize(buy_value)
}

/// Return in percent relative to cost basis, zero for a zero basis.
pub fn profit_loss_pct(profit_loss: f64, buy_value: f64) -> f64 {
    let basis = sanitize(buy_value);
    if basis == 0.0 {
        0.0
    } else {
        (sanitize(profit_loss) / basis) * 100.0
    }
}

/// Simple interest earned over the full tenor.
pub fn deposito_interest(principal: f64, annual_rate_pct: f64, tenor: Tenor) -> f64 {
    // multiply before dividing so round percentages stay exact
    sanitize(principal) * sanitize(annual_rate_pct) / 100.0 * tenor.years()
}

/// Principal plus simple interest at maturity.
pub fn deposito_maturity_value(principal: f64, annual_rate_pct: f64, tenor: Tenor) -> f64 {
    sanitize(principal) + deposito_interest(principal, annual_rate_pct, tenor)
}

/// Interest left after withholding tax. Display helper only; stored
/// valuations stay gross.
pub fn net_interest(interest: f64, tax_rate_pct: f64) -> f64 {
    sanitize(interest) * (1.0 - sanitize(tax_rate_pct) / 100.0)
}
