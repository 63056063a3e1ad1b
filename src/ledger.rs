//! Pure discount arithmetic. The database applies discounts server-side
//! (`db::facilities::apply_discount`) so the stored amount is authoritative;
//! this module mirrors that computation for previews and tests.

/// Round half away from zero to two decimal places, matching Postgres
/// `round(numeric, 2)`.
pub fn round_currency(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}

/// The tax amount after one approval at `rate`. Discounts compound: each
/// approval applies `rate` to the current amount, not the original.
pub fn discounted_amount(tax_amount: f64, rate: f64) -> f64 {
    round_currency(tax_amount - tax_amount * rate)
}
