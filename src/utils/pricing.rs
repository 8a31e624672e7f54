use chrono::{DateTime, FixedOffset};

/// Platform fee taken from every non-refund transaction
pub const PLATFORM_FEE_RATE: f64 = 0.05;

const MILLIS_PER_DAY: i64 = 24 * 60 * 60 * 1000;

/// Number of billable days between two instants, rounding any partial day up.
/// Zero or negative when `end` is not after `start`.
pub fn rental_days(start: DateTime<FixedOffset>, end: DateTime<FixedOffset>) -> i64 {
    let millis = (end - start).num_milliseconds();
    // ceil for positive spans, truncation toward zero otherwise
    if millis > 0 {
        (millis + MILLIS_PER_DAY - 1) / MILLIS_PER_DAY
    } else {
        millis / MILLIS_PER_DAY
    }
}

/// Total rental price for a number of billable days
pub fn rental_total(days: i64, base_price: f64) -> f64 {
    days as f64 * base_price
}

/// Split of a transaction amount into `(fee, net_amount)`
pub fn fee_split(amount: f64) -> (f64, f64) {
    let fee = amount * PLATFORM_FEE_RATE;
    (fee, amount - fee)
}
