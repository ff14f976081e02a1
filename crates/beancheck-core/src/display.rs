//! Number formatting for reports.
//!
//! A [`DisplayContext`] learns, per currency, how many fractional digits
//! the ledger writes numbers with. Reports then render every number of a
//! currency at its most common precision, so that `10.5 USD` and
//! `3.25 USD` show up as `10.50` and `3.25`.

use rust_decimal::{Decimal, RoundingStrategy};
use std::collections::HashMap;

/// Per-currency precision statistics.
#[derive(Debug, Clone, Default)]
pub struct DisplayContext {
    scales: HashMap<String, HashMap<u32, usize>>,
    render_commas: bool,
}

impl DisplayContext {
    /// Create an empty context.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Render thousands separators in the integer part.
    #[must_use]
    pub const fn with_commas(mut self, render_commas: bool) -> Self {
        self.render_commas = render_commas;
        self
    }

    /// Record one occurrence of `number` written in `currency`.
    pub fn update(&mut self, number: Decimal, currency: &str) {
        *self
            .scales
            .entry(currency.to_string())
            .or_default()
            .entry(number.scale())
            .or_insert(0) += 1;
    }

    /// Most common precision for `currency`; ties go to the larger precision.
    #[must_use]
    pub fn precision(&self, currency: &str) -> Option<u32> {
        self.scales
            .get(currency)?
            .iter()
            .max_by(|(sa, ca), (sb, cb)| ca.cmp(cb).then(sa.cmp(sb)))
            .map(|(scale, _)| *scale)
    }

    /// Format `number` for `currency`.
    ///
    /// Unknown currencies keep the number's own digits.
    #[must_use]
    pub fn format(&self, number: Decimal, currency: &str) -> String {
        let number = match self.precision(currency) {
            Some(precision) => {
                let mut rounded =
                    number.round_dp_with_strategy(precision, RoundingStrategy::MidpointNearestEven);
                rounded.rescale(precision);
                rounded
            }
            None => number,
        };
        let text = number.to_string();
        if self.render_commas {
            insert_commas(&text)
        } else {
            text
        }
    }
}

fn insert_commas(text: &str) -> String {
    let (sign, unsigned) = text
        .strip_prefix('-')
        .map_or(("", text), |rest| ("-", rest));
    let (int_part, frac_part) = unsigned
        .split_once('.')
        .map_or((unsigned, None), |(i, f)| (i, Some(f)));

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    match frac_part {
        Some(frac) => format!("{sign}{grouped}.{frac}"),
        None => format!("{sign}{grouped}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_most_common_precision() {
        let mut ctx = DisplayContext::new();
        ctx.update(dec!(1.00), "USD");
        ctx.update(dec!(2.50), "USD");
        ctx.update(dec!(3.125), "USD");
        assert_eq!(ctx.precision("USD"), Some(2));
        assert_eq!(ctx.format(dec!(10.5), "USD"), "10.50");
        assert_eq!(ctx.format(dec!(0.125), "USD"), "0.12");
    }

    #[test]
    fn test_tie_prefers_larger_precision() {
        let mut ctx = DisplayContext::new();
        ctx.update(dec!(1.0), "EUR");
        ctx.update(dec!(1.000), "EUR");
        assert_eq!(ctx.precision("EUR"), Some(3));
    }

    #[test]
    fn test_unknown_currency_keeps_digits() {
        let ctx = DisplayContext::new();
        assert_eq!(ctx.precision("GBP"), None);
        assert_eq!(ctx.format(dec!(100.438), "GBP"), "100.438");
    }

    #[test]
    fn test_commas() {
        let mut ctx = DisplayContext::new().with_commas(true);
        ctx.update(dec!(1.00), "USD");
        assert_eq!(ctx.format(dec!(-1234567.5), "USD"), "-1,234,567.50");
        assert_eq!(ctx.format(dec!(999), "USD"), "999.00");
        assert_eq!(insert_commas("1000"), "1,000");
    }
}
