//! Display formatting for dashboard values.

use crate::{parse_decimal, Price};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

const THOUSAND: f64 = 1_000.0;
const MILLION: f64 = 1_000_000.0;
const BILLION: f64 = 1_000_000_000.0;

/// Format a number with a K/M/B magnitude suffix and fixed decimals.
///
/// Returns `"-"` for `None`, NaN and infinities.
pub fn fmt(value: Option<f64>, decimals: usize) -> String {
    let Some(num) = value.filter(|v| v.is_finite()) else {
        return "-".to_string();
    };

    let abs = num.abs();
    if abs >= BILLION {
        format!("{:.*}B", decimals, num / BILLION)
    } else if abs >= MILLION {
        format!("{:.*}M", decimals, num / MILLION)
    } else if abs >= THOUSAND {
        format!("{:.*}K", decimals, num / THOUSAND)
    } else {
        format!("{:.*}", decimals, num)
    }
}

/// Format an optional decimal. See [`fmt`].
pub fn fmt_decimal(value: Option<Decimal>, decimals: usize) -> String {
    fmt(value.and_then(|d| d.to_f64()), decimals)
}

/// Parse and format a raw numeric string. Unparseable input yields `"-"`.
pub fn fmt_str(raw: &str, decimals: usize) -> String {
    fmt_decimal(parse_decimal(raw), decimals)
}

/// Percentage change from `open` to `last`.
///
/// Returns 0 when either value is absent, and when `open` is zero.
/// A zero `last` is a real price and yields -100.
pub fn pct(open: Option<Price>, last: Option<Price>) -> f64 {
    match (open, last) {
        (Some(open), Some(last)) => last
            .pct_from(open)
            .and_then(|p| p.to_f64())
            .unwrap_or(0.0),
        _ => 0.0,
    }
}

/// Display label for a futures contract id.
///
/// Strips `suffix` (e.g., "_UMCBL") when the id ends with it; any other id is
/// returned unchanged.
pub fn instrument_label<'a>(inst_id: &'a str, suffix: &str) -> &'a str {
    if suffix.is_empty() {
        return inst_id;
    }
    inst_id.strip_suffix(suffix).unwrap_or(inst_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn price(d: Decimal) -> Option<Price> {
        Some(Price::new(d))
    }

    #[test]
    fn test_fmt_suffixes() {
        assert_eq!(fmt(Some(1_500.0), 2), "1.50K");
        assert_eq!(fmt(Some(2_300_000.0), 2), "2.30M");
        assert_eq!(fmt(Some(4_100_000_000.0), 2), "4.10B");
        assert_eq!(fmt(Some(999.0), 2), "999.00");
        assert_eq!(fmt(Some(-1_500.0), 2), "-1.50K");
        assert_eq!(fmt(Some(0.12346), 4), "0.1235");
    }

    #[test]
    fn test_fmt_missing() {
        assert_eq!(fmt(Some(f64::NAN), 2), "-");
        assert_eq!(fmt(None, 2), "-");
        assert_eq!(fmt(Some(f64::INFINITY), 2), "-");
    }

    #[test]
    fn test_fmt_str() {
        assert_eq!(fmt_str("1500", 2), "1.50K");
        assert_eq!(fmt_str("abc", 2), "-");
        assert_eq!(fmt_str("", 2), "-");
    }

    #[test]
    fn test_pct() {
        assert_eq!(pct(price(dec!(100)), price(dec!(110))), 10.0);
        assert_eq!(pct(price(dec!(0)), price(dec!(110))), 0.0);
        assert_eq!(pct(None, price(dec!(110))), 0.0);
        assert_eq!(pct(price(dec!(100)), None), 0.0);
        assert_eq!(pct(price(dec!(100)), price(dec!(0))), -100.0);
        assert_eq!(pct(price(dec!(200)), price(dec!(150))), -25.0);
        // Overflowing change is treated like a missing open.
        assert_eq!(
            pct(price(dec!(0.0000000000000000000000000001)), price(dec!(1000000000))),
            0.0
        );
    }

    #[test]
    fn test_instrument_label() {
        assert_eq!(instrument_label("BTCUSDT_UMCBL", "_UMCBL"), "BTCUSDT");
        assert_eq!(instrument_label("BTCUSD_DMCBL", "_UMCBL"), "BTCUSD_DMCBL");
        assert_eq!(instrument_label("ETHUSDT", "_UMCBL"), "ETHUSDT");
        assert_eq!(instrument_label("ETHUSDT_UMCBL", ""), "ETHUSDT_UMCBL");
    }
}
