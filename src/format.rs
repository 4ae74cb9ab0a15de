// Currency formatting for the presentation layer

use serde::{Deserialize, Serialize};

/// Locale currency convention. Defaults to Brazilian real ("R$ 1.234,56").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CurrencyFormat {
    pub symbol: String,
    pub thousands_separator: char,
    pub decimal_separator: char,
    pub decimals: usize,
}

impl Default for CurrencyFormat {
    fn default() -> Self {
        CurrencyFormat {
            symbol: "R$".to_string(),
            thousands_separator: '.',
            decimal_separator: ',',
            decimals: 2,
        }
    }
}

impl CurrencyFormat {
    /// Format an amount. `None`, NaN and infinities render as the zero amount.
    pub fn format(&self, amount: Option<f64>) -> String {
        let amount = amount.filter(|a| a.is_finite()).unwrap_or(0.0);

        let fixed = format!("{:.*}", self.decimals, amount.abs());
        let (int_part, frac_part) = match fixed.split_once('.') {
            Some((i, f)) => (i, Some(f)),
            None => (fixed.as_str(), None),
        };

        let mut out = String::new();
        // "-0,00" is not a thing
        if amount < 0.0 && fixed.bytes().any(|b| matches!(b, b'1'..=b'9')) {
            out.push('-');
        }
        out.push_str(&self.symbol);
        out.push('\u{a0}');
        out.push_str(&group_thousands(int_part, self.thousands_separator));
        if let Some(frac) = frac_part {
            out.push(self.decimal_separator);
            out.push_str(frac);
        }
        out
    }
}

fn group_thousands(digits: &str, separator: char) -> String {
    let len = digits.len();
    let mut out = String::with_capacity(len + len / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (len - i) % 3 == 0 {
            out.push(separator);
        }
        out.push(c);
    }
    out
}

/// Shorthand for the default (pt-BR) convention.
pub fn format_brl(amount: Option<f64>) -> String {
    CurrencyFormat::default().format(amount)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_brl() {
        assert_eq!(format_brl(Some(1234.56)), "R$\u{a0}1.234,56");
        assert_eq!(format_brl(Some(1_000_000.0)), "R$\u{a0}1.000.000,00");
        assert_eq!(format_brl(Some(12.5)), "R$\u{a0}12,50");
    }

    #[test]
    fn test_format_negative() {
        assert_eq!(format_brl(Some(-60.0)), "-R$\u{a0}60,00");
        assert_eq!(format_brl(Some(-0.001)), "R$\u{a0}0,00");
    }

    #[test]
    fn test_format_absent_is_zero() {
        assert_eq!(format_brl(None), "R$\u{a0}0,00");
        assert_eq!(format_brl(Some(f64::NAN)), "R$\u{a0}0,00");
    }

    #[test]
    fn test_custom_convention() {
        let usd = CurrencyFormat {
            symbol: "US$".to_string(),
            thousands_separator: ',',
            decimal_separator: '.',
            decimals: 0,
        };
        assert_eq!(usd.format(Some(9876543.4)), "US$\u{a0}9,876,543");
    }
}
