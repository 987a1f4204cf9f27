use crate::config::DisplaySettings;

/// Number rendering for terminal tables
#[derive(Debug, Clone)]
pub struct MoneyFormat {
    pub symbol: String,
    pub thousands: char,
    pub decimal: char,
}

impl Default for MoneyFormat {
    fn default() -> Self {
        Self::from(&DisplaySettings::default())
    }
}

impl From<&DisplaySettings> for MoneyFormat {
    fn from(display: &DisplaySettings) -> Self {
        Self {
            symbol: display.currency_symbol.clone(),
            thousands: display.thousands_separator,
            decimal: display.decimal_separator,
        }
    }
}

impl MoneyFormat {
    /// `R$ 1.234,56`
    pub fn money(&self, value: f64) -> String {
        format!("{} {}", self.symbol, self.amount(value))
    }

    /// `1.234,56`
    pub fn amount(&self, value: f64) -> String {
        let cents = (value * 100.0).round() as i64;
        let whole = format_grouped_int(cents / 100, self.thousands);
        let frac = (cents % 100).unsigned_abs();
        let sign = if cents < 0 && cents / 100 == 0 { "-" } else { "" };
        format!("{sign}{whole}{}{frac:02}", self.decimal)
    }

    /// `1,5M`, `250k`, or the plain amount below a thousand
    pub fn abbreviate(&self, value: f64) -> String {
        // Thresholds sit where rounding would otherwise reach the next unit
        let abs = value.abs();
        let (scaled, suffix) = if abs >= 999_950.0 {
            (value / 1_000_000.0, "M")
        } else if abs >= 999.5 {
            (value / 1_000.0, "k")
        } else {
            return self.with_decimal(format!("{value:.0}"));
        };
        let rounded = format!("{:.1}", (scaled * 10.0).round() / 10.0);
        let text = rounded.strip_suffix(".0").unwrap_or(&rounded);
        self.with_decimal(format!("{text}{suffix}"))
    }

    /// `12,5%`
    pub fn percent(&self, value: f64) -> String {
        self.with_decimal(format!("{value:.1}%"))
    }

    fn with_decimal(&self, text: String) -> String {
        if self.decimal == '.' {
            text
        } else {
            text.replace('.', &self.decimal.to_string())
        }
    }
}

/// Group digits in threes with `sep`
pub fn format_grouped_int(value: i64, sep: char) -> String {
    let negative = value < 0;
    let digits = value.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);

    for (i, ch) in digits.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            out.push(sep);
        }
        out.push(ch);
    }

    let mut grouped: String = out.chars().rev().collect();
    if negative {
        grouped.insert(0, '-');
    }
    grouped
}
