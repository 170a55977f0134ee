// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use std::sync::LazyLock;

use regex::Regex;

/// Preset rates offered as shortcuts; any other percentage may be typed.
pub const COMMON_TAX_RATES: [f64; 5] = [1.0, 3.0, 6.0, 9.0, 13.0];
pub const DEFAULT_TAX_RATE: f64 = 13.0;
pub const DEFAULT_GROSS_INPUT: &str = "111.00";
pub const DEFAULT_NET_INPUT: &str = "100.00";

static NUMERIC_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[+-]?(?:\d+\.?\d*|\.\d+)(?:[eE][+-]?\d+)?")
        .expect("numeric prefix regex must compile")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Precision {
    Zero,
    #[default]
    Two,
    Four,
}

impl Precision {
    pub const ALL: [Self; 3] = [Self::Zero, Self::Two, Self::Four];

    pub const fn digits(self) -> usize {
        match self {
            Self::Zero => 0,
            Self::Two => 2,
            Self::Four => 4,
        }
    }

    pub const fn next(self) -> Self {
        match self {
            Self::Zero => Self::Two,
            Self::Two => Self::Four,
            Self::Four => Self::Zero,
        }
    }
}

/// Formats a rate without a trailing `.0`, so `13.0` reads `13` and `5.5`
/// stays `5.5`.
pub fn format_rate(rate_percent: f64) -> String {
    format!("{rate_percent}")
}

/// Reads the leading decimal number of `input`; anything unreadable is zero.
pub fn parse_amount(input: &str) -> f64 {
    NUMERIC_PREFIX
        .find(input.trim_start())
        .and_then(|found| found.as_str().parse::<f64>().ok())
        .filter(|value| value.is_finite())
        .unwrap_or(0.0)
}

pub fn net_from_gross(gross: f64, rate_percent: f64) -> f64 {
    gross / (1.0 + rate(rate_percent))
}

pub fn gross_from_net(net: f64, rate_percent: f64) -> f64 {
    net * (1.0 + rate(rate_percent))
}

fn rate(rate_percent: f64) -> f64 {
    rate_percent / 100.0
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TaxBreakdown {
    pub gross: f64,
    pub net: f64,
    pub tax: f64,
}

impl TaxBreakdown {
    pub fn from_gross(gross: f64, rate_percent: f64) -> Self {
        let net = net_from_gross(gross, rate_percent);
        Self {
            gross,
            net,
            tax: gross - net,
        }
    }

    pub fn from_net(net: f64, rate_percent: f64) -> Self {
        let gross = gross_from_net(net, rate_percent);
        Self {
            gross,
            net,
            tax: gross - net,
        }
    }

    pub fn formatted(&self, precision: Precision) -> FormattedBreakdown {
        FormattedBreakdown {
            gross: format_fixed(self.gross, precision),
            net: format_fixed(self.net, precision),
            tax: format_fixed(self.tax, precision),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormattedBreakdown {
    pub gross: String,
    pub net: String,
    pub tax: String,
}

pub fn format_fixed(value: f64, precision: Precision) -> String {
    format!("{value:.*}", precision.digits())
}
