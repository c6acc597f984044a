use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A backend value displayed verbatim. The JSON endpoints are loose about
/// numeric fields: a price or indicator value may arrive as a number or as a
/// pre-formatted string (including placeholders like "Veri Yok").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DisplayValue {
    Number(f64),
    Text(String),
}

impl DisplayValue {
    /// Numeric view for price comparisons. Non-numeric text yields `None`.
    pub fn as_decimal(&self) -> Option<Decimal> {
        match self {
            DisplayValue::Number(n) => Decimal::try_from(*n).ok(),
            DisplayValue::Text(s) => Decimal::from_str(s.trim()).ok(),
        }
    }

    /// Integer view for the 0-100 trend probability attributes. Text that does
    /// not parse as a whole number yields `None`, which classifies as low and
    /// never triggers a notification.
    pub fn as_percent(&self) -> Option<i64> {
        match self {
            DisplayValue::Number(n) => Some(n.trunc() as i64),
            DisplayValue::Text(s) => {
                let s = s.trim();
                s.parse::<i64>()
                    .ok()
                    .or_else(|| s.parse::<f64>().ok().map(|f| f.trunc() as i64))
            }
        }
    }
}

impl Default for DisplayValue {
    fn default() -> Self {
        DisplayValue::Text(String::new())
    }
}

impl fmt::Display for DisplayValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DisplayValue::Number(n) => write!(f, "{}", n),
            DisplayValue::Text(s) => write!(f, "{}", s),
        }
    }
}

/// Per-pair indicator bundle served by `/indicators/json/`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct IndicatorBundle {
    pub sma_signal: DisplayValue,
    pub stoch_signal: DisplayValue,
    pub adx: DisplayValue,
    pub adx_signal: DisplayValue,
    pub rsi: DisplayValue,
    pub rsi_signal: DisplayValue,
    pub ichimoku_signal: DisplayValue,
    pub atr: DisplayValue,
    pub atr_signal: DisplayValue,
    pub vwap: DisplayValue,
    pub vwap_signal: DisplayValue,
    pub near_fibo: DisplayValue,
    pub reversal: DisplayValue,
    pub downtrend: DisplayValue,
    pub uptrend: DisplayValue,
}

/// Style class for a trend probability cell. High iff probability is strictly
/// greater than 50; 50 itself is low. A missing or unparseable attribute is low.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrendLevel {
    High,
    Low,
}

impl TrendLevel {
    pub fn classify(probability: Option<i64>) -> Self {
        match probability {
            Some(p) if p > 50 => TrendLevel::High,
            _ => TrendLevel::Low,
        }
    }
}

/// Transient foreground state of a price cell after a refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flash {
    Up,
    Down,
}

/// Direction/strength class attached to a rendered signal icon.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalClass {
    BuyArrow,
    SellArrow,
    Neutral,
    GoldenCross,
    DeathCross,
    StrongUp,
    StrongDown,
    Weak,
    TrendUp,
    TrendDown,
    HighVolatility,
    AboveAverage,
    BelowAverage,
}

impl SignalClass {
    /// Icon glyph shown in place of the recognized label. High volatility warns
    /// downward on purpose.
    pub fn glyph(&self) -> &'static str {
        match self {
            SignalClass::BuyArrow
            | SignalClass::GoldenCross
            | SignalClass::StrongUp
            | SignalClass::TrendUp
            | SignalClass::AboveAverage => "↑",
            SignalClass::SellArrow
            | SignalClass::DeathCross
            | SignalClass::StrongDown
            | SignalClass::TrendDown
            | SignalClass::HighVolatility
            | SignalClass::BelowAverage => "↓",
            SignalClass::Neutral | SignalClass::Weak => "—",
        }
    }

    pub fn is_bullish(&self) -> bool {
        matches!(
            self,
            SignalClass::BuyArrow
                | SignalClass::GoldenCross
                | SignalClass::StrongUp
                | SignalClass::TrendUp
                | SignalClass::AboveAverage
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn display_value_parses_from_number_or_string() {
        let v: DisplayValue = serde_json::from_str("105.5").unwrap();
        assert_eq!(v.as_decimal(), Some(dec!(105.5)));

        let v: DisplayValue = serde_json::from_str("\"105.5\"").unwrap();
        assert_eq!(v.as_decimal(), Some(dec!(105.5)));
        assert_eq!(v.to_string(), "105.5");

        let v: DisplayValue = serde_json::from_str("\"Veri Yok\"").unwrap();
        assert_eq!(v.as_decimal(), None);
        assert_eq!(v.as_percent(), None);
        assert_eq!(v.to_string(), "Veri Yok");
    }

    #[test]
    fn percent_truncates_fractions() {
        assert_eq!(DisplayValue::Number(51.9).as_percent(), Some(51));
        assert_eq!(DisplayValue::Text("50".into()).as_percent(), Some(50));
    }

    #[test]
    fn trend_level_boundary_is_strict() {
        assert_eq!(TrendLevel::classify(Some(0)), TrendLevel::Low);
        assert_eq!(TrendLevel::classify(Some(50)), TrendLevel::Low);
        assert_eq!(TrendLevel::classify(Some(51)), TrendLevel::High);
        assert_eq!(TrendLevel::classify(Some(100)), TrendLevel::High);
        assert_eq!(TrendLevel::classify(None), TrendLevel::Low);
    }

    #[test]
    fn indicator_bundle_tolerates_mixed_field_types() {
        let json = r#"{
            "sma_signal": "Golden Cross (Alım)",
            "stoch_signal": "Nötr",
            "adx": 27.31,
            "adx_signal": "Güçlü Yükseliş",
            "rsi": "64.2",
            "rsi_signal": "Nötr",
            "ichimoku_signal": "Yükseliş Trendi (Bulut Üstünde)",
            "atr": 1250.4,
            "atr_signal": "Yüksek Volatilite",
            "vwap": 43125.77,
            "vwap_signal": "Fiyat Ortalamanın Üzerinde",
            "near_fibo": "61.8%",
            "reversal": 12,
            "downtrend": 34,
            "uptrend": "55"
        }"#;
        let bundle: IndicatorBundle = serde_json::from_str(json).unwrap();
        assert_eq!(bundle.uptrend.as_percent(), Some(55));
        assert_eq!(bundle.downtrend.as_percent(), Some(34));
        assert_eq!(bundle.adx.to_string(), "27.31");
    }
}
