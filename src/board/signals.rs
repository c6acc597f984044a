use crate::types::SignalClass;

use super::{CellContent, PairRow};

/// The seven indicators whose textual labels are rendered as icons.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Indicator {
    Stochastic,
    Rsi,
    Sma,
    Adx,
    Ichimoku,
    Atr,
    Vwap,
}

/// All transforms, in the order the full re-render pass applies them.
pub const ALL_INDICATORS: [Indicator; 7] = [
    Indicator::Stochastic,
    Indicator::Rsi,
    Indicator::Sma,
    Indicator::Adx,
    Indicator::Ichimoku,
    Indicator::Atr,
    Indicator::Vwap,
];

/// Maps a recognized label to its icon class. Unknown labels (including
/// backend placeholders and composite Ichimoku annotations) map to `None` and
/// stay plain text.
pub fn icon_for(indicator: Indicator, label: &str) -> Option<SignalClass> {
    match indicator {
        Indicator::Stochastic => match label {
            "Alım" => Some(SignalClass::BuyArrow),
            "Satış" => Some(SignalClass::SellArrow),
            "Nötr" => Some(SignalClass::Neutral),
            _ => None,
        },
        Indicator::Rsi => match label {
            "Aşırı Satım (Alım)" => Some(SignalClass::BuyArrow),
            "Aşırı Alım (Satış)" => Some(SignalClass::SellArrow),
            "Nötr" => Some(SignalClass::Neutral),
            _ => None,
        },
        Indicator::Sma => match label {
            "Golden Cross (Alım)" => Some(SignalClass::GoldenCross),
            "Death Cross (Satış)" => Some(SignalClass::DeathCross),
            _ => None,
        },
        Indicator::Adx => match label {
            "Güçlü Yükseliş" => Some(SignalClass::StrongUp),
            "Güçlü Düşüş" => Some(SignalClass::StrongDown),
            "Zayıf Trend" => Some(SignalClass::Weak),
            _ => None,
        },
        Indicator::Ichimoku => match label {
            "Yükseliş Trendi" => Some(SignalClass::TrendUp),
            "Düşüş Trendi" => Some(SignalClass::TrendDown),
            _ => None,
        },
        Indicator::Atr => match label {
            "Yüksek Volatilite" => Some(SignalClass::HighVolatility),
            _ => None,
        },
        Indicator::Vwap => match label {
            "Fiyat Ortalamanın Üzerinde" => Some(SignalClass::AboveAverage),
            "Fiyat Ortalamanın Altında" => Some(SignalClass::BelowAverage),
            _ => None,
        },
    }
}

/// Applies one transform over every row. Cells already holding an icon are
/// untouched, so re-running a transform over its own output is a no-op and the
/// pass is safe to invoke on every refresh.
pub fn apply_transform(rows: &mut [PairRow], indicator: Indicator) {
    for row in rows.iter_mut() {
        let cell = row.signal_cell_mut(indicator);
        if let CellContent::Text(label) = cell {
            if let Some(class) = icon_for(indicator, label.trim()) {
                *cell = CellContent::Icon(class);
            }
        }
    }
}
