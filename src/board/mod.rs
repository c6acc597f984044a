use rust_decimal::Decimal;
use std::collections::HashMap;
use std::str::FromStr;
use std::time::{Duration, Instant};

use crate::types::{DisplayValue, Flash, IndicatorBundle, SignalClass, TrendLevel};

pub mod signals;

pub use signals::{Indicator, ALL_INDICATORS};

const PLACEHOLDER: &str = "-";

/// Content of a signal cell: plain backend text until its label is recognized,
/// an icon afterwards. Icon text no longer matches any label string, which is
/// what makes the render pass self-stabilizing.
#[derive(Debug, Clone, PartialEq)]
pub enum CellContent {
    Text(String),
    Icon(SignalClass),
}

impl CellContent {
    pub fn placeholder() -> Self {
        CellContent::Text(PLACEHOLDER.to_string())
    }

    /// What the cell shows on screen.
    pub fn display(&self) -> &str {
        match self {
            CellContent::Text(s) => s,
            CellContent::Icon(class) => class.glyph(),
        }
    }

    pub fn icon(&self) -> Option<SignalClass> {
        match self {
            CellContent::Icon(class) => Some(*class),
            CellContent::Text(_) => None,
        }
    }
}

/// One dashboard row. Rows are created once from configuration and only ever
/// mutated afterwards; a poll response for an unknown pair is ignored.
#[derive(Debug, Clone, PartialEq)]
pub struct PairRow {
    pub pair: String,
    pub price: String,
    pub flash: Option<(Flash, Instant)>,
    pub sma_signal: CellContent,
    pub stoch_signal: CellContent,
    pub adx: String,
    pub adx_signal: CellContent,
    pub rsi: String,
    pub rsi_signal: CellContent,
    pub ichimoku_signal: CellContent,
    pub atr: String,
    pub atr_signal: CellContent,
    pub vwap: String,
    pub vwap_signal: CellContent,
    pub near_fibo: String,
    pub reversal: String,
    pub downtrend_text: String,
    pub uptrend_text: String,
    /// Stored probability attributes behind the visible trend cells.
    pub downtrend: Option<i64>,
    pub uptrend: Option<i64>,
    pub downtrend_level: TrendLevel,
    pub uptrend_level: TrendLevel,
}

impl PairRow {
    pub fn new(pair: &str) -> Self {
        Self {
            pair: pair.to_string(),
            price: PLACEHOLDER.to_string(),
            flash: None,
            sma_signal: CellContent::placeholder(),
            stoch_signal: CellContent::placeholder(),
            adx: PLACEHOLDER.to_string(),
            adx_signal: CellContent::placeholder(),
            rsi: PLACEHOLDER.to_string(),
            rsi_signal: CellContent::placeholder(),
            ichimoku_signal: CellContent::placeholder(),
            atr: PLACEHOLDER.to_string(),
            atr_signal: CellContent::placeholder(),
            vwap: PLACEHOLDER.to_string(),
            vwap_signal: CellContent::placeholder(),
            near_fibo: PLACEHOLDER.to_string(),
            reversal: PLACEHOLDER.to_string(),
            downtrend_text: PLACEHOLDER.to_string(),
            uptrend_text: PLACEHOLDER.to_string(),
            downtrend: None,
            uptrend: None,
            downtrend_level: TrendLevel::Low,
            uptrend_level: TrendLevel::Low,
        }
    }

    pub fn signal_cell_mut(&mut self, indicator: Indicator) -> &mut CellContent {
        match indicator {
            Indicator::Stochastic => &mut self.stoch_signal,
            Indicator::Rsi => &mut self.rsi_signal,
            Indicator::Sma => &mut self.sma_signal,
            Indicator::Adx => &mut self.adx_signal,
            Indicator::Ichimoku => &mut self.ichimoku_signal,
            Indicator::Atr => &mut self.atr_signal,
            Indicator::Vwap => &mut self.vwap_signal,
        }
    }

    /// Active flash color, if its reversion deadline has not passed.
    pub fn flash_at(&self, now: Instant) -> Option<Flash> {
        match self.flash {
            Some((flash, until)) if now < until => Some(flash),
            _ => None,
        }
    }
}

/// The row-keyed table model. Built once from the configured pair list and
/// shared between the pollers and the renderer.
#[derive(Debug, Clone, PartialEq)]
pub struct Board {
    rows: Vec<PairRow>,
}

impl Board {
    pub fn new(pairs: &[String]) -> Self {
        Self {
            rows: pairs.iter().map(|p| PairRow::new(p)).collect(),
        }
    }

    pub fn rows(&self) -> &[PairRow] {
        &self.rows
    }

    pub fn row(&self, pair: &str) -> Option<&PairRow> {
        self.rows.iter().find(|r| r.pair == pair)
    }

    /// Price tick: for every row with a price in the response, compare the new
    /// value numerically against the displayed one, arm the transient up/down
    /// flash on a change, replace the text, and re-derive the trend color
    /// classes for all rows. A newer flash supersedes any pending reversion.
    pub fn apply_prices(
        &mut self,
        prices: &HashMap<String, DisplayValue>,
        now: Instant,
        flash_duration: Duration,
    ) {
        for row in &mut self.rows {
            let Some(value) = prices.get(&row.pair) else {
                continue;
            };
            let old = Decimal::from_str(row.price.trim()).ok();
            let new = value.as_decimal();
            if let (Some(old), Some(new)) = (old, new) {
                if new > old {
                    row.flash = Some((Flash::Up, now + flash_duration));
                } else if new < old {
                    row.flash = Some((Flash::Down, now + flash_duration));
                }
            }
            row.price = value.to_string();
        }
        self.classify_trends();
    }

    /// Indicator tick: overwrite every indicator-driven cell and stored trend
    /// attribute for rows with matching data, then run the full re-render pass.
    pub fn apply_indicators(&mut self, data: &HashMap<String, IndicatorBundle>) {
        for row in &mut self.rows {
            let Some(bundle) = data.get(&row.pair) else {
                continue;
            };
            row.sma_signal = CellContent::Text(bundle.sma_signal.to_string());
            row.stoch_signal = CellContent::Text(bundle.stoch_signal.to_string());
            row.adx = bundle.adx.to_string();
            row.adx_signal = CellContent::Text(bundle.adx_signal.to_string());
            row.rsi = bundle.rsi.to_string();
            row.rsi_signal = CellContent::Text(bundle.rsi_signal.to_string());
            row.ichimoku_signal = CellContent::Text(bundle.ichimoku_signal.to_string());
            row.atr = bundle.atr.to_string();
            row.atr_signal = CellContent::Text(bundle.atr_signal.to_string());
            row.vwap = bundle.vwap.to_string();
            row.vwap_signal = CellContent::Text(bundle.vwap_signal.to_string());
            row.near_fibo = bundle.near_fibo.to_string();
            row.reversal = bundle.reversal.to_string();
            row.downtrend_text = bundle.downtrend.to_string();
            row.downtrend = bundle.downtrend.as_percent();
            row.uptrend_text = bundle.uptrend.to_string();
            row.uptrend = bundle.uptrend.as_percent();
        }
        self.restyle();
    }

    /// Full re-render pass: all seven signal transforms, then both trend
    /// classifiers, in fixed order. Idempotent over unchanged data.
    pub fn restyle(&mut self) {
        for indicator in ALL_INDICATORS {
            signals::apply_transform(&mut self.rows, indicator);
        }
        self.classify_trends();
    }

    /// Re-derives both trend color classes for every row from the stored
    /// probability attributes. Always a full resync, never a diff.
    pub fn classify_trends(&mut self) {
        for row in &mut self.rows {
            row.uptrend_level = TrendLevel::classify(row.uptrend);
            row.downtrend_level = TrendLevel::classify(row.downtrend);
        }
    }

    /// Clears flashes whose reversion deadline has passed.
    pub fn expire_flashes(&mut self, now: Instant) {
        for row in &mut self.rows {
            if let Some((_, until)) = row.flash {
                if now >= until {
                    row.flash = None;
                }
            }
        }
    }
}
