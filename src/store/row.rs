use crate::markup::types::{
    dedup_characteristics, normalize_screenshots, Characteristic, LocalStamp, PartialResult, RawScreenshot,
    TradeResult,
};
use crate::markup::{MarkupEntry, Timeframe};
use serde::{Deserialize, Serialize};

/// Stored shape of an entry: the same fields as `MarkupEntry`, snake_case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkupRow {
    pub id: String,
    pub datetime_local: LocalStamp,
    pub symbol: String,
    pub timeframe: Timeframe,
    #[serde(default)]
    pub strategy: Option<String>,
    #[serde(default)]
    pub characteristics: Option<Vec<Characteristic>>,
    #[serde(default)]
    pub trade_result: Option<TradeResult>,
    #[serde(default)]
    pub pips: Option<f64>,
    #[serde(default)]
    pub pips_tp1: Option<f64>,
    #[serde(default)]
    pub result_tp1: Option<PartialResult>,
    #[serde(default)]
    pub pips_tp2: Option<f64>,
    #[serde(default)]
    pub result_tp2: Option<PartialResult>,
    #[serde(default)]
    pub pips_tp3: Option<f64>,
    #[serde(default)]
    pub result_tp3: Option<PartialResult>,
    #[serde(default)]
    pub pips_sl: Option<f64>,
    #[serde(default)]
    pub capital_pct: Option<f64>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub screenshots: Option<Vec<RawScreenshot>>,
    #[serde(default)]
    pub screenshot_data_url: Option<String>,
}

impl From<&MarkupEntry> for MarkupRow {
    fn from(e: &MarkupEntry) -> Self {
        Self {
            id: e.id.clone(),
            datetime_local: e.datetime_local,
            symbol: e.symbol.clone(),
            timeframe: e.timeframe,
            strategy: Some(e.strategy.clone()),
            characteristics: (!e.characteristics.is_empty()).then(|| e.characteristics.to_vec()),
            trade_result: e.trade_result,
            pips: e.pips,
            pips_tp1: e.pips_tp1,
            result_tp1: e.result_tp1,
            pips_tp2: e.pips_tp2,
            result_tp2: e.result_tp2,
            pips_tp3: e.pips_tp3,
            result_tp3: e.result_tp3,
            pips_sl: e.pips_sl,
            capital_pct: e.capital_pct,
            notes: e.notes.clone(),
            screenshots: (!e.screenshots.is_empty())
                .then(|| e.screenshots.iter().cloned().map(RawScreenshot::from).collect()),
            screenshot_data_url: e.screenshot_data_url.clone(),
        }
    }
}

impl From<MarkupRow> for MarkupEntry {
    fn from(row: MarkupRow) -> Self {
        let screenshots = normalize_screenshots(
            &row.id,
            row.timeframe,
            row.screenshots.unwrap_or_default(),
            row.screenshot_data_url.as_deref(),
        );
        Self {
            id: row.id,
            datetime_local: row.datetime_local,
            symbol: row.symbol,
            timeframe: row.timeframe,
            strategy: row.strategy.unwrap_or_default(),
            characteristics: dedup_characteristics(row.characteristics.unwrap_or_default()),
            trade_result: row.trade_result,
            pips: row.pips,
            pips_tp1: row.pips_tp1,
            result_tp1: row.result_tp1,
            pips_tp2: row.pips_tp2,
            result_tp2: row.result_tp2,
            pips_tp3: row.pips_tp3,
            result_tp3: row.result_tp3,
            pips_sl: row.pips_sl,
            capital_pct: row.capital_pct,
            notes: row.notes,
            screenshots,
            screenshot_data_url: row.screenshot_data_url,
        }
    }
}
