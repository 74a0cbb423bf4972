//! Pure composition of aligned series into a renderer-agnostic descriptor.
//!
//! [`compose`] holds no drawing state. The renderer receives a fresh
//! [`SeriesDescriptor`] on every load and is expected to dispose of whatever
//! it built from the previous one before constructing the new chart.

use indexmap::IndexMap;
use std::collections::HashMap;
use serde::{Deserialize, Serialize};

use crate::models::bar::BarSeries;
use crate::models::cash_history::CashHistory;
use crate::models::position::{Position, Side};
use crate::series::align::{forward_fill, forward_fill_opt, reference_axis};

/// Series colours, assigned by position order.
pub const PALETTE: [&str; 6] = [
    "#3b82f6", "#8b5cf6", "#ec4899", "#f59e0b", "#10b981", "#06b6d4",
];
pub const CASH_COLOR: &str = "#22c55e";
pub const LONG_ACCENT: &str = "#22c55e";
pub const SHORT_ACCENT: &str = "#ef4444";

pub const CASH_ID: &str = "cash";

const STACKED_HEADROOM: f64 = 1.05;
const PERCENT_PAD: f64 = 0.10;

/// Which view to compose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartMode {
    /// Absolute dollars: cash plus cumulative position exposure.
    #[default]
    Stacked,
    /// Return since entry, per instrument.
    Percent,
}

/// Everything one load cycle fetched.
#[derive(Debug, Clone, Default)]
pub struct CompositionInput {
    /// Positions in the order the backend listed them.
    pub positions: Vec<Position>,
    /// Bar history keyed by symbol. Missing symbols are treated as empty.
    pub histories: IndexMap<String, BarSeries>,
    /// Reconstructed ledger, if one could be fetched.
    pub cash: Option<CashHistory>,
    /// Authoritative current cash balance.
    pub cash_balance: f64,
}

/// How a layer is filled under its line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Fill {
    None,
    /// Band down to the zero baseline.
    ToZero,
    /// Band down to the layer at `layer` (index into `layers`).
    ToLayer { layer: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineStyle {
    Solid,
    Dashed,
}

/// One drawable series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Layer {
    pub id: String,
    pub label: String,
    pub color: String,
    /// Same length as the axis. `None` is a gap.
    pub values: Vec<Option<f64>>,
    pub fill: Fill,
    pub line: LineStyle,
}

/// Vertical line at a position's entry time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryMarker {
    pub symbol: String,
    pub timestamp: i64,
    pub color: String,
    pub accent: String,
    pub side: Side,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct YRange {
    pub min: f64,
    pub max: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegendEntry {
    pub id: String,
    pub label: String,
    pub color: String,
    /// Market value for instruments, balance for cash.
    pub value: f64,
    /// First to last close over the window.
    pub change_percent: Option<f64>,
    pub filled_at: Option<i64>,
}

/// A complete, self-contained chart description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeriesDescriptor {
    pub mode: ChartMode,
    pub axis: Vec<i64>,
    pub layers: Vec<Layer>,
    pub markers: Vec<EntryMarker>,
    pub y_range: YRange,
    pub legend: Vec<LegendEntry>,
}

impl SeriesDescriptor {
    pub fn layer(&self, id: &str) -> Option<&Layer> {
        self.layers.iter().find(|l| l.id == id)
    }
}

struct Instrument<'a> {
    /// Layer and legend id; unique even when a symbol is listed twice.
    id: String,
    position: &'a Position,
    history: Option<&'a BarSeries>,
    color: &'static str,
}

impl Instrument<'_> {
    fn closes(&self) -> Vec<(i64, f64)> {
        self.history.map(BarSeries::closes).unwrap_or_default()
    }

    fn label(&self) -> String {
        self.history
            .map(|h| h.display_name().to_string())
            .unwrap_or_else(|| self.position.symbol.clone())
    }
}

/// Composes the chart for `mode`.
pub fn compose(input: &CompositionInput, mode: ChartMode) -> SeriesDescriptor {
    let axis = reference_axis(
        input
            .positions
            .iter()
            .filter_map(|p| input.histories.get(&p.symbol)),
    );

    let mut seen: HashMap<&str, usize> = HashMap::new();
    let mut instruments: Vec<Instrument<'_>> = input
        .positions
        .iter()
        .enumerate()
        .map(|(i, position)| {
            let n = seen.entry(position.symbol.as_str()).or_default();
            *n += 1;
            let id = if *n == 1 {
                position.symbol.clone()
            } else {
                format!("{}#{}", position.symbol, n)
            };
            Instrument {
                id,
                position,
                history: input.histories.get(&position.symbol),
                color: PALETTE[i % PALETTE.len()],
            }
        })
        .collect();
    // Colours are fixed by position order above; only instruments with bars draw.
    instruments.retain(|inst| inst.history.is_some_and(|h| !h.is_empty()));
    // Largest exposure at the bottom of the stack.
    instruments.sort_by(|a, b| {
        b.position
            .market_value
            .abs()
            .total_cmp(&a.position.market_value.abs())
    });

    let (layers, y_range) = match mode {
        ChartMode::Stacked => stacked_layers(input, &instruments, &axis),
        ChartMode::Percent => percent_layers(&instruments, &axis),
    };

    SeriesDescriptor {
        mode,
        markers: entry_markers(&instruments, &axis),
        legend: legend(input, &instruments, mode),
        axis,
        layers,
        y_range,
    }
}

fn stacked_layers(
    input: &CompositionInput,
    instruments: &[Instrument<'_>],
    axis: &[i64],
) -> (Vec<Layer>, YRange) {
    // An anchor-only ledger says nothing about the past; draw the balance flat.
    let cash = match input.cash.as_ref().filter(|c| c.has_entries()) {
        Some(history) => forward_fill(axis, &history.series(), 0.0),
        None => vec![input.cash_balance; axis.len()],
    };

    let mut layers = Vec::with_capacity(instruments.len() + 1);
    let mut running = cash.clone();
    layers.push(Layer {
        id: CASH_ID.to_string(),
        label: "Cash".to_string(),
        color: CASH_COLOR.to_string(),
        values: cash.into_iter().map(Some).collect(),
        fill: Fill::ToZero,
        line: LineStyle::Solid,
    });

    for inst in instruments {
        let prices = forward_fill(axis, &inst.closes(), 0.0);
        let qty = inst.position.qty;
        let entry = inst.position.filled_at;
        for ((total, &t), price) in running.iter_mut().zip(axis).zip(prices) {
            let before_entry = entry.is_some_and(|e| t < e);
            if !before_entry {
                *total += (price * qty).abs();
            }
        }
        let below = layers.len() - 1;
        layers.push(Layer {
            id: inst.id.clone(),
            label: inst.label(),
            color: inst.color.to_string(),
            values: running.iter().copied().map(Some).collect(),
            fill: Fill::ToLayer { layer: below },
            line: LineStyle::Solid,
        });
    }

    let max = layers
        .iter()
        .flat_map(|l| l.values.iter().flatten().copied())
        .fold(f64::NEG_INFINITY, f64::max);
    let y_range = if max > 0.0 {
        YRange {
            min: 0.0,
            max: max * STACKED_HEADROOM,
        }
    } else {
        YRange { min: 0.0, max: 1.0 }
    };
    (layers, y_range)
}

/// Percent return from `entry` to `price`; shorts profit when price falls.
pub fn percent_return(entry: f64, price: f64, side: Side) -> f64 {
    match side {
        Side::Long => (price - entry) / entry * 100.0,
        Side::Short => (entry - price) / entry * 100.0,
    }
}

fn percent_layers(instruments: &[Instrument<'_>], axis: &[i64]) -> (Vec<Layer>, YRange) {
    let mut layers = Vec::with_capacity(instruments.len() + 1);
    layers.push(Layer {
        id: CASH_ID.to_string(),
        label: "Cash".to_string(),
        color: CASH_COLOR.to_string(),
        values: vec![Some(0.0); axis.len()],
        fill: Fill::None,
        line: LineStyle::Dashed,
    });

    for inst in instruments {
        let prices = forward_fill_opt(axis, &inst.closes());
        let start = match inst.position.filled_at {
            Some(entry) => axis.partition_point(|&t| t < entry),
            None => 0,
        };
        let baseline = prices
            .iter()
            .enumerate()
            .skip(start)
            .find_map(|(i, p)| p.filter(|v| *v != 0.0).map(|v| (i, v)));

        let values = match baseline {
            Some((from, entry_price)) => prices
                .iter()
                .enumerate()
                .map(|(i, p)| {
                    if i < from {
                        None
                    } else {
                        p.map(|price| percent_return(entry_price, price, inst.position.side))
                    }
                })
                .collect(),
            None => vec![None; axis.len()],
        };
        layers.push(Layer {
            id: inst.id.clone(),
            label: inst.label(),
            color: inst.color.to_string(),
            values,
            fill: Fill::None,
            line: LineStyle::Solid,
        });
    }

    let (min, max) = layers
        .iter()
        .flat_map(|l| l.values.iter().flatten().copied())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(v), hi.max(v))
        });
    let y_range = if min.is_finite() && max.is_finite() {
        let span = max - min;
        let pad = if span > 0.0 { span * PERCENT_PAD } else { 1.0 };
        YRange {
            min: min - pad,
            max: max + pad,
        }
    } else {
        YRange {
            min: -1.0,
            max: 1.0,
        }
    };
    (layers, y_range)
}

fn entry_markers(instruments: &[Instrument<'_>], axis: &[i64]) -> Vec<EntryMarker> {
    let (Some(&first), Some(&last)) = (axis.first(), axis.last()) else {
        return Vec::new();
    };
    instruments
        .iter()
        .filter_map(|inst| {
            let ts = inst.position.filled_at?;
            (first..=last).contains(&ts).then(|| EntryMarker {
                symbol: inst.position.symbol.clone(),
                timestamp: ts,
                color: inst.color.to_string(),
                accent: match inst.position.side {
                    Side::Long => LONG_ACCENT,
                    Side::Short => SHORT_ACCENT,
                }
                .to_string(),
                side: inst.position.side,
            })
        })
        .collect()
}

fn legend(
    input: &CompositionInput,
    instruments: &[Instrument<'_>],
    mode: ChartMode,
) -> Vec<LegendEntry> {
    let mut entries: Vec<LegendEntry> = instruments
        .iter()
        .map(|inst| LegendEntry {
            id: inst.id.clone(),
            label: inst.label(),
            color: inst.color.to_string(),
            value: inst.position.market_value,
            change_percent: inst.history.and_then(BarSeries::summary).map(|s| s.change_percent),
            filled_at: inst.position.filled_at,
        })
        .collect();
    if mode == ChartMode::Stacked {
        entries.insert(
            0,
            LegendEntry {
                id: CASH_ID.to_string(),
                label: "Cash".to_string(),
                color: CASH_COLOR.to_string(),
                value: input.cash_balance,
                change_percent: None,
                filled_at: None,
            },
        );
    }
    entries
}
