//! Chart series types

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Which run of the series a point belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PointKind {
    /// Historical ("actual") price
    Actual,
    /// Forecast price
    Predicted,
}

/// One day of the chart.
///
/// Serializes as `{"date": "YYYY-MM-DD", "actual": 123.45}` or
/// `{"date": ..., "predicted": ...}`; exactly one price field is ever
/// present, and deserializing anything else fails.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "WirePoint", into = "WirePoint")]
pub struct ChartDataPoint {
    date: NaiveDate,
    kind: PointKind,
    price: f64,
}

impl ChartDataPoint {
    /// A historical point
    pub fn new_actual(date: NaiveDate, price: f64) -> Self {
        Self {
            date,
            kind: PointKind::Actual,
            price,
        }
    }

    /// A forecast point
    pub fn new_predicted(date: NaiveDate, price: f64) -> Self {
        Self {
            date,
            kind: PointKind::Predicted,
            price,
        }
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn kind(&self) -> PointKind {
        self.kind
    }

    /// Price regardless of kind
    pub fn price(&self) -> f64 {
        self.price
    }

    /// Price if this is a historical point
    pub fn actual(&self) -> Option<f64> {
        (self.kind == PointKind::Actual).then_some(self.price)
    }

    /// Price if this is a forecast point
    pub fn predicted(&self) -> Option<f64> {
        (self.kind == PointKind::Predicted).then_some(self.price)
    }
}

#[derive(Serialize, Deserialize)]
struct WirePoint {
    date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    actual: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    predicted: Option<f64>,
}

impl TryFrom<WirePoint> for ChartDataPoint {
    type Error = String;

    fn try_from(wire: WirePoint) -> Result<Self, Self::Error> {
        match (wire.actual, wire.predicted) {
            (Some(price), None) => Ok(Self::new_actual(wire.date, price)),
            (None, Some(price)) => Ok(Self::new_predicted(wire.date, price)),
            _ => Err(format!(
                "chart point for {} must have exactly one of 'actual' or 'predicted'",
                wire.date
            )),
        }
    }
}

impl From<ChartDataPoint> for WirePoint {
    fn from(point: ChartDataPoint) -> Self {
        Self {
            date: point.date,
            actual: point.actual(),
            predicted: point.predicted(),
        }
    }
}

/// Headline numbers for a series, used by front ends for the chart card
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SeriesSummary {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub first_price: f64,
    /// Last historical point
    pub last_actual: Option<ChartDataPoint>,
    /// Last forecast point
    pub last_predicted: Option<ChartDataPoint>,
    pub min_price: f64,
    pub max_price: f64,
}

impl SeriesSummary {
    /// Summarize a series; `None` when it is empty
    pub fn from_points(points: &[ChartDataPoint]) -> Option<Self> {
        let first = points.first()?;
        let last = points.last()?;

        let (min_price, max_price) = points.iter().fold(
            (f64::INFINITY, f64::NEG_INFINITY),
            |(min, max), p| (min.min(p.price), max.max(p.price)),
        );

        Some(Self {
            start_date: first.date,
            end_date: last.date,
            first_price: first.price,
            last_actual: points.iter().rev().find(|p| p.kind == PointKind::Actual).copied(),
            last_predicted: points
                .iter()
                .rev()
                .find(|p| p.kind == PointKind::Predicted)
                .copied(),
            min_price,
            max_price,
        })
    }

    /// Percent change from the last actual price to the last predicted one
    pub fn projected_change_pct(&self) -> Option<f64> {
        let from = self.last_actual?.price;
        let to = self.last_predicted?.price;
        (from != 0.0).then(|| (to - from) / from * 100.0)
    }
}
