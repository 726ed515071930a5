//! Terminal rendering for series and predictions

use comfy_table::presets::UTF8_FULL;
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};
use predictor_core::{
    ChartDataPoint, PointKind, Prediction, Sentiment, SentimentAnalysisResult, SeriesSummary,
};

/// Days between sampled table rows
const SAMPLE_EVERY: usize = 20;
const SPARKLINE_WIDTH: usize = 52;
const TABLE_WIDTH: u16 = 80;
const BARS: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];

pub fn prediction(prediction: &Prediction) -> String {
    format!(
        "{}\n\n{}",
        series(&prediction.ticker, &prediction.series),
        sentiment_card(&prediction.sentiment)
    )
}

pub fn series(ticker: &str, points: &[ChartDataPoint]) -> String {
    let Some(summary) = SeriesSummary::from_points(points) else {
        return format!("{ticker}: no data");
    };

    let mut out = format!(
        "{ticker} price history & forecast ({} to {})\n",
        summary.start_date, summary.end_date
    );
    out.push_str(&sparkline(points, SPARKLINE_WIDTH));
    out.push('\n');
    out.push_str(&points_table(points).to_string());
    out.push('\n');
    out.push_str(&summary_line(&summary));
    out
}

fn points_table(points: &[ChartDataPoint]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["Date", "Actual", "Predicted"]);

    for idx in sample_indices(points) {
        let point = &points[idx];
        let price = |value: Option<f64>| {
            Cell::new(value.map(|v| format!("{v:.2}")).unwrap_or_default())
                .set_alignment(CellAlignment::Right)
        };
        table.add_row(vec![
            Cell::new(point.date()),
            price(point.actual()),
            price(point.predicted()),
        ]);
    }
    table
}

/// Every `SAMPLE_EVERY`th point plus the last historical and last overall point
fn sample_indices(points: &[ChartDataPoint]) -> Vec<usize> {
    let mut indices: Vec<usize> = (0..points.len()).step_by(SAMPLE_EVERY).collect();
    if let Some(boundary) = points.iter().rposition(|p| p.kind() == PointKind::Actual) {
        indices.push(boundary);
    }
    if !points.is_empty() {
        indices.push(points.len() - 1);
    }
    indices.sort_unstable();
    indices.dedup();
    indices
}

fn summary_line(summary: &SeriesSummary) -> String {
    let mut line = format!(
        "Range {:.2} - {:.2}",
        summary.min_price, summary.max_price
    );
    if let Some(last) = summary.last_actual {
        line.push_str(&format!(" | last actual {:.2}", last.price()));
    }
    if let Some(last) = summary.last_predicted {
        line.push_str(&format!(" | forecast {:.2}", last.price()));
    }
    if let Some(pct) = summary.projected_change_pct() {
        line.push_str(&format!(" ({pct:+.2}%)"));
    }
    line
}

/// Bucketed mean prices scaled onto block characters
fn sparkline(points: &[ChartDataPoint], width: usize) -> String {
    if points.is_empty() || width == 0 {
        return String::new();
    }
    let width = width.min(points.len());

    let means: Vec<f64> = (0..width)
        .map(|col| {
            let start = col * points.len() / width;
            let end = ((col + 1) * points.len() / width).max(start + 1);
            let bucket = &points[start..end];
            bucket.iter().map(ChartDataPoint::price).sum::<f64>() / bucket.len() as f64
        })
        .collect();

    let min = means.iter().copied().fold(f64::INFINITY, f64::min);
    let max = means.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let span = max - min;

    means
        .iter()
        .map(|mean| {
            if span <= f64::EPSILON {
                return BARS[0];
            }
            let level = ((mean - min) / span * (BARS.len() - 1) as f64).round() as usize;
            BARS[level.min(BARS.len() - 1)]
        })
        .collect()
}

fn sentiment_color(sentiment: Option<Sentiment>) -> Color {
    match sentiment {
        Some(Sentiment::Bullish) => Color::Green,
        Some(Sentiment::Bearish) => Color::Red,
        Some(Sentiment::Neutral) | None => Color::Grey,
    }
}

fn sentiment_card(result: &SentimentAnalysisResult) -> Table {
    let label = result.sentiment.map_or("N/A", |s| s.as_str());

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(TABLE_WIDTH)
        .set_header(vec![Cell::new("AI Market Sentiment").add_attribute(Attribute::Bold)])
        .add_row(vec![
            Cell::new(label)
                .fg(sentiment_color(result.sentiment))
                .add_attribute(Attribute::Bold),
        ])
        .add_row(vec![Cell::new(&result.explanation)]);
    table
}
