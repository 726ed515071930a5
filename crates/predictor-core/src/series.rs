//! Synthetic price series generation
//!
//! The series is a multiplicative random walk: a run of historical
//! ("actual") days followed by a run of forecast ("predicted") days that
//! continue from the same running price and date. The ticker does not seed
//! or bias the walk, so two tickers draw from the same distribution.

use chrono::{Days, Local, NaiveDate};
use rand::Rng;
use tracing::{debug, warn};

use crate::models::ChartDataPoint;

/// Number of historical points
pub const HISTORY_DAYS: usize = 200;
/// Number of forecast points
pub const FORECAST_DAYS: usize = 60;
/// Days before today the walk starts from
pub const LOOKBACK_DAYS: u64 = 260;
/// Per-step volatility as a fraction of price
pub const VOLATILITY: f64 = 0.025;
/// Per-step upward bias during the historical run
pub const HISTORY_DRIFT: f64 = 0.0005;
/// Per-step upward bias during the forecast run
pub const FORECAST_DRIFT: f64 = HISTORY_DRIFT * 2.0;
/// Prices never fall below this
pub const PRICE_FLOOR: f64 = 10.0;
/// Start prices are drawn uniformly from this range
pub const START_PRICE_RANGE: std::ops::Range<f64> = 100.0..500.0;

/// Generates the chart series for a prediction.
#[derive(Debug, Clone, Copy, Default)]
pub struct SeriesGenerator;

impl SeriesGenerator {
    pub fn new() -> Self {
        Self
    }

    /// Generate a series ending relative to today's local date.
    ///
    /// Never fails; any ticker, including an empty one, yields
    /// `HISTORY_DAYS + FORECAST_DAYS` points.
    pub fn generate(&self, ticker: &str) -> Vec<ChartDataPoint> {
        let today = Local::now().date_naive();
        self.generate_with(ticker, today, &mut rand::thread_rng())
    }

    /// Generate a series anchored at `today` using the given random source.
    ///
    /// The first point is dated `today - LOOKBACK_DAYS + 1`; each following
    /// point is one calendar day later.
    pub fn generate_with<R: Rng + ?Sized>(
        &self,
        ticker: &str,
        today: NaiveDate,
        rng: &mut R,
    ) -> Vec<ChartDataPoint> {
        let mut points = Vec::with_capacity(HISTORY_DAYS + FORECAST_DAYS);
        let mut date = today
            .checked_sub_days(Days::new(LOOKBACK_DAYS))
            .unwrap_or(NaiveDate::MIN);
        let mut price = rng.gen_range(START_PRICE_RANGE);

        let runs: [(usize, f64, PointFn); 2] = [
            (HISTORY_DAYS, HISTORY_DRIFT, ChartDataPoint::new_actual),
            (FORECAST_DAYS, FORECAST_DRIFT, ChartDataPoint::new_predicted),
        ];

        'runs: for (days, drift, make_point) in runs {
            for _ in 0..days {
                price = step(price, drift, rng);
                // The last date is `today` itself, so stepping never leaves
                // chrono's calendar as long as `today` is a valid date.
                let Some(next) = date.succ_opt() else {
                    warn!(ticker, points = points.len(), "calendar exhausted, series is short");
                    break 'runs;
                };
                date = next;
                points.push(make_point(date, round_cents(price)));
            }
        }

        debug!(ticker, points = points.len(), "generated synthetic series");
        points
    }
}

type PointFn = fn(NaiveDate, f64) -> ChartDataPoint;

/// One random-walk step, clamped to the price floor
fn step<R: Rng + ?Sized>(price: f64, drift: f64, rng: &mut R) -> f64 {
    let u: f64 = rng.gen_range(0.0..1.0);
    let change = (u - 0.5 + drift) * price * VOLATILITY;
    (price + change).max(PRICE_FLOOR)
}

fn round_cents(price: f64) -> f64 {
    (price * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PointKind;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn anchor() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 19).unwrap()
    }

    fn check_invariants(points: &[ChartDataPoint]) {
        assert_eq!(points.len(), 260);

        for pair in points.windows(2) {
            assert_eq!(pair[0].date().succ_opt(), Some(pair[1].date()));
        }

        for (i, point) in points.iter().enumerate() {
            if i < HISTORY_DAYS {
                assert!(point.actual().is_some() && point.predicted().is_none());
            } else {
                assert!(point.predicted().is_some() && point.actual().is_none());
            }
            let price = point.price();
            assert!(price >= PRICE_FLOOR, "price {price} below floor at {i}");
            assert_eq!(round_cents(price), price, "more than 2 decimals at {i}");
        }
    }

    #[test]
    fn test_shape_and_dates() {
        let mut rng = StdRng::seed_from_u64(7);
        let points = SeriesGenerator::new().generate_with("AAPL", anchor(), &mut rng);

        check_invariants(&points);
        assert_eq!(
            points[0].date(),
            NaiveDate::from_ymd_opt(2026, 2, 2).unwrap(),
            "first point is the day after today - 260"
        );
        assert_eq!(points[259].date(), anchor());
        assert_eq!(points[0].kind(), PointKind::Actual);
        assert_eq!(points[259].kind(), PointKind::Predicted);
        assert_eq!(points[199].kind(), PointKind::Actual);
        assert_eq!(points[200].kind(), PointKind::Predicted);
    }

    #[test]
    fn test_empty_ticker_is_accepted() {
        let points = SeriesGenerator::new().generate("");
        check_invariants(&points);
    }

    #[test]
    fn test_repeated_calls_hold_invariants() {
        let generator = SeriesGenerator::new();
        for _ in 0..20 {
            check_invariants(&generator.generate("MSFT"));
        }
    }

    #[test]
    fn test_ticker_does_not_affect_output() {
        let generator = SeriesGenerator::new();
        let a = generator.generate_with("AAPL", anchor(), &mut StdRng::seed_from_u64(42));
        let b = generator.generate_with("TSLA", anchor(), &mut StdRng::seed_from_u64(42));
        assert_eq!(a, b);
    }

    #[test]
    fn test_start_price_in_range() {
        for seed in 0..50 {
            let mut rng = StdRng::seed_from_u64(seed);
            let points = SeriesGenerator::new().generate_with("X", anchor(), &mut rng);
            // one step moves at most ~1.25% from the start price
            let first = points[0].price();
            assert!(first > 100.0 * 0.98 && first < 500.0 * 1.02, "first = {first}");
        }
    }

    #[test]
    fn test_full_length_at_calendar_edges() {
        let generator = SeriesGenerator::new();

        let mut rng = StdRng::seed_from_u64(5);
        let points = generator.generate_with("AAPL", NaiveDate::MAX, &mut rng);
        check_invariants(&points);
        assert_eq!(points[259].date(), NaiveDate::MAX);

        let mut rng = StdRng::seed_from_u64(5);
        let points = generator.generate_with("AAPL", NaiveDate::MIN, &mut rng);
        check_invariants(&points);
    }

    #[test]
    fn test_step_clamps_to_floor() {
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..1000 {
            assert!(step(PRICE_FLOOR, HISTORY_DRIFT, &mut rng) >= PRICE_FLOOR);
        }
    }

    #[test]
    fn test_step_bounds() {
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..1000 {
            let next = step(200.0, FORECAST_DRIFT, &mut rng);
            let max_move = (0.5 + FORECAST_DRIFT) * 200.0 * VOLATILITY;
            assert!((next - 200.0).abs() <= max_move + 1e-9);
        }
    }

    #[test]
    fn test_round_cents() {
        assert_eq!(round_cents(123.456), 123.46);
        assert_eq!(round_cents(10.0), 10.0);
        assert_eq!(round_cents(99.994), 99.99);
    }
}
