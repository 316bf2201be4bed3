//! Synthetic price generation: a Gaussian random walk with news shocks.

use super::PriceTable;
use crate::{Error, Result};
use rand::Rng;
use rand_distr::{Distribution, Normal};

/// Standard deviation of the news shock multiplier.
const NEWS_SHOCK_STD: f64 = 2.0;
/// Shortest news effect, in days (inclusive).
const NEWS_MIN_DAYS: usize = 3;
/// Longest news effect, in days (exclusive).
const NEWS_MAX_DAYS: usize = 15;

/// A market-wide news event still moving prices.
#[derive(Debug, Clone, Copy)]
struct NewsShock {
    /// Multiplier applied to each stock's volatility
    strength: f64,
    /// Days left, today included
    remaining: usize,
}

/// Roll for a news event today.
fn draw_news<R: Rng + ?Sized>(rng: &mut R, probability: f64) -> Result<Option<NewsShock>> {
    if probability <= 0.0 || !rng.gen_bool(probability.min(1.0)) {
        return Ok(None);
    }

    let shock = Normal::new(0.0, NEWS_SHOCK_STD)
        .map_err(|e| Error::InvalidOperation(format!("news distribution: {}", e)))?;

    Ok(Some(NewsShock {
        strength: shock.sample(rng),
        remaining: rng.gen_range(NEWS_MIN_DAYS..NEWS_MAX_DAYS),
    }))
}

/// Generate daily closing prices for each stock.
///
/// Day 0 holds `initial_prices`. Every later day adds a `N(0, volatility)`
/// increment per stock plus the drift of any active news shock
/// (`strength × volatility`, shared by all stocks for 3 to 14 days). A price
/// that reaches zero or below marks the company as failed: the column is
/// `NaN` from that day on. A non-positive initial price fails the company from
/// day 0.
pub fn generate_stock_prices<R: Rng + ?Sized>(
    days: usize,
    initial_prices: &[f64],
    volatilities: &[f64],
    news_probability: f64,
    rng: &mut R,
) -> Result<PriceTable> {
    if days == 0 {
        return Err(Error::InvalidOperation(
            "Cannot generate prices over zero days".to_string(),
        ));
    }
    if initial_prices.len() != volatilities.len() {
        return Err(Error::InvalidOperation(format!(
            "{} initial prices but {} volatilities",
            initial_prices.len(),
            volatilities.len()
        )));
    }

    let increments = volatilities
        .iter()
        .map(|&vol| {
            Normal::new(0.0, vol)
                .map_err(|_| Error::InvalidOperation(format!("invalid volatility {}", vol)))
        })
        .collect::<Result<Vec<_>>>()?;

    let stocks = initial_prices.len();
    let mut columns: Vec<Vec<f64>> = initial_prices
        .iter()
        .map(|&p| {
            let mut col = vec![f64::NAN; days];
            if p > 0.0 {
                col[0] = p;
            }
            col
        })
        .collect();

    let mut active: Vec<NewsShock> = Vec::new();

    for day in 1..days {
        if let Some(shock) = draw_news(rng, news_probability)? {
            tracing::debug!(day, strength = shock.strength, duration = shock.remaining, "news shock");
            active.push(shock);
        }
        let news_strength: f64 = active.iter().map(|s| s.strength).sum();

        for stock in 0..stocks {
            // Draw even for failed stocks so each column consumes the RNG the same way
            let step = increments[stock].sample(rng) + news_strength * volatilities[stock];
            let previous = columns[stock][day - 1];
            if previous.is_nan() {
                continue;
            }

            let price = previous + step;
            if price > 0.0 {
                columns[stock][day] = price;
            } else {
                tracing::debug!(day, stock, "company failed");
            }
        }

        for shock in active.iter_mut() {
            shock.remaining -= 1;
        }
        active.retain(|s| s.remaining > 0);
    }

    PriceTable::from_columns(columns)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_shape_and_start() {
        let mut rng = StdRng::seed_from_u64(1);
        let table = generate_stock_prices(100, &[150.0, 250.0], &[1.8, 3.2], 0.01, &mut rng).unwrap();

        assert_eq!(table.days(), 100);
        assert_eq!(table.stocks(), 2);
        assert_eq!(table.row(0), &[150.0, 250.0]);
    }

    #[test]
    fn test_prices_positive_until_failure() {
        let mut rng = StdRng::seed_from_u64(7);
        // High volatility on a cheap stock so failures actually happen
        let table =
            generate_stock_prices(1825, &[5.0, 20.0, 100.0], &[3.0, 4.0, 1.0], 0.05, &mut rng)
                .unwrap();

        for column in table.columns() {
            let failed_at = column.iter().position(|p| p.is_nan()).unwrap_or(column.len());
            assert!(column[..failed_at].iter().all(|&p| p > 0.0));
            assert!(column[failed_at..].iter().all(|p| p.is_nan()));
        }
    }

    #[test]
    fn test_seed_is_reproducible() {
        let a = generate_stock_prices(
            50,
            &[100.0],
            &[2.0],
            0.2,
            &mut StdRng::seed_from_u64(99),
        )
        .unwrap();
        let b = generate_stock_prices(
            50,
            &[100.0],
            &[2.0],
            0.2,
            &mut StdRng::seed_from_u64(99),
        )
        .unwrap();

        assert_eq!(a, b);
    }

    #[test]
    fn test_zero_volatility_without_news_is_flat() {
        let mut rng = StdRng::seed_from_u64(3);
        let table = generate_stock_prices(10, &[42.0], &[0.0], 0.0, &mut rng).unwrap();

        assert!(table.column(0).iter().all(|&p| p == 42.0));
    }

    #[test]
    fn test_zero_initial_price_fails_immediately() {
        let mut rng = StdRng::seed_from_u64(3);
        let table = generate_stock_prices(10, &[0.0, 10.0], &[1.0, 1.0], 0.0, &mut rng).unwrap();

        assert!(table.column(0).iter().all(|p| p.is_nan()));
        assert_eq!(table.price(0, 1), 10.0);
    }

    #[test]
    fn test_negative_volatility_rejected() {
        let mut rng = StdRng::seed_from_u64(3);
        let result = generate_stock_prices(10, &[10.0], &[-1.0], 0.0, &mut rng);
        assert!(matches!(result, Err(Error::InvalidOperation(_))));
    }
}
