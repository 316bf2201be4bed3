//! Relative Strength Index (RSI) oscillator, scaled to `[0, 1]`.

use super::sma::first_nan;

/// Calculate RSI value from average gain and average loss.
/// Handles edge cases: no losses (RSI=1), no gains (RSI=0), no change (RSI=0.5).
#[inline]
fn calculate_rsi_value(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss <= 0.0 {
        if avg_gain <= 0.0 {
            0.5 // No change
        } else {
            1.0 // All gains, no losses
        }
    } else if avg_gain <= 0.0 {
        0.0 // All losses, no gains
    } else {
        let rs = avg_gain / avg_loss;
        1.0 - (1.0 / (1.0 + rs))
    }
}

/// Calculate the `period`-day RSI oscillator.
///
/// For each day, the last `period` prices give `period - 1` consecutive
/// differences. The average gain is the mean of the positive differences and
/// the average loss the mean magnitude of the negative ones; then
/// `RSI = 1 - 1 / (1 + gain / loss)`.
///
/// A window without any decrease saturates at 1.0 instead of dividing by zero.
/// Days before a full window, and every day from the first `NaN` price on,
/// are `NaN`.
///
/// # Example
///
/// ```rust
/// use tradesim_core::indicators::rsi_oscillator;
///
/// let rising = vec![10.0, 11.0, 12.0, 13.0, 14.0];
/// let rsi = rsi_oscillator(&rising, 3);
///
/// assert!(rsi[1].is_nan());
/// assert_eq!(rsi[4], 1.0);
/// ```
pub fn rsi_oscillator(prices: &[f64], period: usize) -> Vec<f64> {
    let n = prices.len();
    let mut result = vec![f64::NAN; n];

    if period < 2 || n < period {
        return result;
    }

    let valid = first_nan(prices);

    for day in (period - 1)..valid {
        let window = &prices[day + 1 - period..=day];

        let (mut gain_sum, mut gains) = (0.0, 0usize);
        let (mut loss_sum, mut losses) = (0.0, 0usize);
        for pair in window.windows(2) {
            let change = pair[1] - pair[0];
            if change > 0.0 {
                gain_sum += change;
                gains += 1;
            } else if change < 0.0 {
                loss_sum -= change;
                losses += 1;
            }
        }

        let avg_gain = if gains > 0 { gain_sum / gains as f64 } else { 0.0 };
        let avg_loss = if losses > 0 { loss_sum / losses as f64 } else { 0.0 };

        result[day] = calculate_rsi_value(avg_gain, avg_loss);
    }

    result
}
