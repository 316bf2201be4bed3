//! Simple and weighted moving averages over price series that may end in `NaN`.

/// Index of the first `NaN` in `data`, or `data.len()` if there is none.
pub(crate) fn first_nan(data: &[f64]) -> usize {
    data.iter().position(|x| x.is_nan()).unwrap_or(data.len())
}

/// Calculate Simple Moving Average.
///
/// # Arguments
///
/// * `data` - Price series
/// * `period` - Lookback period
///
/// # Returns
///
/// Vector of SMA values. The first `period-1` values are `NaN`.
///
/// # Example
///
/// ```rust
/// use tradesim_core::indicators::sma;
///
/// let prices = vec![10.0, 11.0, 12.0, 11.0, 10.0, 11.0, 12.0, 13.0, 12.0, 11.0];
/// let sma_values = sma(&prices, 3);
///
/// // SMA at index 2 = (10 + 11 + 12) / 3 = 11.0
/// assert!((sma_values[2] - 11.0).abs() < 0.001);
/// assert!(sma_values[1].is_nan());
/// ```
pub fn sma(data: &[f64], period: usize) -> Vec<f64> {
    let n = data.len();
    let mut result = vec![f64::NAN; n];

    if period == 0 || period > n {
        return result;
    }

    // Calculate first SMA using simple sum
    let mut sum: f64 = data[..period].iter().sum();
    result[period - 1] = sum / period as f64;

    // Use rolling window for subsequent values
    for i in period..n {
        sum = sum - data[i - period] + data[i];
        result[i] = sum / period as f64;
    }

    result
}

/// Calculate the `period`-day moving average used by the strategies.
///
/// With empty `weights` this is a plain average. Otherwise `weights` must have
/// length `period` and is applied oldest price first, as a dot product with
/// the window (the weights are used as given, not normalized).
///
/// Values before a full window exists are `NaN`. Once the series hits `NaN`
/// (a failed company) the average is `NaN` from that day on.
///
/// # Example
///
/// ```rust
/// use tradesim_core::indicators::moving_average;
///
/// let prices = vec![1.0, 2.0, 3.0, 4.0, f64::NAN, f64::NAN];
/// let ma = moving_average(&prices, 2, &[]);
///
/// assert!((ma[1] - 1.5).abs() < 1e-12);
/// assert!((ma[3] - 3.5).abs() < 1e-12);
/// assert!(ma[4].is_nan() && ma[5].is_nan());
/// ```
pub fn moving_average(data: &[f64], period: usize, weights: &[f64]) -> Vec<f64> {
    let n = data.len();
    let valid = first_nan(data);

    if weights.is_empty() {
        let mut result = vec![f64::NAN; n];
        let prefix = sma(&data[..valid], period);
        result[..valid].copy_from_slice(&prefix);
        return result;
    }

    let mut result = vec![f64::NAN; n];
    if period == 0 || weights.len() != period {
        return result;
    }

    for i in (period - 1)..valid {
        let start = i + 1 - period;
        result[i] = data[start..=i]
            .iter()
            .zip(weights)
            .map(|(price, weight)| price * weight)
            .sum();
    }

    result
}
