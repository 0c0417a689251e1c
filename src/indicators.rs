//! Return and volatility indicators
//!
//! Log returns from adjusted closes and rolling annualized volatility.

use statrs::statistics::Statistics;

use crate::error::{RegimeError, RegimeResult};
use crate::types::{
    PriceSeries, ReturnPoint, ReturnSeries, RollingWindow, VolatilityPoint, VolatilitySeries,
};

/// Trading days per year used to annualize daily volatility
pub const TRADING_DAYS_PER_YEAR: f64 = 252.0;

/// Calculate daily log returns ln(p_t / p_{t-1})
///
/// Fails on the first non-positive or non-finite price instead of letting
/// NaN or infinity leak into the volatility series.
pub fn log_returns(prices: &PriceSeries) -> RegimeResult<ReturnSeries> {
    if let Some(bad) = prices
        .points()
        .iter()
        .find(|p| p.close <= 0.0 || !p.close.is_finite())
    {
        return Err(RegimeError::InvalidPrice {
            date: bad.date,
            price: bad.close,
        });
    }

    Ok(prices
        .points()
        .windows(2)
        .map(|pair| ReturnPoint {
            date: pair[1].date,
            log_return: (pair[1].close / pair[0].close).ln(),
        })
        .collect())
}

/// Calculate rolling sample standard deviation (n - 1 denominator)
pub fn rolling_std(values: &[f64], period: usize) -> Vec<Option<f64>> {
    let mut result = Vec::with_capacity(values.len());

    for i in 0..values.len() {
        if period < 2 || i + 1 < period {
            result.push(None);
        } else {
            result.push(Some(values[i + 1 - period..=i].iter().std_dev()));
        }
    }

    result
}

/// Calculate rolling annualized volatility: rolling std * sqrt(252)
pub fn rolling_volatility(returns: &ReturnSeries, window: RollingWindow) -> VolatilitySeries {
    let values: Vec<f64> = returns.iter().map(|r| r.log_return).collect();
    let annualization = TRADING_DAYS_PER_YEAR.sqrt();

    returns
        .iter()
        .zip(rolling_std(&values, window.days()))
        .map(|(r, std)| VolatilityPoint {
            date: r.date,
            annualized_vol: std.map(|s| s * annualization),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PricePoint;
    use approx::assert_relative_eq;
    use chrono::{Duration, NaiveDate};

    fn series(closes: &[f64]) -> PriceSeries {
        let start = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
        PriceSeries::new(
            closes
                .iter()
                .enumerate()
                .map(|(i, &close)| PricePoint {
                    date: start + Duration::days(i as i64),
                    close,
                })
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn test_log_returns_scenario() {
        let returns = log_returns(&series(&[100.0, 105.0, 100.0])).unwrap();

        assert_eq!(returns.len(), 2);
        assert_relative_eq!(returns[0].log_return, 1.05_f64.ln(), epsilon = 1e-12);
        assert_relative_eq!(returns[0].log_return, 0.04879, epsilon = 1e-5);
        assert_relative_eq!(returns[1].log_return, -0.04879, epsilon = 1e-5);
    }

    #[test]
    fn test_log_returns_reject_non_positive() {
        let result = log_returns(&series(&[100.0, 0.0, 101.0]));
        assert!(matches!(result, Err(RegimeError::InvalidPrice { price, .. }) if price == 0.0));

        let result = log_returns(&series(&[100.0, -3.0]));
        assert!(matches!(result, Err(RegimeError::InvalidPrice { .. })));
    }

    #[test]
    fn test_log_returns_empty_and_single() {
        assert!(log_returns(&series(&[])).unwrap().is_empty());
        assert!(log_returns(&series(&[42.0])).unwrap().is_empty());
    }

    #[test]
    fn test_rolling_std() {
        let values = vec![1.0, 2.0, 3.0, 4.0, 6.0];
        let result = rolling_std(&values, 3);

        assert_eq!(result[0], None);
        assert_eq!(result[1], None);
        assert_relative_eq!(result[2].unwrap(), 1.0, epsilon = 1e-12);
        assert_relative_eq!(result[3].unwrap(), 1.0, epsilon = 1e-12);
        // [3, 4, 6]: mean 13/3, sample variance 7/3
        assert_relative_eq!(result[4].unwrap(), (7.0_f64 / 3.0).sqrt(), epsilon = 1e-12);
    }

    #[test]
    fn test_rolling_volatility_alignment() {
        let closes: Vec<f64> = (0..40).map(|i| 100.0 + (i % 5) as f64).collect();
        let returns = log_returns(&series(&closes)).unwrap();
        let vol = rolling_volatility(&returns, RollingWindow::Days20);

        assert_eq!(vol.len(), returns.len());
        assert!(vol[..19].iter().all(|v| v.annualized_vol.is_none()));
        assert!(vol[19..].iter().all(|v| v.annualized_vol.is_some()));
        assert_eq!(vol[19].date, returns[19].date);
    }

    #[test]
    fn test_rolling_volatility_annualized() {
        let closes: Vec<f64> = (0..31).map(|i| if i % 2 == 0 { 100.0 } else { 101.0 }).collect();
        let returns = log_returns(&series(&closes)).unwrap();
        let vol = rolling_volatility(&returns, RollingWindow::Days30);

        let raw: Vec<f64> = returns.iter().map(|r| r.log_return).collect();
        let expected = raw.iter().std_dev() * TRADING_DAYS_PER_YEAR.sqrt();
        assert_relative_eq!(vol[29].annualized_vol.unwrap(), expected, epsilon = 1e-12);
    }
}
