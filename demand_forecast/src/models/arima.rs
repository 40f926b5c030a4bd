//! ARIMA models for daily demand forecasting

use crate::data::DailySeries;
use crate::error::{ForecastError, Result};
use crate::models::{ForecastModel, ForecastResult, TrainedForecastModel};
use crate::optimize::{self, SimplexConfig};
use chrono::{Duration, NaiveDate};
use statrs::distribution::{ContinuousCDF, Normal};

/// Bound keeping AR and MA coefficients away from the unit circle.
const COEFFICIENT_BOUND: f64 = 0.99;

/// ARIMA model specification (AutoRegressive Integrated Moving Average)
#[derive(Debug, Clone)]
pub struct ArimaModel {
    /// Name of the model
    name: String,
    /// AR order (p)
    p: usize,
    /// Differencing order (d)
    d: usize,
    /// MA order (q)
    q: usize,
}

/// Trained ARIMA model
#[derive(Debug, Clone)]
pub struct TrainedArimaModel {
    /// Name of the model
    name: String,
    /// AR order (p)
    p: usize,
    /// Differencing order (d)
    d: usize,
    /// MA order (q)
    q: usize,
    /// Fitted AR coefficients
    ar_coefficients: Vec<f64>,
    /// Fitted MA coefficients
    ma_coefficients: Vec<f64>,
    /// Intercept on the differenced scale
    intercept: f64,
    /// Training series on the original scale
    original: Vec<f64>,
    /// Training series after differencing
    differenced: Vec<f64>,
    /// One-step fitted values on the differenced scale (NaN before conditioning)
    fitted: Vec<f64>,
    /// Residuals on the differenced scale
    residuals: Vec<f64>,
    /// Residual variance
    residual_variance: f64,
    /// Akaike information criterion
    aic: f64,
    /// Bayesian information criterion
    bic: f64,
    /// Last training date, when the series carried dates
    last_date: Option<NaiveDate>,
}

impl ArimaModel {
    /// Create a new ARIMA model specification
    pub fn new(p: usize, d: usize, q: usize) -> Self {
        Self {
            name: format!("ARIMA({},{},{})", p, d, q),
            p,
            d,
            q,
        }
    }

    /// Get the (p, d, q) order
    pub fn order(&self) -> (usize, usize, usize) {
        (self.p, self.d, self.q)
    }

    /// Minimum series length for the fit to be well-defined
    pub fn min_observations(&self) -> usize {
        self.d + self.p.max(self.q) + 2
    }

    /// Estimate intercept, AR, and MA coefficients on the differenced series
    fn estimate(&self, differenced: &[f64]) -> Result<(f64, Vec<f64>, Vec<f64>)> {
        if differenced.is_empty() {
            return Err(ForecastError::FittingError(
                "differenced series is empty".to_string(),
            ));
        }

        let mean = differenced.iter().sum::<f64>() / differenced.len() as f64;
        if self.p == 0 && self.q == 0 {
            return Ok((mean, vec![], vec![]));
        }

        let mut initial = vec![0.0; 1 + self.p + self.q];
        initial[0] = mean;
        for i in 0..self.p {
            initial[1 + i] = 0.1 / (i + 1) as f64;
        }
        for i in 0..self.q {
            initial[1 + self.p + i] = 0.1 / (i + 1) as f64;
        }

        let mut bounds = vec![(f64::NEG_INFINITY, f64::INFINITY)];
        bounds.extend(
            std::iter::repeat((-COEFFICIENT_BOUND, COEFFICIENT_BOUND)).take(self.p + self.q),
        );

        let (p, q) = (self.p, self.q);
        let result = optimize::minimize(
            |params| {
                conditional_sum_of_squares(
                    differenced,
                    p,
                    q,
                    &params[1..1 + p],
                    &params[1 + p..],
                    params[0],
                )
            },
            &initial,
            Some(&bounds),
            &SimplexConfig::default(),
        );

        if !result.value.is_finite() {
            return Err(ForecastError::FittingError(
                "conditional sum of squares did not reach a finite value".to_string(),
            ));
        }

        Ok((
            result.point[0],
            result.point[1..1 + p].to_vec(),
            result.point[1 + p..].to_vec(),
        ))
    }
}

impl ForecastModel for ArimaModel {
    type Trained = TrainedArimaModel;

    fn train(&self, data: &DailySeries) -> Result<TrainedArimaModel> {
        let values = data.totals().to_vec();
        let needed = self.min_observations();
        if values.len() < needed {
            return Err(ForecastError::InsufficientData {
                needed,
                got: values.len(),
            });
        }

        let differenced = difference(&values, self.d);
        let (intercept, ar_coefficients, ma_coefficients) = self.estimate(&differenced)?;
        let (fitted, residuals) = fitted_and_residuals(
            &differenced,
            self.p,
            self.q,
            &ar_coefficients,
            &ma_coefficients,
            intercept,
        );

        let start = self.p.max(self.q);
        let conditioned = &residuals[start.min(residuals.len())..];
        if conditioned.is_empty() {
            return Err(ForecastError::FittingError(
                "no residuals remain after conditioning on initial lags".to_string(),
            ));
        }
        let residual_variance =
            conditioned.iter().map(|r| r * r).sum::<f64>() / conditioned.len() as f64;
        if !residual_variance.is_finite() {
            return Err(ForecastError::FittingError(
                "residual variance is not finite".to_string(),
            ));
        }

        let n_eff = conditioned.len() as f64;
        let k = (self.p + self.q + 1) as f64;
        let log_likelihood = -0.5
            * n_eff
            * (1.0
                + residual_variance.max(f64::MIN_POSITIVE).ln()
                + (2.0 * std::f64::consts::PI).ln());
        let aic = -2.0 * log_likelihood + 2.0 * k;
        let bic = -2.0 * log_likelihood + k * n_eff.ln();

        Ok(TrainedArimaModel {
            name: self.name.clone(),
            p: self.p,
            d: self.d,
            q: self.q,
            ar_coefficients,
            ma_coefficients,
            intercept,
            original: values,
            differenced,
            fitted,
            residuals,
            residual_variance,
            aic,
            bic,
            last_date: data.last_date(),
        })
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl TrainedArimaModel {
    /// Get the (p, d, q) order
    pub fn order(&self) -> (usize, usize, usize) {
        (self.p, self.d, self.q)
    }

    /// Fitted AR coefficients
    pub fn ar_coefficients(&self) -> &[f64] {
        &self.ar_coefficients
    }

    /// Fitted MA coefficients
    pub fn ma_coefficients(&self) -> &[f64] {
        &self.ma_coefficients
    }

    /// Intercept on the differenced scale
    pub fn intercept(&self) -> f64 {
        self.intercept
    }

    /// Number of training observations
    pub fn observations(&self) -> usize {
        self.original.len()
    }

    /// One-step fitted values on the differenced scale
    pub fn fitted_values(&self) -> &[f64] {
        &self.fitted
    }

    /// Residuals on the differenced scale
    pub fn residuals(&self) -> &[f64] {
        &self.residuals
    }

    /// Residual variance
    pub fn residual_variance(&self) -> f64 {
        self.residual_variance
    }

    /// Akaike information criterion
    pub fn aic(&self) -> f64 {
        self.aic
    }

    /// Bayesian information criterion
    pub fn bic(&self) -> f64 {
        self.bic
    }

    /// Last training date, when the training series carried dates
    pub fn last_date(&self) -> Option<NaiveDate> {
        self.last_date
    }

    /// Forecast with normal-approximation confidence intervals at `level`
    pub fn forecast_with_intervals(&self, horizons: usize, level: f64) -> Result<ForecastResult> {
        if level <= 0.0 || level >= 1.0 {
            return Err(ForecastError::InvalidParameter(
                "Confidence level must be between 0 and 1".to_string(),
            ));
        }

        let base = self.forecast(horizons)?;
        if horizons == 0 {
            return Ok(base);
        }

        let normal = Normal::new(0.0, 1.0)
            .map_err(|err| ForecastError::FittingError(err.to_string()))?;
        let z = normal.inverse_cdf((1.0 + level) / 2.0);

        // Forecast variance grows linearly with horizon
        let intervals = base
            .values()
            .iter()
            .enumerate()
            .map(|(step, value)| {
                let se = (self.residual_variance * (step + 1) as f64).sqrt();
                (value - z * se, value + z * se)
            })
            .collect();

        base.with_intervals(intervals)
    }

    /// Point forecasts on the original scale
    fn forecast_values(&self, horizons: usize) -> Vec<f64> {
        let mut extended = self.differenced.clone();
        let mut shocks = self.residuals.clone();

        for _ in 0..horizons {
            let t = extended.len();
            let mut prediction = self.intercept;
            for i in 0..self.p {
                if t > i {
                    prediction += self.ar_coefficients[i] * (extended[t - 1 - i] - self.intercept);
                }
            }
            // Future shocks are zero, but recent in-sample residuals still feed the MA terms
            for i in 0..self.q {
                if t > i {
                    prediction += self.ma_coefficients[i] * shocks[t - 1 - i];
                }
            }
            extended.push(prediction);
            shocks.push(0.0);
        }

        let forecast_diff = extended[self.differenced.len()..].to_vec();
        if self.d > 0 {
            integrate(&forecast_diff, &self.original, self.d)
        } else {
            forecast_diff
        }
    }

    /// Calendar dates for the next `horizons` days after the training end
    fn forecast_dates(&self, horizons: usize) -> Option<Vec<NaiveDate>> {
        let last = self.last_date?;
        (1..=horizons as i64)
            .map(|offset| last.checked_add_signed(Duration::days(offset)))
            .collect()
    }
}

impl TrainedForecastModel for TrainedArimaModel {
    fn forecast(&self, horizons: usize) -> Result<ForecastResult> {
        let values = self.forecast_values(horizons);
        let result = ForecastResult::new(values, horizons)?;

        match self.forecast_dates(horizons) {
            Some(dates) => result.with_dates(dates),
            None => Ok(result),
        }
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Conditional sum of squared one-step errors for the given parameters
fn conditional_sum_of_squares(
    series: &[f64],
    p: usize,
    q: usize,
    ar: &[f64],
    ma: &[f64],
    intercept: f64,
) -> f64 {
    let n = series.len();
    let start = p.max(q);
    if n <= start {
        return f64::MAX;
    }

    let mut residuals = vec![0.0; n];
    let mut total = 0.0;
    for t in start..n {
        let mut prediction = intercept;
        for i in 0..p {
            prediction += ar[i] * (series[t - 1 - i] - intercept);
        }
        for i in 0..q {
            prediction += ma[i] * residuals[t - 1 - i];
        }
        let error = series[t] - prediction;
        residuals[t] = error;
        total += error * error;
    }

    total
}

/// One-step fitted values and residuals on the differenced scale
fn fitted_and_residuals(
    series: &[f64],
    p: usize,
    q: usize,
    ar: &[f64],
    ma: &[f64],
    intercept: f64,
) -> (Vec<f64>, Vec<f64>) {
    let n = series.len();
    let start = p.max(q);
    let mut fitted = vec![f64::NAN; n];
    let mut residuals = vec![0.0; n];

    for t in start.min(n)..n {
        let mut prediction = intercept;
        for i in 0..p {
            prediction += ar[i] * (series[t - 1 - i] - intercept);
        }
        for i in 0..q {
            prediction += ma[i] * residuals[t - 1 - i];
        }
        fitted[t] = prediction;
        residuals[t] = series[t] - prediction;
    }

    (fitted, residuals)
}

/// Difference a series `d` times
fn difference(series: &[f64], d: usize) -> Vec<f64> {
    let mut result = series.to_vec();
    for _ in 0..d {
        if result.len() <= 1 {
            break;
        }
        result = result.windows(2).map(|pair| pair[1] - pair[0]).collect();
    }
    result
}

/// Reverse `d` levels of differencing, continuing from the training series
fn integrate(forecast_diff: &[f64], original: &[f64], d: usize) -> Vec<f64> {
    let mut result = forecast_diff.to_vec();
    for level in (0..d).rev() {
        let at_level = difference(original, level);
        let mut cumulative = at_level.last().copied().unwrap_or(0.0);
        for value in result.iter_mut() {
            cumulative += *value;
            *value = cumulative;
        }
    }
    result
}
