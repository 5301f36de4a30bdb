use super::types::{
    Catalog, ComponentSpec, ForecastError, ForecastParams, ForecastResult, HORIZON_YEARS,
};

const WEIBULL_SHAPE: f64 = 3.5;
// The mean of a shape-3.5 Weibull is just under 0.9 of its scale, so
// stretching the scale by 1/0.9 centres failure draws on the nominal life.
const CHARACTERISTIC_LIFE_RATIO: f64 = 0.9;

pub fn run_forecast(
    catalog: &Catalog,
    params: &ForecastParams,
) -> Result<ForecastResult, ForecastError> {
    validate_params(params)?;

    let usd_rate = params.usd_rate_percent / 100.0;
    let local_rate = params.local_rate_percent / 100.0;

    let mut rng = Rng::new(params.seed);
    let mut acc = YearlySpendAccumulator::new(params.iterations as usize);

    for _ in 0..params.iterations {
        let trial = simulate_trial(catalog, usd_rate, local_rate, &mut rng)?;
        acc.push(&trial);
    }

    Ok(acc.into_result())
}

fn validate_params(params: &ForecastParams) -> Result<(), ForecastError> {
    if params.iterations == 0 {
        return Err(ForecastError::ZeroIterations);
    }

    for (label, value) in [
        ("usd", params.usd_rate_percent),
        ("local", params.local_rate_percent),
    ] {
        if !value.is_finite() || value < -100.0 {
            return Err(ForecastError::InvalidRate { label, value });
        }
    }

    Ok(())
}

fn simulate_trial(
    catalog: &Catalog,
    usd_rate: f64,
    local_rate: f64,
    rng: &mut Rng,
) -> Result<Vec<f64>, ForecastError> {
    let mut yearly_spend = vec![0.0; HORIZON_YEARS + 1];

    for spec in catalog.components() {
        // The draw happens before the window filter so components that miss
        // the window still advance the stream for the components after them.
        let draw = rng.weibull(WEIBULL_SHAPE, weibull_scale(spec.expected_life_years));
        let Some(year) = failure_year_for_draw(draw) else {
            continue;
        };

        let spend = inflated_replacement_cost(spec, year, usd_rate, local_rate);
        if !spend.is_finite() {
            return Err(ForecastError::NonFiniteSpend {
                component: spec.name.clone(),
                year,
            });
        }
        yearly_spend[year] += spend;
    }

    Ok(yearly_spend)
}

fn weibull_scale(expected_life_years: u32) -> f64 {
    expected_life_years as f64 / CHARACTERISTIC_LIFE_RATIO
}

/// Maps a continuous failure-time draw onto an integer year of the forecast
/// window. Rounds to the nearest whole year with ties going away from zero
/// (`f64::round`): a draw of exactly 0.5 lands in year 1, and 20.5 rounds
/// past the window. Draws rounding outside `(0, HORIZON_YEARS]` mean the
/// component does not fail within the forecast.
fn failure_year_for_draw(draw: f64) -> Option<usize> {
    let year = draw.round();
    if year > 0.0 && year <= HORIZON_YEARS as f64 {
        Some(year as usize)
    } else {
        None
    }
}

fn inflated_replacement_cost(
    spec: &ComponentSpec,
    year: usize,
    usd_rate: f64,
    local_rate: f64,
) -> f64 {
    let local_part = spec.replacement_cost * spec.local_cost_fraction;
    let import_part = spec.replacement_cost * (1.0 - spec.local_cost_fraction);
    local_part * (1.0 + local_rate).powi(year as i32)
        + import_part * (1.0 + usd_rate).powi(year as i32)
}

struct YearlySpendAccumulator {
    per_year: Vec<Vec<f64>>,
}

impl YearlySpendAccumulator {
    fn new(expected_trials: usize) -> Self {
        let per_year = (0..=HORIZON_YEARS)
            .map(|_| Vec::with_capacity(expected_trials))
            .collect();
        Self { per_year }
    }

    fn push(&mut self, trial: &[f64]) {
        for (column, spend) in self.per_year.iter_mut().zip(trial) {
            column.push(*spend);
        }
    }

    fn into_result(mut self) -> ForecastResult {
        let mut mean = Vec::with_capacity(self.per_year.len());
        let mut p95 = Vec::with_capacity(self.per_year.len());
        for column in &mut self.per_year {
            let n = column.len() as f64;
            mean.push(column.iter().sum::<f64>() / n);
            p95.push(percentile(column, 95.0));
        }
        ForecastResult { mean, p95 }
    }
}

struct Rng {
    state: u64,
}

impl Rng {
    fn new(seed: u64) -> Self {
        let mixed = splitmix64(seed);
        let state = if mixed == 0 {
            0xA5A5_A5A5_A5A5_A5A5
        } else {
            mixed
        };
        Self { state }
    }

    fn next_u64(&mut self) -> u64 {
        let mut x = self.state;
        x ^= x >> 12;
        x ^= x << 25;
        x ^= x >> 27;
        self.state = x;
        x.wrapping_mul(0x2545F4914F6CDD1D)
    }

    fn next_f64(&mut self) -> f64 {
        const DENOM: f64 = (1_u64 << 53) as f64;
        let v = self.next_u64() >> 11;
        ((v as f64) + 0.5) / DENOM
    }

    /// Weibull(shape, scale) by inverse transform; `next_f64` never returns
    /// exactly 0 or 1, so the log stays finite.
    fn weibull(&mut self, shape: f64, scale: f64) -> f64 {
        let u = self.next_f64();
        scale * (-(1.0 - u).ln()).powf(1.0 / shape)
    }
}

fn splitmix64(mut x: u64) -> u64 {
    x = x.wrapping_add(0x9E3779B97F4A7C15);
    let mut z = x;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58476D1CE4E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D049BB133111EB);
    z ^ (z >> 31)
}

/// Percentile with linear interpolation: the value at fractional rank
/// `p/100 * (n - 1)` of the sorted sample, blending the two bracketing order
/// statistics by the fractional part of the rank.
fn percentile(values: &mut [f64], p: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }

    values.sort_by(|a, b| a.total_cmp(b));

    let n = values.len();
    if n == 1 {
        return values[0];
    }

    let rank = (p / 100.0) * (n as f64 - 1.0);
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;

    if lower == upper {
        values[lower]
    } else {
        let w = rank - lower as f64;
        values[lower] * (1.0 - w) + values[upper] * w
    }
}
