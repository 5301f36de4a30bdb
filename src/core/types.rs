use serde::Serialize;
use thiserror::Error;

/// Forecast window in years; yearly spend is indexed 0..=HORIZON_YEARS.
pub const HORIZON_YEARS: usize = 20;

/// Seed applied when the caller does not override it, so identical inputs
/// regenerate identical reports.
pub const DEFAULT_SEED: u64 = 42;

#[derive(Debug, Clone)]
pub struct ComponentSpec {
    pub name: String,
    pub replacement_cost: f64,
    pub expected_life_years: u32,
    pub local_cost_fraction: f64,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CatalogError {
    #[error("duplicate component name {0:?}")]
    DuplicateName(String),
    #[error("component {name:?} has non-positive replacement cost {cost}")]
    InvalidCost { name: String, cost: f64 },
    #[error("component {name:?} has zero expected life")]
    ZeroLife { name: String },
    #[error("component {name:?} has local cost fraction {fraction} outside [0, 1]")]
    FractionOutOfRange { name: String, fraction: f64 },
}

#[derive(Debug, Clone)]
pub struct Catalog {
    components: Vec<ComponentSpec>,
}

impl Catalog {
    pub fn new(components: Vec<ComponentSpec>) -> Result<Self, CatalogError> {
        for (idx, spec) in components.iter().enumerate() {
            if !spec.replacement_cost.is_finite() || spec.replacement_cost <= 0.0 {
                return Err(CatalogError::InvalidCost {
                    name: spec.name.clone(),
                    cost: spec.replacement_cost,
                });
            }
            if spec.expected_life_years == 0 {
                return Err(CatalogError::ZeroLife {
                    name: spec.name.clone(),
                });
            }
            if !(0.0..=1.0).contains(&spec.local_cost_fraction) {
                return Err(CatalogError::FractionOutOfRange {
                    name: spec.name.clone(),
                    fraction: spec.local_cost_fraction,
                });
            }
            if components[..idx].iter().any(|other| other.name == spec.name) {
                return Err(CatalogError::DuplicateName(spec.name.clone()));
            }
        }

        Ok(Self { components })
    }

    /// The production component set. Entry order is fixed: every component
    /// consumes one draw per trial from the shared stream, so reordering
    /// changes every downstream result.
    pub fn standard() -> Self {
        let entry = |name: &str, cost: f64, life: u32, local: f64| ComponentSpec {
            name: name.to_string(),
            replacement_cost: cost,
            expected_life_years: life,
            local_cost_fraction: local,
        };

        Self::new(vec![
            entry("AI_HVAC_Systems", 8_800_000.0, 22, 0.30),
            entry("4MW_Solar_Microgrid", 6_880_000.0, 12, 0.15),
            entry("Roofing_High_Grade", 9_900_000.0, 25, 0.50),
            entry("Escalators_Elevators", 2_400_000.0, 20, 0.40),
            entry("LED_Retrofit", 3_400_000.0, 19, 0.20),
        ])
        .expect("standard catalog is valid")
    }

    pub fn components(&self) -> &[ComponentSpec] {
        &self.components
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ForecastParams {
    pub usd_rate_percent: f64,
    pub local_rate_percent: f64,
    pub iterations: u32,
    pub seed: u64,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ForecastError {
    #[error("iterations must be at least 1")]
    ZeroIterations,
    #[error("{label} rate of {value}% is invalid: 1 + rate/100 must be finite and non-negative")]
    InvalidRate { label: &'static str, value: f64 },
    #[error("non-finite spend for {component} at year {year}: inflation compounding left f64 range")]
    NonFiniteSpend { component: String, year: usize },
}

impl ForecastError {
    /// Invalid arguments are rejected before any trial runs; everything else
    /// failed during the computation itself.
    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, Self::ZeroIterations | Self::InvalidRate { .. })
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ForecastResult {
    pub mean: Vec<f64>,
    pub p95: Vec<f64>,
}

impl ForecastResult {
    pub fn total_mean(&self) -> f64 {
        self.mean.iter().sum()
    }

    pub fn total_p95(&self) -> f64 {
        self.p95.iter().sum()
    }
}
