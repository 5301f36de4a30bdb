mod cache;
mod engine;
mod types;

pub use cache::ForecastCache;
pub use engine::run_forecast;
pub use types::{
    Catalog, CatalogError, ComponentSpec, DEFAULT_SEED, ForecastError, ForecastParams,
    ForecastResult, HORIZON_YEARS,
};
