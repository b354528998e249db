//! Service layer: calculation orchestration and ID generation.

mod calculation;
mod calculation_id;

use std::sync::Arc;

pub use calculation::{CalculationService, INTERNAL_CALCULATION_ERROR, NEGATIVE_TOKENS_ERROR};
pub use calculation_id::generate_calculation_id;

use crate::{config::RegistryConfig, oracle::ImpactOracle, registry::ModelRegistry};

/// Shared service container threaded through the router state.
#[derive(Clone)]
pub struct Services {
    pub calculation: Arc<CalculationService>,
}

impl Services {
    pub fn new(
        oracle: Arc<dyn ImpactOracle>,
        registry: Option<Arc<ModelRegistry>>,
        config: &RegistryConfig,
    ) -> Self {
        Self {
            calculation: Arc::new(CalculationService::new(oracle, registry, config)),
        }
    }
}
