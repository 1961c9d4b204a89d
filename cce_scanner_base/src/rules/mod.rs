//! Rule definitions, the registry, and the fault-isolating evaluator

pub mod definition;
pub mod errors;
pub mod registry;

pub use definition::{
    Category, Evaluator, Finding, RuleCatalogEntry, RuleDefinition, RuleId, RuleParameters,
    Threshold, ThresholdOperator,
};
pub use errors::{RegistryError, RuleFault};
pub use registry::{RegistryBuilder, RegistryHealth, RegistryStatistics, RuleRegistry};
