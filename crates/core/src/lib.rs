// crates/core/src/lib.rs
pub mod accumulator;
pub mod discovery;
pub mod error;
pub mod parser;
pub mod pricing;
pub mod transcript;
pub mod types;

pub use accumulator::*;
pub use discovery::*;
pub use error::*;
pub use parser::*;
pub use pricing::{model_display_name, model_family, ModelPricing, PricingTable};
pub use transcript::*;
pub use types::*;
