//! Dynamic pricing: the price formula, the engine that derives its inputs
//! from a product's history, and the human-readable change explanation.

mod engine;
mod explanation;
mod model;

pub use engine::{PriceQuote, PricingEngine};
pub use explanation::{explain_change, format_percent, INITIAL_ENTRY};
pub use model::{LinearPricingModel, PricingModel};
