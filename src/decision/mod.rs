// Decision engine: crossover readings + account snapshot -> action
pub mod engine;
pub mod sizing;

pub use engine::{decide, DecisionEngine, MIN_ORDER_CASH};
pub use sizing::{AllCash, SizingStrategy};
