pub mod review_flow;
pub mod session;

pub use review_flow::{BasketChange, ReviewFlow, SkipReason, StepOutcome};
pub use session::{Session, MAX_ROUNDS};
