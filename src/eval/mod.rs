mod criterion;
mod error;
mod error_log;
mod evaluator;
mod extract;
mod gateway;
mod introspect;
mod model;
mod repair;
mod score;
mod statement;
mod stats;

pub use criterion::*;
pub use error::*;
pub use error_log::*;
pub use evaluator::*;
pub use extract::*;
pub use gateway::*;
pub use introspect::*;
pub use model::*;
pub use repair::*;
pub use score::*;
pub use statement::*;
pub use stats::*;
