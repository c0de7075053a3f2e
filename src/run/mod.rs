//! Run orchestration: completion barrier, worker pool, per-worker job loops.

mod barrier;
mod pool;
mod worker;

#[cfg(test)]
mod tests;

pub use pool::{RunPlan, execute};
