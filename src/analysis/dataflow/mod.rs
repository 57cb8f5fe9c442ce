//! Dataflow analyses over instruction graphs.

mod liveness;

pub use liveness::Liveness;
