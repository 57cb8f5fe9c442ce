//! Optimization passes and the pipeline that runs them.
//!
//! This module sits on top of [`crate::analysis`]:
//!
//! - [`crate::analysis`] - graph construction, liveness, SSA conversion
//! - [`compiler`](self) - SSA passes, scheduling, emission, the optimizer
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                      Optimizer Pipeline                          │
//! ├──────────────────────────────────────────────────────────────────┤
//! │                                                                  │
//! │  Optimizer                    One method at a time, or a batch   │
//! │    ├─ TacGraph::build          (in parallel via optimize_all)     │
//! │    ├─ DomTree + Liveness                                         │
//! │    ├─ SSA construction                                           │
//! │    ├─ PassScheduler            DCE → ConstantProp → DCE          │
//! │    ├─ SSA destruction                                            │
//! │    └─ CodeGenerator            Graph → flat instruction list     │
//! │                                                                  │
//! │  MethodContext                SSA graph, def/use chains, events  │
//! │  SsaPass trait                Interface for all passes           │
//! │  EventLog                     Change tracking and diagnostics    │
//! │                                                                  │
//! └──────────────────────────────────────────────────────────────────┘
//! ```

mod codegen;
mod config;
mod context;
mod events;
mod optimizer;
mod pass;
mod passes;
mod scheduler;

pub use codegen::{emit, CodeGenerator};
pub use config::OptimizerConfig;
pub use context::MethodContext;
pub use events::{Event, EventBuilder, EventKind, EventLog};
pub use optimizer::{OptimizedMethod, Optimizer};
pub use pass::SsaPass;
pub use passes::{ConstantPropagationPass, DeadCodeEliminationPass};
pub use scheduler::PassScheduler;
