#![forbid(unsafe_code)]
#![deny(missing_docs)]

//! **tenant-context** – The context loop: per-user reducers, the sticky
//! phase state machine, predicted needs, and recommended actions.
//!
//! This is the only crate that owns [`state::UserContext`] mutation. Every
//! other component either feeds events in through [`loop_worker::ContextLoop::emit_event`]
//! or reads a cloned snapshot back out.

mod phase;
mod predictions;
mod reducers;
mod state;

mod loop_worker;

pub use loop_worker::ContextLoop;
pub use phase::resolve_issue;
pub use state::{
    ActionRecord, DocumentDescriptor, IntensityReport, IssueIntensity, PredictedNeed,
    RecommendedAction, RiskLevel, StateView, UserContext,
};
