//! Call session manager: the orchestrator on top of the bus, presence,
//! negotiator and media controller.
//!
//! Lifecycle per open room: `idle → joining → active → leaving → idle`.
//! Local actions come in as method calls (or [`CallCommand`]s), inbound
//! traffic as envelopes and peer events; the UI is told what happened
//! through [`CallEvent`]s.

mod dispatch;
mod manager;
mod runtime;
mod types;

pub use manager::CallManager;
pub use types::{CallBackends, CallCommand, CallConfig, CallEvent, CallPhase};
