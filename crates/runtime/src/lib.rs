//! TWX Runtime: the Control-Flow Engine, Pause/Resume Scheduler, Trigger Dispatcher, Command
//! Dispatcher, Persistence Adapter, and the ambient logging/configuration support around them.
//! Built on top of `twx-core` (the value/store model) and `twx-compiler` (lexing, parsing,
//! macro expansion, and label resolution).

mod commands;
pub mod config;
pub mod error;
pub mod eval;
pub mod persistence;
pub mod sinks;
pub mod triggers;
mod vm;
pub mod wait;

pub use config::VmConfig;
pub use error::{FatalKind, VmError};
pub use eval::VarLookup;
pub use persistence::{MemoryStore, PersistenceError, PersistenceStore};
#[cfg(feature = "persistence-sled")]
pub use persistence::SledStore;
pub use sinks::{BufferSink, OutputSink, TransportSink};
pub use triggers::{Trigger, TriggerKind, TriggerTable};
pub use vm::Vm;
pub use wait::{Deadline, WaitState};
