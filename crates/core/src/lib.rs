//! TWX Core: the value model and variable store shared by the parser and the runtime.
//!
//! Key design principles:
//! - `Value`: what a script talks about (a number or a string, with Pascal-flavored coercions).
//! - `Store`: name -> value mapping with sparse auto-vivifying arrays and bounded static arrays.
//! - `GameState`: the read-only collaborator interface scripts reach via dotted accessors.
//!
//! This crate has no knowledge of control flow, triggers, or scheduling — it is pure data.

pub mod constants;
pub mod game_state;
pub mod store;
pub mod value;

pub use constants::{SystemContext, resolve_constant};
pub use game_state::{GameState, PortRecord, SectorRecord, StaticGameState};
pub use store::{Path, Store, StoreError};
pub use value::{Value, banker_round};
