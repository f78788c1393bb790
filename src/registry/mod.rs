//! Connection Registry (spec §4.C): the process-wide, in-memory view of
//! who is connected to what. Grounded on the teacher's
//! `state.rs::Connections`/`ConnectionIndices` pair, collapsed into one
//! structure since this core tracks a single `room` context rather than
//! the teacher's room/lobby-list split.

mod connection;

pub use connection::{Connection, ConnectionRegistry, RateLimitedAction};
