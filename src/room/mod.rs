//! Room State Machine (spec §4.D) and Lifecycle Grace Manager (§4.F).

pub mod engine;
pub mod grace;

pub use engine::RoomEngine;
