// User/Room Store Gateway (spec §4.B) — a thin typed API over Postgres,
// one Repository per entity, split into create/read/update/delete files
// the way the teacher splits its `db/lobby/*` module.
pub mod friendship;
pub mod game;
pub mod game_session;
pub mod room;
pub mod room_event;
pub mod user;
