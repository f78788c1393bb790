// Data model: the entities and invariants of spec.md §3.
pub mod friendship;
pub mod game;
pub mod game_session;
pub mod room;
pub mod room_event;
pub mod room_member;
pub mod user;

pub use friendship::{Friendship, FriendshipStatus};
pub use game::Game;
pub use game_session::GameSession;
pub use room::{Room, RoomStatus};
pub use room_event::RoomEvent;
pub use room_member::{ConnectionStatus, Location, MemberRole, RoomMember};
pub use user::{User, UserRole};
