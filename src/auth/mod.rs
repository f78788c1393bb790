// Authentication module: socket-facing JWT extractor, optional per spec §3.

pub mod extractors;
pub mod jwt;

pub use extractors::WsAuth;
pub use jwt::{Claims, generate_jwt};
