//! Refresh-token sessions: records, persistence, rotation and the purge sweep.

mod models;
mod postgres;
mod repository;
mod service;
mod sweeper;

pub use models::{
    IssuedRefreshToken, MAX_SESSION_ID_LEN, NewRefreshToken, RefreshTokenRecord, SessionInfo,
    normalize_session_id,
};
pub use postgres::PostgresSessionRepository;
pub use repository::{InMemorySessionRepository, SessionRepository};
pub use service::SessionManager;
pub use sweeper::spawn_purge_job;
