//! Local SQLite storage for cards, sessions and the review ledger.

pub mod date_utils;
pub mod error;
pub mod repository;
pub mod schema;

pub use error::DbError;
pub use repository::{
    CalendarData, CardRepository, LibraryRepository, ReviewRepository, SessionRepository,
    SqliteRepository, StatsRepository, StoredReview, StudyStats,
};
