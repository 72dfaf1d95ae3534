pub mod cards;
pub mod library;
pub mod sessions;
pub mod stats;
pub mod study;
