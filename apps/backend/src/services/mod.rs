pub mod study;

pub use study::StudyService;
