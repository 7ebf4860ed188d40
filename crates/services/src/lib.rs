#![forbid(unsafe_code)]

pub mod catalog;
pub mod error;
pub mod sessions;

pub use quiz_core::Clock;
pub use sessions as session;

pub use error::{CatalogError, SessionError};

pub use catalog::{
    CatalogProvider, CatalogService, DatasetEntry, DatasetIndex, DatasetSelection,
    HttpCatalogProvider, StaticCatalogProvider,
};
pub use sessions::{
    AnswerOutcome, QuizService, QuizSession, SessionFilter, SessionId, SessionMode,
    SessionOutcome, SessionProgress,
};
