mod ids;
mod question;

pub use ids::{QuestionId, StratumKey};
pub use question::{Question, QuestionAsset, QuestionError, QuestionKind};
