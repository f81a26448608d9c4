pub mod config;
pub mod domain;
pub mod errors;

pub use domain::context::{DialogueContext, HistoryEntry};
pub use domain::intent::Intent;
pub use domain::product::ProductRecord;
pub use errors::HandlerError;
