pub mod context;
pub mod recognizer;
pub mod replies;
pub mod runtime;

pub use context::{ContextStore, ContextUpdate};
pub use recognizer::IntentRecognizer;
pub use runtime::DialogueRuntime;
