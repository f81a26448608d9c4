use thiserror::Error;

/// Failure inside an intent handler. These never cross the `process_turn`
/// boundary: the runtime logs them and answers with `user_message`.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum HandlerError {
    #[error("catalog unavailable: {0}")]
    Catalog(String),
    #[error("reply assembly failed: {0}")]
    Reply(String),
}

impl HandlerError {
    /// Fixed user-facing fallback. Intentionally free of internal detail.
    pub fn user_message(&self) -> &'static str {
        "Disculpá, tuve un inconveniente para responderte. ¿Podés intentar de nuevo en un momento?"
    }
}
