//! The caller's outcome callbacks.

use crate::http::ValidationRecord;

/// Called with the final record once the pipeline completed.
pub type CompleteCallback = Box<dyn FnOnce(ValidationRecord) + Send>;

/// Called with a terminal error message.
pub type ErrorCallback = Box<dyn FnOnce(String) + Send>;

/// Holds both callbacks; delivering either outcome spends both, so the
/// caller hears about at most one outcome.
pub(crate) struct OutcomeCallbacks {
    on_complete: Option<CompleteCallback>,
    on_error: Option<ErrorCallback>,
}

impl OutcomeCallbacks {
    pub(crate) fn new(on_complete: CompleteCallback, on_error: ErrorCallback) -> Self {
        Self {
            on_complete: Some(on_complete),
            on_error: Some(on_error),
        }
    }

    /// Delivers the final record. Returns false if an outcome was already delivered.
    pub(crate) fn complete(&mut self, record: ValidationRecord) -> bool {
        self.on_error = None;
        match self.on_complete.take() {
            Some(callback) => {
                callback(record);
                true
            }
            None => false,
        }
    }

    /// Delivers an error. Returns false if an outcome was already delivered.
    pub(crate) fn fail(&mut self, message: String) -> bool {
        self.on_complete = None;
        match self.on_error.take() {
            Some(callback) => {
                callback(message);
                true
            }
            None => false,
        }
    }

    /// Returns true once an outcome has been delivered.
    pub(crate) fn is_spent(&self) -> bool {
        self.on_complete.is_none() && self.on_error.is_none()
    }
}

impl std::fmt::Debug for OutcomeCallbacks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OutcomeCallbacks")
            .field("spent", &self.is_spent())
            .finish()
    }
}
