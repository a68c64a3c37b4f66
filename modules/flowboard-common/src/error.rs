use thiserror::Error;

#[derive(Error, Debug)]
pub enum WorkflowError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Append error: {0}")]
    Append(String),

    #[error("Delivery error: {0}")]
    Delivery(String),

    #[error("Handler error for event {id}: {message}")]
    Handler { id: String, message: String },

    #[error("Recovery error: {0}")]
    Recovery(String),

    #[error("Decode error for event {id}: {message}")]
    Decode { id: String, message: String },
}
