//! Database error types

use thiserror::Error;

/// Errors from the database cursor
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// Connection could not be opened
    #[error("Database connection failed: {message}")]
    Connect { message: String },

    /// Statement execution failed
    #[error("Database statement failed: {message}")]
    Execute { message: String },
}

impl DatabaseError {
    /// Create a connection error
    pub fn connect(message: impl Into<String>) -> Self {
        Self::Connect {
            message: message.into(),
        }
    }

    /// Create an execution error
    pub fn execute(message: impl Into<String>) -> Self {
        Self::Execute {
            message: message.into(),
        }
    }
}
