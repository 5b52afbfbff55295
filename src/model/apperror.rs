use std::fmt;

/**
 * Represents the type of error that can occur within the application.
 */
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorType {
    Initialization,
    NotFound,
    Validation,
    ConstraintViolation,
    DatabaseError,
    StorageError,
    PasswordHashing,
}

/**
 * Represents an error that occurs within the application.
 */
#[derive(Debug, Clone)]
pub struct ApplicationError {
    /**
     * Error type.
     */
    pub error_type: ErrorType,
    /**
     * Error message describing problem.
     */
    pub message: String,
}

impl ApplicationError {
    /**
     * Creates a new ApplicationError.
     *
     * #Arguments
     * `error_type`: The type of error.
     * `message`: A description of the error.
     */
    pub fn new(error_type: ErrorType, message: String) -> Self {
        ApplicationError { error_type, message }
    }

    /**
     * Shorthand for a not found error on the given entity class.
     */
    pub fn not_found(class_name: &str) -> Self {
        ApplicationError::new(ErrorType::NotFound, format!("{class_name} not found"))
    }

    /**
     * Shorthand for a validation error.
     */
    pub fn validation(message: &str) -> Self {
        ApplicationError::new(ErrorType::Validation, message.to_string())
    }
}

impl fmt::Display for ApplicationError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ApplicationError {}
