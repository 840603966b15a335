pub mod types;
pub mod validator;

pub use types::{FormError, FormErrorType, FormValidationResult, Severity, ACCEPTABLE_SCORE};
pub use validator::{required_landmarks, FormValidator};
