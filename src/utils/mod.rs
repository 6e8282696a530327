// Utility modules for PostPilot Backend

pub mod instagram_errors;
pub mod password;
pub mod validation;

pub use instagram_errors::{InstagramError, InstagramErrorResponse};
pub use password::{hash_password, verify_password, PasswordError};
pub use validation::{trim_and_validate_field, trim_optional_field};
