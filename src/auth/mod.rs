//! Authentication primitives.
//!
//! JWT issuance/verification for access and refresh tokens, and
//! password hashing.

mod claims;
mod jwt;
mod password;

pub use claims::AccessClaims;
pub use claims::RefreshClaims;
pub use jwt::issue_access_token;
pub use jwt::issue_refresh_token;
pub use jwt::verify_access_token;
pub use jwt::verify_refresh_token;
pub use jwt::VerificationError;
pub use password::hash_password;
pub use password::verify_password;
