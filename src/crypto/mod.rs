pub mod jwt;
pub mod password;
pub mod signature;

pub use jwt::{issue_token, verify_token, Claims};
pub use password::{hash_password, verify_password};
pub use signature::verify_stripe_signature;
