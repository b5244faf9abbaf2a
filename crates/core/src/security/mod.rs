//! Credential primitives: password hashing and access-token signing.
//!
//! Both are self-contained and know nothing about users or storage; the credential service
//! composes them.

mod password;
mod token;

pub use password::PasswordHasher;
pub use token::{Claims, SigningAlgorithm, TokenSigner};
