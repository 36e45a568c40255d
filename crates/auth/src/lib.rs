// Core modules
mod error;
mod jwt;
mod password;
mod verification;

// Store-backed modules
pub mod model;
pub mod repository;
pub mod service;

// Re-export error types
pub use error::{AuthError, Result};

// Re-export crypto primitives
pub use jwt::{Claims, TokenIssuer};
pub use password::{hash_password, verify_password};
pub use verification::{issue_code, CODE_LENGTH};

pub use model::{
    LoginInput, NewUser, PublicUser, RegisterInput, Role, UpdateInput, User, UserChanges,
    VerifyInput,
};
pub use repository::{SqlUserRepository, UserRepository};
pub use service::UserService;
