// Public API - what other modules can use
pub use errors::AuthError;
pub use middleware::{jwt_auth, require_role, TOKEN_HEADER};
pub use policy::authorize;
pub use token::TokenService;
pub use types::{Claims, Identity, Role};

// Internal modules
mod errors;
mod middleware;
pub mod password;
mod policy;
mod token;
mod types;
