//! Authentication: password hashing, bearer tokens, extractors and the
//! `/api/auth` endpoints.

pub mod handlers;
pub mod middleware;
pub mod password;
pub mod token;

pub use middleware::{BearerToken, SessionUser};
pub use token::{Claims, TokenError, TokenIssuer};
