mod authorizer;
mod helpers;
mod middleware;
mod token;

pub use authorizer::{Authorizer, GrantAuthorizer};
pub use middleware::{AuthError, RequireUser};
pub use token::{TokenGenerator, generate_portal_token, parse_token};
