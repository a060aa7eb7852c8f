pub mod auth;
pub mod rate_limit;
pub mod request;
pub mod response;
pub mod security_headers;

pub use auth::{authorize, jwt_auth_middleware, AuthUser};
pub use rate_limit::{rate_limit_middleware, RateDecision, RateLimiter};
pub use request::ValidJson;
pub use response::{ApiResponse, ApiResult, CollectionResponse, PagedResponse, TokenResponse};
pub use security_headers::with_security_headers;
