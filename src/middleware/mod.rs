mod jwt_middleware;

pub use jwt_middleware::CurrentUser;
pub use jwt_middleware::JwtGuard;
