//! Request middleware

pub mod metrics;
pub mod rate_limit;
pub mod session;

pub use session::CurrentUser;
