//! Caller identity for report requests.
//!
//! The push token is verified by the gateway in front of this service; here
//! we only read who issued it and attach that identity to the request.

mod middleware;
mod push_token;

pub use middleware::*;
pub use push_token::*;
