pub mod cookie;
pub mod guard;
pub mod token;

pub use cookie::SessionCookie;
pub use guard::SessionGuard;
pub use token::{Clock, SessionToken, SystemClock, TokenCodec, TokenError};
