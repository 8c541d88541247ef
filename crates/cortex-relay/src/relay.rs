pub mod filter;
pub mod lines;
pub mod sse;
pub mod stream;

pub use filter::FieldFilter;
pub use sse::{Payload, SseLine};
pub use stream::{EventStreamRelay, RelayOutcome};
