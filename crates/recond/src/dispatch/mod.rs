//! JSONL request dispatch.
//!
//! A connection carries a single request line naming a `command`. The handler
//! parses it, routes it to the job manager or the result archive, and writes a
//! reply followed by an exit message. Failures are written as a stderr stream
//! line followed by an exit carrying the mapped status.

mod errors;
mod handler;
mod request;
mod response;
mod router;

pub use self::errors::DispatchError;
pub(crate) use self::handler::DispatchConnectionHandler;
pub use self::request::CommandRequest;
pub use self::response::{DaemonMessage, StreamTarget};

