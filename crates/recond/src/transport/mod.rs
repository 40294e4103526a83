//! Socket transport for client connections.
//!
//! The listener binds the configured endpoint, accepts connections on a
//! background thread, and hands each one to a [`ConnectionHandler`] on its own
//! thread.

mod errors;
mod listener;
mod stream;

pub use self::errors::ListenerError;
pub(crate) use self::listener::{ListenerHandle, SocketListener};
pub(crate) use self::stream::{ConnectionHandler, ConnectionStream};

const LISTENER_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::transport");
