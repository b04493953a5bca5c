//! Debug tools for strata - TCP inspection server for a running terrain world
//!
//! Start the debug server in your app:
//! ```ignore
//! let handler = Arc::new(Mutex::new(world));
//! let _server = DebugServer::start(handler, strata_debug::DEFAULT_PORT);
//! ```
//!
//! Every command is a query; nothing sent over the wire mutates the world.

pub mod protocol;
pub mod server;

pub use protocol::*;
pub use server::{DebugHandler, DebugServer};

/// Default debug server port
pub const DEFAULT_PORT: u16 = 9743;
