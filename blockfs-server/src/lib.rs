//! TCP front end for [`blockfs`]: one thread per client, one line per request.
pub mod logger;
pub mod protocol;
pub mod server;

pub use server::Server;
