//! Local SQLite storage for keys

mod pool;

pub use pool::{connect, connect_in_memory};
