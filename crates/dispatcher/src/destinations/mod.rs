//! Destination implementations
//!
//! Contains FileDestination, LogDestination, MemoryDestination and
//! WriterDestination (stdout/stderr and any other `AsyncWrite`).

mod file;
mod log;
mod memory;
mod writer;

pub use self::file::{FileDestination, FileDestinationConfig};
pub use self::log::LogDestination;
pub use self::memory::MemoryDestination;
pub use self::writer::WriterDestination;
