//! Line-oriented I/O (C10): the input-line loader and the ticker/module
//! dump writers. Neither module knows anything about the dispatcher;
//! they only know `RawEvent` and the ledger accessor APIs.

pub mod dump;
pub mod loader;

pub use dump::{write_module_dump, write_ticker_dump};
pub use loader::{EventReader, LoadError};
