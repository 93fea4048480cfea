//! Worker pool and per-class pipeline.
//!
//! A [`Dispatcher`] plans one task per class identifier, puts them on a shared
//! FIFO queue and drains it with a fixed number of worker threads. Each worker
//! owns its own fetcher (and therefore its own pooled connection) and runs
//! every class through: skip check → fetch with retry → extract → optional
//! archive deletion. Any error or panic stays confined to the class that
//! caused it and becomes a `Failed` outcome.

mod pool;
mod process;

pub use pool::Dispatcher;
