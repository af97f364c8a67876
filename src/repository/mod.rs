//! Repository Layer
//!
//! Remote store, image host and session abstractions, with HTTP and SQLite
//! implementations.

mod db;
mod http_store;
mod local_store;
mod traits;

#[cfg(test)]
mod tests;

pub use db::open_db;
pub use http_store::{classify, HttpImageHost, HttpRemoteStore};
pub use local_store::LocalStore;
pub use traits::{ImageHost, RemoteStore, SessionProvider, StaticSession};
