//! Reader module
//!
//! The host-facing surface: a `ReaderSession` per loaded content document
//! and a bounded `SessionStore` for the HTTP service.

mod session;
mod store;

pub use session::{ReaderSession, SessionSnapshot};
pub use store::{SessionStore, SharedSession};
