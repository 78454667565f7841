//! HTTP artifact transporter: `peek`/`get`/`put` against remote
//! repositories, with resumable downloads, WebDAV collection creation,
//! pooled connections shared across a session, cached authentication state,
//! and cancellation-safe progress reporting.

pub mod auth;
pub mod checksum;
pub mod error;
pub mod http;
pub mod state;
pub mod task;
pub mod uri;
