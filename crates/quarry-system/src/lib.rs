//! The repository system facade: one entry point tying the dependency graph
//! engine and the HTTP transporter together, plus the on-disk local
//! repository artifacts are resolved into.

pub mod download;
pub mod local;
pub mod progress;
pub mod system;
