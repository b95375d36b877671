//! CLI command implementations

pub mod cache;
pub mod get;
pub mod ls;
pub mod mkdir;
pub mod mv;
pub mod put;
pub mod retry;
pub mod rm;
pub mod status;
