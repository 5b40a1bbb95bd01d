pub mod config;
pub mod coordinator;
pub mod core;
pub mod error;
pub mod log;
pub mod schemas;
pub mod store;
pub mod tmux;
pub mod worker;

pub use error::{Error, Result};
pub use store::FileStore;
