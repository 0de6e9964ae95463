pub mod cache;
pub mod color;
pub mod config;
pub mod consts;
pub mod error;
pub mod frame;
pub mod io;
pub mod quality;
pub mod session;
pub mod stack;

pub use config::SessionConfig;
pub use error::{Result, SerError};
pub use session::Session;
