pub mod config;
pub mod frame;
pub mod info;
pub mod stack;
pub mod timestamps;
