pub mod archive;
pub mod config;
pub mod core;
pub mod fs_utils;
pub mod server;
pub mod world;
