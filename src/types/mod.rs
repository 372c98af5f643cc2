pub mod errors;
pub mod world;
