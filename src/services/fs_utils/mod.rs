pub mod file_utils;
pub mod path_utils;

pub use file_utils::{dir_size, format_size, move_dir_cross_device, remove_dir_if_present};

#[cfg(test)]
#[path = "tests/file_utils_tests.rs"]
mod file_utils_tests;

#[cfg(test)]
#[path = "tests/path_utils_tests.rs"]
mod path_utils_tests;
