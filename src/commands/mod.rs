pub mod check;
pub mod daemon;
pub mod run;
pub mod scan;
pub mod settings;
pub mod stats;
pub mod utils;
pub mod version;

#[cfg(test)]
#[path = "../commands_test.rs"]
mod commands_test;
