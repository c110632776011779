pub mod clone;
pub mod commands;
pub mod doctor;
pub mod error;
pub mod fs_utils;
pub mod git_config;
pub mod launch;
pub mod logging;
pub mod lookup;
pub mod paths;
pub mod profiles;
pub mod prompt;
pub mod runner;
pub mod services;
pub mod ssh;
pub mod ui;

#[cfg(test)]
pub mod test_utils;
