mod env;
mod file;
mod types;
mod util;

pub use types::{GuardConfig, DEFAULT_CONFIG_PATH};

#[cfg(test)]
use util::{parse_bool, split_csv};

#[cfg(test)]
mod tests;
