#![allow(dead_code)]

pub mod authority;
pub mod builders;

pub use authority::{FakeAuthority, Reply};
pub use builders::PolicyBuilder;

use std::path::PathBuf;

/// Path of a file under `testdata/`.
pub fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("testdata")
        .join(name)
}
