pub mod xxhash;

pub use xxhash::files_identical;
