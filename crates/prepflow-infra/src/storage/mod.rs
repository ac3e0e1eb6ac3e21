//! File storage backends.

pub mod filesystem;
