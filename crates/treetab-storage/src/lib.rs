//! treetab-storage - Storage library for treetab
//!
//! This crate provides the file system implementation of the sink opener.

mod file_sinks;

pub use file_sinks::FileSystemSinks;
