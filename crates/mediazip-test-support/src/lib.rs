#![forbid(unsafe_code)]
#![warn(missing_docs, clippy::all, clippy::pedantic)]

//! Shared fixtures for mediazip tests.

pub mod fixtures;

pub use fixtures::MediaLibraryFixture;
