#![forbid(unsafe_code)]

pub mod app;
pub mod chapters;
pub mod cli;
pub mod config;
pub mod convert;
pub mod ebook;
pub mod error;
pub mod logging;
pub mod tags;
pub mod tools;
