pub mod buffer;
pub mod cli;
pub mod config;
pub mod content;
pub mod error;
pub mod exec;
pub mod geometry;
pub mod host;
pub mod input;
pub mod layout;
pub mod logging;
pub mod nag;
pub mod negotiate;
pub mod render;
pub mod runner;
#[cfg(any(test, feature = "testkit"))]
pub mod testkit;
pub mod text;

pub use error::Error;
pub use nag::{Nagbar, Outcome};
