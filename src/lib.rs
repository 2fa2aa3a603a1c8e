pub mod algo;
pub mod config;
pub mod error;
pub mod input;
pub mod model;
pub mod ops;
pub mod report;

pub use error::{Result, TextlensError};
