pub mod aws_config;
pub mod commands;
pub mod ec2;
pub mod error;

pub use error::{Error, Result};
