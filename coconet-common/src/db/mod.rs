//! SQLite persistence adapters

pub mod catalog;
pub mod init;
pub mod links;

pub use catalog::*;
pub use init::*;
pub use links::*;
