#![forbid(unsafe_code)]

pub mod bank;
pub mod repository;
pub mod sqlite;

pub use bank::{BankError, QuestionSource};
pub use repository::{Storage, StorageError};
