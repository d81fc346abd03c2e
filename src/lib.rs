/*!
 *! # LiteDB in Rust
 *! This is a reimplementation of [LiteDB] in Rust.
 *!
 *! This implementation only supports synchronous, single-process (or, with
 *! the `shared-mutex` feature, cooperating-process) operation: there is no
 *! cooperative scheduler and no implicit asynchrony in the storage engine.
 *!
 *! [LiteDB]: https://www.litedb.org/
 */

#![allow(dead_code)]
#![allow(clippy::too_many_arguments)]

use crate::bson::Value;
use crate::engine::{BasePage, PageType};
use std::fmt::Display;

#[macro_use]
pub mod bson;
pub mod engine;
#[cfg(windows)]
mod shared_mutex;
mod utils;

pub type Result<T> = std::result::Result<T, Error>;

/// The closed set of error kinds the engine can report (see the crate's
/// error-handling design: I/O, catalog, index, transaction-lifecycle, and
/// timeout failures each get their own kind so callers can match on them
/// instead of parsing messages).
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ErrorKind {
    #[error("I/O error")]
    IOError,
    #[error("corrupted page")]
    CorruptedPage,
    #[error("wrong password")]
    WrongPassword,
    #[error("unsupported file format version")]
    UnsupportedVersion,
    #[error("database is read-only")]
    ReadOnly,
    #[error("collection does not exist")]
    NoCollection,
    #[error("index does not exist")]
    NoIndex,
    #[error("index already exists")]
    IndexAlreadyExists,
    #[error("collection already has the maximum number of indexes")]
    TooManyIndexes,
    #[error("cannot drop the primary key index")]
    CannotDropPrimaryKey,
    #[error("duplicate key")]
    DuplicateKey,
    #[error("index key too large")]
    IndexKeyTooLarge,
    #[error("document too large")]
    DocumentTooLarge,
    #[error("transaction was started on a different thread")]
    WrongThread,
    #[error("no active transaction")]
    NoTransaction,
    #[error("a transaction is already active")]
    AlreadyInTrans,
    #[error("transaction exceeded its memory budget")]
    TransactionLimit,
    #[error("operation timed out")]
    Timeout,
    #[error("invalid name")]
    InvalidName,
    #[error("invalid data")]
    Other,
}

/// An engine error: a closed [`ErrorKind`] plus a human-readable message.
///
/// Matching on `.kind()` is the supported way for embedders to branch on
/// failure (e.g. retry on `Timeout`, surface `DuplicateKey` to the user);
/// the message text is for logs/diagnostics only and is not part of the
/// stability contract.
#[derive(Debug)]
pub struct Error {
    kind: ErrorKind,
    message: String,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub(crate) fn of(kind: ErrorKind, message: impl Display) -> Self {
        Error {
            kind,
            message: message.to_string(),
        }
    }

    pub(crate) fn invalid_database() -> Error {
        Error::of(ErrorKind::CorruptedPage, "Invalid database file")
    }

    pub(crate) fn invalid_page() -> Error {
        Error::of(ErrorKind::CorruptedPage, "Invalid database file")
    }

    pub(crate) fn datetime_overflow() -> Self {
        Self::of(ErrorKind::Other, "DateTime overflow")
    }

    pub(crate) fn encrypted_no_password() -> Self {
        Self::of(ErrorKind::WrongPassword, "Encrypted database without password")
    }

    pub(crate) fn collation_not_match() -> Error {
        Error::of(ErrorKind::UnsupportedVersion, "Collation not match")
    }

    pub(crate) fn invalid_page_type(expected: PageType, page: BasePage) -> Error {
        Error::of(
            ErrorKind::CorruptedPage,
            format!(
                "Invalid page type: expected {:?}, got {:?}",
                expected,
                page.page_type()
            ),
        )
    }

    pub(crate) fn collection_index_limit_reached() -> Error {
        Error::of(ErrorKind::TooManyIndexes, "Collection index limit reached")
    }

    pub(crate) fn name_length_header_space(name: &str) -> Error {
        Error::of(
            ErrorKind::InvalidName,
            format!("Name length exceeds available header space: {}", name),
        )
    }

    pub(crate) fn invalid_collection_name(name: &str) -> Error {
        Error::of(ErrorKind::InvalidName, format!("Invalid collection name: {}", name))
    }

    pub(crate) fn no_free_space_page(page_id: u32, available: usize, need: usize) -> Error {
        Error::of(
            ErrorKind::CorruptedPage,
            format!(
                "No free space in page: {} (available: {}, need: {})",
                page_id, available, need
            ),
        )
    }

    pub(crate) fn invalid_bson() -> Error {
        Error::of(ErrorKind::CorruptedPage, "Invalid BSON")
    }

    pub(crate) fn size_limit_reached() -> Self {
        Self::of(ErrorKind::ReadOnly, "Size limit reached")
    }

    pub(crate) fn transaction_limit() -> Error {
        Self::of(
            ErrorKind::TransactionLimit,
            "Transaction exceeded its maximum dirty-page budget",
        )
    }

    pub(crate) fn invalid_index_key(message: &str) -> Error {
        Error::of(ErrorKind::IndexKeyTooLarge, format!("Invalid index key: {}", message))
    }

    pub(crate) fn index_duplicate_key(index: &str, key: &Value) -> Error {
        Error::of(
            ErrorKind::DuplicateKey,
            format!("Duplicate key in index {index}: {key:?}"),
        )
    }

    pub(crate) fn already_exists_collection_name(name: &str) -> Error {
        Error::of(ErrorKind::InvalidName, format!("Already exists collection name: {}", name))
    }

    pub(crate) fn document_size_exceed_limit() -> Self {
        Error::of(ErrorKind::DocumentTooLarge, "DocumentSize exceed limit")
    }

    pub(crate) fn index_already_exists(name: &str) -> Error {
        Error::of(ErrorKind::IndexAlreadyExists, format!("Index already exists: {}", name))
    }

    pub(crate) fn drop_id_index() -> Error {
        Error::of(ErrorKind::CannotDropPrimaryKey, "Cannot drop the `_id` index")
    }

    pub(crate) fn bad_auto_id(auto_id: impl Display, collection: &str, last_id: impl Display) -> Error {
        Error::of(
            ErrorKind::Other,
            format!(
                "Cannot use auto-id {auto_id} in collection `{collection}`: last _id was {last_id}"
            ),
        )
    }

    pub(crate) fn invalid_data_type(field: &str, value: &Value) -> Error {
        Error::of(
            ErrorKind::Other,
            format!("Invalid value for field `{field}`: {value:?}"),
        )
    }

    pub(crate) fn wrong_thread() -> Error {
        Error::of(ErrorKind::WrongThread, "Transaction accessed from a different thread")
    }

    pub(crate) fn no_transaction() -> Error {
        Error::of(ErrorKind::NoTransaction, "No active transaction")
    }

    pub(crate) fn already_in_trans() -> Error {
        Error::of(ErrorKind::AlreadyInTrans, "A transaction is already active on this thread")
    }

    pub(crate) fn timeout() -> Error {
        Error::of(ErrorKind::Timeout, "Timed out waiting for a lock")
    }

    pub(crate) fn no_collection(name: &str) -> Error {
        Error::of(ErrorKind::NoCollection, format!("Collection `{name}` does not exist"))
    }

    pub(crate) fn no_index(name: &str) -> Error {
        Error::of(ErrorKind::NoIndex, format!("Index `{name}` does not exist"))
    }

    pub(crate) fn wrong_password() -> Error {
        Error::of(ErrorKind::WrongPassword, "Wrong password")
    }

    pub(crate) fn unsupported_version(version: u8) -> Error {
        Error::of(ErrorKind::UnsupportedVersion, format!("Unsupported file format version {version}"))
    }

    pub(crate) fn read_only() -> Error {
        Error::of(ErrorKind::ReadOnly, "Database was opened read-only")
    }
}

impl Error {
    pub fn err(message: impl Display) -> Self {
        Error {
            kind: ErrorKind::Other,
            message: message.to_string(),
        }
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error {
            kind: ErrorKind::IOError,
            message: err.to_string(),
        }
    }
}

impl From<bson::ParseError> for Error {
    fn from(err: bson::ParseError) -> Self {
        Error {
            kind: ErrorKind::CorruptedPage,
            message: err.to_string(),
        }
    }
}

impl From<std::string::FromUtf8Error> for Error {
    fn from(err: std::string::FromUtf8Error) -> Self {
        Self::err(err)
    }
}
