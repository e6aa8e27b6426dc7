//! Obtree implement a concurrent, in-memory ordered index from
//! `u64` keys to opaque values.
//!
//! The index is a fixed-fanout B+tree. Readers never lock: every node
//! carries a 64-bit version word and lookups validate a snapshot of it
//! around each step of the descent, chasing sibling links or restarting
//! from the root when a structural change slips in underneath. Writers
//! lock a single leaf for plain inserts; splits and rebalances take an
//! additional structural-modification lock and climb the tree
//! level-by-level, bottom-up.
//!
//! Entries inside a node never move once written. A node's sort order
//! lives in a single 64-bit permutation word, and publishing that word
//! is what makes an insert visible to concurrent readers.
//!
//! **Possible ways to configure [Index]**:
//!
//! *spin*, relevant only in multi-threaded context. Constructing with
//! `spin` as true will have a writer thread spin while waiting to
//! acquire a node lock, constructing with false will have the thread
//! yield to the OS scheduler while waiting.
//!
//! Deletes are available behind `&mut self`, refer to
//! [Index::remove][btree::Index::remove].

use std::{error, fmt, result};

/// Short form to compose Error values.
///
/// Here are few possible ways:
///
/// ```ignore
/// use crate::Error;
/// err_at!(Fatal, msg: "outlier key {}", key)
/// ```
///
/// ```ignore
/// use crate::Error;
/// err_at!(FailConvert, usize::try_from(value))
/// ```
///
#[macro_export]
macro_rules! err_at {
    ($v:ident, msg: $($arg:expr),+) => {{
        let prefix = format!("{}:{}", file!(), line!());
        Err(Error::$v(prefix, format!($($arg),+)))
    }};
    ($v:ident, $e:expr) => {{
        match $e {
            Ok(val) => Ok(val),
            Err(err) => {
                let prefix = format!("{}:{}", file!(), line!());
                Err(Error::$v(prefix, format!("{}", err)))
            }
        }
    }};
    ($v:ident, $e:expr, $($arg:expr),+) => {{
        match $e {
            Ok(val) => Ok(val),
            Err(err) => {
                let prefix = format!("{}:{}", file!(), line!());
                let msg = format!($($arg),+);
                Err(Error::$v(prefix, format!("{} {}", err, msg)))
            }
        }
    }};
}

pub mod btree;

pub use crate::btree::{Depth, Index, Stats};

/// Type alias for Result return type, used by this package.
pub type Result<T> = result::Result<T, Error>;

/// Error variants that can be returned by this package's API.
///
/// Each variant carries a prefix, typically identifying the
/// error location.
#[derive(Clone, Debug, PartialEq)]
pub enum Error {
    Fatal(String, String),
    FailConvert(String, String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> result::Result<(), fmt::Error> {
        use Error::*;

        match self {
            Fatal(p, msg) => write!(f, "{} Fatal: {}", p, msg),
            FailConvert(p, msg) => write!(f, "{} FailConvert: {}", p, msg),
        }
    }
}

impl error::Error for Error {}

/// Convert rust-native value to json encoded string.
pub trait ToJson {
    /// Call this method to get the json encoded string.
    fn to_json(&self) -> String;
}
