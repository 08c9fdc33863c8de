//! High-level API for the taiga data store.
//!
//! A [`Repository`] assembles the typed stores, the watch state and the
//! lock manager over a backend; a [`Store`] is a cheap view over a
//! repository plus a position: a branch name, or a detached commit.
//! Applications bind [`Contents`] to [`Path`]s, fork branches, commit,
//! and merge divergent branches with the contents' own three-way
//! combinators.
//!
//! ```
//! use taiga_sdk::{Repository, Store};
//! use taiga_objects::{Text, UnitMetadata};
//! use taiga_types::{Config, Path, Task};
//!
//! let repo: Repository<Text, UnitMetadata> =
//!     Repository::open(Config::new()).unwrap();
//! let store = Store::master(&repo);
//!
//! let task = Task::new(0, "example", 0).with_message("first write");
//! store
//!     .set(&task, &Path::parse("/a/b").unwrap(), Text::new("hi"), None)
//!     .unwrap();
//! assert_eq!(
//!     store.get(&Path::parse("/a/b").unwrap()).unwrap(),
//!     Text::new("hi")
//! );
//! ```

pub mod error;
pub mod repository;
pub mod store;

pub use error::{SdkError, SdkResult};
pub use repository::Repository;
pub use store::{Status, Store};

pub use taiga_objects::{Contents, Counter, Metadata, Slice, Text, UnitMetadata};
pub use taiga_types::{Branch, Config, ObjectId, Path, Step, Task};
