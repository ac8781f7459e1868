//! Changeset-to-instance adaptation over an ECDb-style catalog.
//!
//! Row-level changes from a transactional log are resolved against the catalog
//! (tables, columns, class maps) and rebuilt into JSON instances tagged with
//! their class, table and operation.

#![warn(missing_docs)]

pub mod adaptor;
pub mod catalog;
pub mod changeset;
pub mod error;
pub mod schema;
pub mod types;

pub use adaptor::{AdaptorOptions, ChangesetAdaptor, FilterConfig};
pub use catalog::{CatalogStore, MapCache, MapCacheStats, QueryParam};
pub use changeset::{ChangeOp, ChangeRecord, ChangeStage, ChangesetReader, RecordedChangeset, RowValues};
pub use error::{AdaptorError, Result};
pub use types::{Id64, SqlValue};
