//! vlt - labeled secrets in a local SQLite vault
//!
//! Secrets are opaque payloads with a display name and any number of
//! free-form labels. Searches take shell-style glob patterns over labels and
//! names and return one aggregate per secret with its labels in order.

pub mod aggregate;
pub mod cancel;
pub mod error;
pub mod query;
pub mod schema;
pub mod store;

pub use aggregate::{LabeledSecret, LabeledSecrets};
pub use error::{Entity, Precondition, StoreError};
pub use query::Column;
pub use store::{Executor, Store};
