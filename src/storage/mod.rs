//! Document persistence.
//!
//! [`DocumentStore`] is the capability the pipeline depends on: insert a
//! document into a named collection and get back the id the store assigned.
//! [`JsonStore`] is the embedded implementation, a single JSON file laid out
//! as collections of numbered documents:
//!
//! ```text
//! {
//!   "apnews_com":  { "1": { "infos": {..}, "extracted_at": ".." } },
//!   "www_npr_org": { "1": {..}, "2": {..} }
//! }
//! ```

pub mod json_store;

use crate::error::Result;
use crate::models::Document;

pub use json_store::JsonStore;

/// Store-assigned document identifier, unique and increasing per collection.
pub type DocId = u64;

/// Collection used until another one is selected.
pub const DEFAULT_COLLECTION: &str = "_default";

/// Trait for document storage backends.
pub trait DocumentStore {
    /// Append `document` to `collection`, creating the collection on first
    /// use, and return its id.
    async fn insert_into(&mut self, collection: &str, document: Document) -> Result<DocId>;
}
