//! # Weft
//!
//! Load related entities without N+1 fetches.
//!
//! Weft provides:
//! - Eager loading of whole navigation trees (`Posts.Author`, `Posts.Tags`)
//!   with one batched fetch per tree node
//! - An identity map, so every `(type, key)` is one in-memory instance
//! - Explicit loading of a single navigation after the fact
//! - Read-through navigation queries (filter, order, count) that never mark
//!   the navigation as loaded
//!
//! Storage stays outside: implement [`BatchFetcher`](prelude::BatchFetcher)
//! for your store, or use the bundled `InMemoryStore`.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use weft::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), LoadError> {
//!     let mut ctx = LoadContext::new(blogging_schema()?, store);
//!     let blogs = ctx.attach_all("Blog", store_roots)?;
//!
//!     let tree = ctx
//!         .include("Blog")
//!         .include("Posts")
//!         .then_include("Author")
//!         .include("Posts")
//!         .then_include("Tags")
//!         .build()?;
//!
//!     let stats = ctx.resolve(&blogs, &tree).await?;
//!     assert_eq!(stats.fetches, 3);
//!     Ok(())
//! }
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

/// The loader engine.
pub mod engine {
    pub use weft_core::*;
}

/// Logging setup.
pub use weft_core::logging;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use weft_core::prelude::*;
    pub use weft_core::{CancellationToken, GraphResolver, load_collection, load_reference, query_collection};
}

// Re-export key types at the crate root
pub use weft_core::{LoadContext, LoadError, LoadResult, Schema};
