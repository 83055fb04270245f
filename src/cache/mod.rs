//! Cache module
//!
//! The server keeps rendered pages in a [`PageCache`]; `generate` keeps a
//! [`Manifest`] on disk to skip pages whose HTML did not change.

mod manifest;
mod pages;

pub use manifest::{hash_content, output_path, ChangeSet, Manifest, ManifestEntry, CACHE_DIR};
pub use pages::{CachedPage, Lookup, Outcome, PageCache, RouteState};
