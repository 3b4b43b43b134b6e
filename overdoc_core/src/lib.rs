//! `overdoc_core` is the content transformation and overwrite merge engine of
//! the overdoc documentation toolchain. Base documents are YAML object trees
//! describing API entities. Authors amend them with hand-written markdown
//! addressed by uid instead of by file position.
//!
//! ## Processing Pipeline
//!
//! ```text
//! Base document (### YamlMime:<Type>)
//!   → Codec (YAML text into a ContentNode tree)
//!   → Validation (shape check against the Schema, collects uid definitions)
//!   → Schema processor (render pipeline: file includes, markdown, hrefs, xrefs)
//!   → Cross-reference export
//!
//! Overwrite file / markdown fragment file
//!   → Parser (uid, metadata, body)
//!   → Placeholder substitution (`*content` → body)
//!   → Schema processor (overwrite or fragments pipeline)
//!   → Fold per uid, address with OPath, structural merge
//!   → Re-validation and cross-reference re-export
//! ```
//!
//! ## Modules
//!
//! - [`config`] — Configuration loading from `overdoc.toml`.
//! - [`fragments`] — Markdown fragment parsing, validation, overwrite synthesis and skeleton generation.
//! - [`interpret`] — The schema processor, the built-in interpreters and the preset pipelines.
//! - [`opath`] — Object paths such as `/items[uid="A"]/name`.
//!
//! ## Key Types
//!
//! - [`Engine`] — Loads base documents and applies overwrites and fragments.
//! - [`ContentNode`] — The content tree of a document.
//! - [`Schema`] — The expected shape of content, with content types, merge keys and tags.
//! - [`OPath`] — An address into a schema or content tree.
//! - [`OverwriteDocument`] — Hand-written content for one uid.
//! - [`XrefRecord`] — The cross-reference record of a uid.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use overdoc_core::{CancellationToken, DiskFileLayer, Engine, OverdocConfig, SchemaRegistry, Services};
//! use std::path::Path;
//!
//! let root = Path::new(".");
//! let config = OverdocConfig::load(root).unwrap().unwrap_or_default();
//! let files = DiskFileLayer::new(root);
//! let registry = SchemaRegistry::from_config(&files, &config).unwrap();
//! let engine = Engine::new(config.options(), Services::new(files));
//! let cancel = CancellationToken::new();
//!
//! let mut documents = engine
//!     .load_base_documents(&["api/System.String.yml".to_string()], &registry, &cancel)
//!     .unwrap();
//! let overwrites = engine.load_overwrite_documents("overwrites/string.md").unwrap();
//! engine.apply_overwrites(&mut documents, &overwrites, &cancel).unwrap();
//! ```

pub use codec::*;
pub use config::*;
pub use content::*;
pub use context::*;
pub use diagnostics::*;
pub use document::*;
pub use engine::*;
pub use error::*;
pub use files::*;
pub use interpret::Interpreter;
pub use interpret::Pipelines;
pub use interpret::SchemaProcessor;
pub use markdown_service::*;
pub use merge::*;
pub use opath::OPath;
pub use opath::Segment;
pub use overwrite::*;
pub use placeholder::*;
pub use schema::*;
pub use tokio_util::sync::CancellationToken;
pub use validate::*;
pub use worker::*;
pub use xref::*;

mod codec;
pub mod config;
mod content;
mod context;
mod diagnostics;
mod document;
mod engine;
#[allow(unused_assignments)]
mod error;
mod files;
pub mod fragments;
pub mod interpret;
mod markdown_service;
mod merge;
pub mod opath;
mod overwrite;
mod placeholder;
mod schema;
mod validate;
mod worker;
mod xref;

#[cfg(test)]
mod __fixtures;
