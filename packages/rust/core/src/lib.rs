//! Core docset build logic for docsetkit.
//!
//! This crate ties together layout, search indexing, the landing page,
//! archiving and local install into the end-to-end `build` workflow
//! ([`pipeline::build_docset`]).

pub mod feed;
pub mod indexer;
pub mod install;
pub mod landing;
pub mod layout;
pub mod markup;
pub mod pipeline;
pub mod render;
