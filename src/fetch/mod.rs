//! Bridge between declarative XML query documents and [`QueryTree`].
//!
//! `parse_document` and `render_document` are inverses over the grammar
//! the evaluator supports: parsing a rendered tree gives the tree back,
//! and rendering a parsed document reproduces the document in canonical
//! form.
//!
//! [`QueryTree`]: crate::query::QueryTree

pub mod parse;
pub mod render;

pub use parse::parse_document;
pub use render::render_document;
