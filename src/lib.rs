//! # Folio
//!
//! A page reflow engine for document templates.
//!
//! A contract template is a flowing tree of paragraphs, tables and inline
//! runs. Folio cuts it into pages of a fixed height budget, and keeps those
//! pages correct while the user fills in variables: a field that grows
//! pushes words onto the next page, a field that shrinks pulls them back.
//!
//! **Nothing is ever lost or reordered.** Text breaks only between words,
//! tables and headings never break, and a container cut across a page
//! boundary leaves a shallow mirror on each side, tied together by a split
//! watermark so the halves can be merged again.
//!
//! ## Architecture
//!
//! ```text
//! Input (JSON Document)
//!       ↓
//!   [template]: Fill in ${variables} and data-variable bindings
//!       ↓
//!   [model]:    Node tree, copied into an arena
//!       ↓
//!   [estimate]: Height of every token and unbreakable node
//!       ↓
//!   [layout]:   Full pass into pages, then forward/backward reflow
//!       ↓
//!   RenderedPage[] (JSON)
//! ```

pub mod error;
pub mod estimate;
pub mod layout;
pub mod model;
pub mod template;

#[cfg(feature = "wasm")]
pub mod wasm;

pub use error::{PaginateError, Result};
pub use estimate::{CharCountEstimator, HeightEstimator, HeuristicEstimator, MeasuredEstimator};
pub use layout::{Page, PageSet, PageSetBuilder, RenderedPage};
pub use model::{Document, Node, NodeKind, PageConfig};
pub use template::{extract_variables, substitute, Variable, VariableType};

/// Paginate a document.
///
/// This is the primary entry point. Variable values carried by the
/// document are filled in first, then the tree is laid out with the
/// heuristic estimator configured from `document.page`.
pub fn paginate(document: &Document) -> Result<PageSet> {
    let root = if document.variables.is_empty() {
        document.root.clone()
    } else {
        substitute(&document.root, &document.variables)
    };
    PageSetBuilder::new(document.page).build(&root)
}

/// Paginate a document described as JSON, returning the rendered pages.
pub fn paginate_json(json: &str) -> Result<Vec<RenderedPage>> {
    let document: Document = serde_json::from_str(json)?;
    Ok(paginate(&document)?.render())
}
