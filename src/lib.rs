//! Headless show/hide disclosure controllers for test-report pages.
//!
//! A [`Page`] parses report markup into an in-memory DOM, attaches behaviours
//! through an explicit [`BehaviorRegistry`], and drives the lazy-disclosure
//! pattern: a show control reveals a collapsed region and loads its content
//! from a (mocked) endpoint, a hide control collapses it again.
//!
//! ```
//! use lazy_disclosure::{Page, Result};
//!
//! fn main() -> Result<()> {
//!     let html = r#"
//!         <div id="r1" style="display: none"></div>
//!         <a id="r1-showlink" data-query="/report?id=42">show</a>
//!         <a id="r1-hidelink" style="display: none">hide</a>
//!     "#;
//!     let mut page = Page::from_html(html)?;
//!     page.set_fetch_mock("/report?id=42", "<div>ok</div>");
//!     page.click("#r1-showlink")?;
//!     page.flush()?;
//!     page.assert_inner_html("#r1", "<div>ok</div>")?;
//!     Ok(())
//! }
//! ```

use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt;
use std::rc::Rc;

mod behavior;
mod config;
mod disclosure;
mod dom;
mod dom_utils;
mod fetch;
mod html;
mod id_pattern;
mod page;
mod selector;
mod trace;

#[cfg(test)]
mod tests;

pub use behavior::{BehaviorRegistry, ElementPredicate, Initializer};
pub use config::{DisclosureConfig, ResponseOrdering, SiblingPolicy};
pub use disclosure::{ControllerKind, DisclosureBinding, DisclosureState};
pub use fetch::{FetchId, FetchResponse, PendingFetch};
pub use page::{ClickHandler, Page};

pub(crate) use dom_utils::*;
pub(crate) use fetch::*;
pub(crate) use html::*;
pub(crate) use id_pattern::*;
pub(crate) use page::ClickAction;
pub(crate) use selector::*;
pub(crate) use trace::*;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("html parse error: {0}")]
    HtmlParse(String),
    #[error("unsupported selector: {0}")]
    UnsupportedSelector(String),
    #[error("invalid id pattern {pattern}: {message}")]
    InvalidIdPattern { pattern: String, message: String },
    #[error("{0} is not an element")]
    NotAnElement(NodeId),
    #[error("selector not found: {0}")]
    SelectorNotFound(String),
    #[error("element not found: #{id}")]
    MissingElement { id: String },
    #[error("element #{id} has no {name} attribute")]
    MissingAttribute { id: String, name: String },
    #[error("unknown fetch request: {0}")]
    UnknownFetch(FetchId),
    #[error("fetch step limit exceeded: {limit}")]
    StepLimitExceeded { limit: usize },
    #[error("invalid config: {0}")]
    InvalidConfig(String),
    #[error(
        "assertion failed for {selector}: expected {expected}, actual {actual}, snippet {dom_snippet}"
    )]
    AssertionFailed {
        selector: String,
        expected: String,
        actual: String,
        dom_snippet: String,
    },
}

/// Handle to a node in a [`Page`]'s DOM.
///
/// Handles stay valid for the life of the page. A node removed from the
/// document keeps its handle but is no longer connected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node#{}", self.0)
    }
}

#[derive(Debug, Clone)]
pub(crate) enum NodeType {
    Document,
    Element(Element),
    Text(String),
}

#[derive(Debug, Clone)]
pub(crate) struct Node {
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
    pub(crate) node_type: NodeType,
}

#[derive(Debug, Clone)]
pub(crate) struct Element {
    pub(crate) tag_name: String,
    pub(crate) attrs: HashMap<String, String>,
}

#[derive(Debug, Clone)]
pub(crate) struct Dom {
    pub(crate) nodes: Vec<Node>,
    pub(crate) root: NodeId,
    pub(crate) id_index: HashMap<String, Vec<NodeId>>,
}
