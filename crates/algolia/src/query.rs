//! Query building.
//!
//! Algolia takes a plain full-text query, so a filter tree is flattened to
//! its leaf values joined by spaces. Field names and connectors are not
//! expressible at this layer and are ignored.

use crate::backend::{
    AlgoliaSearchBackend, DefaultResultFactory, ResultFactory, SearchOptions, SearchResponse,
    SearchResult,
};
use crate::error::BackendResult;
use crate::model::ModelId;

/// Token matching every document.
pub const MATCH_ALL: &str = "*";

/// How the children of a filter group combine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Connector {
    /// All children must match.
    #[default]
    And,
    /// Any child may match.
    Or,
}

/// A node of a filter tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterNode {
    /// A single `field: value` filter.
    Leaf {
        /// Field the filter was written against.
        field: String,
        /// Literal value to match.
        value: String,
    },
    /// A group of child filters.
    Group {
        /// How the children combine.
        connector: Connector,
        /// Child filters, in order.
        children: Vec<FilterNode>,
    },
}

impl FilterNode {
    /// Creates a leaf filter.
    pub fn leaf(field: impl Into<String>, value: impl Into<String>) -> Self {
        FilterNode::Leaf {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Creates an empty group.
    pub fn group(connector: Connector) -> Self {
        FilterNode::Group {
            connector,
            children: Vec::new(),
        }
    }

    /// Returns true if the tree has no leaf.
    pub fn is_empty(&self) -> bool {
        match self {
            FilterNode::Leaf { .. } => false,
            FilterNode::Group { children, .. } => children.iter().all(FilterNode::is_empty),
        }
    }

    fn collect_values<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            FilterNode::Leaf { value, .. } => out.push(value),
            FilterNode::Group { children, .. } => {
                for child in children {
                    child.collect_values(out);
                }
            }
        }
    }
}

/// Flattens `filter` into a query string.
///
/// An empty tree yields [`MATCH_ALL`].
pub fn build_query(filter: &FilterNode) -> String {
    let mut values = Vec::new();
    filter.collect_values(&mut values);
    if values.is_empty() {
        return MATCH_ALL.to_string();
    }
    values.join(" ")
}

/// A search being assembled: filters, result window and target model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlgoliaSearchQuery {
    filter: FilterNode,
    options: SearchOptions,
}

impl Default for AlgoliaSearchQuery {
    fn default() -> Self {
        Self {
            filter: FilterNode::group(Connector::And),
            options: SearchOptions::default(),
        }
    }
}

impl AlgoliaSearchQuery {
    /// Creates an empty query matching everything.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a `field: value` filter to the root group.
    pub fn add_filter(&mut self, field: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.add_node(FilterNode::leaf(field, value))
    }

    /// Adds a filter subtree to the root group.
    pub fn add_node(&mut self, node: FilterNode) -> &mut Self {
        if let FilterNode::Group { children, .. } = &mut self.filter {
            children.push(node);
        }
        self
    }

    /// Restricts the search to `model`.
    pub fn add_model(&mut self, model: ModelId) -> &mut Self {
        if !self.options.models.contains(&model) {
            self.options.models.push(model);
        }
        self
    }

    /// Sets the result window.
    pub fn set_limits(&mut self, start_offset: usize, end_offset: usize) -> &mut Self {
        self.options.start_offset = start_offset;
        self.options.end_offset = end_offset;
        self
    }

    /// The root filter group.
    pub fn filter(&self) -> &FilterNode {
        &self.filter
    }

    /// The search options this query runs with.
    pub fn options(&self) -> &SearchOptions {
        &self.options
    }

    /// Returns the query string sent to the service.
    pub fn build_query(&self) -> String {
        build_query(&self.filter)
    }

    /// Runs the query on `backend`.
    pub async fn run(
        &self,
        backend: &AlgoliaSearchBackend,
    ) -> BackendResult<SearchResponse<SearchResult>> {
        self.run_with(backend, &DefaultResultFactory).await
    }

    /// Runs the query on `backend`, building results with `factory`.
    pub async fn run_with<F: ResultFactory>(
        &self,
        backend: &AlgoliaSearchBackend,
        factory: &F,
    ) -> BackendResult<SearchResponse<F::Output>> {
        backend
            .search_with(&self.build_query(), &self.options, factory)
            .await
    }
}
