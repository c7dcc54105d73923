//! On-demand specification enrichment.
//!
//! When a stored specification is missing or too short and the user has
//! referenced that product by name, fetch richer text from the web-search
//! collaborator. The enriched text lives only on the per-turn product
//! clone — it is never written back to the catalog. Search failure of any
//! kind leaves the specification unchanged; enrichment can never fail the
//! overall response.

use std::sync::Arc;

use tracing::{debug, warn};

use super::truncate_chars;
use crate::catalog::Product;
use crate::error::SearchError;
use crate::search::WebSearch;

/// Specifications shorter than this are considered too thin to answer
/// spec questions from.
pub const MIN_SPEC_CHARS: usize = 50;

/// Each search hit body is cut to this many characters before merging.
const SNIPPET_CHARS: usize = 200;

/// Fixed qualifier terms appended to the product name in the query.
const QUERY_QUALIFIERS: &str = "especificações técnicas características";

/// Separator between merged snippets.
const SNIPPET_SEPARATOR: &str = " | ";

/// Web-search-backed specification enricher.
pub struct SpecEnricher {
    search: Arc<dyn WebSearch>,
    max_results: usize,
}

impl SpecEnricher {
    pub fn new(search: Arc<dyn WebSearch>, max_results: usize) -> Self {
        Self {
            search,
            max_results,
        }
    }

    /// Whether this product's specification should be enriched for the
    /// given (already lower-cased) user message.
    pub fn needs_enrichment(product: &Product, lower_text: &str) -> bool {
        product.specs.chars().count() < MIN_SPEC_CHARS
            && lower_text.contains(&product.name.to_lowercase())
    }

    /// Enrich the specifications of all products mentioned in `text`.
    pub async fn enrich(&self, products: &mut [Product], text: &str) {
        let lower = text.to_lowercase();
        for product in products.iter_mut() {
            if !Self::needs_enrichment(product, &lower) {
                continue;
            }
            match self.lookup(&product.name).await {
                Ok(specs) => {
                    debug!(product = %product.name, "Specification enriched from web search");
                    product.specs = specs;
                }
                Err(e) => {
                    warn!(product = %product.name, error = %e, "Spec search failed, keeping stored text");
                }
            }
        }
    }

    async fn lookup(&self, product_name: &str) -> Result<String, SearchError> {
        let query = format!("{product_name} {QUERY_QUALIFIERS}");
        let hits = self.search.search(&query, self.max_results).await?;
        Ok(hits
            .iter()
            .map(|hit| truncate_chars(&hit.body, SNIPPET_CHARS))
            .collect::<Vec<_>>()
            .join(SNIPPET_SEPARATOR))
    }
}
