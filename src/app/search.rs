use crate::listing::model::BusinessRecord;
use crate::util::fold_case;

pub const ALL_CATEGORIES: &str = "All";

/// Category selection. `All` is the sentinel for "no category filter".
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CategoryFilter {
    All,
    Exact(String),
}

impl CategoryFilter {
    pub fn label(&self) -> &str {
        match self {
            CategoryFilter::All => ALL_CATEGORIES,
            CategoryFilter::Exact(name) => name,
        }
    }

    /// Case-sensitive on purpose: categories are matched as stored upstream.
    pub fn accepts(&self, record: &BusinessRecord) -> bool {
        match self {
            CategoryFilter::All => true,
            CategoryFilter::Exact(name) => record.kind == *name,
        }
    }
}

/// True when the folded query is a substring of name, description, address or type.
pub fn matches_query(record: &BusinessRecord, query_folded: &str) -> bool {
    if query_folded.is_empty() {
        return true;
    }
    [&record.name, &record.description, &record.address, &record.kind]
        .iter()
        .any(|field| fold_case(field).contains(query_folded))
}

/// Indices into `listing` of the records passing both filters, in listing order.
pub fn filter_indices(
    listing: &[BusinessRecord],
    query: &str,
    category: &CategoryFilter,
) -> Vec<usize> {
    let query = fold_case(query);
    listing
        .iter()
        .enumerate()
        .filter(|(_, r)| category.accepts(r) && matches_query(r, &query))
        .map(|(i, _)| i)
        .collect()
}

/// Quick-search overlay matching: name or description only, nothing for an empty query.
pub fn quick_search_indices(listing: &[BusinessRecord], query: &str) -> Vec<usize> {
    let query = fold_case(query);
    if query.is_empty() {
        return Vec::new();
    }
    listing
        .iter()
        .enumerate()
        .filter(|(_, r)| fold_case(&r.name).contains(&query) || fold_case(&r.description).contains(&query))
        .map(|(i, _)| i)
        .collect()
}
