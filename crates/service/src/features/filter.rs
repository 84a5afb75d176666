use models::store::query::Op;
use models::{Category, Query};

/// Optional narrowing of a feature listing.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FeatureFilter {
    pub category: Option<Category>,
    pub name_prefix: Option<String>,
}

impl FeatureFilter {
    /// `None` when nothing narrows the listing.
    pub fn to_query(&self) -> Option<Query> {
        let mut query = Query::all();
        if let Some(category) = self.category {
            query = query.eq("properties.category", category.as_str());
        }
        if let Some(prefix) = self.name_prefix.as_deref().map(str::trim).filter(|p| !p.is_empty()) {
            query = query.with("properties.name", Op::Prefix, prefix);
        }
        (!query.is_empty()).then_some(query)
    }
}
