//! Category catalog with an explicitly owned label lookup cache.

use doc_model::{Category, DataAttribute};
use std::collections::HashMap;

/// Categories available to the current task.
///
/// Label lookups are memoized; [`CategoryCatalog::replace`] invalidates the
/// memo so stale entries never outlive a catalog change.
#[derive(Debug, Default, Clone)]
pub struct CategoryCatalog {
    categories: Vec<Category>,
    label_cache: HashMap<String, Option<usize>>,
}

impl CategoryCatalog {
    pub fn new(categories: Vec<Category>) -> Self {
        Self { categories, label_cache: HashMap::new() }
    }

    pub fn replace(&mut self, categories: Vec<Category>) {
        self.categories = categories;
        self.invalidate();
    }

    pub fn invalidate(&mut self) {
        self.label_cache.clear();
    }

    pub fn len(&self) -> usize {
        self.categories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Category> {
        self.categories.iter().find(|category| category.id == id)
    }

    /// Case-insensitive lookup by display name.
    pub fn by_label(&mut self, label: &str) -> Option<&Category> {
        let key = label.to_lowercase();
        let index = match self.label_cache.get(&key) {
            Some(cached) => *cached,
            None => {
                let found = self
                    .categories
                    .iter()
                    .position(|category| category.name.to_lowercase() == key);
                self.label_cache.insert(key, found);
                found
            }
        };

        index.and_then(|index| self.categories.get(index))
    }

    pub fn cached_labels(&self) -> usize {
        self.label_cache.len()
    }

    /// Empty data attributes for a category, or none when it is unknown.
    pub fn data_template(&self, id: &str) -> Vec<DataAttribute> {
        self.get(id).map(Category::data_template).unwrap_or_default()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Category> {
        self.categories.iter()
    }
}
