use std::fmt::Display;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceQueryFilter {
    pub category_id: Option<i64>,
    /// Only list services that can currently be ordered
    pub active_only: Option<bool>,
    pub search: Option<String>,
}

impl ServiceQueryFilter {
    pub fn with_category(mut self, category_id: i64) -> Self {
        self.category_id = Some(category_id);
        self
    }

    pub fn active_only(mut self) -> Self {
        self.active_only = Some(true);
        self
    }

    pub fn with_search<S: Into<String>>(mut self, search: S) -> Self {
        self.search = Some(search.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.category_id.is_none() && !self.active_only.unwrap_or(false) && self.search.is_none()
    }
}

impl Display for ServiceQueryFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_empty() {
            return write!(f, "No filters.");
        }
        if let Some(id) = self.category_id {
            write!(f, "category: {id}. ")?;
        }
        if self.active_only.unwrap_or(false) {
            write!(f, "active only. ")?;
        }
        if let Some(search) = &self.search {
            write!(f, "search: {search}. ")?;
        }
        Ok(())
    }
}
