// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use std::collections::BTreeMap;
use std::fmt;

use crate::{CategoryId, SortState};

pub const SORT_FIELD: &str = "sort";
pub const CATEGORY_FIELD: &str = "categoryId";

/// Listing a filter form belongs to. Part of every [`QueryKey`], so two
/// listings with identical fields never share cached pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ListNamespace {
    CategoryProducts,
    ProviderProducts,
}

impl ListNamespace {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::CategoryProducts => "products/category",
            Self::ProviderProducts => "products/provider",
        }
    }
}

/// Fingerprint of a filter form. Equal iff namespace and every field are equal.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct QueryKey {
    namespace: ListNamespace,
    fields: BTreeMap<String, String>,
}

impl QueryKey {
    pub const fn namespace(&self) -> ListNamespace {
        self.namespace
    }

    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.namespace.as_str())?;
        for (name, value) in &self.fields {
            write!(f, " {name}={value:?}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterForm {
    namespace: ListNamespace,
    values: BTreeMap<String, String>,
}

impl FilterForm {
    pub fn new(namespace: ListNamespace) -> Self {
        Self {
            namespace,
            values: BTreeMap::new(),
        }
    }

    pub fn category_products(category_id: CategoryId, sort: SortState) -> Self {
        let mut form = Self::new(ListNamespace::CategoryProducts);
        form.set(CATEGORY_FIELD, category_id.to_string());
        form.set_sort(sort);
        form
    }

    pub fn provider_products(sort: SortState) -> Self {
        let mut form = Self::new(ListNamespace::ProviderProducts);
        form.set_sort(sort);
        form
    }

    pub const fn namespace(&self) -> ListNamespace {
        self.namespace
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.values.get(field).map(String::as_str)
    }

    /// Sets a field and reports whether its value changed.
    pub fn set(&mut self, field: &str, value: impl Into<String>) -> bool {
        let value = value.into();
        if self.values.get(field) == Some(&value) {
            return false;
        }
        self.values.insert(field.to_owned(), value);
        true
    }

    pub fn remove(&mut self, field: &str) -> bool {
        self.values.remove(field).is_some()
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }

    pub fn sort(&self) -> SortState {
        self.get(SORT_FIELD)
            .and_then(SortState::parse)
            .unwrap_or_default()
    }

    pub fn set_sort(&mut self, sort: SortState) -> bool {
        self.set(SORT_FIELD, sort.as_wire())
    }

    pub fn category_id(&self) -> Option<CategoryId> {
        self.get(CATEGORY_FIELD)
            .and_then(|raw| raw.parse::<i64>().ok())
            .map(CategoryId::new)
    }

    pub fn query_key(&self) -> QueryKey {
        QueryKey {
            namespace: self.namespace,
            fields: self.values.clone(),
        }
    }
}
