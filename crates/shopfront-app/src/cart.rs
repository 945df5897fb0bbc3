// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use std::collections::BTreeSet;

use crate::{CartItem, ProductId};

/// Checked rows of the shopping list. Prices are read from the items passed
/// in, so the selection stays valid when counts change in the store.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CartSelection {
    checked: BTreeSet<ProductId>,
}

impl CartSelection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_checked(&self, product_id: ProductId) -> bool {
        self.checked.contains(&product_id)
    }

    /// Flips one row and returns its new state.
    pub fn toggle(&mut self, product_id: ProductId) -> bool {
        if self.checked.remove(&product_id) {
            false
        } else {
            self.checked.insert(product_id);
            true
        }
    }

    /// Checks every row unless all are already checked, in which case it
    /// clears the selection.
    pub fn toggle_all(&mut self, items: &[CartItem]) {
        if self.all_checked(items) {
            self.checked.clear();
        } else {
            self.checked = items.iter().map(|item| item.product_id).collect();
        }
    }

    pub fn all_checked(&self, items: &[CartItem]) -> bool {
        !items.is_empty() && items.iter().all(|item| self.is_checked(item.product_id))
    }

    /// Drops ids that are no longer in the list.
    pub fn retain_present(&mut self, items: &[CartItem]) {
        self.checked
            .retain(|id| items.iter().any(|item| item.product_id == *id));
    }

    pub fn count(&self, items: &[CartItem]) -> usize {
        self.selected(items).count()
    }

    /// Sum of checked line totals, saturating at `i64::MAX`.
    pub fn total(&self, items: &[CartItem]) -> i64 {
        self.selected(items)
            .map(CartItem::line_total)
            .fold(0i64, i64::saturating_add)
    }

    pub fn selected<'a>(&'a self, items: &'a [CartItem]) -> impl Iterator<Item = &'a CartItem> {
        items
            .iter()
            .filter(|item| self.is_checked(item.product_id))
    }

    pub fn clear(&mut self) {
        self.checked.clear();
    }
}
