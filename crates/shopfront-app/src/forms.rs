// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Result, bail};

use crate::{CartItem, CartSelection, ProductId, ProductInfo};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductFormInput {
    pub name: String,
    pub price: i64,
    pub stock: i64,
    pub category_name: String,
    pub images: Vec<String>,
    pub infos: Vec<ProductInfo>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderLineInput {
    pub product_id: ProductId,
    pub count: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderFormInput {
    pub items: Vec<OrderLineInput>,
}

impl ProductFormInput {
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            bail!("product name is required -- enter a name and retry");
        }
        if self.category_name.trim().is_empty() {
            bail!("product category is required -- choose a category and retry");
        }
        if self.price <= 0 {
            bail!("product price must be positive");
        }
        if self.stock < 0 {
            bail!("product stock cannot be negative");
        }
        if self.images.iter().any(|url| url.trim().is_empty()) {
            bail!("product image URLs must not be blank");
        }
        for info in &self.infos {
            if info.title.trim().is_empty() && !info.content.trim().is_empty() {
                bail!("product info rows need a title -- add one or remove the row");
            }
        }
        Ok(())
    }
}

impl OrderFormInput {
    /// Builds an order from the checked rows of the shopping list.
    pub fn from_selection(items: &[CartItem], selection: &CartSelection) -> Self {
        Self {
            items: selection
                .selected(items)
                .map(|item| OrderLineInput {
                    product_id: item.product_id,
                    count: item.order_count,
                })
                .collect(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.items.is_empty() {
            bail!("order is empty -- check at least one item and retry");
        }
        for line in &self.items {
            if line.product_id.get() <= 0 {
                bail!("order item has an invalid product id {}", line.product_id);
            }
            if line.count <= 0 {
                bail!(
                    "order count for product {} must be at least 1",
                    line.product_id
                );
            }
        }
        let mut ids: Vec<ProductId> = self.items.iter().map(|line| line.product_id).collect();
        ids.sort_unstable();
        if ids.windows(2).any(|pair| pair[0] == pair[1]) {
            bail!("order lists a product more than once");
        }
        Ok(())
    }
}
