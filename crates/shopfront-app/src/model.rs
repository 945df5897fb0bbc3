// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::ids::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortField {
    CreatedAt,
    Price,
    Name,
}

impl SortField {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::CreatedAt => "createdAt",
            Self::Price => "price",
            Self::Name => "name",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "createdAt" => Some(Self::CreatedAt),
            "price" => Some(Self::Price),
            "name" => Some(Self::Name),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "asc" => Some(Self::Asc),
            "desc" => Some(Self::Desc),
            _ => None,
        }
    }
}

/// Sort order of a product listing. The wire form is `"<field> <direction>"`,
/// for example `"createdAt desc"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortState {
    pub field: SortField,
    pub direction: SortDirection,
}

impl SortState {
    pub const NEWEST: Self = Self::new(SortField::CreatedAt, SortDirection::Desc);

    /// Choices offered by the sort selector, in display order.
    pub const ALL: [Self; 4] = [
        Self::NEWEST,
        Self::new(SortField::Price, SortDirection::Desc),
        Self::new(SortField::Price, SortDirection::Asc),
        Self::new(SortField::Name, SortDirection::Asc),
    ];

    pub const fn new(field: SortField, direction: SortDirection) -> Self {
        Self { field, direction }
    }

    pub fn as_wire(self) -> String {
        format!("{} {}", self.field.as_str(), self.direction.as_str())
    }

    pub fn parse(value: &str) -> Option<Self> {
        let mut parts = value.split_whitespace();
        let field = SortField::parse(parts.next()?)?;
        let direction = match parts.next() {
            Some(direction) => SortDirection::parse(direction)?,
            None => SortDirection::Asc,
        };
        if parts.next().is_some() {
            return None;
        }
        Some(Self::new(field, direction))
    }

    pub const fn label(self) -> &'static str {
        match (self.field, self.direction) {
            (SortField::CreatedAt, SortDirection::Desc) => "newest",
            (SortField::CreatedAt, SortDirection::Asc) => "oldest",
            (SortField::Price, SortDirection::Desc) => "price: high to low",
            (SortField::Price, SortDirection::Asc) => "price: low to high",
            (SortField::Name, SortDirection::Asc) => "name",
            (SortField::Name, SortDirection::Desc) => "name (reverse)",
        }
    }

    /// Next entry of [`SortState::ALL`], wrapping. Sorts outside the list
    /// start over at the first entry.
    pub fn next(self) -> Self {
        let current = Self::ALL.iter().position(|sort| *sort == self);
        match current {
            Some(index) => Self::ALL[(index + 1) % Self::ALL.len()],
            None => Self::ALL[0],
        }
    }
}

impl Default for SortState {
    fn default() -> Self {
        Self::NEWEST
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ViewType {
    #[default]
    Grid,
    List,
}

impl ViewType {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Grid => "grid",
            Self::List => "list",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "grid" => Some(Self::Grid),
            "list" => Some(Self::List),
            _ => None,
        }
    }

    pub const fn toggled(self) -> Self {
        match self {
            Self::Grid => Self::List,
            Self::List => Self::Grid,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderStatus {
    Checking,
    Received,
    Delivering,
    Delivered,
    Canceled,
}

impl OrderStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Checking => "checking",
            Self::Received => "received",
            Self::Delivering => "delivering",
            Self::Delivered => "delivered",
            Self::Canceled => "canceled",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "checking" => Some(Self::Checking),
            "received" => Some(Self::Received),
            "delivering" => Some(Self::Delivering),
            "delivered" => Some(Self::Delivered),
            "canceled" => Some(Self::Canceled),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScreenKind {
    Category,
    ManageProducts,
    Cart,
}

impl ScreenKind {
    pub const LISTINGS: [Self; 2] = [Self::Category, Self::ManageProducts];

    pub const fn label(self) -> &'static str {
        match self {
            Self::Category => "shop",
            Self::ManageProducts => "my products",
            Self::Cart => "cart",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductInfo {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub price: i64,
    #[serde(default)]
    pub stock: i64,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub infos: Vec<ProductInfo>,
    #[serde(default)]
    pub category: Option<Category>,
}

impl Product {
    pub fn cover_image(&self) -> Option<&str> {
        self.images.first().map(String::as_str)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    #[serde(default)]
    pub product_count: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderItem {
    pub id: OrderItemId,
    pub product: Product,
    pub count: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    pub id: OrderId,
    pub items: Vec<OrderItem>,
    pub total: i64,
    pub status: OrderStatus,
    pub created_at: Option<OffsetDateTime>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LikeList {
    pub id: LikeId,
    pub products: Vec<Product>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    pub product_id: ProductId,
    pub name: String,
    pub price: i64,
    pub image_url: String,
    pub order_count: i64,
}

impl CartItem {
    pub fn from_product(product: &Product) -> Self {
        Self {
            product_id: product.id,
            name: product.name.clone(),
            price: product.price,
            image_url: product.cover_image().unwrap_or_default().to_owned(),
            order_count: 1,
        }
    }

    pub const fn line_total(&self) -> i64 {
        self.price.saturating_mul(self.order_count)
    }
}

/// Formats a whole-won amount with thousands separators, e.g. `12,500`.
pub fn format_price(amount: i64) -> String {
    let digits = amount.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if amount < 0 {
        out.push('-');
    }
    for (index, ch) in digits.chars().enumerate() {
        if index > 0 && (digits.len() - index) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}
