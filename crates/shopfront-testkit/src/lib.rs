// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result};
use shopfront_app::{
    CartItem, Category, CategoryId, Cursor, FetchError, FilterForm, Page, PageSource, Product,
    ProductId, ProductInfo, QueryKey, SortDirection, SortField, SortState,
};
use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::Mutex;

const CATEGORY_NAMES: [&str; 8] = [
    "Clothing",
    "Shoes",
    "Bags",
    "Kitchen",
    "Stationery",
    "Outdoor",
    "Lighting",
    "Toys",
];

const ADJECTIVES: [&str; 12] = [
    "Linen", "Canvas", "Walnut", "Wool", "Ceramic", "Bamboo", "Leather", "Cotton", "Copper",
    "Felt", "Oak", "Denim",
];

const NOUNS: [&str; 12] = [
    "Shirt", "Tote", "Bowl", "Lamp", "Notebook", "Jacket", "Mug", "Sneaker", "Blanket", "Basket",
    "Wallet", "Scarf",
];

const MATERIALS: [&str; 6] = ["linen", "cotton", "oak", "steel", "wool", "recycled paper"];

#[derive(Debug, Clone)]
struct DeterministicRng {
    state: u64,
}

impl DeterministicRng {
    fn new(seed: u64) -> Self {
        let mut state = seed ^ 0x9E37_79B9_7F4A_7C15;
        if state == 0 {
            state = 0xA409_3822_299F_31D0;
        }
        Self { state }
    }

    fn next_u64(&mut self) -> u64 {
        self.state = self
            .state
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);

        let mut x = self.state;
        x ^= x >> 13;
        x ^= x << 7;
        x ^= x >> 17;
        x
    }

    fn int_n(&mut self, n: usize) -> usize {
        if n <= 1 {
            return 0;
        }
        (self.next_u64() % (n as u64)) as usize
    }
}

/// Seeded generator for catalog fixtures. Same seed, same products.
#[derive(Debug, Clone)]
pub struct ProductFaker {
    rng: DeterministicRng,
}

impl ProductFaker {
    pub fn new(seed: u64) -> Self {
        let normalized = if seed == 0 { 1 } else { seed };
        Self {
            rng: DeterministicRng::new(normalized),
        }
    }

    pub fn category(&mut self, id: i64) -> Category {
        Category {
            id: CategoryId::new(id),
            name: self.pick(&CATEGORY_NAMES).to_owned(),
            product_count: None,
        }
    }

    pub fn product(&mut self, id: i64) -> Product {
        let name = format!("{} {}", self.pick(&ADJECTIVES), self.pick(&NOUNS));
        let price = self.int_range(10, 990) * 100;
        let stock = self.int_range(0, 50);
        let category_id = self.int_range(1, CATEGORY_NAMES.len() as i64);
        let category = self.category(category_id);
        Product {
            id: ProductId::new(id),
            name,
            price,
            stock,
            images: vec![format!("https://cdn.shopfront.test/products/{id}.jpg")],
            infos: vec![ProductInfo {
                title: "material".to_owned(),
                content: self.pick(&MATERIALS).to_owned(),
            }],
            category: Some(category),
        }
    }

    /// Products with ids `1..=count`.
    pub fn products(&mut self, count: usize) -> Vec<Product> {
        (1..=count as i64).map(|id| self.product(id)).collect()
    }

    pub fn cart_item(&mut self, id: i64, order_count: i64) -> CartItem {
        CartItem {
            order_count,
            ..CartItem::from_product(&self.product(id))
        }
    }

    fn pick<'a>(&mut self, values: &'a [&'a str]) -> &'a str {
        values[self.rng.int_n(values.len())]
    }

    fn int_range(&mut self, min: i64, max: i64) -> i64 {
        if max <= min {
            return min;
        }
        let span = (max - min + 1) as usize;
        min + self.rng.int_n(span) as i64
    }
}

/// In-memory paged catalog standing in for the backend.
///
/// Pages are numbered from [`Cursor::FIRST`]. Products are ordered by the
/// form's sort before slicing, so a sort change yields a different first page
/// the way the server would. Every call is recorded and queued failures are
/// returned before any page is served.
pub struct Catalog {
    products: Vec<Product>,
    page_size: usize,
    title: Option<String>,
    calls: Mutex<Vec<(QueryKey, Cursor)>>,
    failures: Mutex<VecDeque<FetchError>>,
}

impl Catalog {
    pub fn new(products: Vec<Product>, page_size: usize) -> Self {
        Self {
            products,
            page_size: page_size.max(1),
            title: None,
            calls: Mutex::new(Vec::new()),
            failures: Mutex::new(VecDeque::new()),
        }
    }

    pub fn with_title(mut self, title: &str) -> Self {
        self.title = Some(title.to_owned());
        self
    }

    pub fn fail_next(&self, error: FetchError) {
        if let Ok(mut failures) = self.failures.lock() {
            failures.push_back(error);
        }
    }

    pub fn calls(&self) -> Vec<(QueryKey, Cursor)> {
        self.calls
            .lock()
            .map(|calls| calls.clone())
            .unwrap_or_default()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().map(|calls| calls.len()).unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.products.len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }

    fn sorted(&self, sort: SortState) -> Vec<Product> {
        let mut products = self.products.clone();
        match sort.field {
            SortField::CreatedAt => products.sort_by_key(|product| product.id),
            SortField::Price => products.sort_by_key(|product| (product.price, product.id)),
            SortField::Name => {
                products.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
            }
        }
        if sort.direction == SortDirection::Desc {
            products.reverse();
        }
        products
    }
}

impl PageSource<Product> for Catalog {
    fn fetch_page(&self, filters: &FilterForm, cursor: Cursor) -> Result<Page<Product>, FetchError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push((filters.query_key(), cursor));
        }
        if let Some(error) = self.failures.lock().ok().and_then(|mut f| f.pop_front()) {
            return Err(error);
        }

        let products = self.sorted(filters.sort());
        let total = products.len() as u64;
        let start = (cursor.get().saturating_sub(1) as usize).saturating_mul(self.page_size);
        let end = start.saturating_add(self.page_size).min(products.len());
        let items = products.get(start..end).map(<[Product]>::to_vec).unwrap_or_default();

        let mut page = if end < products.len() {
            Page::with_next(items, Cursor::new(cursor.get() + 1), total)
        } else {
            Page::last(items, total)
        };
        page.title = self.title.clone();
        Ok(page)
    }
}

pub fn temp_db_path() -> Result<(tempfile::TempDir, PathBuf)> {
    let dir = tempfile::tempdir().context("create temp dir")?;
    let db_path = dir.path().join("shopfront.db");
    Ok((dir, db_path))
}

#[cfg(test)]
mod tests {
    use super::{Catalog, ProductFaker};
    use shopfront_app::{CategoryId, Cursor, FetchError, FilterForm, PageSource, SortState};
    use std::collections::BTreeSet;

    #[test]
    fn new_deterministic_seed() {
        let mut left = ProductFaker::new(42);
        let mut right = ProductFaker::new(42);
        assert_eq!(left.product(1), right.product(1));
    }

    #[test]
    fn product_has_positive_price_and_image() {
        let mut faker = ProductFaker::new(3);
        for product in faker.products(20) {
            assert!(product.price > 0);
            assert!(product.stock >= 0);
            assert!(product.cover_image().is_some());
        }
    }

    #[test]
    fn catalog_pages_through_every_product_once() {
        let mut faker = ProductFaker::new(5);
        let catalog = Catalog::new(faker.products(7), 3).with_title("Clothing");
        let form = FilterForm::category_products(CategoryId::new(1), SortState::NEWEST);

        let mut seen = BTreeSet::new();
        let mut cursor = Some(Cursor::FIRST);
        while let Some(current) = cursor {
            let page = catalog.fetch_page(&form, current).expect("page");
            assert_eq!(page.total_results, 7);
            assert_eq!(page.title.as_deref(), Some("Clothing"));
            for product in &page.items {
                assert!(seen.insert(product.id));
            }
            cursor = page.next_cursor();
        }
        assert_eq!(seen.len(), 7);
        assert_eq!(catalog.call_count(), 3);
    }

    #[test]
    fn catalog_returns_queued_failure_first() {
        let catalog = Catalog::new(ProductFaker::new(1).products(2), 10);
        catalog.fail_next(FetchError::Rejected {
            status: 500,
            message: "boom".to_owned(),
        });
        let form = FilterForm::provider_products(SortState::NEWEST);

        assert!(catalog.fetch_page(&form, Cursor::FIRST).is_err());
        assert!(catalog.fetch_page(&form, Cursor::FIRST).is_ok());
    }
}
