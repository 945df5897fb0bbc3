// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Result, anyhow};
use shopfront_api::ProductPageSource;
use shopfront_app::{
    CartItem, Category, FetchError, FetchRequest, OrderFormInput, Page, PageSource, Product,
    ProductId, ScreenKind, SortState, ViewType,
};
use shopfront_store::Store;
use shopfront_tui::InternalEvent;
use std::collections::BTreeSet;
use std::sync::mpsc::Sender;
use std::thread;
use tracing::{debug, info};

pub struct ApiRuntime<'a> {
    source: ProductPageSource,
    store: &'a mut Store,
}

impl<'a> ApiRuntime<'a> {
    pub fn new(source: ProductPageSource, store: &'a mut Store) -> Self {
        Self { source, store }
    }
}

impl shopfront_tui::AppRuntime for ApiRuntime<'_> {
    fn fetch_page(&mut self, request: &FetchRequest) -> Result<Page<Product>, FetchError> {
        self.source.fetch_page(&request.filters, request.cursor())
    }

    fn spawn_fetch(
        &mut self,
        listing: ScreenKind,
        request: FetchRequest,
        tx: Sender<InternalEvent>,
    ) -> Result<()> {
        let source = self.source.clone();
        thread::Builder::new()
            .name(format!("fetch-{}", listing.label()))
            .spawn(move || {
                let result = source.fetch_page(&request.filters, request.cursor());
                // The UI may have quit; nobody is left to tell.
                let _ = tx.send(InternalEvent::PageFetched {
                    listing,
                    ticket: request.ticket,
                    result,
                });
            })
            .map_err(|error| anyhow!("spawn fetch thread: {error}"))?;
        Ok(())
    }

    fn load_categories(&mut self) -> Result<Vec<Category>> {
        Ok(self.source.client().get_categories()?)
    }

    fn load_liked(&mut self) -> Result<BTreeSet<ProductId>> {
        if !self.source.client().has_token() {
            debug!("no api token; skipping like list");
            return Ok(BTreeSet::new());
        }
        let liked = self
            .source
            .client()
            .find_like_list()?
            .map(|list| list.products.iter().map(|product| product.id).collect())
            .unwrap_or_default();
        Ok(liked)
    }

    fn set_liked(&mut self, product_id: ProductId, liked: bool) -> Result<()> {
        if liked {
            self.source.client().like_product(product_id)
        } else {
            self.source.client().unlike_product(product_id)
        }
    }

    fn load_cart(&mut self) -> Result<Vec<CartItem>> {
        self.store.list_cart_items()
    }

    fn add_to_cart(&mut self, product: &Product) -> Result<i64> {
        self.store.add_to_cart(&CartItem::from_product(product))
    }

    fn set_cart_count(&mut self, product_id: ProductId, count: i64) -> Result<()> {
        self.store.set_cart_count(product_id, count)
    }

    fn remove_cart_item(&mut self, product_id: ProductId) -> Result<()> {
        self.store.remove_cart_item(product_id)
    }

    fn place_order(&mut self, order: &OrderFormInput) -> Result<()> {
        let order_id = self.source.client().create_order(order)?;
        let ordered: Vec<ProductId> = order.items.iter().map(|line| line.product_id).collect();
        let removed = self.store.remove_cart_items(&ordered)?;
        info!(order_id = ?order_id.map(|id| id.get()), removed, "order placed");
        Ok(())
    }

    fn save_view_type(&mut self, view_type: ViewType) -> Result<()> {
        self.store.put_view_type(view_type)
    }

    fn save_sort(&mut self, sort: SortState) -> Result<()> {
        self.store.put_sort(sort)
    }
}
