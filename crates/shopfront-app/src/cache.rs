// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use std::collections::BTreeMap;
use tracing::debug;

use crate::{Cursor, ListController, ListEffect, Page, PageSource, QueryKey, Resolution};

/// Pages fetched so far, keyed by the query that produced them. Shared by
/// every list a screen owns; controllers only reach it through
/// [`ListEffect::Invalidate`].
#[derive(Debug, Clone)]
pub struct QueryCache<T> {
    entries: BTreeMap<QueryKey, BTreeMap<Cursor, Page<T>>>,
}

impl<T> Default for QueryCache<T> {
    fn default() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }
}

impl<T> QueryCache<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: QueryKey, cursor: Cursor, page: Page<T>) {
        self.entries.entry(key).or_default().insert(cursor, page);
    }

    pub fn get(&self, key: &QueryKey, cursor: Cursor) -> Option<&Page<T>> {
        self.entries.get(key).and_then(|pages| pages.get(&cursor))
    }

    pub fn page_count(&self, key: &QueryKey) -> usize {
        self.entries.get(key).map_or(0, BTreeMap::len)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Removes every page stored under `key` and returns how many went.
    pub fn invalidate(&mut self, key: &QueryKey) -> usize {
        let removed = self.entries.remove(key).map_or(0, |pages| pages.len());
        if removed > 0 {
            debug!(%key, removed, "invalidated cached pages");
        }
        removed
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Mirrors the controller's newest page into the cache after a successful
    /// resolution.
    pub fn record(&mut self, controller: &ListController<T>, resolution: Resolution)
    where
        T: Clone,
    {
        if let Resolution::Appended { cursor } = resolution
            && let Some(page) = controller.pages().last()
        {
            self.insert(controller.query_key().clone(), cursor, page.clone());
        }
    }
}

/// Executes effects synchronously until none remain. Each fetch runs on the
/// calling thread, so this suits headless callers and tests; interactive
/// callers dispatch fetches to workers and feed results to
/// [`ListController::resolve`] themselves.
pub fn drive<T, S>(
    controller: &mut ListController<T>,
    source: &S,
    cache: &mut QueryCache<T>,
    effects: Vec<ListEffect>,
) -> Vec<Resolution>
where
    T: Clone,
    S: PageSource<T> + ?Sized,
{
    let mut resolutions = Vec::new();
    for effect in effects {
        match effect {
            ListEffect::Invalidate(key) => {
                cache.invalidate(&key);
            }
            ListEffect::Fetch(request) => {
                let result = source.fetch_page(&request.filters, request.cursor());
                let resolution = controller.resolve(&request.ticket, result);
                cache.record(controller, resolution);
                resolutions.push(resolution);
            }
        }
    }
    resolutions
}
