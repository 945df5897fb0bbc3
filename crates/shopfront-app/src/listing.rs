// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

//! Incremental list loading.
//!
//! [`ListController`] performs no I/O. Each operation returns [`ListEffect`]s
//! for the caller to execute, and every fetch outcome comes back through
//! [`ListController::resolve`] together with the [`FetchTicket`] it was issued
//! with. A ticket records the query key and list epoch that were current at
//! dispatch, so results that arrive after a filter change or refresh are
//! dropped instead of being merged into the new list.

use std::fmt;
use thiserror::Error;
use tracing::{debug, warn};

use crate::{FilterForm, QueryKey};

/// Page cursor handed back by the API. Opaque to the controller apart from
/// being strictly increasing within one query key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Cursor(u32);

impl Cursor {
    pub const FIRST: Self = Self(1);

    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    pub const fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Display for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub has_next_page: bool,
    pub next_page: Option<Cursor>,
    /// Total reported by upstream as of this page. Not summed across pages.
    pub total_results: u64,
    pub title: Option<String>,
}

impl<T> Page<T> {
    pub fn last(items: Vec<T>, total_results: u64) -> Self {
        Self {
            items,
            has_next_page: false,
            next_page: None,
            total_results,
            title: None,
        }
    }

    pub fn with_next(items: Vec<T>, next_page: Cursor, total_results: u64) -> Self {
        Self {
            items,
            has_next_page: true,
            next_page: Some(next_page),
            total_results,
            title: None,
        }
    }

    pub fn next_cursor(&self) -> Option<Cursor> {
        if self.has_next_page {
            self.next_page
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("cannot reach {endpoint}: {message}")]
    Transport { endpoint: String, message: String },
    #[error("server error ({status}): {message}")]
    Rejected { status: u16, message: String },
    #[error("decode {what}: {message}")]
    Decode { what: String, message: String },
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

pub trait PageSource<T> {
    fn fetch_page(&self, filters: &FilterForm, cursor: Cursor) -> Result<Page<T>, FetchError>;
}

impl<T, F> PageSource<T> for F
where
    F: Fn(&FilterForm, Cursor) -> Result<Page<T>, FetchError>,
{
    fn fetch_page(&self, filters: &FilterForm, cursor: Cursor) -> Result<Page<T>, FetchError> {
        self(filters, cursor)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListStatus {
    Idle,
    Loading,
    Error,
    Success,
}

impl ListStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Loading => "loading",
            Self::Error => "error",
            Self::Success => "success",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchKind {
    FirstPage,
    NextPage,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchTicket {
    key: QueryKey,
    epoch: u64,
    kind: FetchKind,
    cursor: Cursor,
}

impl FetchTicket {
    pub const fn key(&self) -> &QueryKey {
        &self.key
    }

    pub const fn kind(&self) -> FetchKind {
        self.kind
    }

    pub const fn cursor(&self) -> Cursor {
        self.cursor
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub ticket: FetchTicket,
    pub filters: FilterForm,
}

impl FetchRequest {
    pub const fn cursor(&self) -> Cursor {
        self.ticket.cursor
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListEffect {
    /// Drop every externally cached page stored under this key.
    Invalidate(QueryKey),
    Fetch(FetchRequest),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Appended { cursor: Cursor },
    Failed,
    /// The ticket no longer matches the list; the result was dropped.
    Superseded,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListSnapshot<T> {
    pub status: ListStatus,
    pub pages: Vec<Page<T>>,
    pub all_items: Vec<T>,
    pub total_results: u64,
    pub is_fetching_next: bool,
    pub has_next_page: bool,
    pub last_error: Option<FetchError>,
}

#[derive(Debug, Clone)]
struct ListState<T> {
    epoch: u64,
    pages: Vec<Page<T>>,
    cursors: Vec<Cursor>,
    status: ListStatus,
    awaiting_first: bool,
    is_fetching_next: bool,
    last_error: Option<FetchError>,
}

impl<T> ListState<T> {
    fn loading(epoch: u64) -> Self {
        Self {
            epoch,
            pages: Vec::new(),
            cursors: Vec::new(),
            status: ListStatus::Loading,
            awaiting_first: true,
            is_fetching_next: false,
            last_error: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ListController<T> {
    filters: FilterForm,
    key: QueryKey,
    state: ListState<T>,
    next_epoch: u64,
}

impl<T> ListController<T> {
    /// Creates a controller in the loading state together with the page-1
    /// fetch it is waiting on.
    pub fn initialize(filters: FilterForm) -> (Self, Vec<ListEffect>) {
        let key = filters.query_key();
        let controller = Self {
            filters,
            key,
            state: ListState::loading(0),
            next_epoch: 1,
        };
        let effects = vec![ListEffect::Fetch(controller.first_page_request())];
        (controller, effects)
    }

    pub fn on_filter_change(&mut self, filters: FilterForm) -> Vec<ListEffect> {
        let key = filters.query_key();
        if key == self.key {
            return Vec::new();
        }
        self.filters = filters;
        self.restart(key)
    }

    /// Discards the list and refetches page 1 under the current filters.
    pub fn refresh(&mut self) -> Vec<ListEffect> {
        let key = self.key.clone();
        self.restart(key)
    }

    /// Requests the next page when the list is idle and has one. Safe to call
    /// redundantly; it returns no effects whenever a fetch would be wrong.
    pub fn on_visibility_trigger(&mut self) -> Vec<ListEffect> {
        if self.state.status == ListStatus::Loading || self.state.is_fetching_next {
            return Vec::new();
        }
        let Some(cursor) = self.state.pages.last().and_then(Page::next_cursor) else {
            return Vec::new();
        };
        if let Some(previous) = self.state.cursors.last()
            && cursor <= *previous
        {
            warn!(key = %self.key, %cursor, %previous, "next page cursor did not advance");
            return Vec::new();
        }

        self.state.is_fetching_next = true;
        debug!(key = %self.key, %cursor, "fetching next page");
        vec![ListEffect::Fetch(FetchRequest {
            ticket: FetchTicket {
                key: self.key.clone(),
                epoch: self.state.epoch,
                kind: FetchKind::NextPage,
                cursor,
            },
            filters: self.filters.clone(),
        })]
    }

    pub fn resolve(
        &mut self,
        ticket: &FetchTicket,
        result: Result<Page<T>, FetchError>,
    ) -> Resolution {
        if !self.accepts(ticket) {
            debug!(key = %ticket.key, cursor = %ticket.cursor, "dropping superseded page");
            return Resolution::Superseded;
        }

        match ticket.kind {
            FetchKind::FirstPage => self.state.awaiting_first = false,
            FetchKind::NextPage => self.state.is_fetching_next = false,
        }

        match result {
            Ok(page) => {
                self.state.pages.push(page);
                self.state.cursors.push(ticket.cursor);
                self.state.status = ListStatus::Success;
                self.state.last_error = None;
                Resolution::Appended {
                    cursor: ticket.cursor,
                }
            }
            Err(error) => {
                warn!(key = %self.key, cursor = %ticket.cursor, %error, "page fetch failed");
                self.state.status = ListStatus::Error;
                self.state.last_error = Some(error);
                Resolution::Failed
            }
        }
    }

    pub const fn filters(&self) -> &FilterForm {
        &self.filters
    }

    pub const fn query_key(&self) -> &QueryKey {
        &self.key
    }

    pub const fn status(&self) -> ListStatus {
        self.state.status
    }

    pub fn pages(&self) -> &[Page<T>] {
        &self.state.pages
    }

    pub fn all_items(&self) -> impl Iterator<Item = &T> {
        self.state.pages.iter().flat_map(|page| page.items.iter())
    }

    pub fn item_count(&self) -> usize {
        self.state.pages.iter().map(|page| page.items.len()).sum()
    }

    pub fn total_results(&self) -> u64 {
        self.state
            .pages
            .last()
            .map(|page| page.total_results)
            .unwrap_or(0)
    }

    pub fn title(&self) -> Option<&str> {
        self.state.pages.last().and_then(|page| page.title.as_deref())
    }

    pub const fn is_fetching_next(&self) -> bool {
        self.state.is_fetching_next
    }

    pub fn has_next_page(&self) -> bool {
        self.state
            .pages
            .last()
            .is_some_and(|page| page.has_next_page)
    }

    pub const fn last_error(&self) -> Option<&FetchError> {
        self.state.last_error.as_ref()
    }

    pub fn snapshot(&self) -> ListSnapshot<T>
    where
        T: Clone,
    {
        ListSnapshot {
            status: self.state.status,
            pages: self.state.pages.clone(),
            all_items: self.all_items().cloned().collect(),
            total_results: self.total_results(),
            is_fetching_next: self.state.is_fetching_next,
            has_next_page: self.has_next_page(),
            last_error: self.state.last_error.clone(),
        }
    }

    fn restart(&mut self, key: QueryKey) -> Vec<ListEffect> {
        let superseded = std::mem::replace(&mut self.key, key);
        self.state = ListState::loading(self.next_epoch);
        self.next_epoch = self.next_epoch.wrapping_add(1);
        debug!(from = %superseded, to = %self.key, "list restarted");
        vec![
            ListEffect::Invalidate(superseded),
            ListEffect::Fetch(self.first_page_request()),
        ]
    }

    fn first_page_request(&self) -> FetchRequest {
        debug!(key = %self.key, "fetching first page");
        FetchRequest {
            ticket: FetchTicket {
                key: self.key.clone(),
                epoch: self.state.epoch,
                kind: FetchKind::FirstPage,
                cursor: Cursor::FIRST,
            },
            filters: self.filters.clone(),
        }
    }

    fn accepts(&self, ticket: &FetchTicket) -> bool {
        if ticket.key != self.key || ticket.epoch != self.state.epoch {
            return false;
        }
        match ticket.kind {
            FetchKind::FirstPage => self.state.awaiting_first,
            FetchKind::NextPage => {
                self.state.is_fetching_next
                    && self.state.pages.last().and_then(Page::next_cursor) == Some(ticket.cursor)
            }
        }
    }
}
