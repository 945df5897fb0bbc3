// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyModifiers};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use crossterm::{execute, terminal};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::{Block, Borders, Cell, Paragraph, Row, Table, Tabs};
use shopfront_app::{
    AppCommand, AppEvent, AppState, CATEGORY_FIELD, CartItem, CartSelection, Category, CategoryId,
    FetchError, FetchRequest, FetchTicket, FilterForm, ListController, ListEffect, ListNamespace,
    ListStatus, OrderFormInput, Page, Product, ProductId, QueryCache, Resolution, ScreenKind, SortState,
    ViewType, VisibilityTrigger, format_price,
};
use std::collections::BTreeSet;
use std::io;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::Duration;
use tracing::{debug, warn};

const GRID_COLUMNS: usize = 2;
const LIKED_MARK: &str = "♥";
const CHECKED_MARK: &str = "[x]";
const UNCHECKED_MARK: &str = "[ ]";

/// Everything the UI needs from the outside world. Listing fetches go through
/// [`AppRuntime::spawn_fetch`], which must eventually send exactly one
/// [`InternalEvent::PageFetched`] per request.
pub trait AppRuntime {
    fn fetch_page(&mut self, request: &FetchRequest) -> Result<Page<Product>, FetchError>;
    fn spawn_fetch(
        &mut self,
        listing: ScreenKind,
        request: FetchRequest,
        tx: Sender<InternalEvent>,
    ) -> Result<()> {
        let result = self.fetch_page(&request);
        tx.send(InternalEvent::PageFetched {
            listing,
            ticket: request.ticket,
            result,
        })
        .map_err(|_| anyhow!("fetch event channel closed"))?;
        Ok(())
    }
    fn load_categories(&mut self) -> Result<Vec<Category>>;
    fn load_liked(&mut self) -> Result<BTreeSet<ProductId>>;
    fn set_liked(&mut self, product_id: ProductId, liked: bool) -> Result<()>;
    fn load_cart(&mut self) -> Result<Vec<CartItem>>;
    fn add_to_cart(&mut self, product: &Product) -> Result<i64>;
    fn set_cart_count(&mut self, product_id: ProductId, count: i64) -> Result<()>;
    fn remove_cart_item(&mut self, product_id: ProductId) -> Result<()>;
    /// Submits the order and drops the ordered rows from the shopping list.
    fn place_order(&mut self, order: &OrderFormInput) -> Result<()>;
    fn save_view_type(&mut self, view_type: ViewType) -> Result<()>;
    fn save_sort(&mut self, sort: SortState) -> Result<()>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InternalEvent {
    ClearStatus {
        token: u64,
    },
    PageFetched {
        listing: ScreenKind,
        ticket: FetchTicket,
        result: Result<Page<Product>, FetchError>,
    },
}

/// Initial filters for the two product listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LaunchOptions {
    /// Category to open; the first category the API lists when absent.
    pub category: Option<CategoryId>,
    pub sort: SortState,
}

impl Default for LaunchOptions {
    fn default() -> Self {
        Self {
            category: None,
            sort: SortState::NEWEST,
        }
    }
}

#[derive(Debug, Clone)]
struct ListingView {
    screen: ScreenKind,
    controller: ListController<Product>,
    trigger: VisibilityTrigger,
    selected: usize,
    offset: usize,
}

impl ListingView {
    fn new(screen: ScreenKind, filters: FilterForm) -> (Self, Vec<ListEffect>) {
        let (controller, effects) = ListController::initialize(filters);
        (
            Self {
                screen,
                controller,
                trigger: VisibilityTrigger::new(),
                selected: 0,
                offset: 0,
            },
            effects,
        )
    }

    fn selected_product(&self) -> Option<&Product> {
        self.controller.all_items().nth(self.selected)
    }

    /// Forget scroll position and sentinel state after the list was replaced.
    fn reset_view(&mut self) {
        self.selected = 0;
        self.offset = 0;
        self.trigger.reset();
    }
}

#[derive(Debug, Clone, Default)]
struct CartView {
    items: Vec<CartItem>,
    selection: CartSelection,
    selected: usize,
}

#[derive(Debug, Clone)]
struct ViewData {
    listings: Vec<ListingView>,
    cache: QueryCache<Product>,
    cart: CartView,
    categories: Vec<Category>,
    liked: BTreeSet<ProductId>,
    viewport_rows: usize,
    status_token: u64,
}

impl ViewData {
    fn new(options: LaunchOptions, categories: Vec<Category>) -> (Self, Vec<(ScreenKind, Vec<ListEffect>)>) {
        let category_filters = match options.category.or_else(|| categories.first().map(|c| c.id)) {
            Some(category_id) => FilterForm::category_products(category_id, options.sort),
            None => {
                let mut filters = FilterForm::new(ListNamespace::CategoryProducts);
                filters.set_sort(options.sort);
                filters
            }
        };
        let (category, category_effects) = ListingView::new(ScreenKind::Category, category_filters);
        let (provider, provider_effects) = ListingView::new(
            ScreenKind::ManageProducts,
            FilterForm::provider_products(options.sort),
        );

        (
            Self {
                listings: vec![category, provider],
                cache: QueryCache::new(),
                cart: CartView::default(),
                categories,
                liked: BTreeSet::new(),
                viewport_rows: 0,
                status_token: 0,
            },
            vec![
                (ScreenKind::Category, category_effects),
                (ScreenKind::ManageProducts, provider_effects),
            ],
        )
    }

    fn listing(&self, screen: ScreenKind) -> Option<&ListingView> {
        self.listings.iter().find(|view| view.screen == screen)
    }

    fn listing_mut(&mut self, screen: ScreenKind) -> Option<&mut ListingView> {
        self.listings.iter_mut().find(|view| view.screen == screen)
    }
}

pub fn run_app<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    options: LaunchOptions,
) -> Result<()> {
    let (internal_tx, internal_rx) = mpsc::channel();
    let mut view_data = start_view_data(state, runtime, options, &internal_tx);

    enable_raw_mode().context("enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, terminal::EnterAlternateScreen).context("enter alternate screen")?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("create terminal")?;

    let mut result = Ok(());
    loop {
        process_internal_events(state, &mut view_data, &internal_tx, &internal_rx);

        if let Err(error) = terminal.draw(|frame| render(frame, state, &view_data)) {
            result = Err(error).context("draw frame");
            break;
        }
        match terminal.size() {
            Ok(size) => view_data.viewport_rows = body_viewport_rows(size.height, state),
            Err(error) => {
                result = Err(error).context("read terminal size");
                break;
            }
        }
        observe_sentinel(state, runtime, &mut view_data, &internal_tx);

        let has_event = event::poll(Duration::from_millis(120)).context("poll event")?;
        if has_event {
            if let Event::Key(key) = event::read().context("read event")?
                && handle_key_event(state, runtime, &mut view_data, &internal_tx, key)
            {
                break;
            }
        }
    }

    disable_raw_mode().context("disable raw mode")?;
    execute!(io::stdout(), terminal::LeaveAlternateScreen).context("leave alternate screen")?;
    result
}

fn start_view_data<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    options: LaunchOptions,
    tx: &Sender<InternalEvent>,
) -> ViewData {
    let categories = match runtime.load_categories() {
        Ok(categories) => categories,
        Err(error) => {
            warn!(%error, "loading categories failed");
            state.dispatch(AppCommand::SetStatus(format!("categories unavailable: {error}")));
            Vec::new()
        }
    };

    let (mut view_data, initial) = ViewData::new(options, categories);
    match runtime.load_liked() {
        Ok(liked) => view_data.liked = liked,
        Err(error) => debug!(%error, "like list unavailable"),
    }
    if let Err(error) = reload_cart(runtime, &mut view_data) {
        state.dispatch(AppCommand::SetStatus(format!("cart load failed: {error}")));
    }
    for (listing, effects) in initial {
        dispatch_effects(runtime, &mut view_data, listing, effects, tx);
    }
    view_data
}

fn process_internal_events(
    state: &mut AppState,
    view_data: &mut ViewData,
    tx: &Sender<InternalEvent>,
    rx: &Receiver<InternalEvent>,
) {
    while let Ok(event) = rx.try_recv() {
        match event {
            InternalEvent::ClearStatus { token } if token == view_data.status_token => {
                state.dispatch(AppCommand::ClearStatus);
            }
            InternalEvent::ClearStatus { .. } => {}
            InternalEvent::PageFetched {
                listing,
                ticket,
                result,
            } => handle_page_fetched(state, view_data, tx, listing, &ticket, result),
        }
    }
}

fn handle_page_fetched(
    state: &mut AppState,
    view_data: &mut ViewData,
    tx: &Sender<InternalEvent>,
    listing: ScreenKind,
    ticket: &FetchTicket,
    result: Result<Page<Product>, FetchError>,
) {
    let Some(view) = view_data
        .listings
        .iter_mut()
        .find(|view| view.screen == listing)
    else {
        return;
    };
    let resolution = view.controller.resolve(ticket, result);
    view_data.cache.record(&view.controller, resolution);
    match resolution {
        Resolution::Appended { .. } => view.trigger.rearm(),
        Resolution::Failed => {
            let message = view
                .controller
                .last_error()
                .map(|error| format!("{} load failed: {error}", listing.label()))
                .unwrap_or_else(|| format!("{} load failed", listing.label()));
            emit_status(state, view_data, tx, message);
        }
        Resolution::Superseded => {}
    }
}

fn dispatch_effects<R: AppRuntime>(
    runtime: &mut R,
    view_data: &mut ViewData,
    listing: ScreenKind,
    effects: Vec<ListEffect>,
    tx: &Sender<InternalEvent>,
) {
    for effect in effects {
        match effect {
            ListEffect::Invalidate(key) => {
                view_data.cache.invalidate(&key);
            }
            ListEffect::Fetch(request) => {
                if let Err(error) = runtime.spawn_fetch(listing, request, tx.clone()) {
                    warn!(%error, "dispatching page fetch failed");
                }
            }
        }
    }
}

fn observe_sentinel<R: AppRuntime>(
    state: &AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    tx: &Sender<InternalEvent>,
) {
    if !state.is_listing() {
        return;
    }
    let viewport_rows = view_data.viewport_rows;
    let Some(view) = view_data.listing_mut(state.screen) else {
        return;
    };
    let visible = sentinel_visible(view, state.view_type, viewport_rows);
    if !view.trigger.observe(visible) {
        return;
    }
    let effects = view.controller.on_visibility_trigger();
    dispatch_effects(runtime, view_data, state.screen, effects, tx);
}

fn schedule_status_clear(internal_tx: &Sender<InternalEvent>, token: u64) {
    let sender = internal_tx.clone();
    thread::spawn(move || {
        thread::sleep(Duration::from_secs(4));
        let _ = sender.send(InternalEvent::ClearStatus { token });
    });
}

fn emit_status(
    state: &mut AppState,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    message: impl Into<String>,
) {
    let events = state.dispatch(AppCommand::SetStatus(message.into()));
    apply_status_events(view_data, internal_tx, &events);
}

fn apply_status_events(view_data: &mut ViewData, internal_tx: &Sender<InternalEvent>, events: &[AppEvent]) {
    if events
        .iter()
        .any(|event| matches!(event, AppEvent::StatusUpdated(_)))
    {
        view_data.status_token = view_data.status_token.saturating_add(1);
        schedule_status_clear(internal_tx, view_data.status_token);
    }
}

fn handle_key_event<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
) -> bool {
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        return true;
    }

    match key.code {
        KeyCode::Char('q') => return true,
        KeyCode::Tab => {
            state.dispatch(AppCommand::NextListing);
            return false;
        }
        KeyCode::Char('v') => {
            let events = state.dispatch(AppCommand::ToggleViewType);
            apply_status_events(view_data, internal_tx, &events);
            if let Err(error) = runtime.save_view_type(state.view_type) {
                emit_status(state, view_data, internal_tx, format!("save view failed: {error}"));
            }
            let viewport_rows = view_data.viewport_rows;
            for view in &mut view_data.listings {
                scroll_to_selected(view, state.view_type, viewport_rows);
            }
            return false;
        }
        _ => {}
    }

    if state.screen == ScreenKind::Cart {
        handle_cart_key(state, runtime, view_data, internal_tx, key);
    } else {
        handle_listing_key(state, runtime, view_data, internal_tx, key);
    }
    false
}

fn handle_listing_key<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
) {
    let screen = state.screen;
    let view_type = state.view_type;
    let viewport_rows = view_data.viewport_rows;

    match key.code {
        KeyCode::Char('j') | KeyCode::Down => {
            if let Some(view) = view_data.listing_mut(screen) {
                let last = view.controller.item_count().saturating_sub(1);
                view.selected = (view.selected + 1).min(last);
                scroll_to_selected(view, view_type, viewport_rows);
            }
        }
        KeyCode::Char('k') | KeyCode::Up => {
            if let Some(view) = view_data.listing_mut(screen) {
                view.selected = view.selected.saturating_sub(1);
                scroll_to_selected(view, view_type, viewport_rows);
            }
        }
        KeyCode::Char('s') => {
            let Some(view) = view_data.listing_mut(screen) else {
                return;
            };
            let sort = view.controller.filters().sort().next();
            let mut filters = view.controller.filters().clone();
            filters.set_sort(sort);
            let effects = view.controller.on_filter_change(filters);
            view.reset_view();
            dispatch_effects(runtime, view_data, screen, effects, internal_tx);
            if let Err(error) = runtime.save_sort(sort) {
                warn!(%error, "saving sort failed");
            }
            emit_status(state, view_data, internal_tx, format!("sort: {}", sort.label()));
        }
        KeyCode::Char(']') | KeyCode::Char('[') if screen == ScreenKind::Category => {
            let forward = key.code == KeyCode::Char(']');
            switch_category(state, runtime, view_data, internal_tx, forward);
        }
        KeyCode::Char('r') => {
            let Some(view) = view_data.listing_mut(screen) else {
                return;
            };
            // A failed next page is retried in place; loaded pages stay.
            let retry_next =
                view.controller.status() == ListStatus::Error && !view.controller.pages().is_empty();
            let effects = if retry_next {
                view.controller.on_visibility_trigger()
            } else {
                let effects = view.controller.refresh();
                view.reset_view();
                effects
            };
            dispatch_effects(runtime, view_data, screen, effects, internal_tx);
            let message = if retry_next {
                "retrying next page"
            } else {
                "refreshing"
            };
            emit_status(state, view_data, internal_tx, message);
        }
        KeyCode::Char('a') => {
            let Some(product) = view_data
                .listing(screen)
                .and_then(ListingView::selected_product)
                .cloned()
            else {
                emit_status(state, view_data, internal_tx, "nothing selected");
                return;
            };
            let message = match runtime.add_to_cart(&product) {
                Ok(count) => {
                    if let Err(error) = reload_cart(runtime, view_data) {
                        warn!(%error, "reloading cart failed");
                    }
                    format!("added {} ({count} in cart)", product.name)
                }
                Err(error) => format!("add to cart failed: {error}"),
            };
            emit_status(state, view_data, internal_tx, message);
        }
        KeyCode::Char('l') => {
            let Some(product) = view_data
                .listing(screen)
                .and_then(ListingView::selected_product)
                .cloned()
            else {
                return;
            };
            let liked = !view_data.liked.contains(&product.id);
            let message = match runtime.set_liked(product.id, liked) {
                Ok(()) => {
                    if liked {
                        view_data.liked.insert(product.id);
                        format!("liked {}", product.name)
                    } else {
                        view_data.liked.remove(&product.id);
                        format!("unliked {}", product.name)
                    }
                }
                Err(error) => format!("like failed: {error}"),
            };
            emit_status(state, view_data, internal_tx, message);
        }
        KeyCode::Char('c') => {
            if let Err(error) = reload_cart(runtime, view_data) {
                emit_status(state, view_data, internal_tx, format!("cart load failed: {error}"));
            }
            state.dispatch(AppCommand::OpenCart);
        }
        _ => {}
    }
}

fn switch_category<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    forward: bool,
) {
    if view_data.categories.is_empty() {
        emit_status(state, view_data, internal_tx, "no categories loaded");
        return;
    }
    let count = view_data.categories.len();
    let current = view_data
        .listing(ScreenKind::Category)
        .and_then(|view| view.controller.filters().category_id());
    let index = current
        .and_then(|id| view_data.categories.iter().position(|c| c.id == id))
        .map(|index| {
            if forward {
                (index + 1) % count
            } else {
                (index + count - 1) % count
            }
        })
        .unwrap_or(0);
    let category = view_data.categories[index].clone();

    let Some(view) = view_data.listing_mut(ScreenKind::Category) else {
        return;
    };
    let mut filters = view.controller.filters().clone();
    filters.set(CATEGORY_FIELD, category.id.to_string());
    let effects = view.controller.on_filter_change(filters);
    view.reset_view();
    dispatch_effects(runtime, view_data, ScreenKind::Category, effects, internal_tx);
    emit_status(state, view_data, internal_tx, format!("category: {}", category.name));
}

fn handle_cart_key<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
) {
    let selected_item = view_data.cart.items.get(view_data.cart.selected).cloned();

    match key.code {
        KeyCode::Esc | KeyCode::Char('c') => {
            state.dispatch(AppCommand::CloseCart);
        }
        KeyCode::Char('j') | KeyCode::Down => {
            let last = view_data.cart.items.len().saturating_sub(1);
            view_data.cart.selected = (view_data.cart.selected + 1).min(last);
        }
        KeyCode::Char('k') | KeyCode::Up => {
            view_data.cart.selected = view_data.cart.selected.saturating_sub(1);
        }
        KeyCode::Char(' ') => {
            if let Some(item) = selected_item {
                view_data.cart.selection.toggle(item.product_id);
            }
        }
        KeyCode::Char('A') => {
            let cart = &mut view_data.cart;
            cart.selection.toggle_all(&cart.items);
        }
        KeyCode::Char('+') | KeyCode::Char('-') => {
            let Some(item) = selected_item else {
                return;
            };
            let count = if key.code == KeyCode::Char('+') {
                item.order_count.saturating_add(1)
            } else {
                item.order_count - 1
            };
            if count < 1 {
                emit_status(state, view_data, internal_tx, "count is already 1 -- press d to remove");
                return;
            }
            let result = runtime
                .set_cart_count(item.product_id, count)
                .and_then(|()| reload_cart(runtime, view_data));
            if let Err(error) = result {
                emit_status(state, view_data, internal_tx, format!("update count failed: {error}"));
            }
        }
        KeyCode::Char('d') => {
            let Some(item) = selected_item else {
                return;
            };
            let message = match runtime
                .remove_cart_item(item.product_id)
                .and_then(|()| reload_cart(runtime, view_data))
            {
                Ok(()) => format!("removed {}", item.name),
                Err(error) => format!("remove failed: {error}"),
            };
            emit_status(state, view_data, internal_tx, message);
        }
        KeyCode::Char('o') => {
            let order = OrderFormInput::from_selection(&view_data.cart.items, &view_data.cart.selection);
            let total = view_data.cart.selection.total(&view_data.cart.items);
            let message = match order
                .validate()
                .and_then(|()| runtime.place_order(&order))
            {
                Ok(()) => {
                    view_data.cart.selection.clear();
                    if let Err(error) = reload_cart(runtime, view_data) {
                        warn!(%error, "reloading cart failed");
                    }
                    format!(
                        "ordered {} item(s) for ₩{}",
                        order.items.len(),
                        format_price(total)
                    )
                }
                Err(error) => format!("order failed: {error}"),
            };
            emit_status(state, view_data, internal_tx, message);
        }
        _ => {}
    }
}

fn reload_cart<R: AppRuntime>(runtime: &mut R, view_data: &mut ViewData) -> Result<()> {
    let items = runtime.load_cart()?;
    view_data.cart.selection.retain_present(&items);
    view_data.cart.selected = view_data.cart.selected.min(items.len().saturating_sub(1));
    view_data.cart.items = items;
    Ok(())
}

const fn columns_for(view_type: ViewType) -> usize {
    match view_type {
        ViewType::Grid => GRID_COLUMNS,
        ViewType::List => 1,
    }
}

fn item_rows(item_count: usize, view_type: ViewType) -> usize {
    item_count.div_ceil(columns_for(view_type))
}

/// The footer row sits right after the last item row. It counts as visible
/// once it falls inside the scrolled window.
fn sentinel_visible(view: &ListingView, view_type: ViewType, viewport_rows: usize) -> bool {
    if viewport_rows == 0 {
        return false;
    }
    let sentinel_row = item_rows(view.controller.item_count(), view_type);
    sentinel_row >= view.offset && sentinel_row < view.offset + viewport_rows
}

/// Keeps the selected item on screen. Selecting the last item also scrolls
/// the footer into view, which is what asks for the next page.
fn scroll_to_selected(view: &mut ListingView, view_type: ViewType, viewport_rows: usize) {
    if viewport_rows == 0 {
        return;
    }
    let columns = columns_for(view_type);
    let item_count = view.controller.item_count();
    let selected_row = view.selected / columns;
    let target_row = if item_count > 0 && view.selected + 1 >= item_count {
        item_rows(item_count, view_type)
    } else {
        selected_row
    };

    if selected_row < view.offset {
        view.offset = selected_row;
    }
    if target_row >= view.offset + viewport_rows {
        view.offset = target_row + 1 - viewport_rows;
    }
}

fn body_viewport_rows(frame_height: u16, state: &AppState) -> usize {
    // tabs (3) + status (2) + body borders (2)
    let chrome = 7usize;
    let header = usize::from(state.view_type == ViewType::List);
    usize::from(frame_height).saturating_sub(chrome + header)
}

fn footer_text(controller: &ListController<Product>) -> String {
    let error = controller
        .last_error()
        .map(ToString::to_string)
        .unwrap_or_default();
    match controller.status() {
        ListStatus::Idle | ListStatus::Loading => "loading...".to_owned(),
        ListStatus::Error if controller.pages().is_empty() => {
            format!("failed to load: {error} -- press r to retry")
        }
        _ if controller.is_fetching_next() => "loading more...".to_owned(),
        ListStatus::Error => format!("load more failed: {error} -- press r to retry"),
        ListStatus::Success if controller.has_next_page() => "load more".to_owned(),
        ListStatus::Success => "nothing more to load".to_owned(),
    }
}

fn listing_title(view: &ListingView) -> String {
    let name = view
        .controller
        .title()
        .map(str::to_owned)
        .unwrap_or_else(|| view.screen.label().to_owned());
    format!(
        "{name} · {} products · {}",
        view.controller.total_results(),
        view.controller.filters().sort().label()
    )
}

fn cart_title(cart: &CartView) -> String {
    format!(
        "cart · {} of {} selected · total ₩{}",
        cart.selection.count(&cart.items),
        cart.items.len(),
        format_price(cart.selection.total(&cart.items))
    )
}

fn status_text(state: &AppState) -> String {
    if let Some(status) = &state.status_line {
        return status.clone();
    }
    match state.screen {
        ScreenKind::Cart => {
            "j/k move · space check · A all · +/- count · d remove · o order · c back".to_owned()
        }
        ScreenKind::Category => {
            "j/k move · s sort · [/] category · r refresh · v view · a add · l like · c cart · tab · q"
                .to_owned()
        }
        ScreenKind::ManageProducts => {
            "j/k move · s sort · r refresh · v view · a add · l like · c cart · tab · q".to_owned()
        }
    }
}

fn render(frame: &mut ratatui::Frame<'_>, state: &AppState, view_data: &ViewData) {
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(1),
            Constraint::Length(2),
        ])
        .split(frame.area());

    let screens = [ScreenKind::Category, ScreenKind::ManageProducts, ScreenKind::Cart];
    let selected = screens
        .iter()
        .position(|screen| *screen == state.screen)
        .unwrap_or(0);
    let titles = screens
        .iter()
        .map(|screen| match screen {
            ScreenKind::Cart => format!("cart ({})", view_data.cart.items.len()),
            other => other.label().to_owned(),
        })
        .collect::<Vec<String>>();
    let tabs = Tabs::new(titles)
        .block(Block::default().title("shopfront").borders(Borders::ALL))
        .style(Style::default().fg(Color::White))
        .highlight_style(
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        )
        .select(selected);
    frame.render_widget(tabs, layout[0]);

    if state.screen == ScreenKind::Cart {
        render_cart(frame, layout[1], &view_data.cart);
    } else if let Some(view) = view_data.listing(state.screen) {
        render_listing(frame, layout[1], state.view_type, view, &view_data.liked);
    }

    let status_widget = Paragraph::new(status_text(state))
        .style(Style::default().fg(Color::Yellow))
        .block(Block::default().borders(Borders::TOP));
    frame.render_widget(status_widget, layout[2]);
}

fn product_label(product: &Product, liked: &BTreeSet<ProductId>) -> String {
    let mark = if liked.contains(&product.id) {
        format!("{LIKED_MARK} ")
    } else {
        String::new()
    };
    format!("{mark}{} · ₩{}", product.name, format_price(product.price))
}

fn render_listing(
    frame: &mut ratatui::Frame<'_>,
    area: Rect,
    view_type: ViewType,
    view: &ListingView,
    liked: &BTreeSet<ProductId>,
) {
    let selected_style = Style::default()
        .fg(Color::Black)
        .bg(Color::Cyan)
        .add_modifier(Modifier::BOLD);
    let products: Vec<&Product> = view.controller.all_items().collect();
    let footer = footer_text(&view.controller);

    let table = match view_type {
        ViewType::List => {
            let mut rows: Vec<Row<'_>> = products
                .iter()
                .enumerate()
                .skip(view.offset)
                .map(|(index, product)| {
                    let style = if index == view.selected {
                        selected_style
                    } else {
                        Style::default()
                    };
                    Row::new(vec![
                        Cell::from(if liked.contains(&product.id) { LIKED_MARK } else { "" }),
                        Cell::from(product.name.clone()),
                        Cell::from(format!("₩{}", format_price(product.price))),
                        Cell::from(product.stock.to_string()),
                    ])
                    .style(style)
                })
                .collect();
            rows.push(Row::new(vec![Cell::from(""), Cell::from(footer)]).style(Style::default().fg(Color::DarkGray)));
            Table::new(
                rows,
                [
                    Constraint::Length(2),
                    Constraint::Min(16),
                    Constraint::Length(14),
                    Constraint::Length(6),
                ],
            )
            .header(
                Row::new(vec!["", "product", "price", "stock"]).style(
                    Style::default()
                        .fg(Color::White)
                        .add_modifier(Modifier::BOLD),
                ),
            )
        }
        ViewType::Grid => {
            let mut rows: Vec<Row<'_>> = products
                .chunks(GRID_COLUMNS)
                .enumerate()
                .skip(view.offset)
                .map(|(row_index, chunk)| {
                    let cells = chunk.iter().enumerate().map(|(column, product)| {
                        let index = row_index * GRID_COLUMNS + column;
                        let style = if index == view.selected {
                            selected_style
                        } else {
                            Style::default()
                        };
                        Cell::from(product_label(product, liked)).style(style)
                    });
                    Row::new(cells.collect::<Vec<_>>())
                })
                .collect();
            rows.push(Row::new(vec![Cell::from(footer)]).style(Style::default().fg(Color::DarkGray)));
            Table::new(rows, [Constraint::Percentage(50), Constraint::Percentage(50)])
        }
    };

    frame.render_widget(
        table.block(Block::default().borders(Borders::ALL).title(listing_title(view))),
        area,
    );
}

fn render_cart(frame: &mut ratatui::Frame<'_>, area: Rect, cart: &CartView) {
    if cart.items.is_empty() {
        let empty = Paragraph::new("shopping list is empty -- press c to go back and a to add")
            .block(Block::default().borders(Borders::ALL).title(cart_title(cart)));
        frame.render_widget(empty, area);
        return;
    }

    let rows = cart.items.iter().enumerate().map(|(index, item)| {
        let mark = if cart.selection.is_checked(item.product_id) {
            CHECKED_MARK
        } else {
            UNCHECKED_MARK
        };
        let style = if index == cart.selected {
            Style::default().fg(Color::Black).bg(Color::Cyan)
        } else {
            Style::default()
        };
        Row::new(vec![
            Cell::from(mark),
            Cell::from(item.name.clone()),
            Cell::from(format!("₩{}", format_price(item.price))),
            Cell::from(format!("x{}", item.order_count)),
            Cell::from(format!("₩{}", format_price(item.line_total()))),
        ])
        .style(style)
    });
    let table = Table::new(
        rows,
        [
            Constraint::Length(4),
            Constraint::Min(16),
            Constraint::Length(14),
            Constraint::Length(5),
            Constraint::Length(14),
        ],
    )
    .header(
        Row::new(vec!["", "product", "price", "count", "total"]).style(
            Style::default()
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        ),
    )
    .block(Block::default().borders(Borders::ALL).title(cart_title(cart)));
    frame.render_widget(table, area);
}

#[cfg(test)]
mod tests {
    use super::{
        AppRuntime, InternalEvent, LaunchOptions, ViewData, body_viewport_rows, footer_text,
        handle_key_event, listing_title, process_internal_events, scroll_to_selected,
        sentinel_visible, start_view_data, status_text,
    };
    use anyhow::{Result, bail};
    use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
    use shopfront_app::{
        AppState, CartItem, Category, CategoryId, FetchError, FetchRequest, ListStatus,
        OrderFormInput, Page, PageSource, Product, ProductId, ScreenKind, SortState, ViewType,
    };
    use shopfront_testkit::{Catalog, ProductFaker};
    use std::collections::BTreeSet;
    use std::sync::mpsc::{self, Receiver, Sender};

    struct TestRuntime {
        catalog: Catalog,
        categories: Vec<Category>,
        cart: Vec<CartItem>,
        liked: BTreeSet<ProductId>,
        orders: Vec<OrderFormInput>,
        saved_view: Option<ViewType>,
        saved_sort: Option<SortState>,
    }

    impl TestRuntime {
        fn with_products(count: usize, page_size: usize) -> Self {
            let mut faker = ProductFaker::new(9);
            Self {
                catalog: Catalog::new(faker.products(count), page_size).with_title("Bags"),
                categories: vec![faker.category(1), faker.category(2)],
                cart: Vec::new(),
                liked: BTreeSet::new(),
                orders: Vec::new(),
                saved_view: None,
                saved_sort: None,
            }
        }
    }

    impl AppRuntime for TestRuntime {
        fn fetch_page(&mut self, request: &FetchRequest) -> Result<Page<Product>, FetchError> {
            self.catalog.fetch_page(&request.filters, request.cursor())
        }

        fn load_categories(&mut self) -> Result<Vec<Category>> {
            Ok(self.categories.clone())
        }

        fn load_liked(&mut self) -> Result<BTreeSet<ProductId>> {
            Ok(self.liked.clone())
        }

        fn set_liked(&mut self, product_id: ProductId, liked: bool) -> Result<()> {
            if liked {
                self.liked.insert(product_id);
            } else {
                self.liked.remove(&product_id);
            }
            Ok(())
        }

        fn load_cart(&mut self) -> Result<Vec<CartItem>> {
            Ok(self.cart.clone())
        }

        fn add_to_cart(&mut self, product: &Product) -> Result<i64> {
            if let Some(item) = self
                .cart
                .iter_mut()
                .find(|item| item.product_id == product.id)
            {
                item.order_count += 1;
                return Ok(item.order_count);
            }
            self.cart.push(CartItem::from_product(product));
            Ok(1)
        }

        fn set_cart_count(&mut self, product_id: ProductId, count: i64) -> Result<()> {
            match self.cart.iter_mut().find(|item| item.product_id == product_id) {
                Some(item) => {
                    item.order_count = count;
                    Ok(())
                }
                None => bail!("product {product_id} is not in the shopping list"),
            }
        }

        fn remove_cart_item(&mut self, product_id: ProductId) -> Result<()> {
            self.cart.retain(|item| item.product_id != product_id);
            Ok(())
        }

        fn place_order(&mut self, order: &OrderFormInput) -> Result<()> {
            let ordered: Vec<ProductId> = order.items.iter().map(|line| line.product_id).collect();
            self.cart.retain(|item| !ordered.contains(&item.product_id));
            self.orders.push(order.clone());
            Ok(())
        }

        fn save_view_type(&mut self, view_type: ViewType) -> Result<()> {
            self.saved_view = Some(view_type);
            Ok(())
        }

        fn save_sort(&mut self, sort: SortState) -> Result<()> {
            self.saved_sort = Some(sort);
            Ok(())
        }
    }

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    struct Harness {
        state: AppState,
        runtime: TestRuntime,
        view_data: ViewData,
        tx: Sender<InternalEvent>,
        rx: Receiver<InternalEvent>,
    }

    impl Harness {
        fn start(mut runtime: TestRuntime) -> Self {
            let mut state = AppState::default();
            let (tx, rx) = mpsc::channel();
            let view_data =
                start_view_data(&mut state, &mut runtime, LaunchOptions::default(), &tx);
            Self {
                state,
                runtime,
                view_data,
                tx,
                rx,
            }
        }

        fn press(&mut self, code: KeyCode) -> bool {
            handle_key_event(
                &mut self.state,
                &mut self.runtime,
                &mut self.view_data,
                &self.tx,
                key(code),
            )
        }

        fn pump(&mut self) {
            process_internal_events(&mut self.state, &mut self.view_data, &self.tx, &self.rx);
        }

        fn observe(&mut self) {
            super::observe_sentinel(&self.state, &mut self.runtime, &mut self.view_data, &self.tx);
        }

        fn category_ids(&self) -> Vec<i64> {
            self.view_data
                .listing(ScreenKind::Category)
                .map(|view| view.controller.all_items().map(|p| p.id.get()).collect())
                .unwrap_or_default()
        }
    }

    #[test]
    fn startup_loads_first_page_of_both_listings() {
        let mut harness = Harness::start(TestRuntime::with_products(5, 2));
        assert_eq!(harness.runtime.catalog.call_count(), 2);

        harness.pump();
        let view = harness
            .view_data
            .listing(ScreenKind::Category)
            .expect("category listing");
        assert_eq!(view.controller.status(), ListStatus::Success);
        assert_eq!(view.controller.item_count(), 2);
        assert_eq!(view.controller.filters().category_id(), Some(CategoryId::new(1)));
        assert_eq!(listing_title(view), "Bags · 5 products · newest");
        assert_eq!(footer_text(&view.controller), "load more");
    }

    #[test]
    fn visible_sentinel_fetches_until_viewport_is_filled() {
        let mut harness = Harness::start(TestRuntime::with_products(5, 2));
        harness.state.view_type = ViewType::List;
        harness.view_data.viewport_rows = 20;
        harness.pump();

        harness.observe();
        harness.observe();
        assert_eq!(harness.runtime.catalog.call_count(), 3, "one next-page fetch");

        harness.pump();
        harness.observe();
        harness.pump();
        assert_eq!(harness.category_ids(), vec![5, 4, 3, 2, 1]);

        harness.observe();
        assert_eq!(harness.runtime.catalog.call_count(), 4);
        let view = harness
            .view_data
            .listing(ScreenKind::Category)
            .expect("category listing");
        assert_eq!(footer_text(&view.controller), "nothing more to load");
    }

    #[test]
    fn hidden_sentinel_does_not_fetch() {
        let mut harness = Harness::start(TestRuntime::with_products(10, 4));
        harness.state.view_type = ViewType::List;
        harness.view_data.viewport_rows = 2;
        harness.pump();

        harness.observe();
        assert_eq!(harness.runtime.catalog.call_count(), 2);

        for _ in 0..3 {
            harness.press(KeyCode::Char('j'));
        }
        harness.observe();
        assert_eq!(harness.runtime.catalog.call_count(), 3);
    }

    #[test]
    fn sort_change_drops_results_for_previous_sort() {
        let mut harness = Harness::start(TestRuntime::with_products(6, 3));
        harness.press(KeyCode::Char('s'));
        harness.pump();

        let view = harness
            .view_data
            .listing(ScreenKind::Category)
            .expect("category listing");
        assert_eq!(view.controller.filters().sort(), SortState::ALL[1]);
        assert_eq!(view.controller.pages().len(), 1, "stale first page was dropped");
        assert_eq!(harness.runtime.saved_sort, Some(SortState::ALL[1]));
        assert_eq!(harness.state.status_line.as_deref(), Some("sort: price: high to low"));
    }

    #[test]
    fn failed_first_page_reports_and_retries_on_refresh() {
        let runtime = TestRuntime::with_products(3, 5);
        runtime.catalog.fail_next(FetchError::Rejected {
            status: 500,
            message: "down".to_owned(),
        });
        let mut harness = Harness::start(runtime);
        harness.pump();

        let view = harness
            .view_data
            .listing(ScreenKind::Category)
            .expect("category listing");
        assert_eq!(view.controller.status(), ListStatus::Error);
        assert!(footer_text(&view.controller).contains("press r to retry"));
        assert!(
            harness
                .state
                .status_line
                .as_deref()
                .is_some_and(|status| status.contains("shop load failed"))
        );

        harness.press(KeyCode::Char('r'));
        harness.pump();
        assert_eq!(harness.category_ids().len(), 3);
    }

    #[test]
    fn failed_next_page_retries_in_place() {
        let mut harness = Harness::start(TestRuntime::with_products(5, 2));
        harness.state.view_type = ViewType::List;
        harness.view_data.viewport_rows = 20;
        harness.pump();

        harness.runtime.catalog.fail_next(FetchError::Rejected {
            status: 500,
            message: "down".to_owned(),
        });
        harness.observe();
        harness.pump();
        assert_eq!(harness.runtime.catalog.call_count(), 3);
        let view = harness
            .view_data
            .listing(ScreenKind::Category)
            .expect("category listing");
        assert_eq!(view.controller.status(), ListStatus::Error);
        assert_eq!(
            footer_text(&view.controller),
            "load more failed: server error (500): down -- press r to retry"
        );

        for code in [KeyCode::Char('k'), KeyCode::Char('j')] {
            harness.press(code);
            harness.observe();
            harness.pump();
        }
        assert_eq!(harness.runtime.catalog.call_count(), 3, "sentinel never left view");

        harness.press(KeyCode::Char('r'));
        assert_eq!(harness.runtime.catalog.call_count(), 4);
        assert_eq!(harness.category_ids(), vec![5, 4], "loaded pages are kept");
        assert_eq!(harness.state.status_line.as_deref(), Some("retrying next page"));

        harness.pump();
        assert_eq!(harness.category_ids(), vec![5, 4, 3, 2]);
        let view = harness
            .view_data
            .listing(ScreenKind::Category)
            .expect("category listing");
        assert_eq!(view.controller.status(), ListStatus::Success);
    }

    #[test]
    fn category_keys_switch_scope() {
        let mut harness = Harness::start(TestRuntime::with_products(4, 4));
        harness.pump();

        harness.press(KeyCode::Char(']'));
        let view = harness
            .view_data
            .listing(ScreenKind::Category)
            .expect("category listing");
        assert_eq!(view.controller.filters().category_id(), Some(CategoryId::new(2)));
        assert_eq!(view.controller.item_count(), 0);

        harness.press(KeyCode::Char('['));
        let view = harness
            .view_data
            .listing(ScreenKind::Category)
            .expect("category listing");
        assert_eq!(view.controller.filters().category_id(), Some(CategoryId::new(1)));
    }

    #[test]
    fn add_like_and_order_from_cart() {
        let mut harness = Harness::start(TestRuntime::with_products(4, 4));
        harness.pump();

        harness.press(KeyCode::Char('a'));
        harness.press(KeyCode::Char('a'));
        harness.press(KeyCode::Char('j'));
        harness.press(KeyCode::Char('a'));
        harness.press(KeyCode::Char('l'));
        assert_eq!(harness.runtime.cart.len(), 2);
        assert_eq!(harness.runtime.cart[0].order_count, 2);
        assert_eq!(harness.runtime.liked.len(), 1);

        harness.press(KeyCode::Char('c'));
        assert_eq!(harness.state.screen, ScreenKind::Cart);
        assert_eq!(harness.view_data.cart.items.len(), 2);

        harness.press(KeyCode::Char('o'));
        assert!(
            harness
                .state
                .status_line
                .as_deref()
                .is_some_and(|status| status.contains("order is empty"))
        );

        harness.press(KeyCode::Char(' '));
        harness.press(KeyCode::Char('+'));
        let first = harness.view_data.cart.items[0].clone();
        assert_eq!(first.order_count, 3);
        assert_eq!(
            harness.view_data.cart.selection.total(&harness.view_data.cart.items),
            first.price * 3
        );

        harness.press(KeyCode::Char('o'));
        assert_eq!(harness.runtime.orders.len(), 1);
        assert_eq!(harness.runtime.orders[0].items[0].count, 3);
        assert_eq!(harness.view_data.cart.items.len(), 1);
        assert_eq!(harness.view_data.cart.selection.count(&harness.view_data.cart.items), 0);
    }

    #[test]
    fn cart_toggle_all_and_remove() {
        let mut harness = Harness::start(TestRuntime::with_products(3, 3));
        harness.pump();
        harness.press(KeyCode::Char('a'));
        harness.press(KeyCode::Char('j'));
        harness.press(KeyCode::Char('a'));
        harness.press(KeyCode::Char('c'));

        harness.press(KeyCode::Char('A'));
        assert!(harness.view_data.cart.selection.all_checked(&harness.view_data.cart.items));

        harness.press(KeyCode::Char('-'));
        assert_eq!(harness.view_data.cart.items[0].order_count, 1);

        harness.press(KeyCode::Char('d'));
        assert_eq!(harness.view_data.cart.items.len(), 1);
        assert_eq!(harness.view_data.cart.selection.count(&harness.view_data.cart.items), 1);

        harness.press(KeyCode::Esc);
        assert_eq!(harness.state.screen, ScreenKind::Category);
    }

    #[test]
    fn view_toggle_and_tab_switch() {
        let mut harness = Harness::start(TestRuntime::with_products(2, 2));
        harness.press(KeyCode::Char('v'));
        assert_eq!(harness.state.view_type, ViewType::List);
        assert_eq!(harness.runtime.saved_view, Some(ViewType::List));

        harness.press(KeyCode::Tab);
        assert_eq!(harness.state.screen, ScreenKind::ManageProducts);
        assert!(status_text(&harness.state).contains("list view"));
        assert!(harness.press(KeyCode::Char('q')));
    }

    #[test]
    fn grid_scroll_reveals_footer_at_last_item() {
        let mut harness = Harness::start(TestRuntime::with_products(8, 8));
        harness.pump();
        let view_type = ViewType::Grid;
        let view = harness
            .view_data
            .listing_mut(ScreenKind::Category)
            .expect("category listing");

        assert!(!sentinel_visible(view, view_type, 2));
        view.selected = 7;
        scroll_to_selected(view, view_type, 2);
        assert_eq!(view.offset, 3);
        assert!(sentinel_visible(view, view_type, 2));
    }

    #[test]
    fn viewport_rows_exclude_chrome() {
        let mut state = AppState::default();
        assert_eq!(body_viewport_rows(30, &state), 23);
        state.view_type = ViewType::List;
        assert_eq!(body_viewport_rows(30, &state), 22);
        assert_eq!(body_viewport_rows(4, &state), 0);
    }
}
