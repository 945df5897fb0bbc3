// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow, bail};
use rusqlite::{Connection, OptionalExtension, params};
use shopfront_app::{CartItem, ProductId, SortState, ViewType};
use std::collections::BTreeSet;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tracing::debug;

pub const APP_NAME: &str = "shopfront";

const SETTING_VIEW_TYPE: &str = "ui.view_type";
const SETTING_SORT: &str = "ui.sort";

const REQUIRED_SCHEMA: &[(&str, &[&str])] = &[
    (
        "cart_items",
        &[
            "product_id",
            "name",
            "price",
            "image_url",
            "order_count",
            "created_at",
            "updated_at",
        ],
    ),
    ("settings", &["key", "value", "updated_at"]),
];

/// Local persistence for the shopping list and a handful of UI preferences.
///
/// The store is handed to whoever needs it; there is no process-wide
/// instance.
pub struct Store {
    conn: Connection,
}

impl Store {
    pub fn open(path: &Path) -> Result<Self> {
        let printable = path.to_string_lossy().to_string();
        validate_db_path(&printable)?;
        let conn = Connection::open(path)
            .with_context(|| format!("open database at {}", path.display()))?;
        configure_connection(&conn)?;
        Ok(Self { conn })
    }

    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("open in-memory database")?;
        configure_connection(&conn)?;
        Ok(Self { conn })
    }

    pub fn raw_connection(&self) -> &Connection {
        &self.conn
    }

    pub fn bootstrap(&self) -> Result<()> {
        if has_user_tables(&self.conn)? {
            validate_schema(&self.conn)?;
        } else {
            self.conn
                .execute_batch(include_str!("sql/schema.sql"))
                .context("create schema")?;
        }
        Ok(())
    }

    pub fn list_cart_items(&self) -> Result<Vec<CartItem>> {
        let mut stmt = self
            .conn
            .prepare(
                "
                SELECT product_id, name, price, image_url, order_count
                FROM cart_items
                ORDER BY created_at ASC, product_id ASC
                ",
            )
            .context("prepare cart query")?;
        let rows = stmt
            .query_map([], |row| {
                Ok(CartItem {
                    product_id: ProductId::new(row.get(0)?),
                    name: row.get(1)?,
                    price: row.get(2)?,
                    image_url: row.get(3)?,
                    order_count: row.get(4)?,
                })
            })
            .context("query cart items")?;

        rows.collect::<rusqlite::Result<Vec<_>>>()
            .context("collect cart items")
    }

    pub fn find_cart_item(&self, product_id: ProductId) -> Result<Option<CartItem>> {
        self.conn
            .query_row(
                "
                SELECT product_id, name, price, image_url, order_count
                FROM cart_items
                WHERE product_id = ?
                ",
                params![product_id.get()],
                |row| {
                    Ok(CartItem {
                        product_id: ProductId::new(row.get(0)?),
                        name: row.get(1)?,
                        price: row.get(2)?,
                        image_url: row.get(3)?,
                        order_count: row.get(4)?,
                    })
                },
            )
            .optional()
            .with_context(|| format!("load cart item {product_id}"))
    }

    /// Adds a product to the list, or bumps its count by the incoming amount
    /// when it is already there. Name, price and image follow the latest
    /// product data. Returns the resulting count.
    pub fn add_to_cart(&self, item: &CartItem) -> Result<i64> {
        if item.order_count <= 0 {
            bail!(
                "cart count for product {} must be at least 1",
                item.product_id
            );
        }
        if item.price < 0 {
            bail!("product {} has a negative price", item.product_id);
        }

        let now = now_rfc3339()?;
        self.conn
            .execute(
                "
                INSERT INTO cart_items (
                  product_id, name, price, image_url, order_count,
                  created_at, updated_at
                ) VALUES (?, ?, ?, ?, ?, ?, ?)
                ON CONFLICT(product_id) DO UPDATE SET
                  name = excluded.name,
                  price = excluded.price,
                  image_url = excluded.image_url,
                  order_count = cart_items.order_count + excluded.order_count,
                  updated_at = excluded.updated_at
                ",
                params![
                    item.product_id.get(),
                    item.name,
                    item.price,
                    item.image_url,
                    item.order_count,
                    now,
                    now,
                ],
            )
            .context("upsert cart item")?;

        let count: i64 = self
            .conn
            .query_row(
                "SELECT order_count FROM cart_items WHERE product_id = ?",
                params![item.product_id.get()],
                |row| row.get(0),
            )
            .context("read cart count")?;
        debug!(product_id = %item.product_id, count, "cart item added");
        Ok(count)
    }

    pub fn set_cart_count(&self, product_id: ProductId, count: i64) -> Result<()> {
        if count <= 0 {
            bail!("cart count for product {product_id} must be at least 1 -- remove the item instead");
        }
        let now = now_rfc3339()?;
        let rows_affected = self
            .conn
            .execute(
                "
                UPDATE cart_items
                SET order_count = ?, updated_at = ?
                WHERE product_id = ?
                ",
                params![count, now, product_id.get()],
            )
            .context("update cart count")?;
        if rows_affected == 0 {
            bail!("product {product_id} is not in the shopping list");
        }
        Ok(())
    }

    pub fn remove_cart_item(&self, product_id: ProductId) -> Result<()> {
        let rows_affected = self
            .conn
            .execute(
                "DELETE FROM cart_items WHERE product_id = ?",
                params![product_id.get()],
            )
            .context("delete cart item")?;
        if rows_affected == 0 {
            bail!("product {product_id} is not in the shopping list");
        }
        Ok(())
    }

    /// Removes every listed product in one transaction. Ids that are not in
    /// the list are ignored. Returns how many rows were deleted.
    pub fn remove_cart_items(&mut self, product_ids: &[ProductId]) -> Result<usize> {
        let unique: BTreeSet<ProductId> = product_ids.iter().copied().collect();
        let tx = self.conn.transaction().context("begin cart removal")?;
        let mut removed = 0usize;
        {
            let mut stmt = tx
                .prepare("DELETE FROM cart_items WHERE product_id = ?")
                .context("prepare cart removal")?;
            for product_id in unique {
                removed += stmt
                    .execute(params![product_id.get()])
                    .with_context(|| format!("delete cart item {product_id}"))?;
            }
        }
        tx.commit().context("commit cart removal")?;
        Ok(removed)
    }

    pub fn clear_cart(&self) -> Result<usize> {
        self.conn
            .execute("DELETE FROM cart_items", [])
            .context("clear shopping list")
    }

    pub fn get_view_type(&self) -> Result<Option<ViewType>> {
        let raw = self.get_setting_raw(SETTING_VIEW_TYPE)?;
        raw.map(|value| {
            ViewType::parse(&value).ok_or_else(|| {
                anyhow!("setting `{SETTING_VIEW_TYPE}` has invalid value `{value}`; expected grid or list")
            })
        })
        .transpose()
    }

    pub fn put_view_type(&self, view_type: ViewType) -> Result<()> {
        self.put_setting_raw(SETTING_VIEW_TYPE, view_type.as_str())
    }

    pub fn get_sort(&self) -> Result<Option<SortState>> {
        let raw = self.get_setting_raw(SETTING_SORT)?;
        raw.map(|value| {
            SortState::parse(&value).ok_or_else(|| {
                anyhow!("setting `{SETTING_SORT}` has invalid value `{value}`; expected e.g. `createdAt desc`")
            })
        })
        .transpose()
    }

    pub fn put_sort(&self, sort: SortState) -> Result<()> {
        self.put_setting_raw(SETTING_SORT, &sort.as_wire())
    }

    fn get_setting_raw(&self, key: &str) -> Result<Option<String>> {
        self.conn
            .query_row(
                "SELECT value FROM settings WHERE key = ?",
                params![key],
                |row| row.get::<_, String>(0),
            )
            .optional()
            .with_context(|| format!("read setting {key}"))
    }

    fn put_setting_raw(&self, key: &str, value: &str) -> Result<()> {
        let now = now_rfc3339()?;
        self.conn
            .execute(
                "
                INSERT INTO settings (key, value, updated_at)
                VALUES (?, ?, ?)
                ON CONFLICT(key) DO UPDATE SET
                  value = excluded.value,
                  updated_at = excluded.updated_at
                ",
                params![key, value, now],
            )
            .with_context(|| format!("upsert setting {key}"))?;
        Ok(())
    }
}

pub fn default_db_path() -> Result<PathBuf> {
    if let Some(override_path) = env::var_os("SHOPFRONT_DB_PATH") {
        return Ok(PathBuf::from(override_path));
    }

    let data_root = dirs::data_local_dir().ok_or_else(|| {
        anyhow!("cannot resolve data directory; set SHOPFRONT_DB_PATH to a writable database path")
    })?;

    let app_dir = data_root.join(APP_NAME);
    fs::create_dir_all(&app_dir)
        .with_context(|| format!("create data directory {}", app_dir.display()))?;
    Ok(app_dir.join("shopfront.db"))
}

pub fn validate_db_path(path: &str) -> Result<()> {
    if path.is_empty() {
        bail!("database path must not be empty");
    }
    if path == ":memory:" {
        return Ok(());
    }

    if let Some(index) = path.find("://")
        && index > 0
    {
        let scheme = &path[..index];
        if scheme.chars().all(char::is_alphabetic) {
            bail!(
                "database path {path:?} looks like a URI ({scheme}://); pass a filesystem path instead"
            );
        }
    }

    if path.starts_with("file:") {
        bail!("database path {path:?} uses file: URI syntax; pass a plain filesystem path");
    }

    if path.contains('?') {
        bail!(
            "database path {path:?} contains '?'; remove query parameters and use a plain file path"
        );
    }

    Ok(())
}

fn has_user_tables(conn: &Connection) -> Result<bool> {
    let count: i64 = conn
        .query_row(
            "
            SELECT COUNT(*)
            FROM sqlite_master
            WHERE type = 'table'
              AND name NOT LIKE 'sqlite_%'
            ",
            [],
            |row| row.get(0),
        )
        .context("count user tables")?;
    Ok(count > 0)
}

fn validate_schema(conn: &Connection) -> Result<()> {
    for (table, required_columns) in REQUIRED_SCHEMA {
        let columns = table_columns(conn, table)?;
        if columns.is_empty() {
            bail!(
                "database is missing required table `{table}`; point storage.db_path at a shopfront database"
            );
        }

        let missing: Vec<&str> = required_columns
            .iter()
            .copied()
            .filter(|column| !columns.contains(*column))
            .collect();
        if !missing.is_empty() {
            bail!(
                "table `{table}` is missing required columns: {}; remove the database file to recreate it",
                missing.join(", ")
            );
        }
    }
    Ok(())
}

fn table_columns(conn: &Connection, table: &str) -> Result<BTreeSet<String>> {
    let mut stmt = conn
        .prepare(&format!("PRAGMA table_info({table})"))
        .with_context(|| format!("inspect columns for {table}"))?;
    let rows = stmt
        .query_map([], |row| row.get::<_, String>(1))
        .with_context(|| format!("query column info for {table}"))?;

    rows.collect::<rusqlite::Result<BTreeSet<_>>>()
        .with_context(|| format!("collect columns for {table}"))
}

fn configure_connection(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        PRAGMA foreign_keys = ON;
        PRAGMA journal_mode = WAL;
        PRAGMA synchronous = NORMAL;
        PRAGMA busy_timeout = 5000;
        ",
    )
    .context("configure sqlite pragmas")
}

fn now_rfc3339() -> Result<String> {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .context("format current timestamp")
}
