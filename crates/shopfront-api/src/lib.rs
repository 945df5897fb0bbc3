// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

//! Blocking client for the storefront REST API.
//!
//! Every response is wrapped in an `{ ok, error, ... }` envelope. Transport
//! failures, non-2xx statuses and `ok: false` bodies all surface as
//! [`FetchError`] so listing code can treat them uniformly.

use anyhow::{Context, Result, bail};
use reqwest::StatusCode;
use reqwest::blocking::{Client as HttpClient, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use shopfront_app::{
    Category, CategoryId, Cursor, FetchError, FilterForm, LikeId, LikeList, ListNamespace, Order,
    OrderFormInput, OrderId, OrderItem, OrderItemId, OrderStatus, Page, PageSource, Product,
    ProductFormInput, ProductId, ProductInfo, SortState, UserId,
};
use std::time::Duration;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tracing::debug;
use url::Url;

#[derive(Debug, Clone)]
pub struct Client {
    base_url: String,
    token: Option<String>,
    timeout: Duration,
    http: HttpClient,
}

impl Client {
    pub fn new(base_url: &str, token: Option<&str>, timeout: Duration) -> Result<Self> {
        let base_url = base_url.trim_end_matches('/').to_owned();
        if base_url.is_empty() {
            bail!("api.base_url must not be empty");
        }
        let parsed = Url::parse(&base_url)
            .with_context(|| format!("api.base_url {base_url:?} is not a valid URL"))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            bail!(
                "api.base_url must use http or https, got {}:// -- fix the scheme and retry",
                parsed.scheme()
            );
        }

        let http = HttpClient::builder()
            .timeout(timeout)
            .build()
            .context("build HTTP client")?;

        Ok(Self {
            base_url,
            token: token
                .map(str::trim)
                .filter(|token| !token.is_empty())
                .map(str::to_owned),
            timeout,
            http,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn has_token(&self) -> bool {
        self.token.is_some()
    }

    pub fn get_categories(&self) -> Result<Vec<Category>, FetchError> {
        let body: CategoriesBody = self.send(self.http.get(self.endpoint("/categories")), "categories")?;
        Ok(body.categories)
    }

    pub fn get_products_by_category(
        &self,
        category_id: CategoryId,
        order: SortState,
        page: Cursor,
    ) -> Result<Page<Product>, FetchError> {
        let request = self
            .http
            .get(self.endpoint(&format!("/categories/{category_id}")))
            .query(&[("order", order.as_wire()), ("page", page.to_string())]);
        let body: ProductsBody = self.send(request, "category products")?;
        Ok(body.into_page(page))
    }

    pub fn get_products_from_provider(
        &self,
        sort: SortState,
        page: Cursor,
    ) -> Result<Page<Product>, FetchError> {
        let request = self
            .http
            .get(self.endpoint("/products/provider"))
            .query(&[("sort", sort.as_wire()), ("page", page.to_string())]);
        let body: ProductsBody = self.send(request, "provider products")?;
        Ok(body.into_page(page))
    }

    pub fn find_product_by_id(&self, product_id: ProductId) -> Result<Product> {
        let body: ProductBody = self.send(
            self.http
                .get(self.endpoint(&format!("/products/{product_id}"))),
            "product",
        )?;
        body.product
            .with_context(|| format!("product {product_id} missing from response"))
    }

    /// Validates and creates a product. Returns the new id when the server
    /// reports one.
    pub fn add_product(&self, input: &ProductFormInput) -> Result<Option<ProductId>> {
        input.validate()?;
        let body: AddProductBody = self.send(
            self.http
                .post(self.endpoint("/products"))
                .json(&ProductPayload::from(input)),
            "add product",
        )?;
        Ok(body.product_id.map(ProductId::new))
    }

    pub fn edit_product(&self, product_id: ProductId, input: &ProductFormInput) -> Result<()> {
        input.validate()?;
        let _: NoBody = self.send(
            self.http
                .put(self.endpoint(&format!("/products/{product_id}")))
                .json(&ProductPayload::from(input)),
            "edit product",
        )?;
        Ok(())
    }

    pub fn delete_product(&self, product_id: ProductId) -> Result<()> {
        let _: NoBody = self.send(
            self.http
                .delete(self.endpoint(&format!("/products/{product_id}"))),
            "delete product",
        )?;
        Ok(())
    }

    pub fn create_order(&self, input: &OrderFormInput) -> Result<Option<OrderId>> {
        input.validate()?;
        let payload = CreateOrderPayload {
            items: input
                .items
                .iter()
                .map(|line| CreateOrderLine {
                    product_id: line.product_id.get(),
                    count: line.count,
                })
                .collect(),
        };
        let body: CreateOrderBody = self.send(
            self.http.post(self.endpoint("/orders")).json(&payload),
            "create order",
        )?;
        Ok(body.order_id.map(OrderId::new))
    }

    pub fn get_orders_from_consumer(
        &self,
        consumer_id: UserId,
        status: Option<OrderStatus>,
    ) -> Result<Vec<Order>> {
        let mut params = vec![("consumerId", consumer_id.to_string())];
        if let Some(status) = status {
            params.push(("status", order_status_label(status).to_owned()));
        }
        let body: OrdersBody = self.send(
            self.http
                .get(self.endpoint("/orders/consumer"))
                .query(&params),
            "orders",
        )?;
        body.orders
            .into_iter()
            .map(WireOrder::into_order)
            .collect::<Result<Vec<_>, _>>()
            .map_err(anyhow::Error::from)
    }

    pub fn find_like_list(&self) -> Result<Option<LikeList>> {
        let body: LikeListBody = self.send(self.http.get(self.endpoint("/likes")), "like list")?;
        Ok(body.like_list.map(|list| LikeList {
            id: LikeId::new(list.id),
            products: list.products,
        }))
    }

    pub fn like_product(&self, product_id: ProductId) -> Result<()> {
        let _: NoBody = self.send(
            self.http
                .put(self.endpoint(&format!("/likes/products/{product_id}/add"))),
            "like product",
        )?;
        Ok(())
    }

    pub fn unlike_product(&self, product_id: ProductId) -> Result<()> {
        let _: NoBody = self.send(
            self.http
                .put(self.endpoint(&format!("/likes/products/{product_id}/remove"))),
            "unlike product",
        )?;
        Ok(())
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn send<T: DeserializeOwned>(&self, request: RequestBuilder, what: &str) -> Result<T, FetchError> {
        let request = match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        };
        let response = request
            .send()
            .map_err(|error| connection_error(&self.base_url, error))?;

        let status = response.status();
        let body = response.text().map_err(|error| FetchError::Decode {
            what: what.to_owned(),
            message: error.to_string(),
        })?;
        if !status.is_success() {
            return Err(clean_error_response(status, &body));
        }

        let envelope: Envelope<T> =
            serde_json::from_str(&body).map_err(|error| FetchError::Decode {
                what: what.to_owned(),
                message: error.to_string(),
            })?;
        if !envelope.ok {
            return Err(FetchError::Rejected {
                status: status.as_u16(),
                message: envelope
                    .error
                    .filter(|message| !message.is_empty())
                    .unwrap_or_else(|| format!("{what} request was rejected")),
            });
        }
        debug!(what, status = status.as_u16(), "api request succeeded");
        Ok(envelope.body)
    }
}

/// Serves both product listings from the REST API.
#[derive(Debug, Clone)]
pub struct ProductPageSource {
    client: Client,
}

impl ProductPageSource {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &Client {
        &self.client
    }
}

impl PageSource<Product> for ProductPageSource {
    fn fetch_page(&self, filters: &FilterForm, cursor: Cursor) -> Result<Page<Product>, FetchError> {
        match filters.namespace() {
            ListNamespace::CategoryProducts => {
                let category_id = filters.category_id().ok_or_else(|| {
                    FetchError::InvalidRequest("category listing has no category id".to_owned())
                })?;
                self.client
                    .get_products_by_category(category_id, filters.sort(), cursor)
            }
            ListNamespace::ProviderProducts => {
                self.client.get_products_from_provider(filters.sort(), cursor)
            }
        }
    }
}

/// Label the backend uses for an order status.
pub const fn order_status_label(status: OrderStatus) -> &'static str {
    match status {
        OrderStatus::Checking => "확인중",
        OrderStatus::Received => "주문 접수",
        OrderStatus::Delivering => "배달중",
        OrderStatus::Delivered => "배달 완료",
        OrderStatus::Canceled => "주문 취소",
    }
}

pub fn parse_order_status(label: &str) -> Option<OrderStatus> {
    match label {
        "확인중" => Some(OrderStatus::Checking),
        "주문 접수" => Some(OrderStatus::Received),
        "배달중" => Some(OrderStatus::Delivering),
        "배달 완료" => Some(OrderStatus::Delivered),
        "주문 취소" => Some(OrderStatus::Canceled),
        other => OrderStatus::parse(&other.to_ascii_lowercase()),
    }
}

fn connection_error(base_url: &str, error: reqwest::Error) -> FetchError {
    FetchError::Transport {
        endpoint: base_url.to_owned(),
        message: if error.is_timeout() {
            "request timed out".to_owned()
        } else {
            error.to_string()
        },
    }
}

fn clean_error_response(status: StatusCode, body: &str) -> FetchError {
    let message = if let Ok(parsed) = serde_json::from_str::<ErrorEnvelope>(body)
        && let Some(error) = parsed.error
        && !error.is_empty()
    {
        error
    } else if !body.is_empty() && body.len() < 100 && !body.contains('{') {
        body.trim().to_owned()
    } else {
        format!("server returned {}", status.as_u16())
    };
    FetchError::Rejected {
        status: status.as_u16(),
        message,
    }
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
    #[serde(flatten)]
    body: T,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct NoBody {}

#[derive(Debug, Deserialize)]
struct CategoriesBody {
    #[serde(default)]
    categories: Vec<Category>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProductsBody {
    #[serde(default)]
    products: Vec<Product>,
    #[serde(default)]
    total_results: Option<u64>,
    #[serde(default)]
    has_next_page: bool,
    #[serde(default)]
    next_page: Option<u32>,
    #[serde(default)]
    category_name: Option<String>,
}

impl ProductsBody {
    /// A server that reports more pages but no cursor gets the page after
    /// the requested one.
    fn into_page(self, requested: Cursor) -> Page<Product> {
        let total = self
            .total_results
            .unwrap_or(self.products.len() as u64);
        let mut page = if self.has_next_page {
            let next = self
                .next_page
                .unwrap_or_else(|| requested.get().saturating_add(1));
            Page::with_next(self.products, Cursor::new(next), total)
        } else {
            Page::last(self.products, total)
        };
        page.title = self.category_name.filter(|name| !name.is_empty());
        page
    }
}

#[derive(Debug, Deserialize)]
struct ProductBody {
    #[serde(default)]
    product: Option<Product>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AddProductBody {
    #[serde(default)]
    product_id: Option<i64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ProductPayload<'a> {
    name: &'a str,
    price: i64,
    stock: i64,
    category_name: &'a str,
    images: &'a [String],
    infos: &'a [ProductInfo],
}

impl<'a> From<&'a ProductFormInput> for ProductPayload<'a> {
    fn from(input: &'a ProductFormInput) -> Self {
        Self {
            name: input.name.trim(),
            price: input.price,
            stock: input.stock,
            category_name: input.category_name.trim(),
            images: &input.images,
            infos: &input.infos,
        }
    }
}

#[derive(Debug, Serialize)]
struct CreateOrderPayload {
    items: Vec<CreateOrderLine>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateOrderLine {
    product_id: i64,
    count: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateOrderBody {
    #[serde(default)]
    order_id: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct OrdersBody {
    #[serde(default)]
    orders: Vec<WireOrder>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireOrder {
    id: i64,
    #[serde(default)]
    order_items: Vec<WireOrderItem>,
    #[serde(default)]
    total: i64,
    status: String,
    #[serde(default)]
    created_at: Option<String>,
}

impl WireOrder {
    fn into_order(self) -> Result<Order, FetchError> {
        let status = parse_order_status(&self.status).ok_or_else(|| FetchError::Decode {
            what: format!("order {}", self.id),
            message: format!("unknown status {:?}", self.status),
        })?;
        let created_at = self
            .created_at
            .as_deref()
            .map(|raw| OffsetDateTime::parse(raw, &Rfc3339))
            .transpose()
            .map_err(|error| FetchError::Decode {
                what: format!("order {} createdAt", self.id),
                message: error.to_string(),
            })?;
        Ok(Order {
            id: OrderId::new(self.id),
            items: self
                .order_items
                .into_iter()
                .map(|item| OrderItem {
                    id: OrderItemId::new(item.id),
                    product: item.product,
                    count: item.count,
                })
                .collect(),
            total: self.total,
            status,
            created_at,
        })
    }
}

#[derive(Debug, Deserialize)]
struct WireOrderItem {
    id: i64,
    product: Product,
    count: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LikeListBody {
    #[serde(default)]
    like_list: Option<WireLikeList>,
}

#[derive(Debug, Deserialize)]
struct WireLikeList {
    id: i64,
    #[serde(default)]
    products: Vec<Product>,
}
