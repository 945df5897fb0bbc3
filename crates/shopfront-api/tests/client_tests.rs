// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Result, anyhow};
use shopfront_api::{Client, ProductPageSource};
use shopfront_app::{
    CategoryId, Cursor, FetchError, FilterForm, ListController, ListEffect, ListNamespace,
    OrderFormInput, OrderLineInput, OrderStatus, PageSource, ProductFormInput, ProductId,
    QueryCache, Resolution, SortState, UserId, drive,
};
use std::io::Read;
use std::thread;
use std::time::Duration;
use tiny_http::{Header, Method, Response, Server};

fn json_response(body: &str) -> Response<std::io::Cursor<Vec<u8>>> {
    Response::from_string(body).with_status_code(200).with_header(
        Header::from_bytes("Content-Type", "application/json").expect("valid content type header"),
    )
}

fn mock_server() -> Result<(Server, String)> {
    let server =
        Server::http("127.0.0.1:0").map_err(|error| anyhow!("start mock server: {error}"))?;
    let addr = format!("http://{}/api", server.server_addr());
    Ok((server, addr))
}

fn product_json(id: i64) -> String {
    format!(
        r#"{{"id":{id},"name":"Product {id}","price":{},"images":["https://cdn.test/{id}.jpg"]}}"#,
        id * 1000
    )
}

#[test]
fn client_rejects_non_http_base_url() {
    assert!(Client::new("", None, Duration::from_secs(1)).is_err());
    assert!(Client::new("not a url", None, Duration::from_secs(1)).is_err());
    let error = Client::new("ftp://shop.test", None, Duration::from_secs(1))
        .expect_err("ftp should be rejected");
    assert!(error.to_string().contains("http or https"));
}

#[test]
fn unreachable_server_is_transport_error() {
    let client = Client::new("http://127.0.0.1:1/api", None, Duration::from_millis(50))
        .expect("client should initialize");

    let error = client
        .get_categories()
        .expect_err("request should fail for unreachable endpoint");
    assert!(matches!(error, FetchError::Transport { .. }));
    assert!(error.to_string().contains("cannot reach http://127.0.0.1:1/api"));
}

#[test]
fn category_page_sends_order_page_and_bearer_token() -> Result<()> {
    let (server, addr) = mock_server()?;

    let handle = thread::spawn(move || {
        let request = server.recv().expect("request expected");
        assert_eq!(request.method(), &Method::Get);
        let url = request.url().to_owned();
        assert!(url.starts_with("/api/categories/7?"), "unexpected url {url}");
        assert!(url.contains("order=price+desc"), "unexpected url {url}");
        assert!(url.contains("page=2"), "unexpected url {url}");
        let auth = request
            .headers()
            .iter()
            .find(|header| header.field.equiv("Authorization"))
            .map(|header| header.value.as_str().to_owned());
        assert_eq!(auth.as_deref(), Some("Bearer secret-token"));

        let body = format!(
            r#"{{"ok":true,"products":[{},{}],"totalResults":5,"hasNextPage":true,"nextPage":3,"categoryName":"Shoes"}}"#,
            product_json(3),
            product_json(4)
        );
        request
            .respond(json_response(&body))
            .expect("response should succeed");
    });

    let client = Client::new(&addr, Some("secret-token"), Duration::from_secs(1))?;
    let page =
        client.get_products_by_category(CategoryId::new(7), SortState::ALL[1], Cursor::new(2))?;
    assert_eq!(page.items.len(), 2);
    assert_eq!(page.items[0].id, ProductId::new(3));
    assert_eq!(page.total_results, 5);
    assert_eq!(page.next_cursor(), Some(Cursor::new(3)));
    assert_eq!(page.title.as_deref(), Some("Shoes"));

    handle.join().expect("server thread should join");
    Ok(())
}

#[test]
fn provider_page_uses_sort_param() -> Result<()> {
    let (server, addr) = mock_server()?;

    let handle = thread::spawn(move || {
        let request = server.recv().expect("request expected");
        let url = request.url().to_owned();
        assert!(url.starts_with("/api/products/provider?"), "unexpected url {url}");
        assert!(url.contains("sort=createdAt+desc"), "unexpected url {url}");
        assert!(url.contains("page=1"), "unexpected url {url}");
        assert!(
            request
                .headers()
                .iter()
                .all(|header| !header.field.equiv("Authorization")),
            "no token configured"
        );
        request
            .respond(json_response(
                r#"{"ok":true,"products":[],"totalResults":0,"hasNextPage":false}"#,
            ))
            .expect("response should succeed");
    });

    let client = Client::new(&addr, None, Duration::from_secs(1))?;
    let source = ProductPageSource::new(client);
    let page = source.fetch_page(&FilterForm::provider_products(SortState::NEWEST), Cursor::FIRST)?;
    assert!(page.items.is_empty());
    assert!(!page.has_next_page);

    handle.join().expect("server thread should join");
    Ok(())
}

#[test]
fn ok_false_envelope_is_rejection() -> Result<()> {
    let (server, addr) = mock_server()?;

    let handle = thread::spawn(move || {
        let request = server.recv().expect("request expected");
        request
            .respond(json_response(r#"{"ok":false,"error":"category not found"}"#))
            .expect("response should succeed");
    });

    let client = Client::new(&addr, None, Duration::from_secs(1))?;
    let error = client
        .get_products_by_category(CategoryId::new(99), SortState::NEWEST, Cursor::FIRST)
        .expect_err("ok:false should fail");
    assert_eq!(
        error,
        FetchError::Rejected {
            status: 200,
            message: "category not found".to_owned(),
        }
    );

    handle.join().expect("server thread should join");
    Ok(())
}

#[test]
fn http_error_status_is_rejection() -> Result<()> {
    let (server, addr) = mock_server()?;

    let handle = thread::spawn(move || {
        let request = server.recv().expect("request expected");
        request
            .respond(Response::from_string("forbidden").with_status_code(403))
            .expect("response should succeed");
    });

    let client = Client::new(&addr, None, Duration::from_secs(1))?;
    let error = client
        .get_categories()
        .expect_err("403 should fail");
    assert_eq!(error.to_string(), "server error (403): forbidden");

    handle.join().expect("server thread should join");
    Ok(())
}

#[test]
fn malformed_body_is_decode_error() -> Result<()> {
    let (server, addr) = mock_server()?;

    let handle = thread::spawn(move || {
        let request = server.recv().expect("request expected");
        request
            .respond(json_response(r#"{"ok":true,"products":"nope"}"#))
            .expect("response should succeed");
    });

    let client = Client::new(&addr, None, Duration::from_secs(1))?;
    let error = client
        .get_products_from_provider(SortState::NEWEST, Cursor::FIRST)
        .expect_err("bad body should fail");
    assert!(matches!(error, FetchError::Decode { .. }));

    handle.join().expect("server thread should join");
    Ok(())
}

#[test]
fn category_listing_without_id_never_hits_network() -> Result<()> {
    let client = Client::new("http://127.0.0.1:1/api", None, Duration::from_millis(50))?;
    let source = ProductPageSource::new(client);
    let error = source
        .fetch_page(&FilterForm::new(ListNamespace::CategoryProducts), Cursor::FIRST)
        .expect_err("missing id should fail");
    assert!(matches!(error, FetchError::InvalidRequest(_)));
    Ok(())
}

#[test]
fn controller_pages_through_mock_api() -> Result<()> {
    let (server, addr) = mock_server()?;

    let handle = thread::spawn(move || {
        let first = server.recv().expect("first request expected");
        assert!(first.url().contains("page=1"));
        let body = format!(
            r#"{{"ok":true,"products":[{},{}],"totalResults":3,"hasNextPage":true,"nextPage":2,"categoryName":"Bags"}}"#,
            product_json(1),
            product_json(2)
        );
        first
            .respond(json_response(&body))
            .expect("response should succeed");

        let second = server.recv().expect("second request expected");
        assert!(second.url().contains("page=2"));
        let body = format!(
            r#"{{"ok":true,"products":[{}],"totalResults":3,"hasNextPage":false,"categoryName":"Bags"}}"#,
            product_json(3)
        );
        second
            .respond(json_response(&body))
            .expect("response should succeed");
    });

    let source = ProductPageSource::new(Client::new(&addr, None, Duration::from_secs(1))?);
    let mut cache = QueryCache::new();
    let (mut controller, effects) =
        ListController::initialize(FilterForm::category_products(CategoryId::new(4), SortState::NEWEST));
    let resolutions = drive(&mut controller, &source, &mut cache, effects);
    assert!(matches!(resolutions.as_slice(), [Resolution::Appended { .. }]));
    assert_eq!(controller.title(), Some("Bags"));

    let effects = controller.on_visibility_trigger();
    assert!(matches!(effects.as_slice(), [ListEffect::Fetch(_)]));
    drive(&mut controller, &source, &mut cache, effects);

    let ids: Vec<i64> = controller.all_items().map(|product| product.id.get()).collect();
    assert_eq!(ids, vec![1, 2, 3]);
    assert!(!controller.has_next_page());
    assert!(controller.on_visibility_trigger().is_empty());
    assert_eq!(cache.page_count(controller.query_key()), 2);

    handle.join().expect("server thread should join");
    Ok(())
}

#[test]
fn create_order_posts_checked_lines() -> Result<()> {
    let (server, addr) = mock_server()?;

    let handle = thread::spawn(move || {
        let mut request = server.recv().expect("request expected");
        assert_eq!(request.method(), &Method::Post);
        assert_eq!(request.url(), "/api/orders");
        let mut body = String::new();
        request
            .as_reader()
            .read_to_string(&mut body)
            .expect("read request body");
        let parsed: serde_json::Value = serde_json::from_str(&body).expect("json body");
        assert_eq!(
            parsed,
            serde_json::json!({ "items": [{ "productId": 4, "count": 2 }] })
        );
        request
            .respond(json_response(r#"{"ok":true,"orderId":31}"#))
            .expect("response should succeed");
    });

    let client = Client::new(&addr, Some("t"), Duration::from_secs(1))?;
    let order = OrderFormInput {
        items: vec![OrderLineInput {
            product_id: ProductId::new(4),
            count: 2,
        }],
    };
    let order_id = client.create_order(&order)?;
    assert_eq!(order_id.map(|id| id.get()), Some(31));

    handle.join().expect("server thread should join");
    Ok(())
}

#[test]
fn invalid_forms_are_rejected_before_sending() -> Result<()> {
    let client = Client::new("http://127.0.0.1:1/api", None, Duration::from_millis(50))?;
    let empty_order = OrderFormInput { items: Vec::new() };
    let error = client
        .create_order(&empty_order)
        .expect_err("empty order should fail");
    assert!(error.to_string().contains("order is empty"));

    let product = ProductFormInput {
        name: String::new(),
        price: 1000,
        stock: 1,
        category_name: "Bags".to_owned(),
        images: Vec::new(),
        infos: Vec::new(),
    };
    let error = client
        .add_product(&product)
        .expect_err("blank name should fail");
    assert!(error.to_string().contains("name is required"));
    Ok(())
}

#[test]
fn orders_decode_status_labels_and_dates() -> Result<()> {
    let (server, addr) = mock_server()?;

    let handle = thread::spawn(move || {
        let request = server.recv().expect("request expected");
        let url = request.url().to_owned();
        assert!(url.starts_with("/api/orders/consumer?"), "unexpected url {url}");
        assert!(url.contains("consumerId=12"), "unexpected url {url}");
        let body = format!(
            r#"{{"ok":true,"orders":[{{"id":5,"total":6000,"status":"배달중","createdAt":"2026-02-19T12:34:56Z","orderItems":[{{"id":9,"count":2,"product":{}}}]}}]}}"#,
            product_json(3)
        );
        request
            .respond(json_response(&body))
            .expect("response should succeed");
    });

    let client = Client::new(&addr, Some("t"), Duration::from_secs(1))?;
    let orders = client.get_orders_from_consumer(UserId::new(12), None)?;
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0].status, OrderStatus::Delivering);
    assert_eq!(orders[0].items[0].count, 2);
    assert_eq!(orders[0].items[0].product.id, ProductId::new(3));
    assert!(orders[0].created_at.is_some());

    handle.join().expect("server thread should join");
    Ok(())
}

#[test]
fn like_and_unlike_use_put_endpoints() -> Result<()> {
    let (server, addr) = mock_server()?;

    let handle = thread::spawn(move || {
        for expected in ["/api/likes/products/8/add", "/api/likes/products/8/remove"] {
            let request = server.recv().expect("request expected");
            assert_eq!(request.method(), &Method::Put);
            assert_eq!(request.url(), expected);
            request
                .respond(json_response(r#"{"ok":true}"#))
                .expect("response should succeed");
        }
        let request = server.recv().expect("request expected");
        assert_eq!(request.url(), "/api/likes");
        let body = format!(
            r#"{{"ok":true,"likeList":{{"id":1,"products":[{}]}}}}"#,
            product_json(8)
        );
        request
            .respond(json_response(&body))
            .expect("response should succeed");
    });

    let client = Client::new(&addr, Some("t"), Duration::from_secs(1))?;
    client.like_product(ProductId::new(8))?;
    client.unlike_product(ProductId::new(8))?;
    let likes = client.find_like_list()?.expect("like list present");
    assert!(likes.products.iter().any(|product| product.id == ProductId::new(8)));

    handle.join().expect("server thread should join");
    Ok(())
}

fn bag_form() -> ProductFormInput {
    ProductFormInput {
        name: " Canvas Tote ".to_owned(),
        price: 25000,
        stock: 4,
        category_name: "Bags".to_owned(),
        images: vec!["https://cdn.test/tote.jpg".to_owned()],
        infos: Vec::new(),
    }
}

#[test]
fn find_product_by_id_reads_product_body() -> Result<()> {
    let (server, addr) = mock_server()?;

    let handle = thread::spawn(move || {
        let request = server.recv().expect("request expected");
        assert_eq!(request.method(), &Method::Get);
        assert_eq!(request.url(), "/api/products/6");
        let body = format!(r#"{{"ok":true,"product":{}}}"#, product_json(6));
        request
            .respond(json_response(&body))
            .expect("response should succeed");

        let request = server.recv().expect("request expected");
        assert_eq!(request.url(), "/api/products/7");
        request
            .respond(json_response(r#"{"ok":true}"#))
            .expect("response should succeed");
    });

    let client = Client::new(&addr, None, Duration::from_secs(1))?;
    let product = client.find_product_by_id(ProductId::new(6))?;
    assert_eq!(product.id, ProductId::new(6));
    assert_eq!(product.price, 6000);

    let error = client
        .find_product_by_id(ProductId::new(7))
        .expect_err("body without a product should fail");
    assert!(
        error.to_string().contains("product 7 missing from response"),
        "unexpected error {error}"
    );

    handle.join().expect("server thread should join");
    Ok(())
}

#[test]
fn edit_product_puts_trimmed_payload() -> Result<()> {
    let (server, addr) = mock_server()?;

    let handle = thread::spawn(move || {
        let mut request = server.recv().expect("request expected");
        assert_eq!(request.method(), &Method::Put);
        assert_eq!(request.url(), "/api/products/11");
        let mut body = String::new();
        request
            .as_reader()
            .read_to_string(&mut body)
            .expect("read body");
        let payload: serde_json::Value = serde_json::from_str(&body).expect("json body");
        assert_eq!(payload["name"], "Canvas Tote");
        assert_eq!(payload["price"], 25000);
        assert_eq!(payload["categoryName"], "Bags");
        request
            .respond(json_response(r#"{"ok":true}"#))
            .expect("response should succeed");
    });

    let client = Client::new(&addr, Some("t"), Duration::from_secs(1))?;
    client.edit_product(ProductId::new(11), &bag_form())?;

    let mut invalid = bag_form();
    invalid.price = 0;
    let error = client
        .edit_product(ProductId::new(11), &invalid)
        .expect_err("non-positive price should fail");
    assert!(error.to_string().contains("price must be positive"));

    handle.join().expect("server thread should join");
    Ok(())
}

#[test]
fn delete_product_uses_delete_method() -> Result<()> {
    let (server, addr) = mock_server()?;

    let handle = thread::spawn(move || {
        let request = server.recv().expect("request expected");
        assert_eq!(request.method(), &Method::Delete);
        assert_eq!(request.url(), "/api/products/13");
        request
            .respond(json_response(r#"{"ok":false,"error":"not yours"}"#))
            .expect("response should succeed");
    });

    let client = Client::new(&addr, Some("t"), Duration::from_secs(1))?;
    let error = client
        .delete_product(ProductId::new(13))
        .expect_err("rejected delete should fail");
    assert!(error.to_string().contains("not yours"), "unexpected error {error}");

    handle.join().expect("server thread should join");
    Ok(())
}
