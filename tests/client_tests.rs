//! Marketplace client integration tests: envelope normalization, API error
//! mapping, and the bounded randomized 429 retry.

mod test_utils;

use anyhow::Result;
use serde_json::json;
use std::time::Instant;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use stocksync::smartstore::SmartstoreError;
use test_utils::mock_client;

fn channel_product_body() -> serde_json::Value {
    json!({
        "originProduct": {
            "stockQuantity": 8,
            "detailAttribute": {
                "optionInfo": {
                    "useStockManagement": true,
                    "optionCombinations": [
                        {"id": 101, "optionName1": "Red", "stockQuantity": 5},
                        {"id": 102, "optionName1": "Blue", "stockQuantity": 3}
                    ]
                }
            }
        },
        "originProductNo": 9001,
        "windowChannelProduct": {"channelNo": 42}
    })
}

async fn mount_token(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/v1/oauth2/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "tok-1",
            "expires_in": 3600
        })))
        .mount(server)
        .await;
}

#[tokio::test]
async fn reads_flat_and_wrapped_envelopes() -> Result<()> {
    let server = MockServer::start().await;
    mount_token(&server).await;

    Mock::given(method("GET"))
        .and(path("/v2/products/channel-products/FLAT"))
        .respond_with(ResponseTemplate::new(200).set_body_json(channel_product_body()))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v2/products/channel-products/WRAPPED"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"data": channel_product_body()})),
        )
        .mount(&server)
        .await;

    let client = mock_client(&server.uri())?;

    let flat = client.get_channel_product("FLAT").await?;
    let wrapped = client.get_channel_product("WRAPPED").await?;
    assert_eq!(flat.origin_product_no, Some(9001));
    assert_eq!(wrapped.option_stocks().len(), 2);
    Ok(())
}

#[tokio::test]
async fn product_read_returns_none_on_api_error() -> Result<()> {
    let server = MockServer::start().await;
    mount_token(&server).await;

    Mock::given(method("GET"))
        .and(path("/v2/products/channel-products/GONE"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "code": "NOT_FOUND",
            "message": "product does not exist"
        })))
        .mount(&server)
        .await;

    let client = mock_client(&server.uri())?;
    assert!(client.get_product("GONE").await?.is_none());
    Ok(())
}

#[tokio::test]
async fn rate_limited_request_retries_with_backoff_then_succeeds() -> Result<()> {
    let server = MockServer::start().await;
    mount_token(&server).await;

    Mock::given(method("GET"))
        .and(path("/v2/products/channel-products/BUSY"))
        .respond_with(ResponseTemplate::new(429))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v2/products/channel-products/BUSY"))
        .respond_with(ResponseTemplate::new(200).set_body_json(channel_product_body()))
        .mount(&server)
        .await;

    let client = mock_client(&server.uri())?;
    let started = Instant::now();
    let product = client.get_channel_product("BUSY").await?;

    assert_eq!(product.origin_product.stock_quantity, 8);
    // Two 429s mean two randomized waits of at least the configured minimum.
    assert!(started.elapsed().as_millis() >= 20);
    Ok(())
}

#[tokio::test]
async fn rate_limit_exhaustion_is_terminal() -> Result<()> {
    let server = MockServer::start().await;
    mount_token(&server).await;

    Mock::given(method("GET"))
        .and(path("/v2/products/channel-products/SWAMPED"))
        .respond_with(ResponseTemplate::new(429))
        .mount(&server)
        .await;

    let client = mock_client(&server.uri())?;
    let err = client.get_channel_product("SWAMPED").await.unwrap_err();
    match err {
        SmartstoreError::RateLimited { attempts } => assert_eq!(attempts, 3),
        other => panic!("expected rate limit exhaustion, got {other:?}"),
    }
    Ok(())
}

#[tokio::test]
async fn update_extracts_confirmed_stock() -> Result<()> {
    let server = MockServer::start().await;
    mount_token(&server).await;

    Mock::given(method("GET"))
        .and(path("/v2/products/channel-products/P1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(channel_product_body()))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/v2/products/channel-products/P1"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"originProduct": {"stockQuantity": 8}})),
        )
        .mount(&server)
        .await;

    let client = mock_client(&server.uri())?;
    let product = client.get_channel_product("P1").await?;
    let updated = client.update_channel_product_stock("P1", &product).await?;
    assert_eq!(updated.stock_quantity, Some(8));
    Ok(())
}

#[tokio::test]
async fn api_error_surfaces_extracted_message() -> Result<()> {
    let server = MockServer::start().await;
    mount_token(&server).await;

    Mock::given(method("GET"))
        .and(path("/v2/products/channel-products/BAD"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "code": "INVALID_STATE",
            "message": "product is suspended"
        })))
        .mount(&server)
        .await;

    let client = mock_client(&server.uri())?;
    let err = client.get_channel_product("BAD").await.unwrap_err();
    match err {
        SmartstoreError::Api { status, message } => {
            assert_eq!(status, 400);
            assert_eq!(message, "product is suspended (INVALID_STATE)");
        }
        other => panic!("expected API error, got {other:?}"),
    }
    Ok(())
}
