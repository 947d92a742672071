//! End-to-end orchestrator tests: a fresh migrated Postgres database from the
//! sqlx test harness plus a wiremock stand-in for the marketplace API.

use rust_decimal::Decimal;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use adsync_core::{Condition, Marketplace};
use adsync_db::{NewAdRecord, NewProduct, UpsertMarketplaceConfig};
use adsync_sync::{PublishRequest, SyncSettings};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn settings_for(server: &MockServer) -> SyncSettings {
    SyncSettings {
        base_url: server.uri(),
        request_timeout_secs: 5,
        user_agent: "adsync-test/0.1".to_string(),
        import_poll_delay_ms: 0,
        candidate_limit: 50,
        detail_delay_ms: 0,
    }
}

async fn seed_product(pool: &sqlx::PgPool, code: &str, name: &str, price: Decimal) -> i64 {
    adsync_db::upsert_product(
        pool,
        &NewProduct {
            code: code.to_string(),
            name: name.to_string(),
            slug: code.to_lowercase(),
            description: Some("Seminovo, bateria 89%".to_string()),
            price,
            battery_health: Some(89),
            condition: Condition::Used,
            warranty_months: 3,
            includes_accessories: true,
            colors: vec!["preto".to_string()],
            photo_urls: vec![],
            stock_count: 1,
            is_active: true,
        },
    )
    .await
    .expect("seed product")
}

async fn seed_config(pool: &sqlx::PgPool) {
    adsync_db::upsert_config(
        pool,
        Marketplace::Olx,
        &UpsertMarketplaceConfig {
            client_id: Some("client-id".to_string()),
            client_secret: Some("client-secret".to_string()),
            access_token: Some("test-token".to_string()),
            refresh_token: Some("refresh-token".to_string()),
            token_expires_at: None,
            sync_enabled: true,
        },
    )
    .await
    .expect("seed config");
}

/// Mounts the two token-validation endpoints every publish exercises.
async fn mount_token_validation(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/autoupload/published"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"ads": []})))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/autoupload/balance"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({"available": 10, "used": 0})),
        )
        .mount(server)
        .await;
}

fn publish_request(product_id: i64) -> PublishRequest {
    PublishRequest {
        product_id,
        title: None,
        description: None,
        category: None,
    }
}

// ---------------------------------------------------------------------------
// Create
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn publish_with_ad_list_response_stores_list_id(pool: sqlx::PgPool) {
    let server = MockServer::start().await;
    seed_config(&pool).await;
    let product_id = seed_product(&pool, "IP11-01", "iPhone 11 128GB", Decimal::new(1500, 0)).await;

    mount_token_validation(&server).await;
    Mock::given(method("POST"))
        .and(path("/autoupload/import"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "ad_list": [{ "list_id": 1_234_567, "subject": "iPhone 11 128GB" }]
        })))
        .mount(&server)
        .await;

    let report =
        adsync_sync::publish_ad(&pool, &settings_for(&server), &publish_request(product_id)).await;

    assert!(report.success, "{}", report.message);
    assert_eq!(report.remote_ad_id.as_deref(), Some("1234567"));

    let record = adsync_db::get_ad_record(&pool, report.ad_record_id.expect("record id"))
        .await
        .expect("query")
        .expect("record exists");
    assert_eq!(record.status, "advertised");
    assert_eq!(record.remote_ad_id.as_deref(), Some("1234567"));

    let log = adsync_db::list_sync_log(&pool, 10).await.expect("log");
    assert_eq!(log.len(), 1);
    assert_eq!(log[0].action, "create");
    assert_eq!(log[0].outcome, "success");
    assert!(log[0].request_payload.is_some(), "raw request is audited");
}

#[sqlx::test(migrations = "../../migrations")]
async fn publish_with_token_response_leaves_record_processing(pool: sqlx::PgPool) {
    let server = MockServer::start().await;
    seed_config(&pool).await;
    let product_id = seed_product(&pool, "IP12-01", "iPhone 12 64GB", Decimal::new(2100, 0)).await;

    mount_token_validation(&server).await;
    Mock::given(method("POST"))
        .and(path("/autoupload/import"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({"token": "imp-42"})),
        )
        .mount(&server)
        .await;
    // The follow-up poll answers "still processing".
    Mock::given(method("GET"))
        .and(path("/autoupload/import/imp-42"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({"status": "processing"})),
        )
        .mount(&server)
        .await;

    let report =
        adsync_sync::publish_ad(&pool, &settings_for(&server), &publish_request(product_id)).await;

    assert!(report.success, "{}", report.message);
    let record = adsync_db::get_ad_record(&pool, report.ad_record_id.expect("record id"))
        .await
        .expect("query")
        .expect("record exists");
    assert_eq!(record.status, "processing");
    assert_eq!(
        record.remote_ad_id.as_deref(),
        Some("imp-42"),
        "import token is kept as the temporary identifier"
    );
}

#[sqlx::test(migrations = "../../migrations")]
async fn publish_token_then_poll_resolution_advertises(pool: sqlx::PgPool) {
    let server = MockServer::start().await;
    seed_config(&pool).await;
    let product_id = seed_product(&pool, "IP13-01", "iPhone 13 128GB", Decimal::new(3200, 0)).await;

    mount_token_validation(&server).await;
    Mock::given(method("POST"))
        .and(path("/autoupload/import"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({"token": "imp-77"})),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/autoupload/import/imp-77"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({"status": "finished", "list_id": 9_876_543})),
        )
        .mount(&server)
        .await;

    let report =
        adsync_sync::publish_ad(&pool, &settings_for(&server), &publish_request(product_id)).await;

    assert!(report.success, "{}", report.message);
    assert_eq!(report.remote_ad_id.as_deref(), Some("9876543"));
    let record = adsync_db::get_ad_record(&pool, report.ad_record_id.expect("record id"))
        .await
        .expect("query")
        .expect("record exists");
    assert_eq!(record.status, "advertised");
}

#[sqlx::test(migrations = "../../migrations")]
async fn publish_without_identifier_reports_failure(pool: sqlx::PgPool) {
    let server = MockServer::start().await;
    seed_config(&pool).await;
    let product_id = seed_product(&pool, "IP14-01", "iPhone 14", Decimal::new(4200, 0)).await;

    mount_token_validation(&server).await;
    Mock::given(method("POST"))
        .and(path("/autoupload/import"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({"message": "accepted"})),
        )
        .mount(&server)
        .await;

    let report =
        adsync_sync::publish_ad(&pool, &settings_for(&server), &publish_request(product_id)).await;

    assert!(!report.success);
    assert_eq!(report.code.as_deref(), Some("NO_IDENTIFIER"));
    let record = adsync_db::get_ad_record(&pool, report.ad_record_id.expect("record id"))
        .await
        .expect("query")
        .expect("record exists");
    assert_eq!(record.status, "error");
}

#[sqlx::test(migrations = "../../migrations")]
async fn publish_twice_is_rejected_by_the_precheck(pool: sqlx::PgPool) {
    let server = MockServer::start().await;
    seed_config(&pool).await;
    let product_id = seed_product(&pool, "IP11-02", "iPhone 11 64GB", Decimal::new(1400, 0)).await;

    mount_token_validation(&server).await;
    Mock::given(method("POST"))
        .and(path("/autoupload/import"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "ad_list": [{ "list_id": 42 }]
        })))
        .mount(&server)
        .await;

    let settings = settings_for(&server);
    let first = adsync_sync::publish_ad(&pool, &settings, &publish_request(product_id)).await;
    assert!(first.success, "{}", first.message);

    let second = adsync_sync::publish_ad(&pool, &settings, &publish_request(product_id)).await;
    assert!(!second.success);
    assert_eq!(second.code.as_deref(), Some("ALREADY_ADVERTISED"));
}

#[sqlx::test(migrations = "../../migrations")]
async fn publish_fails_cleanly_when_unconfigured(pool: sqlx::PgPool) {
    let server = MockServer::start().await;
    let product_id = seed_product(&pool, "IP15-01", "iPhone 15", Decimal::new(5200, 0)).await;

    let report =
        adsync_sync::publish_ad(&pool, &settings_for(&server), &publish_request(product_id)).await;

    assert!(!report.success);
    assert_eq!(report.code.as_deref(), Some("NOT_CONFIGURED"));
    // Short-circuited before any remote call: nothing was mounted, and no
    // request ever reached the mock server.
    assert!(server.received_requests().await.unwrap_or_default().is_empty());
}

// ---------------------------------------------------------------------------
// Remove
// ---------------------------------------------------------------------------

async fn seed_advertised_ad(pool: &sqlx::PgPool, product_id: i64, remote_id: &str) -> i64 {
    let record = adsync_db::insert_ad_record(
        pool,
        &NewAdRecord {
            product_id,
            integration: Marketplace::Olx,
            remote_ad_id: Some(remote_id.to_string()),
            title: "iPhone 11 128GB".to_string(),
            description: None,
            price: Decimal::new(1500, 0),
            status: adsync_core::AdStatus::Advertised,
        },
    )
    .await
    .expect("seed ad record");
    record.id
}

#[sqlx::test(migrations = "../../migrations")]
async fn remove_deletes_locally_when_remote_succeeds(pool: sqlx::PgPool) {
    let server = MockServer::start().await;
    seed_config(&pool).await;
    let product_id = seed_product(&pool, "IP11-03", "iPhone 11", Decimal::new(1500, 0)).await;
    let record_id = seed_advertised_ad(&pool, product_id, "555").await;

    Mock::given(method("DELETE"))
        .and(path("/autoupload/ads/555"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    let report = adsync_sync::remove_ad(&pool, &settings_for(&server), record_id).await;

    assert!(report.success, "{}", report.message);
    assert!(adsync_db::get_ad_record(&pool, record_id)
        .await
        .expect("query")
        .is_none());
}

#[sqlx::test(migrations = "../../migrations")]
async fn remove_deletes_locally_when_remote_errors(pool: sqlx::PgPool) {
    let server = MockServer::start().await;
    seed_config(&pool).await;
    let product_id = seed_product(&pool, "IP11-04", "iPhone 11", Decimal::new(1500, 0)).await;
    let record_id = seed_advertised_ad(&pool, product_id, "666").await;

    Mock::given(method("DELETE"))
        .and(path("/autoupload/ads/666"))
        .respond_with(
            ResponseTemplate::new(500).set_body_json(serde_json::json!({"message": "boom"})),
        )
        .mount(&server)
        .await;

    let report = adsync_sync::remove_ad(&pool, &settings_for(&server), record_id).await;

    assert!(report.success, "remote failure must not fail the removal");
    assert!(report.message.contains("locally only"), "{}", report.message);
    assert!(adsync_db::get_ad_record(&pool, record_id)
        .await
        .expect("query")
        .is_none());
}

#[sqlx::test(migrations = "../../migrations")]
async fn remove_deletes_locally_when_unconfigured(pool: sqlx::PgPool) {
    let server = MockServer::start().await;
    let product_id = seed_product(&pool, "IP11-05", "iPhone 11", Decimal::new(1500, 0)).await;
    let record_id = seed_advertised_ad(&pool, product_id, "777").await;

    let report = adsync_sync::remove_ad(&pool, &settings_for(&server), record_id).await;

    assert!(report.success, "{}", report.message);
    assert!(adsync_db::get_ad_record(&pool, record_id)
        .await
        .expect("query")
        .is_none());
}

#[sqlx::test(migrations = "../../migrations")]
async fn remove_twice_is_idempotent(pool: sqlx::PgPool) {
    let server = MockServer::start().await;
    seed_config(&pool).await;
    let product_id = seed_product(&pool, "IP11-06", "iPhone 11", Decimal::new(1500, 0)).await;
    let record_id = seed_advertised_ad(&pool, product_id, "888").await;

    Mock::given(method("DELETE"))
        .and(path("/autoupload/ads/888"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    let settings = settings_for(&server);
    let first = adsync_sync::remove_ad(&pool, &settings, record_id).await;
    assert!(first.success);

    let second = adsync_sync::remove_ad(&pool, &settings, record_id).await;
    assert!(second.success, "second removal must not be fatal");
    assert!(second.message.contains("already removed"));
}

// ---------------------------------------------------------------------------
// Migration matcher
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn migrate_backfills_confident_matches_only(pool: sqlx::PgPool) {
    let server = MockServer::start().await;
    seed_config(&pool).await;

    let matched_product =
        seed_product(&pool, "IP11-07", "iPhone 11 128GB", Decimal::new(1500, 0)).await;
    let unmatched_product =
        seed_product(&pool, "IPX-01", "iPhone X 256GB", Decimal::new(900, 0)).await;

    let matched_record = adsync_db::insert_ad_record(
        &pool,
        &NewAdRecord {
            product_id: matched_product,
            integration: Marketplace::Olx,
            remote_ad_id: None,
            title: "iPhone 11 128GB".to_string(),
            description: None,
            price: Decimal::new(1500, 0),
            status: adsync_core::AdStatus::Pending,
        },
    )
    .await
    .expect("seed matched record")
    .id;

    let unmatched_record = adsync_db::insert_ad_record(
        &pool,
        &NewAdRecord {
            product_id: unmatched_product,
            integration: Marketplace::Olx,
            remote_ad_id: None,
            title: "iPhone X 256GB".to_string(),
            description: None,
            price: Decimal::new(900, 0),
            status: adsync_core::AdStatus::Pending,
        },
    )
    .await
    .expect("seed unmatched record")
    .id;

    Mock::given(method("GET"))
        .and(path("/autoupload/published"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "ads": [
                { "list_id": 111, "subject": "iPhone 11 128GB Preto", "price": 1500 },
                { "list_id": 222, "subject": "Geladeira Brastemp", "price": 900 }
            ]
        })))
        .mount(&server)
        .await;

    let report = adsync_sync::migrate_unresolved(&pool, &settings_for(&server)).await;
    assert!(report.success, "{}", report.message);
    assert!(report.message.contains("resolved 1 of 2"), "{}", report.message);

    let matched = adsync_db::get_ad_record(&pool, matched_record)
        .await
        .expect("query")
        .expect("exists");
    assert_eq!(matched.status, "advertised");
    assert_eq!(matched.remote_ad_id.as_deref(), Some("111"));

    let unmatched = adsync_db::get_ad_record(&pool, unmatched_record)
        .await
        .expect("query")
        .expect("exists");
    assert_eq!(unmatched.status, "pending");
    assert!(unmatched.remote_ad_id.is_none());

    let log = adsync_db::list_sync_log(&pool, 10).await.expect("log");
    assert!(
        log.iter()
            .any(|e| e.outcome == "skipped" && e.message.as_deref().is_some_and(|m| m.contains("no confident match"))),
        "unmatched record must be logged for operator review"
    );
}

// ---------------------------------------------------------------------------
// Bulk clear
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn bulk_clear_empties_ads_and_log(pool: sqlx::PgPool) {
    seed_config(&pool).await;
    let product_id = seed_product(&pool, "IP11-08", "iPhone 11", Decimal::new(1500, 0)).await;
    seed_advertised_ad(&pool, product_id, "999").await;
    adsync_db::append_sync_log(
        &pool,
        &adsync_db::NewSyncLog {
            integration: Marketplace::Olx,
            action: "create".to_string(),
            outcome: "success".to_string(),
            message: None,
            request_payload: None,
            response_payload: None,
            ad_record_id: None,
        },
    )
    .await
    .expect("seed log entry");

    let report = adsync_sync::bulk_clear(&pool).await;
    assert!(report.success, "{}", report.message);

    assert!(adsync_db::list_ad_records(&pool, Marketplace::Olx, 10)
        .await
        .expect("ads")
        .is_empty());
    assert!(adsync_db::list_sync_log(&pool, 10)
        .await
        .expect("log")
        .is_empty());
}

// ---------------------------------------------------------------------------
// Token validation
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn check_token_treats_basic_plan_410_as_valid(pool: sqlx::PgPool) {
    let server = MockServer::start().await;
    seed_config(&pool).await;

    Mock::given(method("GET"))
        .and(path("/autoupload/published"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"ads": []})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/autoupload/balance"))
        .respond_with(ResponseTemplate::new(410).set_body_json(
            serde_json::json!({"reason": "PRODUCT_NOT_FOUND_BY_ACCOUNT"}),
        ))
        .mount(&server)
        .await;

    let report = adsync_sync::check_token(&pool, &settings_for(&server)).await;
    assert!(report.success, "{}", report.message);
    assert!(report.message.contains("basic plan"), "{}", report.message);
}

#[sqlx::test(migrations = "../../migrations")]
async fn check_token_reports_expired_token(pool: sqlx::PgPool) {
    let server = MockServer::start().await;
    seed_config(&pool).await;

    Mock::given(method("GET"))
        .and(path("/autoupload/published"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(serde_json::json!({"message": "expired"})),
        )
        .mount(&server)
        .await;

    let report = adsync_sync::check_token(&pool, &settings_for(&server)).await;
    assert!(!report.success);
    assert_eq!(report.code.as_deref(), Some("UNAUTHORIZED"));
    assert!(report.message.contains("generate a new one"));
}

// ---------------------------------------------------------------------------
// Token refresh
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn expired_token_is_refreshed_before_the_action(pool: sqlx::PgPool) {
    let server = MockServer::start().await;
    adsync_db::upsert_config(
        &pool,
        Marketplace::Olx,
        &UpsertMarketplaceConfig {
            client_id: Some("client-id".to_string()),
            client_secret: Some("client-secret".to_string()),
            access_token: Some("stale-token".to_string()),
            refresh_token: Some("refresh-token".to_string()),
            token_expires_at: Some(chrono::Utc::now() - chrono::Duration::hours(1)),
            sync_enabled: true,
        },
    )
    .await
    .expect("seed expired config");

    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": "fresh-token",
            "refresh_token": "fresh-refresh",
            "expires_in": 3600
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/autoupload/balance"))
        .and(wiremock::matchers::header(
            "authorization",
            "Bearer fresh-token",
        ))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({"available": 5})),
        )
        .mount(&server)
        .await;

    let report = adsync_sync::check_balance(&pool, &settings_for(&server)).await;
    assert!(report.success, "{}", report.message);

    let config = adsync_db::get_config(&pool, Marketplace::Olx)
        .await
        .expect("query")
        .expect("config exists");
    assert_eq!(config.access_token.as_deref(), Some("fresh-token"));
    assert_eq!(config.refresh_token.as_deref(), Some("fresh-refresh"));
}
