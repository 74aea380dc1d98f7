mod common;

use axum::http::{StatusCode, header};
use certrack::entities::certificates;
use certrack::services::Scheduler;
use chrono::{Duration, Local, NaiveDate};
use common::{
    PASSWORD, UserSeed, body_json, certificate_body, json_request, multipart_request, spawn_app,
    spawn_app_with, test_config,
};
use sea_orm::{ActiveModelTrait, EntityTrait, Set};
use serde_json::json;

fn today() -> NaiveDate {
    Local::now().date_naive()
}

#[tokio::test]
async fn test_status_is_derived_from_expiry_on_save() {
    let app = spawn_app().await;
    app.seed_user(UserSeed::employee("jane@example.com")).await;
    let category = app.seed_category("Cloud").await;
    let cookie = app.login("jane@example.com", PASSWORD).await;

    let lapsed = certificate_body(
        category.id,
        today() - Duration::days(400),
        Some(today() - Duration::days(3)),
    );
    let response = app
        .send(json_request("POST", "/api/certificates", Some(&cookie), &lapsed))
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let json = body_json(response).await;
    assert_eq!(json["data"]["status"], "EXPIRED");
    assert_eq!(json["data"]["is_expired"], true);
    assert_eq!(json["data"]["days_expired"], 3);

    let mut revoked = lapsed.clone();
    revoked["status"] = json!("REVOKED");
    let response = app
        .send(json_request("POST", "/api/certificates", Some(&cookie), &revoked))
        .await;
    let json = body_json(response).await;
    assert_eq!(json["data"]["status"], "REVOKED");

    let current = certificate_body(
        category.id,
        today() - Duration::days(30),
        Some(today() + Duration::days(20)),
    );
    let response = app
        .send(json_request("POST", "/api/certificates", Some(&cookie), &current))
        .await;
    let json = body_json(response).await;
    assert_eq!(json["data"]["status"], "ACTIVE");
    assert_eq!(json["data"]["is_expiring_soon"], true);
    assert_eq!(json["data"]["days_until_expiry"], 20);
}

#[tokio::test]
async fn test_certificate_form_validation() {
    let app = spawn_app().await;
    app.seed_user(UserSeed::employee("jane@example.com")).await;
    let category = app.seed_category("Cloud").await;
    let cookie = app.login("jane@example.com", PASSWORD).await;

    let future = certificate_body(category.id, today() + Duration::days(1), None);
    let response = app
        .send(json_request("POST", "/api/certificates", Some(&cookie), &future))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let backwards = certificate_body(
        category.id,
        today() - Duration::days(10),
        Some(today() - Duration::days(10)),
    );
    let response = app
        .send(json_request("POST", "/api/certificates", Some(&cookie), &backwards))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let mut bad_url = certificate_body(category.id, today() - Duration::days(10), None);
    bad_url["verification_url"] = json!("ftp://example.com/cert");
    let response = app
        .send(json_request("POST", "/api/certificates", Some(&cookie), &bad_url))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let unknown_category = certificate_body(category.id + 100, today() - Duration::days(10), None);
    let response = app
        .send(json_request(
            "POST",
            "/api/certificates",
            Some(&cookie),
            &unknown_category,
        ))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // nothing above should have left a provider behind
    let providers = body_json(app.get("/api/providers", Some(&cookie)).await).await;
    assert!(providers["data"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_only_owner_or_admin_can_modify() {
    let app = spawn_app().await;
    app.seed_user(UserSeed::admin("admin@example.com")).await;
    let jane = app.seed_user(UserSeed::employee("jane@example.com")).await;
    let bob = app.seed_user(UserSeed::employee("bob@example.com")).await;
    let category = app.seed_category("Cloud").await;

    let jane_cookie = app.login("jane@example.com", PASSWORD).await;
    let bob_cookie = app.login("bob@example.com", PASSWORD).await;
    let admin_cookie = app.login("admin@example.com", PASSWORD).await;

    // an employee cannot file a certificate under someone else
    let mut body = certificate_body(category.id, today() - Duration::days(60), None);
    body["user_id"] = json!(bob.id);
    let response = app
        .send(json_request("POST", "/api/certificates", Some(&jane_cookie), &body))
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let json = body_json(response).await;
    assert_eq!(json["data"]["user_id"], jane.id);
    let id = json["data"]["id"].as_i64().unwrap();
    let uri = format!("/api/certificates/{id}");

    let detail = body_json(app.get(&uri, Some(&bob_cookie)).await).await;
    assert_eq!(detail["data"]["can_edit"], false);

    let mut update = body.clone();
    update["name"] = json!("Renamed by Bob");
    let response = app
        .send(json_request("PUT", &uri, Some(&bob_cookie), &update))
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app.delete(&uri, &bob_cookie).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    update["name"] = json!("Renamed by admin");
    let response = app
        .send(json_request("PUT", &uri, Some(&admin_cookie), &update))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["name"], "Renamed by admin");
    assert_eq!(json["data"]["user_id"], bob.id);

    let response = app.delete(&uri, &jane_cookie).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app.delete(&uri, &admin_cookie).await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = app.get(&uri, Some(&admin_cookie)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_listing_and_statistics() {
    let app = spawn_app().await;
    app.seed_user(UserSeed::admin("admin@example.com")).await;
    let jane = app.seed_user(UserSeed::employee("jane@example.com")).await;
    app.seed_user(UserSeed::employee("bob@example.com")).await;
    let category = app.seed_category("Cloud").await;

    let jane_cookie = app.login("jane@example.com", PASSWORD).await;
    let admin_cookie = app.login("admin@example.com", PASSWORD).await;

    for days in [30, 60] {
        let body = certificate_body(category.id, today() - Duration::days(days), None);
        let response = app
            .send(json_request("POST", "/api/certificates", Some(&jane_cookie), &body))
            .await;
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    let mine = body_json(app.get("/api/certificates/mine", Some(&jane_cookie)).await).await;
    assert_eq!(mine["data"]["counts"]["total"], 2);
    assert_eq!(mine["data"]["certificates"].as_array().unwrap().len(), 2);

    let overview = body_json(app.get("/api/certificates", Some(&admin_cookie)).await).await;
    assert_eq!(overview["data"]["total_employees"], 1);
    assert_eq!(overview["data"]["employees"][0]["id"], jane.id);

    let searched = body_json(
        app.get("/api/certificates?search=nobody", Some(&admin_cookie))
            .await,
    )
    .await;
    assert_eq!(searched["data"]["total_employees"], 0);

    let own = body_json(
        app.get("/api/certificates/statistics", Some(&jane_cookie))
            .await,
    )
    .await;
    assert_eq!(own["data"]["scope"], "own");
    assert_eq!(own["data"]["total_certificates"], 2);
    assert!(own["data"]["top_employees"].is_null());

    let company = body_json(
        app.get("/api/certificates/statistics", Some(&admin_cookie))
            .await,
    )
    .await;
    assert_eq!(company["data"]["scope"], "company");
    assert_eq!(company["data"]["top_employees"][0]["certificate_count"], 2);
    assert_eq!(company["data"]["by_status"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_certificate_file_uploads() {
    let mut config = test_config();
    config.uploads.max_document_bytes = 1024;
    let app = spawn_app_with(config).await;

    app.seed_user(UserSeed::employee("jane@example.com")).await;
    let category = app.seed_category("Cloud").await;
    let cookie = app.login("jane@example.com", PASSWORD).await;

    let body = certificate_body(category.id, today() - Duration::days(5), None);
    let created = app
        .send(json_request("POST", "/api/certificates", Some(&cookie), &body))
        .await;
    let id = body_json(created).await["data"]["id"].as_i64().unwrap();
    let uri = format!("/api/certificates/{id}/file");

    let response = app.get(&uri, Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app
        .send(multipart_request("PUT", &uri, &cookie, "cert.exe", b"MZ\x90\x00"))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .send(multipart_request("PUT", &uri, &cookie, "cert.pdf", b"just some text"))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let mut oversized = b"%PDF-1.7\n".to_vec();
    oversized.resize(4096, b'0');
    let response = app
        .send(multipart_request("PUT", &uri, &cookie, "cert.pdf", &oversized))
        .await;
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);

    let response = app
        .send(multipart_request(
            "PUT",
            &uri,
            &cookie,
            "AWS cert.pdf",
            b"%PDF-1.7\n%%EOF",
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    let stored = json["data"]["certificate_file"].as_str().unwrap();
    assert!(stored.ends_with(".pdf"));

    let response = app.get(&uri, Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        "application/pdf"
    );

    let response = app.delete(&uri, &cookie).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert!(json["data"]["certificate_file"].is_null());

    let response = app.get(&uri, Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_expiry_sweep_marks_overdue_certificates() {
    let app = spawn_app().await;
    app.seed_user(UserSeed::employee("jane@example.com")).await;
    let category = app.seed_category("Cloud").await;
    let cookie = app.login("jane@example.com", PASSWORD).await;

    let body = certificate_body(
        category.id,
        today() - Duration::days(300),
        Some(today() + Duration::days(30)),
    );
    let created = app
        .send(json_request("POST", "/api/certificates", Some(&cookie), &body))
        .await;
    let id = i32::try_from(body_json(created).await["data"]["id"].as_i64().unwrap()).unwrap();

    // simulate the expiry date passing while the row still says ACTIVE
    let model = certificates::Entity::find_by_id(id)
        .one(&app.state.store.conn)
        .await
        .unwrap()
        .unwrap();
    let mut active: certificates::ActiveModel = model.into();
    active.expiry_date = Set(Some(today() - Duration::days(1)));
    active.update(&app.state.store.conn).await.unwrap();

    let scheduler = Scheduler::new(
        app.state.certificate_service.clone(),
        app.state.config.scheduler.clone(),
    );
    assert_eq!(scheduler.run_once().await.unwrap(), 1);
    assert_eq!(scheduler.run_once().await.unwrap(), 0);

    let json = body_json(
        app.get(&format!("/api/certificates/{id}"), Some(&cookie))
            .await,
    )
    .await;
    assert_eq!(json["data"]["certificate"]["status"], "EXPIRED");
}
