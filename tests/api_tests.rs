mod common;

use axum::http::{StatusCode, header};
use chrono::{Duration, Local};
use common::{
    PASSWORD, UserSeed, body_json, certificate_body, json_request, multipart_request, png_bytes,
    spawn_app,
};
use serde_json::json;

#[tokio::test]
async fn test_health_is_public() {
    let app = spawn_app().await;

    let response = app.get("/api/system/health/live", None).await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["success"], true);
    assert_eq!(json["data"]["status"], "alive");

    let response = app.get("/api/system/health/ready", None).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_protected_routes_require_session() {
    let app = spawn_app().await;

    for uri in [
        "/api/auth/me",
        "/api/dashboard",
        "/api/employees",
        "/api/certificates",
        "/api/providers",
    ] {
        let response = app.get(uri, None).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{uri}");
    }
}

#[tokio::test]
async fn test_login_and_current_user() {
    let app = spawn_app().await;
    app.seed_user(UserSeed::employee("jane@example.com")).await;

    // e-mail lookup is case-insensitive
    let cookie = app.login("  Jane@Example.com ", PASSWORD).await;

    let response = app.get("/api/auth/me", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["data"]["email"], "jane@example.com");
    assert_eq!(json["data"]["is_admin"], false);
    assert_eq!(json["data"]["role"], "EMPLOYEE");
    assert!(json["data"].get("password_hash").is_none());
}

#[tokio::test]
async fn test_login_rejections() {
    let app = spawn_app().await;
    app.seed_user(UserSeed::employee("jane@example.com")).await;
    app.seed_user(UserSeed {
        is_active: false,
        ..UserSeed::employee("gone@example.com")
    })
    .await;

    let wrong_password = app
        .send(json_request(
            "POST",
            "/api/auth/login",
            None,
            &json!({ "email": "jane@example.com", "password": "not-it" }),
        ))
        .await;
    assert_eq!(wrong_password.status(), StatusCode::UNAUTHORIZED);
    let json = body_json(wrong_password).await;
    assert_eq!(json["success"], false);

    let unknown = app
        .send(json_request(
            "POST",
            "/api/auth/login",
            None,
            &json!({ "email": "nobody@example.com", "password": PASSWORD }),
        ))
        .await;
    assert_eq!(unknown.status(), StatusCode::UNAUTHORIZED);

    let inactive = app
        .send(json_request(
            "POST",
            "/api/auth/login",
            None,
            &json!({ "email": "gone@example.com", "password": PASSWORD }),
        ))
        .await;
    assert_eq!(inactive.status(), StatusCode::FORBIDDEN);

    let empty = app
        .send(json_request(
            "POST",
            "/api/auth/login",
            None,
            &json!({ "email": "", "password": "" }),
        ))
        .await;
    assert_eq!(empty.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_logout_ends_session() {
    let app = spawn_app().await;
    app.seed_user(UserSeed::employee("jane@example.com")).await;
    let cookie = app.login("jane@example.com", PASSWORD).await;

    let response = app
        .send(json_request("POST", "/api/auth/logout", Some(&cookie), &json!({})))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = app.get("/api/auth/me", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_new_user_must_change_password_first() {
    let app = spawn_app().await;
    app.seed_user(UserSeed::admin("admin@example.com")).await;
    let admin = app.login("admin@example.com", PASSWORD).await;

    let response = app
        .send(json_request(
            "POST",
            "/api/users",
            Some(&admin),
            &json!({
                "email": "new.hire@example.com",
                "first_name": "new",
                "last_name": "hire",
                "department": "Support",
            }),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let json = body_json(response).await;
    assert_eq!(json["data"]["user"]["first_name"], "New");
    assert_eq!(json["data"]["user"]["must_change_password"], true);
    let temporary = json["data"]["temporary_password"]
        .as_str()
        .unwrap()
        .to_string();
    assert_eq!(temporary.len(), 12);

    let cookie = app.login("new.hire@example.com", &temporary).await;

    let blocked = app.get("/api/dashboard", Some(&cookie)).await;
    assert_eq!(blocked.status(), StatusCode::FORBIDDEN);

    let me = app.get("/api/auth/me", Some(&cookie)).await;
    assert_eq!(me.status(), StatusCode::OK);

    let same = app
        .send(json_request(
            "PUT",
            "/api/auth/password",
            Some(&cookie),
            &json!({ "current_password": temporary, "new_password": temporary }),
        ))
        .await;
    assert_eq!(same.status(), StatusCode::BAD_REQUEST);

    let changed = app
        .send(json_request(
            "PUT",
            "/api/auth/password",
            Some(&cookie),
            &json!({ "current_password": temporary, "new_password": "a-fresh-passphrase" }),
        ))
        .await;
    assert_eq!(changed.status(), StatusCode::OK);

    let dashboard = app.get("/api/dashboard", Some(&cookie)).await;
    assert_eq!(dashboard.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_duplicate_email_is_rejected() {
    let app = spawn_app().await;
    app.seed_user(UserSeed::admin("admin@example.com")).await;
    app.seed_user(UserSeed::employee("jane@example.com")).await;
    let admin = app.login("admin@example.com", PASSWORD).await;

    let response = app
        .send(json_request(
            "POST",
            "/api/users",
            Some(&admin),
            &json!({ "email": "JANE@example.com", "first_name": "Jane", "last_name": "Again" }),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_admin_routes_reject_employees() {
    let app = spawn_app().await;
    let jane = app.seed_user(UserSeed::employee("jane@example.com")).await;
    let cookie = app.login("jane@example.com", PASSWORD).await;

    let create = app
        .send(json_request(
            "POST",
            "/api/users",
            Some(&cookie),
            &json!({ "email": "x@example.com", "first_name": "X", "last_name": "Y" }),
        ))
        .await;
    assert_eq!(create.status(), StatusCode::FORBIDDEN);

    let provider = app
        .send(json_request(
            "POST",
            "/api/providers",
            Some(&cookie),
            &json!({ "name": "Cisco" }),
        ))
        .await;
    assert_eq!(provider.status(), StatusCode::FORBIDDEN);

    let delete = app
        .delete(&format!("/api/users/{}", jane.id), &cookie)
        .await;
    assert_eq!(delete.status(), StatusCode::FORBIDDEN);

    // read access to the catalog stays open
    let list = app.get("/api/providers", Some(&cookie)).await;
    assert_eq!(list.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_employee_cannot_edit_another_profile() {
    let app = spawn_app().await;
    let bob = app.seed_user(UserSeed::employee("bob@example.com")).await;
    let jane = app.seed_user(UserSeed::employee("jane@example.com")).await;
    let cookie = app.login("jane@example.com", PASSWORD).await;

    let other = app
        .send(json_request(
            "PUT",
            &format!("/api/employees/{}", bob.id),
            Some(&cookie),
            &json!({ "position": "Manager" }),
        ))
        .await;
    assert_eq!(other.status(), StatusCode::FORBIDDEN);

    let own = app
        .send(json_request(
            "PUT",
            &format!("/api/employees/{}", jane.id),
            Some(&cookie),
            &json!({ "position": "Lead Engineer" }),
        ))
        .await;
    assert_eq!(own.status(), StatusCode::OK);
    let json = body_json(own).await;
    assert_eq!(json["data"]["position"], "Lead Engineer");
}

#[tokio::test]
async fn test_user_deletion_rules() {
    let app = spawn_app().await;
    let admin = app.seed_user(UserSeed::admin("admin@example.com")).await;
    let root = app
        .seed_user(UserSeed {
            is_superuser: true,
            ..UserSeed::admin("root@example.com")
        })
        .await;
    let jane = app.seed_user(UserSeed::employee("jane@example.com")).await;
    let category = app.seed_category("Cloud").await;
    let cookie = app.login("admin@example.com", PASSWORD).await;

    let own = app
        .delete(&format!("/api/users/{}", admin.id), &cookie)
        .await;
    assert_eq!(own.status(), StatusCode::BAD_REQUEST);

    let superuser = app
        .delete(&format!("/api/users/{}", root.id), &cookie)
        .await;
    assert_eq!(superuser.status(), StatusCode::FORBIDDEN);

    let today = Local::now().date_naive();
    let mut body = certificate_body(category.id, today - Duration::days(30), None);
    body["user_id"] = json!(jane.id);
    let created = app
        .send(json_request("POST", "/api/certificates", Some(&cookie), &body))
        .await;
    assert_eq!(created.status(), StatusCode::CREATED);
    let cert_id = body_json(created).await["data"]["id"].as_i64().unwrap();

    let deleted = app
        .delete(&format!("/api/users/{}", jane.id), &cookie)
        .await;
    assert_eq!(deleted.status(), StatusCode::OK);

    let missing = app
        .get(&format!("/api/certificates/{cert_id}"), Some(&cookie))
        .await;
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);

    let missing_user = app
        .delete(&format!("/api/users/{}", jane.id), &cookie)
        .await;
    assert_eq!(missing_user.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_catalog_conflicts() {
    let app = spawn_app().await;
    let admin = app.seed_user(UserSeed::admin("admin@example.com")).await;
    let cookie = app.login("admin@example.com", PASSWORD).await;

    let created = app
        .send(json_request(
            "POST",
            "/api/categories",
            Some(&cookie),
            &json!({ "name": "Security", "color": "#EF4444" }),
        ))
        .await;
    assert_eq!(created.status(), StatusCode::CREATED);
    let category_id = body_json(created).await["data"]["id"].as_i64().unwrap();

    let duplicate = app
        .send(json_request(
            "POST",
            "/api/categories",
            Some(&cookie),
            &json!({ "name": "security" }),
        ))
        .await;
    assert_eq!(duplicate.status(), StatusCode::CONFLICT);

    let today = Local::now().date_naive();
    let mut body = certificate_body(
        i32::try_from(category_id).unwrap(),
        today - Duration::days(10),
        Some(today + Duration::days(300)),
    );
    body["user_id"] = json!(admin.id);
    let cert = app
        .send(json_request("POST", "/api/certificates", Some(&cookie), &body))
        .await;
    assert_eq!(cert.status(), StatusCode::CREATED);

    let providers = body_json(app.get("/api/providers", Some(&cookie)).await).await;
    let provider_id = providers["data"][0]["id"].as_i64().unwrap();
    assert_eq!(providers["data"][0]["name"], "Amazon Web Services");

    let in_use = app
        .delete(&format!("/api/providers/{provider_id}"), &cookie)
        .await;
    assert_eq!(in_use.status(), StatusCode::CONFLICT);
    let json = body_json(in_use).await;
    assert!(json["error"].as_str().unwrap().contains("Amazon Web Services"));

    let in_use = app
        .delete(&format!("/api/categories/{category_id}"), &cookie)
        .await;
    assert_eq!(in_use.status(), StatusCode::CONFLICT);

    let unused = app
        .send(json_request(
            "POST",
            "/api/providers",
            Some(&cookie),
            &json!({ "name": "Linux Foundation", "website": "https://www.linuxfoundation.org" }),
        ))
        .await;
    assert_eq!(unused.status(), StatusCode::CREATED);
    let unused_id = body_json(unused).await["data"]["id"].as_i64().unwrap();

    let removed = app
        .delete(&format!("/api/providers/{unused_id}"), &cookie)
        .await;
    assert_eq!(removed.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_dashboard_counts() {
    let app = spawn_app().await;
    let admin = app.seed_user(UserSeed::admin("admin@example.com")).await;
    let category = app.seed_category("Cloud").await;
    let cookie = app.login("admin@example.com", PASSWORD).await;
    let today = Local::now().date_naive();

    for expiry in [
        Some(today + Duration::days(10)),
        Some(today + Duration::days(200)),
        Some(today - Duration::days(5)),
        None,
    ] {
        let mut body = certificate_body(category.id, today - Duration::days(40), expiry);
        body["user_id"] = json!(admin.id);
        let response = app
            .send(json_request("POST", "/api/certificates", Some(&cookie), &body))
            .await;
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    let response = app.get("/api/dashboard", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    let kpis = &json["data"]["kpis"];
    assert_eq!(kpis["total_certificates"], 4);
    assert_eq!(kpis["active_certificates"], 3);
    assert_eq!(kpis["expired_certificates"], 1);
    assert_eq!(kpis["expiring_soon"], 1);
    assert!(json["data"]["timeline"].as_array().unwrap().len() >= 12);
}

#[tokio::test]
async fn test_invalid_ids_are_rejected() {
    let app = spawn_app().await;
    app.seed_user(UserSeed::employee("jane@example.com")).await;
    let cookie = app.login("jane@example.com", PASSWORD).await;

    let response = app.get("/api/certificates/0", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app.get("/api/employees/9999", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_profile_photo_lifecycle() {
    let app = spawn_app().await;
    let jane = app.seed_user(UserSeed::employee("jane@example.com")).await;
    let bob = app.seed_user(UserSeed::employee("bob@example.com")).await;
    let cookie = app.login("jane@example.com", PASSWORD).await;
    let uri = format!("/api/employees/{}/photo", jane.id);

    let response = app.get(&uri, Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app
        .send(multipart_request(
            "PUT",
            &format!("/api/employees/{}/photo", bob.id),
            &cookie,
            "me.png",
            &png_bytes(200, 200),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app
        .send(multipart_request("PUT", &uri, &cookie, "me.gif", b"GIF89a"))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .send(multipart_request("PUT", &uri, &cookie, "me.png", b"not an image"))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .send(multipart_request("PUT", &uri, &cookie, "me.png", &png_bytes(10, 10)))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .send(multipart_request("PUT", &uri, &cookie, "me.png", &png_bytes(200, 200)))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let first = body_json(response).await["data"]["profile_image"]
        .as_str()
        .unwrap()
        .to_string();
    let first_path = app.state.files.resolve(&first).unwrap();
    assert!(first_path.exists());

    let response = app.get(&uri, Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        "image/png"
    );

    // replacing the photo drops the previous file
    let response = app
        .send(multipart_request("PUT", &uri, &cookie, "new.png", &png_bytes(300, 300)))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let second = body_json(response).await["data"]["profile_image"]
        .as_str()
        .unwrap()
        .to_string();
    assert_ne!(first, second);
    assert!(!first_path.exists());
    let second_path = app.state.files.resolve(&second).unwrap();
    assert!(second_path.exists());

    let response = app.delete(&uri, &cookie).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert!(json["data"]["profile_image"].is_null());
    assert!(!second_path.exists());

    let response = app.get(&uri, Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
