mod common;

use axum::http::StatusCode;
use blog_backend::domain::entities::LoginType;
use blog_backend::domain::jobs::BackgroundJob;
use blog_backend::infrastructure::cache::CacheService;
use common::{ADMIN_PASSWORD, CLIENT_IP, forwarded_for, login_form, open_login_page};
use serde_json::{Value, json};

#[tokio::test]
async fn test_login_page_sets_challenge_cookies() {
    let app = common::create_test_app();
    let server = app.server();

    let response = server.get("/passport/login?from=%2Fadmin").await;

    response.assert_status_ok();
    assert!(!response.cookie("PublicKey").value().is_empty());
    assert!(!response.cookie("XSRF-TOKEN").value().is_empty());
    assert_eq!(common::cookie_value(&response.cookie("refer")), "/admin");

    let html = response.text();
    assert!(html.contains("Test Blog"));
    assert!(html.contains("__RequestVerificationToken"));
}

#[tokio::test]
async fn test_login_success() {
    let mut app = common::create_test_app();
    app.add_user("admin", ADMIN_PASSWORD, true).await;
    let server = app.server();

    let result = common::login(&server, "admin", ADMIN_PASSWORD).await;

    assert_eq!(result, json!({"success": true, "message": "/", "data": null}));

    let info = server.get("/passport/getuserinfo").await.json::<Value>();
    assert_eq!(info["success"], true);
    assert_eq!(info["data"]["username"], "admin");
    assert_eq!(info["data"]["isAdmin"], true);
    assert!(info["data"].get("passwordHash").is_none());

    match app.next_job() {
        Some(BackgroundJob::LoginRecord {
            user,
            ip,
            login_type,
        }) => {
            assert_eq!(user.username, "admin");
            assert_eq!(ip, CLIENT_IP);
            assert_eq!(login_type, LoginType::Default);
        }
        other => panic!("expected login record job, got {other:?}"),
    }
}

#[tokio::test]
async fn test_login_redirects_to_refer() {
    let app = common::create_test_app();
    app.add_user("admin", ADMIN_PASSWORD, true).await;
    let server = app.server();

    let page = open_login_page(&server, "/passport/login?from=%2Fposts%2F42").await;
    let (name, value) = forwarded_for(CLIENT_IP);
    let result = server
        .post("/passport/login")
        .add_header(name, value)
        .form(&login_form(&page, "admin", ADMIN_PASSWORD, false))
        .await
        .json::<Value>();

    assert_eq!(result["success"], true);
    assert_eq!(result["message"], "/posts/42");
}

#[tokio::test]
async fn test_login_rejects_external_refer() {
    let app = common::create_test_app();
    app.add_user("admin", ADMIN_PASSWORD, true).await;
    let server = app.server();

    let page = open_login_page(&server, "/passport/login?from=https%3A%2F%2Fevil.example").await;
    let (name, value) = forwarded_for(CLIENT_IP);
    let result = server
        .post("/passport/login")
        .add_header(name, value)
        .form(&login_form(&page, "admin", ADMIN_PASSWORD, false))
        .await
        .json::<Value>();

    assert_eq!(result["message"], "/");
}

#[tokio::test]
async fn test_login_wrong_captcha() {
    let app = common::create_test_app();
    app.add_user("admin", ADMIN_PASSWORD, true).await;
    let server = app.server();

    let page = open_login_page(&server, "/passport/login").await;
    let mut form = login_form(&page, "admin", ADMIN_PASSWORD, false);
    form["valid"] = Value::String("wrong!".to_string());

    let result = server.post("/passport/login").form(&form).await.json::<Value>();

    assert_eq!(result["success"], false);
    assert_eq!(result["message"], "Invalid captcha");
}

#[tokio::test]
async fn test_login_captcha_case_insensitive() {
    let app = common::create_test_app();
    app.add_user("admin", ADMIN_PASSWORD, true).await;
    let server = app.server();

    let page = open_login_page(&server, "/passport/login").await;
    let mut form = login_form(&page, "admin", ADMIN_PASSWORD, false);
    form["valid"] = Value::String(format!(" {} ", page.captcha.to_lowercase()));

    let result = server.post("/passport/login").form(&form).await.json::<Value>();

    assert_eq!(result["success"], true);
}

#[tokio::test]
async fn test_login_wrong_password_counts_failure() {
    let app = common::create_test_app();
    app.add_user("admin", ADMIN_PASSWORD, true).await;
    let server = app.server();

    let result = common::login(&server, "admin", "not-the-password").await;

    assert_eq!(result["success"], false);
    assert_eq!(result["message"], "Invalid username or password");

    let count = app
        .cache
        .get(&format!("LoginError:{CLIENT_IP}"))
        .await
        .unwrap();
    assert_eq!(count.as_deref(), Some("1"));
}

#[tokio::test]
async fn test_login_empty_username() {
    let app = common::create_test_app();
    let server = app.server();

    let page = open_login_page(&server, "/passport/login").await;
    let result = server
        .post("/passport/login")
        .form(&login_form(&page, "  ", ADMIN_PASSWORD, false))
        .await
        .json::<Value>();

    assert_eq!(result["success"], false);
    assert_eq!(result["message"], "Username or password cannot be empty");
}

#[tokio::test]
async fn test_login_requires_anti_forgery_token() {
    let app = common::create_test_app();
    app.add_user("admin", ADMIN_PASSWORD, true).await;
    let server = app.server();

    let page = open_login_page(&server, "/passport/login").await;
    let mut form = login_form(&page, "admin", ADMIN_PASSWORD, false);
    form["__RequestVerificationToken"] = Value::String("forged".to_string());

    let response = server.post("/passport/login").form(&form).await;

    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_login_accepts_header_token() {
    let app = common::create_test_app();
    app.add_user("admin", ADMIN_PASSWORD, true).await;
    let server = app.server();

    let page = open_login_page(&server, "/passport/login").await;
    let mut form = login_form(&page, "admin", ADMIN_PASSWORD, false);
    form.as_object_mut().unwrap().remove("__RequestVerificationToken");

    let result = server
        .post("/passport/login")
        .add_header(
            axum::http::HeaderName::from_static("x-xsrf-token"),
            axum::http::HeaderValue::from_str(&page.xsrf_token).unwrap(),
        )
        .form(&form)
        .await
        .json::<Value>();

    assert_eq!(result["success"], true);
}

#[tokio::test]
async fn test_remember_me_restores_login() {
    let mut app = common::create_test_app();
    app.add_user("admin", ADMIN_PASSWORD, true).await;
    let server = app.server();

    let page = open_login_page(&server, "/passport/login").await;
    let response = server
        .post("/passport/login")
        .form(&login_form(&page, "admin", ADMIN_PASSWORD, true))
        .await;
    assert_eq!(response.json::<Value>()["success"], true);

    let username = response.cookie("username");
    let password = response.cookie("password");
    assert_ne!(password.value(), ADMIN_PASSWORD);
    app.next_job();

    // a new browser session carrying only the remember-me cookies
    let fresh = app.server();
    let (name, value) = forwarded_for(CLIENT_IP);
    let restored = fresh
        .get("/passport/login?from=%2Fdashboard")
        .add_header(name, value)
        .add_cookie(username)
        .add_cookie(password)
        .await;

    restored.assert_status(StatusCode::SEE_OTHER);
    assert_eq!(restored.header("location"), "/dashboard");

    let info = fresh.get("/passport/getuserinfo").await.json::<Value>();
    assert_eq!(info["data"]["username"], "admin");

    match app.next_job() {
        Some(BackgroundJob::LoginRecord { login_type, .. }) => {
            assert_eq!(login_type, LoginType::Remembered)
        }
        other => panic!("expected login record job, got {other:?}"),
    }
}

#[tokio::test]
async fn test_logged_in_user_is_redirected_from_login_page() {
    let app = common::create_test_app();
    app.add_user("admin", ADMIN_PASSWORD, true).await;
    let server = app.server();
    common::login(&server, "admin", ADMIN_PASSWORD).await;

    let response = server.get("/passport/login").await;

    response.assert_status(StatusCode::SEE_OTHER);
    assert_eq!(response.header("location"), "/");
}

#[tokio::test]
async fn test_validate_code_reuses_code_per_client() {
    let app = common::create_test_app();
    let server = app.server();

    let (name, value) = forwarded_for(CLIENT_IP);
    let first = server.get("/passport/validatecode").add_header(name, value).await;
    first.assert_status_ok();
    assert_eq!(first.header("content-type"), "image/jpeg");
    assert!(
        first
            .header("content-disposition")
            .to_str()
            .unwrap()
            .contains("captcha.jpg")
    );

    let (name, value) = forwarded_for(CLIENT_IP);
    let second = server.get("/passport/validatecode").add_header(name, value).await;

    assert_eq!(first.as_bytes(), second.as_bytes());
    assert_eq!(first.as_bytes().len(), 6);
}

#[tokio::test]
async fn test_check_validate_code() {
    let app = common::create_test_app();
    let server = app.server();

    let (name, value) = forwarded_for(CLIENT_IP);
    let image = server.get("/passport/validatecode").add_header(name, value).await;
    let code = String::from_utf8(image.as_bytes().to_vec()).unwrap();

    let wrong = server
        .post("/passport/checkvalidatecode")
        .form(&json!({"code": "nope"}))
        .await
        .json::<Value>();
    assert_eq!(wrong["success"], false);
    assert_eq!(wrong["message"], "Invalid captcha");

    let right = server
        .post("/passport/checkvalidatecode")
        .form(&json!({"code": code}))
        .await
        .json::<Value>();
    assert_eq!(right["success"], true);
    assert_eq!(right["message"], "Captcha is correct");
}

#[tokio::test]
async fn test_check_validate_code_without_session_code() {
    let app = common::create_test_app();
    let server = app.server();

    let result = server
        .post("/passport/checkvalidatecode")
        .form(&json!({"code": ""}))
        .await
        .json::<Value>();

    assert_eq!(result["success"], false);
}

#[tokio::test]
async fn test_distributed_lock_rejects_concurrent_request() {
    let app = common::create_test_app();
    let server = app.server();

    let held = app
        .cache
        .try_lock(
            &format!("lock:POST:/passport/checkvalidatecode:{CLIENT_IP}"),
            "other-request",
            std::time::Duration::from_secs(30),
        )
        .await
        .unwrap();
    assert!(held);

    let (name, value) = forwarded_for(CLIENT_IP);
    let response = server
        .post("/passport/checkvalidatecode")
        .add_header(name, value)
        .form(&json!({"code": "x"}))
        .await;

    response.assert_status(StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(
        response.json::<Value>()["message"],
        "Too many requests, please retry later"
    );

    // the rejected request must not drop a lock it never owned
    assert!(app
        .cache
        .release_lock(
            &format!("lock:POST:/passport/checkvalidatecode:{CLIENT_IP}"),
            "other-request",
        )
        .await
        .unwrap());
}

#[tokio::test]
async fn test_distributed_lock_released_after_request() {
    let app = common::create_test_app();
    let server = app.server();

    for _ in 0..2 {
        let (name, value) = forwarded_for(CLIENT_IP);
        server
            .post("/passport/checkvalidatecode")
            .add_header(name, value)
            .form(&json!({"code": "x"}))
            .await
            .assert_status_ok();
    }
}

#[tokio::test]
async fn test_getuserinfo_anonymous() {
    let app = common::create_test_app();
    let server = app.server();

    let info = server.get("/passport/getuserinfo").await.json::<Value>();

    assert_eq!(info, json!({"success": true, "message": "", "data": null}));
}

#[tokio::test]
async fn test_logout_post() {
    let app = common::create_test_app();
    app.add_user("admin", ADMIN_PASSWORD, true).await;
    let server = app.server();
    common::login(&server, "admin", ADMIN_PASSWORD).await;

    let result = server.post("/passport/logout").await.json::<Value>();
    assert_eq!(result["success"], true);
    assert_eq!(result["message"], "Logged out");

    let info = server.get("/passport/getuserinfo").await.json::<Value>();
    assert_eq!(info["data"], Value::Null);
}

#[tokio::test]
async fn test_logout_get_redirects_home() {
    let app = common::create_test_app();
    app.add_user("admin", ADMIN_PASSWORD, true).await;
    let server = app.server();
    common::login(&server, "admin", ADMIN_PASSWORD).await;

    let response = server.get("/passport/logout").await;

    response.assert_status(StatusCode::SEE_OTHER);
    assert_eq!(response.header("location"), "/");
}
