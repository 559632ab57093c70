#![allow(dead_code)]

use async_trait::async_trait;
use axum::http::{HeaderName, HeaderValue};
use axum_extra::extract::cookie::{Cookie, Key};
use axum_test::TestServer;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::mpsc;
use tower_sessions::MemoryStore;

use blog_backend::application::services::user_service::hash_password;
use blog_backend::application::services::{FirewallService, UserService, VariableService};
use blog_backend::domain::entities::{NewUser, UpsertVariable, User, Variable};
use blog_backend::domain::jobs::{BackgroundJob, JobQueue};
use blog_backend::domain::repositories::{UserRepository, VariableRepository};
use blog_backend::error::AppError;
use blog_backend::infrastructure::cache::{CacheService, MemoryCache};
use blog_backend::infrastructure::firewall::{AccessList, FirewallRules, NullReporter, WordFilter};
use blog_backend::infrastructure::geo::{IpLocator, MaxmindDatabase};
use blog_backend::infrastructure::settings::SystemSettings;
use blog_backend::routes::router;
use blog_backend::security::{CaptchaError, CaptchaRenderer, rsa_challenge};
use blog_backend::state::AppState;
use blog_backend::utils::watermark::Watermarker;

pub const ADMIN_PASSWORD: &str = "correct-horse-battery";
pub const CLIENT_IP: &str = "203.0.113.5";

#[derive(Default)]
pub struct InMemoryUserRepository {
    users: Mutex<Vec<User>>,
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, AppError> {
        Ok(self
            .users
            .lock()
            .iter()
            .find(|u| u.username == username)
            .cloned())
    }

    async fn create(&self, new_user: NewUser) -> Result<User, AppError> {
        let mut users = self.users.lock();
        if users.iter().any(|u| u.username == new_user.username) {
            return Err(AppError::conflict("Username taken", serde_json::json!({})));
        }
        let user = User {
            id: users.len() as i64 + 1,
            username: new_user.username,
            nick_name: new_user.nick_name,
            email: new_user.email,
            password_hash: new_user.password_hash,
            is_admin: new_user.is_admin,
            avatar: None,
            locked: false,
            created_at: Utc::now(),
            last_login_at: None,
        };
        users.push(user.clone());
        Ok(user)
    }

    async fn list(&self) -> Result<Vec<User>, AppError> {
        Ok(self.users.lock().clone())
    }

    async fn update_last_login(&self, id: i64, at: DateTime<Utc>) -> Result<(), AppError> {
        if let Some(user) = self.users.lock().iter_mut().find(|u| u.id == id) {
            user.last_login_at = Some(at);
        }
        Ok(())
    }

    async fn count(&self) -> Result<i64, AppError> {
        Ok(self.users.lock().len() as i64)
    }
}

#[derive(Default)]
pub struct InMemoryVariableRepository {
    variables: Mutex<Vec<Variable>>,
}

#[async_trait]
impl VariableRepository for InMemoryVariableRepository {
    async fn list(&self) -> Result<Vec<Variable>, AppError> {
        Ok(self.variables.lock().clone())
    }

    async fn upsert(&self, variable: UpsertVariable) -> Result<u64, AppError> {
        let mut variables = self.variables.lock();
        match variables.iter_mut().find(|v| v.key == variable.key) {
            Some(existing) => existing.value = variable.value,
            None => {
                let id = variables.iter().map(|v| v.id).max().unwrap_or(0) + 1;
                variables.push(Variable {
                    id,
                    key: variable.key,
                    value: variable.value,
                });
            }
        }
        Ok(1)
    }

    async fn delete(&self, id: i32) -> Result<bool, AppError> {
        let mut variables = self.variables.lock();
        let before = variables.len();
        variables.retain(|v| v.id != id);
        Ok(variables.len() < before)
    }
}

/// Renders the code itself so tests can read it back from the response body.
pub struct PlainTextCaptcha;

impl CaptchaRenderer for PlainTextCaptcha {
    fn render(&self, code: &str) -> Result<Vec<u8>, CaptchaError> {
        Ok(code.as_bytes().to_vec())
    }
}

pub struct TestApp {
    pub state: AppState,
    pub store: MemoryStore,
    pub cache: Arc<MemoryCache>,
    pub users: Arc<InMemoryUserRepository>,
    pub jobs: mpsc::Receiver<BackgroundJob>,
}

impl TestApp {
    /// A fresh server (own cookie jar) over the shared state and session store.
    pub fn server(&self) -> TestServer {
        let app = router(self.state.clone(), self.store.clone());
        TestServer::builder().save_cookies().build(app).unwrap()
    }

    pub async fn add_user(&self, username: &str, password: &str, is_admin: bool) -> User {
        self.users
            .create(NewUser {
                username: username.to_string(),
                nick_name: username.to_string(),
                email: None,
                password_hash: hash_password(password).unwrap(),
                is_admin,
            })
            .await
            .unwrap()
    }

    pub fn next_job(&mut self) -> Option<BackgroundJob> {
        self.jobs.try_recv().ok()
    }
}

pub struct TestOptions<'a> {
    pub whitelist: &'a str,
    pub deny: &'a str,
    pub ranges: &'a str,
    pub settings: Vec<(&'a str, &'a str)>,
}

impl Default for TestOptions<'_> {
    fn default() -> Self {
        Self {
            whitelist: "",
            deny: "",
            ranges: "",
            settings: vec![("Title", "Test Blog")],
        }
    }
}

pub fn create_test_app() -> TestApp {
    create_test_app_with(TestOptions::default())
}

pub fn create_test_app_with(options: TestOptions<'_>) -> TestApp {
    let users = Arc::new(InMemoryUserRepository::default());
    let variables = Arc::new(InMemoryVariableRepository::default());
    let cache = Arc::new(MemoryCache::new());
    let settings = Arc::new(SystemSettings::from_pairs(options.settings));

    let geo = Arc::new(MaxmindDatabase::open(Path::new("/nonexistent"), "en"));
    let locator = Arc::new(IpLocator::new(None, geo, "Asia/Shanghai"));

    let rules = Arc::new(FirewallRules::fixed(
        AccessList::parse(options.whitelist, options.deny, options.ranges),
        WordFilter::parse("", ""),
    ));
    let cache_dyn: Arc<dyn CacheService> = cache.clone();
    let firewall = Arc::new(FirewallService::new(
        rules,
        locator.clone(),
        settings.clone(),
        cache_dyn.clone(),
        Arc::new(NullReporter),
        30,
    ));

    let (jobs, job_rx) = JobQueue::new(100);
    let user_repo: Arc<dyn UserRepository> = users.clone();
    let variable_repo: Arc<dyn VariableRepository> = variables;

    let state = AppState {
        user_service: Arc::new(UserService::new(user_repo)),
        variable_service: Arc::new(VariableService::new(variable_repo)),
        firewall,
        locator,
        watermarker: Arc::new(Watermarker::new(settings.clone(), None)),
        settings,
        cache: cache_dyn,
        jobs,
        captcha: Some(Arc::new(PlainTextCaptcha)),
        cookie_key: Key::generate(),
        behind_proxy: true,
        secure_cookies: false,
    };

    TestApp {
        state,
        store: MemoryStore::default(),
        cache,
        users,
        jobs: job_rx,
    }
}

pub fn forwarded_for(ip: &'static str) -> (HeaderName, HeaderValue) {
    (
        HeaderName::from_static("x-forwarded-for"),
        HeaderValue::from_static(ip),
    )
}

/// Cookies and tokens a browser holds after opening the login page.
pub struct LoginPage {
    pub public_key: String,
    pub xsrf_token: String,
    pub captcha: String,
}

pub async fn open_login_page(server: &TestServer, path: &str) -> LoginPage {
    let (name, value) = forwarded_for(CLIENT_IP);
    let page = server.get(path).add_header(name, value).await;
    page.assert_status_ok();

    let public_key = cookie_value(&page.cookie("PublicKey"));
    let xsrf_token = cookie_value(&page.cookie("XSRF-TOKEN"));

    let (name, value) = forwarded_for(CLIENT_IP);
    let image = server
        .get("/passport/validatecode")
        .add_header(name, value)
        .await;
    image.assert_status_ok();
    let captcha = String::from_utf8(image.as_bytes().to_vec()).unwrap();

    LoginPage {
        public_key,
        xsrf_token,
        captcha,
    }
}

/// Cookie values travel percent-encoded.
pub fn cookie_value(cookie: &Cookie<'_>) -> String {
    urlencoding::decode(cookie.value())
        .map(|v| v.into_owned())
        .unwrap_or_else(|_| cookie.value().to_string())
}

pub fn login_form(page: &LoginPage, username: &str, password: &str, remember: bool) -> Value {
    let encrypted = rsa_challenge::encrypt(&page.public_key, password).unwrap();
    let mut form = serde_json::json!({
        "username": username,
        "password": encrypted,
        "valid": page.captcha,
        "__RequestVerificationToken": page.xsrf_token,
    });
    if remember {
        form["remem"] = Value::String("true".to_string());
    }
    form
}

/// Runs the full browser login flow and returns the JSON result.
pub async fn login(server: &TestServer, username: &str, password: &str) -> Value {
    let page = open_login_page(server, "/passport/login").await;
    let (name, value) = forwarded_for(CLIENT_IP);
    server
        .post("/passport/login")
        .add_header(name, value)
        .form(&login_form(&page, username, password, false))
        .await
        .json::<Value>()
}
