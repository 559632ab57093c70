//! Login, captcha and logout endpoints under `/passport`.

use axum::{
    Form,
    extract::{Query, State},
    http::{HeaderMap, HeaderValue, header},
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, PrivateCookieJar, SameSite};
use serde_json::json;
use std::time::Duration;
use tower_sessions::Session;
use tower_sessions::cookie::time::Duration as CookieDuration;
use tracing::{info, warn};

use crate::api::dto::ResultData;
use crate::api::dto::passport::{CheckCodeForm, LoginForm, LoginQuery};
use crate::api::middleware::session::{
    CAPTCHA_KEY, PRIVATE_KEY_KEY, USER_INFO_KEY, current_user, sign_in,
};
use crate::domain::entities::{LoginType, UserInfo};
use crate::domain::jobs::BackgroundJob;
use crate::error::AppError;
use crate::infrastructure::settings::SETTING_TITLE;
use crate::security::{RsaKeyPair, captcha, csrf, rsa_challenge};
use crate::state::AppState;
use crate::utils::ClientIp;
use crate::utils::redirect::local_or_root;
use crate::web::handlers::login::LoginTemplate;

pub const PUBLIC_KEY_COOKIE: &str = "PublicKey";
pub const REFER_COOKIE: &str = "refer";
pub const USERNAME_COOKIE: &str = "username";
pub const PASSWORD_COOKIE: &str = "password";

/// Captcha codes are reused per client for this long.
const CAPTCHA_TTL: Duration = Duration::from_secs(5);
const REMEMBER_ME_DAYS: i64 = 365;

/// Renders the login page, or logs the visitor straight in.
///
/// # Endpoint
///
/// `GET /passport/login?from=<path>`
///
/// Every visit issues a fresh RSA key pair: the public half goes to the
/// `PublicKey` cookie for the page script, the private half stays in the
/// session. An existing session user, or valid remember-me cookies, redirect
/// to `from` when it is a local path and to `/` otherwise.
pub async fn login_page(
    State(state): State<AppState>,
    ClientIp(ip): ClientIp,
    session: Session,
    jar: CookieJar,
    private_jar: PrivateCookieJar,
    Query(query): Query<LoginQuery>,
) -> Result<Response, AppError> {
    let keys = tokio::task::spawn_blocking(RsaKeyPair::generate)
        .await
        .map_err(|e| AppError::internal("Key generation task failed", json!({"reason": e.to_string()})))?
        .map_err(|e| AppError::internal("Key generation failed", json!({"reason": e.to_string()})))?;

    session.insert(PRIVATE_KEY_KEY, &keys.private_key).await?;
    let secure = state.secure_cookies;
    let mut jar = jar.add(lax_cookie(PUBLIC_KEY_COOKIE, keys.public_key, secure));

    let from = query.from.filter(|f| !f.trim().is_empty()).map(|f| {
        urlencoding::decode(&f)
            .map(|decoded| decoded.into_owned())
            .unwrap_or(f)
    });
    if let Some(from) = &from {
        jar = jar.add(lax_cookie(REFER_COOKIE, from.clone(), secure));
    }

    let xsrf_token = csrf::generate_token();
    session.insert(csrf::SESSION_KEY, &xsrf_token).await?;
    jar = jar.add(lax_cookie(csrf::COOKIE_NAME, xsrf_token.clone(), secure));

    let target = local_or_root(from.as_deref());

    if current_user(&session).await?.is_some() {
        return Ok((jar, Redirect::to(&target)).into_response());
    }

    let remembered_name = jar
        .get(USERNAME_COOKIE)
        .and_then(|c| urlencoding::decode(c.value()).ok().map(|v| v.into_owned()));
    let remembered_password = private_jar.get(PASSWORD_COOKIE).map(|c| c.value().to_string());

    if let (Some(username), Some(password)) = (remembered_name, remembered_password)
        && !username.is_empty()
        && !password.is_empty()
    {
        if let Some(user) = state.user_service.login(&username, &password).await? {
            info!(user = %user.username, %ip, "Login restored from remember-me cookies");
            metrics::counter!("logins_total", "type" => LoginType::Remembered.as_str()).increment(1);

            sign_in(&session, &user).await?;
            let (jar, private_jar) = remember(jar, private_jar, &username, &password, secure);
            enqueue_login_record(&state, user, ip.to_string(), LoginType::Remembered);

            return Ok((jar, private_jar, Redirect::to(&target)).into_response());
        }

        let jar = jar.remove(removal(USERNAME_COOKIE));
        let private_jar = private_jar.remove(removal(PASSWORD_COOKIE));
        return Ok((jar, private_jar, render_login(&state, &xsrf_token, from)).into_response());
    }

    Ok((jar, render_login(&state, &xsrf_token, from)).into_response())
}

/// Checks the captcha and the RSA-encrypted credentials.
///
/// # Endpoint
///
/// `POST /passport/login` (form: `username`, `password`, `valid`, `remem`)
///
/// The anti-forgery token is read from `__RequestVerificationToken` or the
/// `X-XSRF-TOKEN` header.
///
/// # Response
///
/// `{"success": true, "message": "<redirect target>"}` on success; business
/// failures return `success: false` with a reason.
///
/// # Errors
///
/// Returns 400 Bad Request when the anti-forgery token is missing or stale.
pub async fn login(
    State(state): State<AppState>,
    ClientIp(ip): ClientIp,
    session: Session,
    headers: HeaderMap,
    jar: CookieJar,
    private_jar: PrivateCookieJar,
    Form(form): Form<LoginForm>,
) -> Result<Response, AppError> {
    verify_csrf(&session, &headers, form.request_verification_token.as_deref()).await?;

    let expected = session.get::<String>(CAPTCHA_KEY).await?;
    let captcha_ok = expected
        .as_deref()
        .is_some_and(|code| code.trim().eq_ignore_ascii_case(form.valid.trim()));
    if !captcha_ok {
        return Ok(ResultData::fail("Invalid captcha").into_response());
    }
    session.remove::<String>(CAPTCHA_KEY).await?;

    let username = form.username.trim();
    if username.is_empty() || form.password.trim().is_empty() {
        return Ok(ResultData::fail("Username or password cannot be empty").into_response());
    }

    let Some(private_key) = session.get::<String>(PRIVATE_KEY_KEY).await? else {
        warn!(%ip, "Login without a challenge key in the session");
        return Ok(ResultData::fail("Login expired, please refresh the page").into_response());
    };

    let password = match rsa_challenge::decrypt(&private_key, form.password.trim()) {
        Ok(password) => password,
        Err(e) => {
            warn!(%ip, username, "Password decryption failed: {}", e);
            return Ok(ResultData::fail("Login expired, please refresh the page").into_response());
        }
    };

    let Some(user) = state.user_service.login(username, &password).await? else {
        let failures = state.firewall.record_login_failure(ip).await;
        metrics::counter!("login_failures_total").increment(1);
        info!(%ip, username, failures, "Wrong username or password");
        return Ok(ResultData::fail("Invalid username or password").into_response());
    };

    info!(user = %user.username, %ip, "User logged in");
    metrics::counter!("logins_total", "type" => LoginType::Default.as_str()).increment(1);

    sign_in(&session, &user).await?;
    session.remove::<String>(PRIVATE_KEY_KEY).await?;

    let (jar, private_jar) = if form.remember_me() {
        remember(jar, private_jar, username, &password, state.secure_cookies)
    } else {
        (jar, private_jar)
    };

    let target = local_or_root(jar.get(REFER_COOKIE).map(|c| c.value()));
    let jar = jar
        .remove(removal(PUBLIC_KEY_COOKIE))
        .remove(removal(REFER_COOKIE));

    enqueue_login_record(&state, user, ip.to_string(), LoginType::Default);

    Ok((jar, private_jar, ResultData::ok(target)).into_response())
}

/// Serves a captcha image and remembers the code in the session.
///
/// # Endpoint
///
/// `GET /passport/validatecode`
///
/// Requests from the same address within a few seconds get the same code.
///
/// # Errors
///
/// Returns 500 Internal Server Error when no font is available.
pub async fn validate_code(
    State(state): State<AppState>,
    ClientIp(ip): ClientIp,
    session: Session,
) -> Result<Response, AppError> {
    let Some(renderer) = state.captcha.clone() else {
        return Err(AppError::internal(
            "Captcha unavailable",
            json!({"reason": "No font configured"}),
        ));
    };

    let fresh = captcha::generate_code(captcha::CODE_LENGTH);
    let code = state
        .cache
        .get_or_insert(&format!("captcha:{ip}"), &fresh, CAPTCHA_TTL)
        .await
        .unwrap_or(fresh);

    session.insert(CAPTCHA_KEY, &code).await?;

    let image = tokio::task::spawn_blocking(move || renderer.render(&code))
        .await
        .map_err(|e| AppError::internal("Captcha task failed", json!({"reason": e.to_string()})))?
        .map_err(|e| AppError::internal("Captcha rendering failed", json!({"reason": e.to_string()})))?;

    Ok((
        [
            (header::CONTENT_TYPE, HeaderValue::from_static("image/jpeg")),
            (
                header::CONTENT_DISPOSITION,
                HeaderValue::from_static("inline; filename=\"captcha.jpg\""),
            ),
            (header::CACHE_CONTROL, HeaderValue::from_static("no-store")),
        ],
        image,
    )
        .into_response())
}

/// Checks a captcha answer without consuming it.
///
/// # Endpoint
///
/// `POST /passport/checkvalidatecode` (form: `code`)
pub async fn check_validate_code(
    session: Session,
    Form(form): Form<CheckCodeForm>,
) -> Result<ResultData, AppError> {
    let expected = session.get::<String>(CAPTCHA_KEY).await?;
    let matches = expected
        .as_deref()
        .is_some_and(|code| code.trim().eq_ignore_ascii_case(form.code.trim()));

    if matches {
        Ok(ResultData::ok("Captcha is correct"))
    } else {
        Ok(ResultData::fail("Invalid captcha"))
    }
}

/// Returns the logged-in user, or `null`.
///
/// # Endpoint
///
/// `GET /passport/getuserinfo`
pub async fn get_user_info(session: Session) -> Result<ResultData, AppError> {
    let user = current_user(&session).await?;
    Ok(ResultData::ok("").with_data(user))
}

/// Logs out and redirects home.
///
/// # Endpoint
///
/// `GET /passport/logout`
pub async fn logout_redirect(
    session: Session,
    jar: CookieJar,
    private_jar: PrivateCookieJar,
) -> Result<Response, AppError> {
    let (jar, private_jar) = sign_out(&session, jar, private_jar).await?;
    Ok((jar, private_jar, Redirect::to("/")).into_response())
}

/// Logs out.
///
/// # Endpoint
///
/// `POST /passport/logout`
pub async fn logout(
    session: Session,
    jar: CookieJar,
    private_jar: PrivateCookieJar,
) -> Result<Response, AppError> {
    let (jar, private_jar) = sign_out(&session, jar, private_jar).await?;
    Ok((jar, private_jar, ResultData::ok("Logged out")).into_response())
}

async fn sign_out(
    session: &Session,
    jar: CookieJar,
    private_jar: PrivateCookieJar,
) -> Result<(CookieJar, PrivateCookieJar), AppError> {
    if let Some(user) = session.remove::<UserInfo>(USER_INFO_KEY).await? {
        info!(user = %user.username, "User logged out");
    }
    session.flush().await?;

    Ok((
        jar.remove(removal(USERNAME_COOKIE)),
        private_jar.remove(removal(PASSWORD_COOKIE)),
    ))
}

/// Accepts the token from the form field or the header.
async fn verify_csrf(
    session: &Session,
    headers: &HeaderMap,
    form_token: Option<&str>,
) -> Result<(), AppError> {
    let provided = form_token.map(str::to_string).or_else(|| {
        headers
            .get(csrf::HEADER_NAME)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    });
    let expected = session.get::<String>(csrf::SESSION_KEY).await?;

    match (expected, provided) {
        (Some(expected), Some(provided)) if csrf::tokens_match(&expected, &provided) => Ok(()),
        _ => Err(AppError::bad_request(
            "Invalid anti-forgery token",
            json!({"reason": "Reload the login page and try again"}),
        )),
    }
}

fn render_login(state: &AppState, xsrf_token: &str, from: Option<String>) -> LoginTemplate {
    LoginTemplate {
        title: state.settings.get_or_empty(SETTING_TITLE),
        xsrf_token: xsrf_token.to_string(),
        from: from.unwrap_or_default(),
    }
}

fn remember(
    jar: CookieJar,
    private_jar: PrivateCookieJar,
    username: &str,
    password: &str,
    secure: bool,
) -> (CookieJar, PrivateCookieJar) {
    let name = Cookie::build((USERNAME_COOKIE, urlencoding::encode(username).into_owned()))
        .path("/")
        .same_site(SameSite::Lax)
        .http_only(true)
        .secure(secure)
        .max_age(CookieDuration::days(REMEMBER_ME_DAYS));
    let secret = Cookie::build((PASSWORD_COOKIE, password.to_string()))
        .path("/")
        .same_site(SameSite::Lax)
        .http_only(true)
        .secure(secure)
        .max_age(CookieDuration::days(REMEMBER_ME_DAYS));

    (jar.add(name), private_jar.add(secret))
}

fn enqueue_login_record(state: &AppState, user: UserInfo, ip: String, login_type: LoginType) {
    state.jobs.enqueue(BackgroundJob::LoginRecord {
        user,
        ip,
        login_type,
    });
}

fn lax_cookie(name: &'static str, value: String, secure: bool) -> Cookie<'static> {
    Cookie::build((name, value))
        .path("/")
        .same_site(SameSite::Lax)
        .secure(secure)
        .build()
}

fn removal(name: &'static str) -> Cookie<'static> {
    Cookie::build(name).path("/").build()
}
