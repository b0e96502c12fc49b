//! Login, logout and the session gate in front of `/dashboard`.

use actix_web::cookie::{Cookie, SameSite};
use actix_web::{http::StatusCode, web, HttpRequest, HttpResponse, Responder};
use log::{error, info};
use serde_json::json;

use crate::core::auth::{authenticate, Session, CREDENTIALS_SIGNIN_STATE, SESSION_COOKIE};
use crate::core::error::AuthError;
use crate::core::invoices::INVOICES_PATH;
use crate::web::handlers::pages::{redirect_to, render};
use crate::web::models::LoginRequest;
use crate::web::server::AppState;

pub const LOGIN_PATH: &str = "/login";

/// Session attached to the request's cookie, if it is still live
pub fn current_session(req: &HttpRequest, data: &AppState) -> Option<Session> {
    let cookie = req.cookie(SESSION_COOKIE)?;
    data.sessions.get(cookie.value())
}

/// Session for a dashboard request, or the redirect to send instead
pub fn require_session(req: &HttpRequest, data: &AppState) -> Result<Session, HttpResponse> {
    current_session(req, data).ok_or_else(|| redirect_to(LOGIN_PATH))
}

fn login_page(status: StatusCode, email: &str, state: Option<&str>) -> HttpResponse {
    let context = json!({
        "title": "Login | Invoice Dashboard",
        "email": email,
        "state": state,
        "error": state.map(|_| "Invalid credentials."),
    });
    render("login", status, &context)
}

/// Serve the login form; signed-in visitors go straight to the dashboard
pub async fn login_form(req: HttpRequest, data: web::Data<AppState>) -> impl Responder {
    if current_session(&req, &data).is_some() {
        return redirect_to(INVOICES_PATH);
    }
    login_page(StatusCode::OK, "", None)
}

/// Credentials sign-in
pub async fn login(data: web::Data<AppState>, form: web::Form<LoginRequest>) -> impl Responder {
    let form = form.into_inner();
    let result = authenticate(
        data.store.as_ref(),
        &data.sessions,
        form.email.as_deref(),
        form.password.as_deref(),
    )
    .await;

    match result {
        Ok(session) => {
            let cookie = Cookie::build(SESSION_COOKIE, session.token)
                .path("/")
                .http_only(true)
                .same_site(SameSite::Lax)
                .finish();
            HttpResponse::SeeOther()
                .insert_header((actix_web::http::header::LOCATION, INVOICES_PATH))
                .cookie(cookie)
                .finish()
        }
        Err(AuthError::CredentialsSignin) => login_page(
            StatusCode::UNAUTHORIZED,
            form.email.as_deref().unwrap_or(""),
            Some(CREDENTIALS_SIGNIN_STATE),
        ),
        Err(e) => {
            error!("Sign-in failed: {}", e);
            HttpResponse::InternalServerError().body("Something went wrong.")
        }
    }
}

/// Drop the session and clear its cookie
pub async fn logout(req: HttpRequest, data: web::Data<AppState>) -> impl Responder {
    if let Some(cookie) = req.cookie(SESSION_COOKIE) {
        if let Some(session) = data.sessions.remove(cookie.value()) {
            info!("User {} ({}) signed out, {} sessions active", session.user_name, session.user_id, data.sessions.len());
        }
    }

    let mut removal = Cookie::build(SESSION_COOKIE, "").path("/").finish();
    removal.make_removal();
    HttpResponse::SeeOther()
        .insert_header((actix_web::http::header::LOCATION, LOGIN_PATH))
        .cookie(removal)
        .finish()
}
