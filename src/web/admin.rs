use super::responses::{error_response, store_status, success_response};
use super::AppState;
use crate::store::StoreError;
use actix_web::http::{header, StatusCode};
use actix_web::{web, HttpRequest, HttpResponse, ResponseError};
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AdminError {
    #[error("Admin endpoints are disabled.")]
    Disabled,
    #[error("Invalid or missing admin token.")]
    Unauthorized,
    #[error("Username is required.")]
    MissingUsername,
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ResponseError for AdminError {
    fn status_code(&self) -> StatusCode {
        match self {
            AdminError::Disabled => StatusCode::FORBIDDEN,
            AdminError::Unauthorized => StatusCode::UNAUTHORIZED,
            AdminError::MissingUsername => StatusCode::BAD_REQUEST,
            AdminError::Store(err) => store_status(err),
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(error_response(&self.to_string()))
    }
}

#[derive(Debug, Deserialize)]
pub struct RemoveUserForm {
    #[serde(default)]
    pub username: String,
}

pub fn configure_admin_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/admin/clear-data", web::post().to(clear_data))
        .route("/admin/remove-user", web::post().to(remove_user));
}

/// Compares every byte regardless of where the first mismatch is
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

fn bearer_token(req: &HttpRequest) -> Option<&str> {
    let value = req.headers().get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    scheme
        .eq_ignore_ascii_case("bearer")
        .then(|| token.trim())
        .filter(|t| !t.is_empty())
}

pub fn authorize(state: &AppState, req: &HttpRequest) -> Result<(), AdminError> {
    let expected = state.admin_token.as_deref().ok_or(AdminError::Disabled)?;

    match bearer_token(req) {
        Some(presented) if constant_time_eq(presented.as_bytes(), expected.as_bytes()) => Ok(()),
        _ => {
            let info = req.connection_info();
            let peer = info.realip_remote_addr().unwrap_or("unknown");
            log::warn!("unauthorized admin call to {} from {}", req.path(), peer);
            Err(AdminError::Unauthorized)
        }
    }
}

pub async fn clear_data(
    state: web::Data<AppState>,
    req: HttpRequest,
) -> Result<HttpResponse, AdminError> {
    authorize(&state, &req)?;

    let removed = state.with_store(|store| store.clear()).await?;
    log::info!("admin cleared all scores ({} rows)", removed);

    Ok(HttpResponse::Ok().json(success_response(&format!(
        "Removed {} score(s).",
        removed
    ))))
}

pub async fn remove_user(
    state: web::Data<AppState>,
    req: HttpRequest,
    form: web::Form<RemoveUserForm>,
) -> Result<HttpResponse, AdminError> {
    authorize(&state, &req)?;

    let username = form.into_inner().username.trim().to_string();
    if username.is_empty() {
        return Err(AdminError::MissingUsername);
    }

    let target = username.clone();
    let removed = state
        .with_store(move |store| store.delete_user(&target))
        .await?;
    log::info!("admin removed {} ({} rows)", username, removed);

    Ok(HttpResponse::Ok().json(success_response(&format!(
        "Removed {} score(s) for {}.",
        removed, username
    ))))
}
