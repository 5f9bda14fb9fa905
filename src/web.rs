pub mod admin;
pub mod handlers;
pub mod pages;
pub mod responses;

use crate::config::{ConfigError, Settings};
use crate::moderation::ModerationPolicy;
use crate::session::{Identity, SessionStore};
use crate::store::{ScoreStore, StoreError};
use crate::submission::SubmitPolicy;
use actix_web::cookie::{time, Cookie, SameSite};
use actix_web::{middleware, web, App, HttpRequest, HttpResponse, HttpServer};
use responses::SubmitResponse;
use std::sync::Arc;

pub const SESSION_COOKIE: &str = "typeboard_session";

/// Everything a request handler can reach. Built once and shared by all workers.
pub struct AppState {
    pub store: Arc<dyn ScoreStore>,
    pub sessions: SessionStore,
    pub moderation: ModerationPolicy,
    pub policy: SubmitPolicy,
    pub leaderboard_limit: usize,
    pub admin_token: Option<String>,
    pub secure_cookies: bool,
}

/// A request carrying a live session cookie
#[derive(Debug, Clone)]
pub struct Authenticated {
    pub token: String,
    pub identity: Identity,
}

impl AppState {
    pub fn new(settings: &Settings, store: Arc<dyn ScoreStore>) -> Result<Self, ConfigError> {
        Ok(Self {
            store,
            sessions: SessionStore::new(settings.session_lifetime()?),
            moderation: settings.moderation_policy()?,
            policy: settings.submit_policy,
            leaderboard_limit: settings.leaderboard_limit,
            admin_token: settings.admin_token.clone().filter(|t| !t.is_empty()),
            secure_cookies: settings.secure_cookies,
        })
    }

    pub fn current_session(&self, req: &HttpRequest) -> Option<Authenticated> {
        let token = req.cookie(SESSION_COOKIE)?.value().to_string();
        let identity = self.sessions.get(&token)?;
        Some(Authenticated { token, identity })
    }

    pub fn session_cookie(&self, token: &str) -> Cookie<'static> {
        let max_age = time::Duration::seconds(self.sessions.lifetime().num_seconds());
        Cookie::build(SESSION_COOKIE, token.to_string())
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax)
            .secure(self.secure_cookies)
            .max_age(max_age)
            .finish()
    }

    pub fn removal_cookie(&self) -> Cookie<'static> {
        let mut cookie = Cookie::build(SESSION_COOKIE, "")
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax)
            .secure(self.secure_cookies)
            .finish();
        cookie.make_removal();
        cookie
    }

    /// Run a store call on the blocking pool
    pub async fn with_store<F, T>(&self, f: F) -> Result<T, StoreError>
    where
        F: FnOnce(&dyn ScoreStore) -> Result<T, StoreError> + Send + 'static,
        T: Send + 'static,
    {
        let store = Arc::clone(&self.store);
        web::block(move || f(store.as_ref()))
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?
    }
}

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    let json = web::JsonConfig::default().error_handler(|err, _req| {
        let body = SubmitResponse::failure(err.to_string());
        actix_web::error::InternalError::from_response(err, HttpResponse::BadRequest().json(body))
            .into()
    });

    cfg.app_data(json)
        .route("/", web::get().to(handlers::login_page))
        .route("/login", web::get().to(handlers::login_page))
        .route("/login", web::post().to(handlers::login))
        .route("/logout", web::get().to(handlers::logout))
        .route("/main", web::get().to(handlers::main_page))
        .route("/home", web::get().to(handlers::main_page))
        .route("/about", web::get().to(handlers::about_page))
        .route("/contact", web::get().to(handlers::contact_page))
        .route("/submit_result", web::post().to(handlers::submit_result))
        .route("/leaderboard", web::get().to(handlers::leaderboard_page))
        .route(
            "/api/leaderboard/global",
            web::get().to(handlers::global_leaderboard),
        )
        .route(
            "/api/leaderboard/college",
            web::get().to(handlers::college_leaderboard),
        )
        .route("/get_user_info", web::get().to(handlers::user_info))
        .configure(admin::configure_admin_routes);
}

pub async fn run_server(state: AppState, address: String) -> std::io::Result<()> {
    let state = web::Data::new(state);

    log::info!("typeboard listening on http://{}", address);

    HttpServer::new(move || {
        App::new()
            .wrap(middleware::Logger::default())
            .app_data(state.clone())
            .configure(configure_routes)
    })
    .bind(address)?
    .run()
    .await
}
