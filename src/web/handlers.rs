use super::pages;
use super::responses::{ErrorBody, SubmitResponse};
use super::{AppState, Authenticated};
use crate::leaderboard::{aggregate_filtered, CollegeFilter};
use crate::score::{ranked, RankedRow, ScoreEntry};
use crate::session::{establish_identity, LoginForm};
use crate::store::{entries, StoreError};
use crate::submission::{submit, ResultPayload};
use actix_web::http::header::{self, ContentType};
use actix_web::{web, HttpRequest, HttpResponse};
use itertools::Itertools;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct CollegeQuery {
    pub college: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct LeaderboardResponse {
    pub status: String,
    pub college: String,
    pub leaderboard: Vec<RankedRow>,
}

#[derive(Debug, Serialize)]
pub struct UserInfo {
    pub username: String,
    pub email: String,
    #[serde(rename = "sapId")]
    pub sap_id: String,
}

fn redirect(location: &str) -> HttpResponse {
    HttpResponse::SeeOther()
        .insert_header((header::LOCATION, location))
        .finish()
}

fn html(state: &AppState, auth: &Authenticated, body: String) -> HttpResponse {
    HttpResponse::Ok()
        .content_type(ContentType::html())
        .cookie(state.session_cookie(&auth.token))
        .body(body)
}

fn not_logged_in() -> HttpResponse {
    HttpResponse::Unauthorized().json(ErrorBody::new("Not logged in"))
}

/// Aggregated rows plus the distinct colleges seen, for the selector
async fn load_board(
    state: &AppState,
    filter: CollegeFilter,
) -> Result<(Vec<RankedRow>, Vec<String>), StoreError> {
    let limit = state.leaderboard_limit;
    state
        .with_store(move |store| {
            let rows = store.scan()?;
            let colleges = college_options(entries(&rows));
            let board = aggregate_filtered(entries(&rows), limit, &filter);
            Ok((ranked(board), colleges))
        })
        .await
}

/// One selector entry per college, case-folded the way [`CollegeFilter`] matches.
/// The first spelling seen is the one shown.
fn college_options<'a, I>(rows: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a ScoreEntry>,
{
    rows.into_iter()
        .map(|e| e.college.clone())
        .unique_by(|c| c.to_uppercase())
        .sorted_by_key(|c| c.to_uppercase())
        .collect()
}

pub async fn login_page(state: web::Data<AppState>, req: HttpRequest) -> HttpResponse {
    if state.current_session(&req).is_some() {
        return redirect("/main");
    }
    HttpResponse::Ok()
        .content_type(ContentType::html())
        .body(pages::login(None))
}

pub async fn login(state: web::Data<AppState>, form: web::Form<LoginForm>) -> HttpResponse {
    match establish_identity(&form, &state.moderation) {
        Ok(identity) => {
            log::info!("{} logged in", identity.username);
            let token = state.sessions.create(identity);
            HttpResponse::SeeOther()
                .insert_header((header::LOCATION, "/main"))
                .cookie(state.session_cookie(&token))
                .finish()
        }
        Err(err) => {
            log::warn!("login refused for {:?}: {}", form.email, err);
            HttpResponse::BadRequest()
                .content_type(ContentType::html())
                .body(pages::login(Some(&err.to_string())))
        }
    }
}

pub async fn logout(state: web::Data<AppState>, req: HttpRequest) -> HttpResponse {
    if let Some(cookie) = req.cookie(super::SESSION_COOKIE) {
        state.sessions.remove(cookie.value());
    }
    HttpResponse::SeeOther()
        .insert_header((header::LOCATION, "/login"))
        .cookie(state.removal_cookie())
        .finish()
}

pub async fn main_page(state: web::Data<AppState>, req: HttpRequest) -> HttpResponse {
    match state.current_session(&req) {
        Some(auth) => html(&state, &auth, pages::main(&auth.identity)),
        None => redirect("/login"),
    }
}

pub async fn about_page(state: web::Data<AppState>, req: HttpRequest) -> HttpResponse {
    match state.current_session(&req) {
        Some(auth) => html(&state, &auth, pages::about(&auth.identity)),
        None => redirect("/login"),
    }
}

pub async fn contact_page(state: web::Data<AppState>, req: HttpRequest) -> HttpResponse {
    match state.current_session(&req) {
        Some(auth) => html(&state, &auth, pages::contact(&auth.identity)),
        None => redirect("/login"),
    }
}

pub async fn submit_result(
    state: web::Data<AppState>,
    req: HttpRequest,
    payload: web::Json<ResultPayload>,
) -> Result<HttpResponse, crate::submission::SubmitError> {
    let identity = state.current_session(&req).map(|auth| auth.identity);
    let policy = state.policy;
    let payload = payload.into_inner();

    let receipt = state
        .with_store(move |store| Ok(submit(store, policy, identity.as_ref(), &payload)))
        .await??;

    Ok(HttpResponse::Ok().json(SubmitResponse::accepted(&receipt)))
}

pub async fn leaderboard_page(
    state: web::Data<AppState>,
    req: HttpRequest,
    query: web::Query<CollegeQuery>,
) -> HttpResponse {
    let Some(auth) = state.current_session(&req) else {
        return redirect("/login");
    };

    let filter = CollegeFilter::parse(query.college.as_deref());
    match load_board(&state, filter.clone()).await {
        Ok((rows, colleges)) => html(
            &state,
            &auth,
            pages::leaderboard(&auth.identity, &rows, &colleges, &filter, None),
        ),
        Err(err) => {
            log::error!("leaderboard unavailable: {}", err);
            HttpResponse::build(super::responses::store_status(&err))
                .content_type(ContentType::html())
                .body(pages::leaderboard(
                    &auth.identity,
                    &[],
                    &[],
                    &filter,
                    Some(&err.to_string()),
                ))
        }
    }
}

async fn json_board(
    state: &AppState,
    req: &HttpRequest,
    college: Option<&str>,
) -> Result<HttpResponse, StoreError> {
    if state.current_session(req).is_none() {
        return Ok(not_logged_in());
    }

    let filter = CollegeFilter::parse(college);
    let label = match &filter {
        CollegeFilter::All => "all".to_string(),
        CollegeFilter::Only(name) => name.clone(),
    };
    let (leaderboard, _) = load_board(state, filter).await.map_err(|err| {
        log::error!("leaderboard unavailable: {}", err);
        err
    })?;

    Ok(HttpResponse::Ok().json(LeaderboardResponse {
        status: "success".to_string(),
        college: label,
        leaderboard,
    }))
}

pub async fn global_leaderboard(
    state: web::Data<AppState>,
    req: HttpRequest,
) -> Result<HttpResponse, StoreError> {
    json_board(&state, &req, None).await
}

pub async fn college_leaderboard(
    state: web::Data<AppState>,
    req: HttpRequest,
    query: web::Query<CollegeQuery>,
) -> Result<HttpResponse, StoreError> {
    json_board(&state, &req, query.college.as_deref()).await
}

pub async fn user_info(state: web::Data<AppState>, req: HttpRequest) -> HttpResponse {
    match state.current_session(&req) {
        Some(Authenticated { identity, .. }) => HttpResponse::Ok().json(UserInfo {
            username: identity.username,
            email: identity.email,
            sap_id: identity.sap_id,
        }),
        None => not_logged_in(),
    }
}
