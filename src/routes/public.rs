use actix_session::Session;
use actix_web::{web, HttpResponse, Responder};
use rand::thread_rng;
use redb::Database;
use serde::Deserialize;
use serde_json::json;

use crate::helper::{admin_helpers, public_helpers, sanitization_helpers};
use crate::models::ContentType;
use crate::selection;
use crate::DbPool;

#[derive(Deserialize)]
pub struct FeedQuery {
    target: Option<String>,
    limit: Option<u32>,
    offset: Option<u32>,
}

#[derive(Deserialize)]
struct CredentialsRequest {
    username: String,
    password: String,
}

pub fn config_api(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .route("/is_server_active", web::get().to(is_server_active))
            .route("/feed", web::get().to(get_feed))
            .route("/feed/{content_type}", web::get().to(get_feed_by_type))
            .route("/daily_free/{content_type}", web::get().to(get_daily_free))
            .route("/content/{id}", web::get().to(get_content_detail))
            .route("/viewer/register", web::post().to(register_viewer))
            .route("/viewer/login", web::post().to(viewer_login))
            .route("/viewer/logout", web::post().to(viewer_logout))
            .route("/viewer/me", web::get().to(viewer_me)),
    );
}

async fn is_server_active() -> impl Responder {
    HttpResponse::Ok().body("active")
}

fn session_viewer_id(session: &Session) -> Option<i64> {
    session.get::<i64>("user_id").unwrap_or(None)
}

fn default_feed_limit(pool: &web::Data<DbPool>) -> u32 {
    match pool.get() {
        Ok(conn) => admin_helpers::get_settings(&conn)
            .feed_page_size
            .parse()
            .unwrap_or(50),
        Err(_) => 50,
    }
}

async fn get_feed(
    session: Session,
    db: web::Data<Database>,
    pool: web::Data<DbPool>,
    query: web::Query<FeedQuery>,
) -> impl Responder {
    let viewer = public_helpers::viewer_access(&pool, session_viewer_id(&session));
    let date = selection::pick_date_today();

    let entries = public_helpers::build_feed(
        &db,
        &ContentType::ALL,
        date,
        &viewer,
        query.target.as_deref(),
        &mut thread_rng(),
    );

    let limit = query.limit.unwrap_or_else(|| default_feed_limit(&pool));
    let offset = query.offset.unwrap_or(0);
    let page: Vec<_> = entries
        .into_iter()
        .skip(offset as usize)
        .take(limit as usize)
        .collect();
    HttpResponse::Ok().json(page)
}

async fn get_feed_by_type(
    content_type: web::Path<String>,
    session: Session,
    db: web::Data<Database>,
    pool: web::Data<DbPool>,
    query: web::Query<FeedQuery>,
) -> impl Responder {
    let Some(content_type) = ContentType::from_path_segment(&content_type) else {
        return HttpResponse::BadRequest()
            .body("Unknown content type. Use 'lessons', 'drills' or 'sparring'.");
    };

    let viewer = public_helpers::viewer_access(&pool, session_viewer_id(&session));
    let date = selection::pick_date_today();

    let entries = public_helpers::build_feed(
        &db,
        &[content_type],
        date,
        &viewer,
        query.target.as_deref(),
        &mut thread_rng(),
    );

    let limit = query.limit.unwrap_or_else(|| default_feed_limit(&pool));
    let offset = query.offset.unwrap_or(0);
    let page: Vec<_> = entries
        .into_iter()
        .skip(offset as usize)
        .take(limit as usize)
        .collect();
    HttpResponse::Ok().json(page)
}

async fn get_daily_free(content_type: web::Path<String>, db: web::Data<Database>) -> impl Responder {
    let Some(content_type) = ContentType::from_path_segment(&content_type) else {
        return HttpResponse::BadRequest()
            .body("Unknown content type. Use 'lessons', 'drills' or 'sparring'.");
    };

    let date = selection::pick_date_today();
    match public_helpers::daily_free_pick(&db, content_type, date) {
        Ok(Some(item)) => HttpResponse::Ok().json(json!({
            "id": item.id,
            "title": item.metadata.title,
            "content_type": item.metadata.content_type,
            "price": item.metadata.price,
            "is_daily_free": true,
            "can_play": true,
            "video_ref": item.metadata.video_ref,
        })),
        Ok(None) => HttpResponse::NotFound().json(json!({
            "error": "nothing free today",
            "content_type": content_type,
        })),
        Err(e) => {
            log::error!("Failed to compute daily free {} pick: {}", content_type, e);
            HttpResponse::InternalServerError().finish()
        }
    }
}

async fn get_content_detail(
    id: web::Path<String>,
    session: Session,
    db: web::Data<Database>,
    pool: web::Data<DbPool>,
) -> impl Responder {
    let item = match public_helpers::fetch_content_detail(&db, &id) {
        Ok(Some(item)) => item,
        Ok(None) => return HttpResponse::NotFound().body("Content not found"),
        Err(e) => {
            log::error!("Failed to fetch content '{}': {}", *id, e);
            return HttpResponse::InternalServerError().finish();
        }
    };

    // Unpublished or broken items 404 on the public surface, same as missing.
    if !selection::is_eligible(&item) {
        return HttpResponse::NotFound().body("Content not found");
    }

    let date = selection::pick_date_today();
    let is_daily_free = match public_helpers::daily_free_pick(&db, item.metadata.content_type, date)
    {
        Ok(pick) => pick.map(|p| p.id) == Some(item.id.clone()),
        Err(e) => {
            log::error!("Failed to resolve daily pick for '{}': {}", item.id, e);
            false
        }
    };

    let viewer = public_helpers::viewer_access(&pool, session_viewer_id(&session));
    let can_play = selection::can_access(&item.id, item.metadata.price, is_daily_free, &viewer);

    HttpResponse::Ok().json(json!({
        "id": item.id,
        "title": item.metadata.title,
        "content_type": item.metadata.content_type,
        "price": item.metadata.price,
        "course_id": item.metadata.course_id,
        "description_html": sanitization_helpers::render_description(&item.metadata.description),
        "is_daily_free": is_daily_free,
        "can_play": can_play,
        // The playback reference is withheld behind the paywall.
        "video_ref": if can_play { item.metadata.video_ref } else { None },
        "created_at": item.metadata.created_at,
    }))
}

async fn register_viewer(
    pool: web::Data<DbPool>,
    payload: web::Json<CredentialsRequest>,
) -> impl Responder {
    let username = payload.username.trim();
    if username.is_empty()
        || !username
            .chars()
            .all(|c| c.is_alphanumeric() || c == '_' || c == '-')
    {
        return HttpResponse::BadRequest()
            .body("Username may only contain letters, numbers, underscores, and hyphens.");
    }
    if payload.password.len() < 8 {
        return HttpResponse::BadRequest().body("Password must be at least 8 characters.");
    }

    match public_helpers::register_viewer(&pool, username, &payload.password) {
        Ok(()) => HttpResponse::Created().json(json!({"success": true})),
        Err(e) => {
            log::warn!("Viewer registration for '{}' failed: {}", username, e);
            HttpResponse::Conflict().body("That username is already taken.")
        }
    }
}

async fn viewer_login(
    session: Session,
    pool: web::Data<DbPool>,
    payload: web::Json<CredentialsRequest>,
) -> impl Responder {
    match public_helpers::verify_viewer_credentials(&pool, &payload.username, &payload.password) {
        Some((user_id, username, role)) => {
            session.insert("user_id", user_id).unwrap();
            session.insert("username", username.clone()).unwrap();
            session.insert("role", role).unwrap();
            public_helpers::record_login_time(&pool, &username);
            HttpResponse::Ok().json(json!({"success": true, "username": username}))
        }
        None => HttpResponse::Unauthorized().body("Invalid credentials or account suspended."),
    }
}

async fn viewer_logout(session: Session) -> impl Responder {
    session.clear();
    HttpResponse::Ok().json(json!({"success": true}))
}

async fn viewer_me(session: Session, pool: web::Data<DbPool>) -> impl Responder {
    let Some(viewer_id) = session_viewer_id(&session) else {
        return HttpResponse::Unauthorized().body("Not logged in.");
    };
    let username = session.get::<String>("username").unwrap_or(None);
    let access = public_helpers::viewer_access(&pool, Some(viewer_id));
    let mut purchased: Vec<&String> = access.purchased.iter().collect();
    purchased.sort();

    HttpResponse::Ok().json(json!({
        "username": username,
        "is_subscriber": access.is_subscriber,
        "purchased": purchased,
    }))
}
