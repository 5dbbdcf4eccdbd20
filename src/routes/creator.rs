use actix_csrf::extractor::{Csrf, CsrfGuarded, CsrfToken};
use actix_session::Session;
use actix_web::{web, HttpResponse, Responder};
use redb::Database;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tera::{Context, Tera};

use crate::helper::{creator_helpers, public_helpers};
use crate::middleware::AuthenticatedUser;
use crate::models::{ContentType, Notification, Viewer};
use crate::AppState;

#[derive(Deserialize)]
struct LoginForm {
    csrf_token: CsrfToken,
    username: String,
    password: String,
}

impl CsrfGuarded for LoginForm {
    fn csrf_token(&self) -> &CsrfToken {
        &self.csrf_token
    }
}

#[derive(Deserialize)]
struct CourseForm {
    title: String,
}

#[derive(Deserialize)]
struct PublishCourseForm {
    course_id: String,
    published: Option<String>,
}

#[derive(Deserialize)]
struct ContentForm {
    title: String,
    content_type: String,
    price: u32,
    course_id: Option<String>,
    video_ref: Option<String>,
    description: String,
    published: Option<String>,
}

#[derive(Deserialize)]
struct ContentUpdateForm {
    content_id: String,
    title: String,
    price: u32,
    video_ref: Option<String>,
    description: String,
    published: Option<String>,
}

#[derive(Deserialize)]
struct ContentDeleteForm {
    content_id: String,
}

#[derive(Serialize)]
struct ApiResponse<T: Serialize> {
    success: bool,
    data: Option<T>,
    error: Option<String>,
}

pub fn config_login(cfg: &mut web::ServiceConfig) {
    cfg.route("/login", web::get().to(show_creator_login_form))
        .route("/login", web::post().to(handle_creator_login))
        .route("/logout", web::post().to(handle_creator_logout));
}

pub fn config_dashboard(cfg: &mut web::ServiceConfig) {
    cfg.route("/dashboard", web::get().to(show_creator_dashboard))
        .route("/create_course", web::post().to(create_course_action))
        .route("/publish_course", web::post().to(publish_course_action))
        .route("/create_content", web::post().to(create_content_action))
        .route("/update_content", web::post().to(update_content_action))
        .route("/delete_content", web::post().to(delete_content_action))
        .service(
            web::scope("/api")
                .route("/mycontent", web::get().to(get_my_content_api))
                .route("/mycourses", web::get().to(get_my_courses_api)),
        );
}

fn current_prefix(app_state: &web::Data<AppState>) -> String {
    app_state
        .creator_prefix
        .read()
        .unwrap_or_else(|poisoned| {
            log::error!("RwLock for creator_prefix was poisoned! Recovering lock.");
            poisoned.into_inner()
        })
        .clone()
}

fn dashboard_url(app_state: &web::Data<AppState>) -> String {
    format!("/management/{}/dashboard", current_prefix(app_state))
}

fn set_notification(session: &Session, message: &str, r#type: &str) {
    session
        .insert(
            "notification",
            &Notification {
                message: message.to_string(),
                r#type: r#type.to_string(),
            },
        )
        .unwrap();
}

fn get_current_creator(
    auth_user: &AuthenticatedUser,
    pool: &web::Data<crate::DbPool>,
) -> Result<Viewer, HttpResponse> {
    creator_helpers::get_creator_details(pool, &auth_user.username).ok_or_else(|| {
        HttpResponse::InternalServerError()
            .json(json!({"success": false, "error": "Authenticated user not found."}))
    })
}

async fn show_creator_login_form(
    session: Session,
    tera: web::Data<Tera>,
    app_state: web::Data<AppState>,
    token: CsrfToken,
) -> impl Responder {
    let prefix = current_prefix(&app_state);

    if session.get::<String>("username").unwrap().is_some() {
        return HttpResponse::Found()
            .append_header(("location", format!("/management/{}/dashboard", prefix)))
            .finish();
    }

    let mut ctx = Context::new();
    ctx.insert("creator_path_prefix", &prefix);
    ctx.insert("csrf_token", token.get());
    if let Some(error) = session.get::<String>("error").unwrap() {
        ctx.insert("error", &error);
        session.remove("error");
    }

    match tera.render("creator/login.html", &ctx) {
        Ok(rendered) => HttpResponse::Ok()
            .content_type("text/html; charset=utf-8")
            .body(rendered),
        Err(_) => HttpResponse::InternalServerError().body("Template error"),
    }
}

async fn handle_creator_login(
    session: Session,
    pool: web::Data<crate::DbPool>,
    app_state: web::Data<AppState>,
    form: Csrf<web::Form<LoginForm>>,
) -> impl Responder {
    let prefix = current_prefix(&app_state);
    let login_url = format!("/management/{}/login", prefix);
    let login_data = form.into_inner();

    if let Some((user_id, username, role)) =
        public_helpers::verify_viewer_credentials(&pool, &login_data.username, &login_data.password)
    {
        if role == "creator" {
            session.insert("user_id", user_id).unwrap();
            session.insert("username", username.clone()).unwrap();
            session.insert("role", role).unwrap();
            session.remove("error");
            public_helpers::record_login_time(&pool, &username);
            HttpResponse::Found()
                .append_header(("location", format!("/management/{}/dashboard", prefix)))
                .finish()
        } else {
            session
                .insert("error", "Access denied. Only creators may log in here.")
                .unwrap();
            HttpResponse::Found()
                .append_header(("location", login_url))
                .finish()
        }
    } else {
        session
            .insert("error", "Invalid credentials or account suspended.")
            .unwrap();
        HttpResponse::Found()
            .append_header(("location", login_url))
            .finish()
    }
}

async fn handle_creator_logout(session: Session, app_state: web::Data<AppState>) -> impl Responder {
    let login_url = format!("/management/{}/login", current_prefix(&app_state));
    session.clear();
    HttpResponse::Found()
        .append_header(("location", login_url))
        .finish()
}

async fn show_creator_dashboard(
    auth_user: AuthenticatedUser,
    session: Session,
    tera: web::Data<Tera>,
    pool: web::Data<crate::DbPool>,
    db: web::Data<Database>,
    app_state: web::Data<AppState>,
    token: CsrfToken,
) -> impl Responder {
    let creator = match get_current_creator(&auth_user, &pool) {
        Ok(creator) => creator,
        Err(response) => return response,
    };

    let mut ctx = Context::new();
    ctx.insert("creator_path_prefix", &current_prefix(&app_state));
    ctx.insert("user", &auth_user);
    ctx.insert("csrf_token", token.get());

    if let Ok(Some(notification)) = session.get::<Notification>("notification") {
        ctx.insert("notification", &notification);
        session.remove("notification");
    }

    match creator_helpers::list_own_content(&db, &creator) {
        Ok(content) => ctx.insert("content", &content),
        Err(e) => {
            log::error!("Failed to list content for '{}': {}", creator.username, e);
            ctx.insert("content", &Vec::<crate::models::ContentItem>::new());
        }
    }
    match creator_helpers::list_own_courses(&db, &creator) {
        Ok(courses) => ctx.insert("courses", &courses),
        Err(e) => {
            log::error!("Failed to list courses for '{}': {}", creator.username, e);
            ctx.insert("courses", &Vec::<crate::models::Course>::new());
        }
    }

    match tera.render("creator/dashboard.html", &ctx) {
        Ok(rendered) => HttpResponse::Ok()
            .content_type("text/html; charset=utf-8")
            .body(rendered),
        Err(e) => {
            log::error!("Failed to render creator dashboard: {}", e);
            HttpResponse::InternalServerError().body("Template error")
        }
    }
}

async fn create_course_action(
    auth_user: AuthenticatedUser,
    session: Session,
    pool: web::Data<crate::DbPool>,
    db: web::Data<Database>,
    app_state: web::Data<AppState>,
    form: web::Form<CourseForm>,
) -> impl Responder {
    let creator = match get_current_creator(&auth_user, &pool) {
        Ok(creator) => creator,
        Err(response) => return response,
    };

    match creator_helpers::create_course(&db, &creator, &form.title) {
        Ok(_) => set_notification(&session, "Course created. It starts unpublished.", "success"),
        Err(e) => set_notification(&session, &e.to_string(), "error"),
    }
    HttpResponse::Found()
        .append_header(("location", dashboard_url(&app_state)))
        .finish()
}

async fn publish_course_action(
    auth_user: AuthenticatedUser,
    session: Session,
    pool: web::Data<crate::DbPool>,
    db: web::Data<Database>,
    app_state: web::Data<AppState>,
    form: web::Form<PublishCourseForm>,
) -> impl Responder {
    let creator = match get_current_creator(&auth_user, &pool) {
        Ok(creator) => creator,
        Err(response) => return response,
    };

    let published = form.published.as_deref() == Some("on");
    match creator_helpers::set_course_published(&db, &creator, &form.course_id, published) {
        Ok(()) => {
            let verb = if published { "published" } else { "unpublished" };
            set_notification(&session, &format!("Course {}.", verb), "success");
        }
        Err(e) => set_notification(&session, &e.to_string(), "error"),
    }
    HttpResponse::Found()
        .append_header(("location", dashboard_url(&app_state)))
        .finish()
}

async fn create_content_action(
    auth_user: AuthenticatedUser,
    session: Session,
    pool: web::Data<crate::DbPool>,
    db: web::Data<Database>,
    app_state: web::Data<AppState>,
    form: web::Form<ContentForm>,
) -> impl Responder {
    let creator = match get_current_creator(&auth_user, &pool) {
        Ok(creator) => creator,
        Err(response) => return response,
    };

    let Some(content_type) = ContentType::from_path_segment(form.content_type.trim()) else {
        set_notification(&session, "Unknown content type.", "error");
        return HttpResponse::Found()
            .append_header(("location", dashboard_url(&app_state)))
            .finish();
    };

    let video_ref = form.video_ref.as_deref().map(str::trim).filter(|s| !s.is_empty());
    let course_id = form.course_id.as_deref().map(str::trim).filter(|s| !s.is_empty());

    match creator_helpers::create_content(
        &db,
        &creator,
        &form.title,
        content_type,
        form.price,
        course_id,
        video_ref,
        &form.description,
        form.published.as_deref() == Some("on"),
    ) {
        Ok(_) => set_notification(&session, "Content created.", "success"),
        Err(e) => set_notification(&session, &e.to_string(), "error"),
    }
    HttpResponse::Found()
        .append_header(("location", dashboard_url(&app_state)))
        .finish()
}

async fn update_content_action(
    auth_user: AuthenticatedUser,
    session: Session,
    pool: web::Data<crate::DbPool>,
    db: web::Data<Database>,
    app_state: web::Data<AppState>,
    form: web::Form<ContentUpdateForm>,
) -> impl Responder {
    let creator = match get_current_creator(&auth_user, &pool) {
        Ok(creator) => creator,
        Err(response) => return response,
    };

    let video_ref = form.video_ref.as_deref().map(str::trim).filter(|s| !s.is_empty());

    match creator_helpers::update_content(
        &db,
        &creator,
        &form.content_id,
        &form.title,
        form.price,
        video_ref,
        &form.description,
        form.published.as_deref() == Some("on"),
    ) {
        Ok(()) => set_notification(&session, "Content updated.", "success"),
        Err(e) => set_notification(&session, &e.to_string(), "error"),
    }
    HttpResponse::Found()
        .append_header(("location", dashboard_url(&app_state)))
        .finish()
}

async fn delete_content_action(
    auth_user: AuthenticatedUser,
    session: Session,
    pool: web::Data<crate::DbPool>,
    db: web::Data<Database>,
    app_state: web::Data<AppState>,
    form: web::Form<ContentDeleteForm>,
) -> impl Responder {
    let creator = match get_current_creator(&auth_user, &pool) {
        Ok(creator) => creator,
        Err(response) => return response,
    };

    match creator_helpers::delete_content(&db, &creator, &form.content_id) {
        Ok(()) => set_notification(&session, "Content deleted.", "success"),
        Err(e) => set_notification(&session, &e.to_string(), "error"),
    }
    HttpResponse::Found()
        .append_header(("location", dashboard_url(&app_state)))
        .finish()
}

async fn get_my_content_api(
    auth_user: AuthenticatedUser,
    pool: web::Data<crate::DbPool>,
    db: web::Data<Database>,
) -> impl Responder {
    let creator = match get_current_creator(&auth_user, &pool) {
        Ok(creator) => creator,
        Err(response) => return response,
    };

    match creator_helpers::list_own_content(&db, &creator) {
        Ok(content) => HttpResponse::Ok().json(ApiResponse {
            success: true,
            data: Some(content),
            error: None,
        }),
        Err(e) => {
            log::error!("Failed to list content for '{}': {}", creator.username, e);
            HttpResponse::InternalServerError().json(ApiResponse::<()> {
                success: false,
                data: None,
                error: Some("Failed to list content.".to_string()),
            })
        }
    }
}

async fn get_my_courses_api(
    auth_user: AuthenticatedUser,
    pool: web::Data<crate::DbPool>,
    db: web::Data<Database>,
) -> impl Responder {
    let creator = match get_current_creator(&auth_user, &pool) {
        Ok(creator) => creator,
        Err(response) => return response,
    };

    match creator_helpers::list_own_courses(&db, &creator) {
        Ok(courses) => HttpResponse::Ok().json(ApiResponse {
            success: true,
            data: Some(courses),
            error: None,
        }),
        Err(e) => {
            log::error!("Failed to list courses for '{}': {}", creator.username, e);
            HttpResponse::InternalServerError().json(ApiResponse::<()> {
                success: false,
                data: None,
                error: Some("Failed to list courses.".to_string()),
            })
        }
    }
}
