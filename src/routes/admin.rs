use actix_csrf::extractor::{Csrf, CsrfGuarded, CsrfToken};
use actix_session::Session;
use actix_web::{web, HttpResponse, Responder};
use chrono::{Duration, Utc};
use redb::Database;
use serde::Deserialize;
use tera::{Context, Tera};

use crate::config::Config;
use crate::helper::{admin_helpers, form_helpers, public_helpers};
use crate::middleware::AuthenticatedUser;
use crate::models::{ContentType, Notification};
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

pub fn config_login(cfg: &mut web::ServiceConfig) {
    cfg.route("/login", web::get().to(show_admin_login_form))
        .route("/login", web::post().to(handle_admin_login))
        .route("/logout", web::post().to(handle_admin_logout));
}

pub fn config_dashboard(cfg: &mut web::ServiceConfig) {
    cfg.route("/dashboard", web::get().to(show_admin_dashboard))
        .route("/create_account", web::post().to(create_account_action))
        .route("/update_account", web::post().to(update_account_action))
        .route("/delete_account", web::post().to(delete_account_action))
        .route("/grant_subscription", web::post().to(grant_subscription_action))
        .route("/grant_purchase", web::post().to(grant_purchase_action))
        .route("/pin_featured_pick", web::post().to(pin_featured_pick_action))
        .route("/unpin_featured_pick", web::post().to(unpin_featured_pick_action))
        .route("/update_settings", web::post().to(update_settings_action))
        .route("/diagnostics", web::get().to(catalog_diagnostics_api));
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

fn dashboard_url(config: &Config) -> String {
    format!("/management/{}/dashboard", config.admin_url_prefix)
}

async fn show_admin_login_form(
    session: Session,
    tera: web::Data<Tera>,
    token: CsrfToken,
    config: web::Data<Config>,
) -> impl Responder {
    let admin_url_prefix = &config.admin_url_prefix;
    if session.get::<String>("role").unwrap_or(None) == Some("admin".to_string()) {
        return HttpResponse::Found()
            .append_header(("location", dashboard_url(&config)))
            .finish();
    }

    let mut ctx = Context::new();
    ctx.insert("admin_url_prefix", admin_url_prefix);
    ctx.insert("csrf_token", token.get());

    if let Some(error) = session.get::<String>("error").unwrap() {
        ctx.insert("error", &error);
        session.remove("error");
    }

    match tera.render("admin/login.html", &ctx) {
        Ok(rendered) => HttpResponse::Ok()
            .content_type("text/html; charset=utf-8")
            .body(rendered),
        Err(_) => HttpResponse::InternalServerError().body("Template error"),
    }
}

async fn handle_admin_login(
    session: Session,
    pool: web::Data<crate::DbPool>,
    form: Csrf<web::Form<LoginForm>>,
    config: web::Data<Config>,
) -> impl Responder {
    let login_url = format!("/management/{}/login", config.admin_url_prefix);
    let login_data = form.into_inner();

    if let Some((user_id, username, role)) =
        public_helpers::verify_viewer_credentials(&pool, &login_data.username, &login_data.password)
    {
        if role == "admin" {
            session.insert("user_id", user_id).unwrap();
            session.insert("username", username.clone()).unwrap();
            session.insert("role", role).unwrap();
            session.remove("error");
            public_helpers::record_login_time(&pool, &username);
            HttpResponse::Found()
                .append_header(("location", dashboard_url(&config)))
                .finish()
        } else {
            session
                .insert("error", "Access denied. Only administrators may log in here.")
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

async fn handle_admin_logout(session: Session, config: web::Data<Config>) -> impl Responder {
    let login_url = format!("/management/{}/login", config.admin_url_prefix);
    session.clear();
    HttpResponse::Found()
        .append_header(("location", login_url))
        .finish()
}

async fn show_admin_dashboard(
    auth_user: AuthenticatedUser,
    session: Session,
    tera: web::Data<Tera>,
    pool: web::Data<crate::DbPool>,
    db: web::Data<Database>,
    token: CsrfToken,
    config: web::Data<Config>,
) -> impl Responder {
    let mut ctx = Context::new();
    ctx.insert("admin_url_prefix", &config.admin_url_prefix);
    ctx.insert("user", &auth_user);
    ctx.insert("csrf_token", token.get());

    if let Ok(Some(notification)) = session.get::<Notification>("notification") {
        ctx.insert("notification", &notification);
        session.remove("notification");
    }

    let settings = match pool.get() {
        Ok(conn) => admin_helpers::get_settings(&conn),
        Err(e) => {
            log::error!("Could not get DB connection from pool for settings: {}", e);
            admin_helpers::Settings {
                creator_path_prefix: "error-loading".to_string(),
                feed_page_size: "50".to_string(),
            }
        }
    };
    ctx.insert("settings", &settings);

    match admin_helpers::fetch_all_accounts(&pool) {
        Ok(accounts) => ctx.insert("accounts", &accounts),
        Err(e) => {
            log::error!("Failed to fetch accounts for dashboard: {}", e);
            ctx.insert("accounts", &Vec::<crate::models::Viewer>::new());
        }
    }

    match admin_helpers::fetch_all_featured_picks(&db) {
        Ok(picks) => ctx.insert("featured_picks", &picks),
        Err(e) => {
            log::error!("Failed to fetch featured picks for dashboard: {}", e);
            ctx.insert("featured_picks", &Vec::<crate::models::FeaturedPick>::new());
        }
    }

    match admin_helpers::run_catalog_diagnostics(&db) {
        Ok(report) => {
            ctx.insert("diagnostics_clean", &report.is_clean());
            ctx.insert("diagnostics", &report);
        }
        Err(e) => {
            log::error!("Catalog diagnostics failed: {}", e);
            ctx.insert("diagnostics_clean", &false);
        }
    }

    match tera.render("admin/dashboard.html", &ctx) {
        Ok(rendered) => HttpResponse::Ok()
            .content_type("text/html; charset=utf-8")
            .body(rendered),
        Err(e) => {
            log::error!("Failed to render admin dashboard: {}", e);
            HttpResponse::InternalServerError().body("Template error")
        }
    }
}

async fn create_account_action(
    session: Session,
    pool: web::Data<crate::DbPool>,
    form: web::Bytes,
    config: web::Data<Config>,
) -> impl Responder {
    let parsed = match form_helpers::parse_form(&form) {
        Ok(p) => p,
        Err(response) => return response,
    };

    let username = parsed.get("username").map(|s| s.trim()).unwrap_or("");
    let password = parsed.get("password").map(|s| s.as_str()).unwrap_or("");
    let role = parsed.get("role").map(|s| s.trim()).unwrap_or("viewer");

    // Admin accounts are created from the setup CLI only.
    if !matches!(role, "creator" | "viewer") {
        set_notification(&session, "Role must be 'creator' or 'viewer'.", "error");
    } else if username.is_empty() || password.len() < 8 {
        set_notification(
            &session,
            "Username must not be empty and the password needs at least 8 characters.",
            "error",
        );
    } else {
        match admin_helpers::create_account(&pool, username, password, role) {
            Ok(()) => set_notification(&session, "Account created.", "success"),
            Err(e) => {
                log::error!("Failed to create account '{}': {}", username, e);
                set_notification(&session, "Failed to create account. The username may already exist.", "error");
            }
        }
    }
    HttpResponse::Found()
        .append_header(("location", dashboard_url(&config)))
        .finish()
}

async fn update_account_action(
    session: Session,
    pool: web::Data<crate::DbPool>,
    form: web::Bytes,
    config: web::Data<Config>,
) -> impl Responder {
    let parsed = match form_helpers::parse_form(&form) {
        Ok(p) => p,
        Err(response) => return response,
    };

    let user_id = parsed
        .get("user_id")
        .and_then(|s| s.trim().parse::<i64>().ok());
    let username = parsed.get("username").map(|s| s.trim()).unwrap_or("");
    let new_password = parsed.get("new_password").map(|s| s.as_str());
    let is_active = parsed.get("is_active").map(|s| s == "on" || s == "true").unwrap_or(false);

    match user_id {
        Some(user_id) if !username.is_empty() => {
            match admin_helpers::update_account(&pool, user_id, username, new_password, is_active) {
                Ok(()) => set_notification(&session, "Account updated.", "success"),
                Err(e) => {
                    log::error!("Failed to update account {}: {}", user_id, e);
                    set_notification(&session, "Failed to update account.", "error");
                }
            }
        }
        _ => set_notification(&session, "A valid user id and username are required.", "error"),
    }
    HttpResponse::Found()
        .append_header(("location", dashboard_url(&config)))
        .finish()
}

async fn delete_account_action(
    session: Session,
    pool: web::Data<crate::DbPool>,
    form: web::Bytes,
    config: web::Data<Config>,
) -> impl Responder {
    let parsed = match form_helpers::parse_form(&form) {
        Ok(p) => p,
        Err(response) => return response,
    };

    match parsed.get("user_id").and_then(|s| s.trim().parse::<i64>().ok()) {
        Some(user_id) => match admin_helpers::delete_account(&pool, user_id) {
            Ok(0) => set_notification(&session, "No such account.", "error"),
            Ok(_) => set_notification(&session, "Account deleted.", "success"),
            Err(e) => {
                log::error!("Failed to delete account {}: {}", user_id, e);
                set_notification(&session, "Failed to delete account.", "error");
            }
        },
        None => set_notification(&session, "A valid user id is required.", "error"),
    }
    HttpResponse::Found()
        .append_header(("location", dashboard_url(&config)))
        .finish()
}

async fn grant_subscription_action(
    session: Session,
    pool: web::Data<crate::DbPool>,
    form: web::Bytes,
    config: web::Data<Config>,
) -> impl Responder {
    let parsed = match form_helpers::parse_form(&form) {
        Ok(p) => p,
        Err(response) => return response,
    };

    let user_id = parsed.get("user_id").and_then(|s| s.trim().parse::<i64>().ok());
    // Zero or a missing value cancels the subscription.
    let days = parsed
        .get("days")
        .and_then(|s| s.trim().parse::<i64>().ok())
        .unwrap_or(0);

    match user_id {
        Some(user_id) => {
            let expires_at = if days > 0 {
                Some(Utc::now() + Duration::days(days))
            } else {
                None
            };
            match admin_helpers::set_subscription(&pool, user_id, expires_at) {
                Ok(()) => match expires_at {
                    Some(_) => set_notification(
                        &session,
                        &format!("Subscription granted for {} days.", days),
                        "success",
                    ),
                    None => set_notification(&session, "Subscription cancelled.", "success"),
                },
                Err(e) => {
                    log::error!("Failed to set subscription for {}: {}", user_id, e);
                    set_notification(&session, "Failed to update subscription.", "error");
                }
            }
        }
        None => set_notification(&session, "A valid user id is required.", "error"),
    }
    HttpResponse::Found()
        .append_header(("location", dashboard_url(&config)))
        .finish()
}

async fn grant_purchase_action(
    session: Session,
    pool: web::Data<crate::DbPool>,
    form: web::Bytes,
    config: web::Data<Config>,
) -> impl Responder {
    let parsed = match form_helpers::parse_form(&form) {
        Ok(p) => p,
        Err(response) => return response,
    };

    let user_id = parsed.get("user_id").and_then(|s| s.trim().parse::<i64>().ok());
    let content_id = parsed.get("content_id").map(|s| s.trim()).unwrap_or("");

    match user_id {
        Some(user_id) if !content_id.is_empty() => {
            match admin_helpers::grant_purchase(&pool, user_id, content_id) {
                Ok(()) => set_notification(&session, "Purchase recorded.", "success"),
                Err(e) => {
                    log::error!("Failed to record purchase for {}: {}", user_id, e);
                    set_notification(&session, "Failed to record purchase.", "error");
                }
            }
        }
        _ => set_notification(&session, "A valid user id and content id are required.", "error"),
    }
    HttpResponse::Found()
        .append_header(("location", dashboard_url(&config)))
        .finish()
}

async fn pin_featured_pick_action(
    session: Session,
    db: web::Data<Database>,
    form: web::Bytes,
    config: web::Data<Config>,
) -> impl Responder {
    let parsed = match form_helpers::parse_form(&form) {
        Ok(p) => p,
        Err(response) => return response,
    };

    let date = match form_helpers::parse_date_field(&parsed, "date") {
        Ok(date) => date,
        Err(response) => return response,
    };
    let content_type = parsed
        .get("content_type")
        .and_then(|s| ContentType::from_path_segment(s.trim()));
    let content_id = parsed.get("content_id").map(|s| s.trim()).unwrap_or("");

    match content_type {
        Some(content_type) if !content_id.is_empty() => {
            match admin_helpers::pin_featured_pick(&db, date, content_type, content_id) {
                Ok(()) => set_notification(
                    &session,
                    &format!("Pinned {} pick for {}.", content_type, date),
                    "success",
                ),
                Err(admin_helpers::AdminHelperError::Validation(reason)) => {
                    set_notification(&session, &reason, "error")
                }
                Err(e) => {
                    log::error!("Failed to pin featured pick: {}", e);
                    set_notification(&session, "Failed to pin featured pick.", "error");
                }
            }
        }
        _ => set_notification(&session, "A content type and content id are required.", "error"),
    }
    HttpResponse::Found()
        .append_header(("location", dashboard_url(&config)))
        .finish()
}

async fn unpin_featured_pick_action(
    session: Session,
    db: web::Data<Database>,
    form: web::Bytes,
    config: web::Data<Config>,
) -> impl Responder {
    let parsed = match form_helpers::parse_form(&form) {
        Ok(p) => p,
        Err(response) => return response,
    };

    let date = match form_helpers::parse_date_field(&parsed, "date") {
        Ok(date) => date,
        Err(response) => return response,
    };
    let content_type = parsed
        .get("content_type")
        .and_then(|s| ContentType::from_path_segment(s.trim()));

    match content_type {
        Some(content_type) => {
            match admin_helpers::unpin_featured_pick(&db, date, content_type) {
                Ok(()) => set_notification(
                    &session,
                    &format!("Removed {} pick for {}.", content_type, date),
                    "success",
                ),
                Err(e) => {
                    log::error!("Failed to unpin featured pick: {}", e);
                    set_notification(&session, "Failed to remove featured pick.", "error");
                }
            }
        }
        None => set_notification(&session, "A content type is required.", "error"),
    }
    HttpResponse::Found()
        .append_header(("location", dashboard_url(&config)))
        .finish()
}

async fn update_settings_action(
    session: Session,
    pool: web::Data<crate::DbPool>,
    form: web::Bytes,
    app_state: web::Data<AppState>,
    config: web::Data<Config>,
) -> impl Responder {
    let parsed = match form_helpers::parse_form(&form) {
        Ok(p) => p,
        Err(response) => return response,
    };

    let prefix = parsed.get("creator_path_prefix").map(|s| s.trim()).unwrap_or("");
    let feed_page_size = parsed.get("feed_page_size").map(|s| s.trim()).unwrap_or("50");

    let is_prefix_valid =
        !prefix.is_empty() && prefix.chars().all(|c| c.is_alphanumeric() || c == '-');
    let is_page_size_valid = feed_page_size.parse::<u32>().map(|n| n > 0).unwrap_or(false);

    if is_prefix_valid && is_page_size_valid {
        let update_prefix_res =
            admin_helpers::update_setting(&pool, "creator_path_prefix", prefix);
        let update_size_res =
            admin_helpers::update_setting(&pool, "feed_page_size", feed_page_size);

        match (update_prefix_res, update_size_res) {
            (Ok(_), Ok(_)) => {
                let mut state_prefix = app_state.creator_prefix.write().unwrap_or_else(|poisoned| {
                    log::error!(
                        "RwLock for creator_prefix was poisoned during settings update! Recovering lock."
                    );
                    poisoned.into_inner()
                });
                *state_prefix = prefix.to_string();
                set_notification(&session, "Settings updated successfully.", "success");
            }
            _ => {
                log::error!("Failed to update one or more settings.");
                set_notification(&session, "Failed to update settings in database.", "error");
            }
        }
    } else if !is_prefix_valid {
        set_notification(
            &session,
            "Invalid prefix. Use only letters, numbers, and hyphens.",
            "error",
        );
    } else {
        set_notification(
            &session,
            "Invalid feed page size. It must be a positive whole number.",
            "error",
        );
    }
    HttpResponse::Found()
        .append_header(("location", dashboard_url(&config)))
        .finish()
}

async fn catalog_diagnostics_api(
    _auth_user: AuthenticatedUser,
    db: web::Data<Database>,
) -> impl Responder {
    match admin_helpers::run_catalog_diagnostics(&db) {
        Ok(report) => HttpResponse::Ok().json(report),
        Err(e) => {
            log::error!("Catalog diagnostics failed: {}", e);
            HttpResponse::InternalServerError().finish()
        }
    }
}
