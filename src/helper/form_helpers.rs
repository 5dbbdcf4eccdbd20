use actix_web::{web, HttpResponse};
use std::collections::HashMap;
use url::form_urlencoded;

/// Parses URL-encoded form data from raw bytes, handling UTF-8 errors with a
/// 400 instead of a panic.
pub fn parse_form(form_bytes: &web::Bytes) -> Result<HashMap<String, String>, HttpResponse> {
    let body = match String::from_utf8(form_bytes.to_vec()) {
        Ok(s) => s,
        Err(_) => return Err(HttpResponse::BadRequest().body("Invalid UTF-8 in request body.")),
    };
    Ok(form_urlencoded::parse(body.as_bytes()).into_owned().collect())
}

/// Pulls a `YYYY-MM-DD` date field out of a parsed form.
pub fn parse_date_field(
    parsed: &HashMap<String, String>,
    field: &str,
) -> Result<chrono::NaiveDate, HttpResponse> {
    let raw = parsed.get(field).map(|s| s.trim()).unwrap_or("");
    chrono::NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|_| {
        HttpResponse::BadRequest().body(format!("Field '{}' must be a YYYY-MM-DD date.", field))
    })
}
