use actix_web::{http::header, http::StatusCode, HttpResponse, Responder};
use handlebars::Handlebars;
use serde_json::json;
use std::sync::Arc;
use log::error;

use crate::core::invoices::INVOICES_PATH;

const TEMPLATES: &[(&str, &str)] = &[
    ("header", include_str!("../templates/header.hbs")),
    ("footer", include_str!("../templates/footer.hbs")),
    ("login", include_str!("../templates/login.hbs")),
    ("invoices", include_str!("../templates/invoices.hbs")),
    ("invoice_form", include_str!("../templates/invoice_form.hbs")),
    ("not_found", include_str!("../templates/not_found.hbs")),
];

/// Shared handlebars instance
lazy_static::lazy_static! {
    static ref HBS: Arc<Handlebars<'static>> = {
        let mut hbs = Handlebars::new();
        // Register templates
        for (name, source) in TEMPLATES {
            if let Err(e) = hbs.register_template_string(name, *source) {
                error!("Error registering Handlebars template {}: {}", name, e);
            }
        }
        Arc::new(hbs)
    };
}

/// Render a template with the given status code
pub fn render(template: &str, status: StatusCode, context: &serde_json::Value) -> HttpResponse {
    match HBS.render(template, context) {
        Ok(body) => HttpResponse::build(status).content_type("text/html; charset=utf-8").body(body),
        Err(e) => {
            error!("Template rendering error: {}", e);
            HttpResponse::InternalServerError().body(format!("Template error: {}", e))
        }
    }
}

/// Render a template to a string, for pages that go into the page cache
pub fn render_to_string(template: &str, context: &serde_json::Value) -> Result<String, String> {
    HBS.render(template, context).map_err(|e| {
        error!("Template rendering error: {}", e);
        e.to_string()
    })
}

/// 303 See Other to `location`
pub fn redirect_to(location: &str) -> HttpResponse {
    HttpResponse::SeeOther()
        .insert_header((header::LOCATION, location))
        .finish()
}

/// Root of the site: the invoice list
pub async fn index() -> impl Responder {
    redirect_to(INVOICES_PATH)
}

/// Dashboard home: the invoice list
pub async fn dashboard() -> impl Responder {
    redirect_to(INVOICES_PATH)
}

pub fn not_found_page(message: &str) -> HttpResponse {
    let context = json!({
        "title": "Not Found | Invoice Dashboard",
        "message": message,
    });
    render("not_found", StatusCode::NOT_FOUND, &context)
}

/// Default route for 404
pub async fn not_found() -> impl Responder {
    not_found_page("Could not find the requested page.")
}
