use std::sync::Arc;
use actix_web::{web, App, HttpServer, middleware};
use actix_files as fs;
use log::info;

use crate::config::AppConfig;
use crate::core::auth::SessionStore;
use crate::core::cache::PageCache;
use crate::core::store::InvoiceStore;
use crate::web::handlers;

/// Shared application state for web handlers
pub struct AppState {
    pub store: Arc<dyn InvoiceStore>,
    pub cache: PageCache,
    pub sessions: SessionStore,
}

impl AppState {
    pub fn new(store: Arc<dyn InvoiceStore>, page_cache_capacity: usize) -> Self {
        AppState {
            store,
            cache: PageCache::new(page_cache_capacity),
            sessions: SessionStore::new(),
        }
    }
}

/// Register page and form routes
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg
        // Auth
        .route("/login", web::get().to(handlers::auth::login_form))
        .route("/login", web::post().to(handlers::auth::login))
        .route("/logout", web::post().to(handlers::auth::logout))
        // Invoices
        .route("/dashboard/invoices", web::get().to(handlers::invoices::list))
        .route("/dashboard/invoices/create", web::get().to(handlers::invoices::create_form))
        .route("/dashboard/invoices/create", web::post().to(handlers::invoices::create))
        .route("/dashboard/invoices/{id}/edit", web::get().to(handlers::invoices::edit_form))
        .route("/dashboard/invoices/{id}/edit", web::post().to(handlers::invoices::update))
        .route("/dashboard/invoices/{id}/delete", web::post().to(handlers::invoices::delete))
        // Pages
        .route("/", web::get().to(handlers::pages::index))
        .route("/dashboard", web::get().to(handlers::pages::dashboard));
}

/// Start the web server for the invoice dashboard
pub async fn start_web_server(config: AppConfig, state: AppState) -> std::io::Result<()> {
    info!("Starting web server on http://{}", config.bind_addr);

    let app_state = web::Data::new(state);
    let static_dir = config.static_dir.clone();

    HttpServer::new(move || {
        App::new()
            .wrap(middleware::Logger::default())
            .app_data(app_state.clone())
            // Static files
            .service(fs::Files::new("/static", &static_dir))
            .configure(configure_routes)
            // Default route for 404
            .default_service(web::to(handlers::pages::not_found))
    })
    .bind(&config.bind_addr)?
    .run()
    .await
}
