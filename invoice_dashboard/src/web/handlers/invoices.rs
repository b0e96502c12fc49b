//! Web handlers for the invoice pages and their form actions

use actix_web::{http::StatusCode, web, HttpRequest, HttpResponse, Responder};
use log::error;
use serde_json::json;

use crate::core::invoices::{
    self, InvoiceForm, INVOICES_PATH, MSG_INVOICE_DELETED, MSG_INVOICE_NOT_FOUND,
};
use crate::core::models::{ActionOutcome, ActionState};
use crate::web::handlers::auth::require_session;
use crate::web::handlers::pages::{not_found_page, redirect_to, render, render_to_string};
use crate::web::models::{CustomerOption, InvoiceFormRequest, InvoiceListQuery, InvoiceRowView, PageLink, PageQuery};
use crate::web::server::AppState;

macro_rules! session_or_redirect {
    ($req:expr, $data:expr) => {
        match require_session(&$req, &$data) {
            Ok(session) => session,
            Err(redirect) => return redirect,
        }
    };
}

fn cache_key(req: &HttpRequest) -> String {
    match req.query_string() {
        "" => req.path().to_string(),
        qs => format!("{}?{}", req.path(), qs),
    }
}

fn page_links(query: &str, total_pages: usize, current: usize) -> Vec<PageLink> {
    (1..=total_pages)
        .map(|number| {
            let params = PageQuery {
                query: Some(query).filter(|q| !q.is_empty()),
                page: number,
            };
            let qs = serde_urlencoded::to_string(&params).unwrap_or_else(|e| {
                error!("Failed to encode page link: {}", e);
                format!("page={}", number)
            });
            let href = format!("{}?{}", INVOICES_PATH, qs);
            PageLink {
                number,
                href,
                current: number == current,
            }
        })
        .collect()
}

/// Render the invoice list, or the error message describing why it could not be built
async fn build_list_page(data: &AppState, query: &str, page: usize, message: Option<&str>) -> Result<String, String> {
    let store = data.store.as_ref();
    let rows = store.fetch_filtered_invoices(query, page).await.map_err(|e| {
        error!("Failed to fetch invoices: {}", e);
        "Failed to fetch invoices.".to_string()
    })?;
    let total_pages = store.fetch_invoice_pages(query).await.map_err(|e| {
        error!("Failed to count invoice pages: {}", e);
        "Failed to fetch invoices.".to_string()
    })?;

    let rows: Vec<InvoiceRowView> = rows.into_iter().map(InvoiceRowView::from).collect();
    let context = json!({
        "title": "Invoices | Invoice Dashboard",
        "query": query,
        "invoices": rows,
        "pages": page_links(query, total_pages, page),
        "message": message,
    });
    render_to_string("invoices", &context)
}

/// Invoice list, served from the page cache when possible
pub async fn list(
    req: HttpRequest,
    data: web::Data<AppState>,
    params: web::Query<InvoiceListQuery>,
) -> impl Responder {
    session_or_redirect!(req, data);

    let key = cache_key(&req);
    if let Some(html) = data.cache.get(&key).await {
        return HttpResponse::Ok().content_type("text/html; charset=utf-8").body(html);
    }

    let query = params.query.clone().unwrap_or_default();
    let page = params.page.unwrap_or(1).max(1);
    let generation = data.cache.generation().await;
    match build_list_page(&data, &query, page, None).await {
        Ok(html) => {
            data.cache.put_if_current(&key, html.clone(), generation).await;
            HttpResponse::Ok().content_type("text/html; charset=utf-8").body(html)
        }
        Err(e) => HttpResponse::InternalServerError().body(e),
    }
}

/// Render the create/edit form, keeping whatever the user typed
async fn form_page(
    data: &AppState,
    status: StatusCode,
    invoice_id: Option<&str>,
    values: &InvoiceFormRequest,
    state: &ActionState,
) -> HttpResponse {
    let customers = match data.store.fetch_customers().await {
        Ok(customers) => customers,
        Err(e) => {
            error!("Failed to fetch customers: {}", e);
            return HttpResponse::InternalServerError().body("Failed to fetch customers.");
        }
    };

    let (title, action, submit) = match invoice_id {
        Some(id) => ("Edit Invoice", format!("{}/{}/edit", INVOICES_PATH, id), "Edit Invoice"),
        None => ("Create Invoice", format!("{}/create", INVOICES_PATH), "Create Invoice"),
    };

    let context = json!({
        "title": format!("{} | Invoice Dashboard", title),
        "heading": title,
        "action": action,
        "submit": submit,
        "customers": CustomerOption::list(customers, values.customer_id.as_deref()),
        "amount": values.amount,
        "is_paid": values.status.as_deref() == Some("paid"),
        "is_pending": values.status.as_deref() == Some("pending"),
        "errors": state.errors,
        "message": state.message,
    });
    render("invoice_form", status, &context)
}

/// Empty create form
pub async fn create_form(req: HttpRequest, data: web::Data<AppState>) -> impl Responder {
    session_or_redirect!(req, data);
    form_page(&data, StatusCode::OK, None, &InvoiceFormRequest::default(), &ActionState::default()).await
}

pub async fn create(
    req: HttpRequest,
    data: web::Data<AppState>,
    form: web::Form<InvoiceFormRequest>,
) -> impl Responder {
    session_or_redirect!(req, data);
    let values = form.into_inner();
    let invoice_form = InvoiceForm::from(&values);

    match invoices::create_invoice(data.store.as_ref(), &data.cache, &invoice_form).await {
        ActionOutcome::Redirect(location) => redirect_to(&location),
        ActionOutcome::State(state) => {
            form_page(&data, StatusCode::UNPROCESSABLE_ENTITY, None, &values, &state).await
        }
    }
}

/// Edit form prefilled from the stored invoice
pub async fn edit_form(
    req: HttpRequest,
    data: web::Data<AppState>,
    path: web::Path<String>,
) -> impl Responder {
    session_or_redirect!(req, data);
    let id = path.into_inner();

    let invoice = match data.store.fetch_invoice(&id).await {
        Ok(Some(invoice)) => invoice,
        Ok(None) => return not_found_page("Could not find the requested invoice."),
        Err(e) => {
            error!("Failed to fetch invoice {}: {}", id, e);
            return HttpResponse::InternalServerError().body("Failed to fetch invoice.");
        }
    };

    let values = InvoiceFormRequest {
        customer_id: Some(invoice.customer_id),
        amount: Some(format!("{}.{:02}", invoice.amount_cents / 100, invoice.amount_cents % 100)),
        status: Some(invoice.status.to_string()),
    };
    form_page(&data, StatusCode::OK, Some(&id), &values, &ActionState::default()).await
}

pub async fn update(
    req: HttpRequest,
    data: web::Data<AppState>,
    path: web::Path<String>,
    form: web::Form<InvoiceFormRequest>,
) -> impl Responder {
    session_or_redirect!(req, data);
    let id = path.into_inner();
    let values = form.into_inner();
    let invoice_form = InvoiceForm::from(&values);

    match invoices::update_invoice(data.store.as_ref(), &data.cache, Some(&id), &invoice_form).await {
        ActionOutcome::Redirect(location) => redirect_to(&location),
        ActionOutcome::State(state) => {
            let status = if state.message.as_deref() == Some(MSG_INVOICE_NOT_FOUND) {
                StatusCode::NOT_FOUND
            } else {
                StatusCode::UNPROCESSABLE_ENTITY
            };
            form_page(&data, status, Some(&id), &values, &state).await
        }
    }
}

pub async fn delete(
    req: HttpRequest,
    data: web::Data<AppState>,
    path: web::Path<String>,
) -> impl Responder {
    session_or_redirect!(req, data);
    let id = path.into_inner();

    let state = invoices::delete_invoice(data.store.as_ref(), &data.cache, &id).await;
    let message = state.message.unwrap_or_default();
    if message == MSG_INVOICE_DELETED {
        return redirect_to(INVOICES_PATH);
    }

    let status = if message == MSG_INVOICE_NOT_FOUND {
        StatusCode::NOT_FOUND
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };
    match build_list_page(&data, "", 1, Some(&message)).await {
        Ok(html) => HttpResponse::build(status).content_type("text/html; charset=utf-8").body(html),
        Err(_) => HttpResponse::build(status).body(message),
    }
}
