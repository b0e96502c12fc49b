use serde::{Deserialize, Serialize};

use crate::core::invoices::InvoiceForm;
use crate::core::models::{format_currency, Customer, InvoiceRow, InvoiceStatus};

/// Invoice create/edit form body
#[derive(Debug, Default, Deserialize)]
pub struct InvoiceFormRequest {
    #[serde(rename = "customerId")]
    pub customer_id: Option<String>,
    pub amount: Option<String>,
    pub status: Option<String>,
}

impl From<&InvoiceFormRequest> for InvoiceForm {
    fn from(req: &InvoiceFormRequest) -> Self {
        InvoiceForm {
            customer_id: req.customer_id.clone(),
            amount: req.amount.clone(),
            status: req.status.clone(),
        }
    }
}

/// Login form body
#[derive(Debug, Default, Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

/// Query parameters of the invoice list
#[derive(Debug, Default, Deserialize)]
pub struct InvoiceListQuery {
    pub query: Option<String>,
    pub page: Option<usize>,
}

/// Invoice row as rendered in the list template
#[derive(Serialize)]
pub struct InvoiceRowView {
    pub id: String,
    pub name: String,
    pub email: String,
    pub amount: String,
    pub status: String,
    pub is_paid: bool,
    pub date: String,
}

impl From<InvoiceRow> for InvoiceRowView {
    fn from(row: InvoiceRow) -> Self {
        InvoiceRowView {
            amount: format_currency(row.amount_cents),
            status: row.status.to_string(),
            is_paid: row.status == InvoiceStatus::Paid,
            id: row.id,
            name: row.name,
            email: row.email,
            date: row.date,
        }
    }
}

/// Customer option in the invoice form's select box
#[derive(Serialize)]
pub struct CustomerOption {
    pub id: String,
    pub name: String,
    pub selected: bool,
}

impl CustomerOption {
    pub fn list(customers: Vec<Customer>, selected: Option<&str>) -> Vec<CustomerOption> {
        customers
            .into_iter()
            .map(|c| CustomerOption {
                selected: selected == Some(c.id.as_str()),
                id: c.id,
                name: c.name,
            })
            .collect()
    }
}

/// Link in the list page's pagination bar
#[derive(Serialize)]
pub struct PageLink {
    pub number: usize,
    pub href: String,
    pub current: bool,
}

/// Query string of a pagination link
#[derive(Debug, Serialize)]
pub struct PageQuery<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query: Option<&'a str>,
    pub page: usize,
}
