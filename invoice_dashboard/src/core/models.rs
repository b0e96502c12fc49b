use std::fmt::Display;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Payment status of an invoice
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum InvoiceStatus {
    /// Invoice has been settled
    Paid,
    /// Invoice is awaiting payment
    Pending,
}

impl InvoiceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvoiceStatus::Paid => "paid",
            InvoiceStatus::Pending => "pending",
        }
    }
}

impl Display for InvoiceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for InvoiceStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "paid" => Ok(InvoiceStatus::Paid),
            "pending" => Ok(InvoiceStatus::Pending),
            other => Err(format!("unknown invoice status: {}", other)),
        }
    }
}

/// Validated invoice fields ready to be written to the store
#[derive(Debug, Clone, PartialEq)]
pub struct InvoiceInput {
    pub customer_id: String,
    /// Amount in cents
    pub amount_cents: i64,
    pub status: InvoiceStatus,
}

/// A stored invoice
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Invoice {
    pub id: String,
    pub customer_id: String,
    pub amount_cents: i64,
    pub status: InvoiceStatus,
    /// Issue date as `YYYY-MM-DD`
    pub date: String,
}

/// Invoice joined with its customer, as shown in the list page
#[derive(Debug, Clone, Serialize)]
pub struct InvoiceRow {
    pub id: String,
    pub name: String,
    pub email: String,
    pub amount_cents: i64,
    pub status: InvoiceStatus,
    pub date: String,
}

/// Customer record
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Customer {
    pub id: String,
    pub name: String,
    pub email: String,
    pub image_url: String,
}

/// Dashboard user
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    /// Salted password hash, see `core::auth::hash_password`
    pub password: String,
}

/// Per-field validation messages for the invoice form
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct FieldErrors {
    #[serde(rename = "customerId", skip_serializing_if = "Vec::is_empty")]
    pub customer_id: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub amount: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub status: Vec<String>,
}

/// State handed back to a form when an action does not redirect
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct ActionState {
    pub errors: Option<FieldErrors>,
    pub message: Option<String>,
}

impl ActionState {
    pub fn message(message: impl Into<String>) -> Self {
        ActionState {
            errors: None,
            message: Some(message.into()),
        }
    }
}

/// Result of a mutation: either send the client elsewhere or show a state
#[derive(Debug, Clone, PartialEq)]
pub enum ActionOutcome {
    Redirect(String),
    State(ActionState),
}

/// Format an amount in cents as a dollar string, e.g. `$1,234.50`
pub fn format_currency(amount_cents: i64) -> String {
    let sign = if amount_cents < 0 { "-" } else { "" };
    let cents = amount_cents.unsigned_abs();
    let dollars = (cents / 100).to_string();

    let mut grouped = String::with_capacity(dollars.len() + dollars.len() / 3);
    for (i, ch) in dollars.chars().enumerate() {
        if i > 0 && (dollars.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    format!("{}${}.{:02}", sign, grouped, cents % 100)
}
