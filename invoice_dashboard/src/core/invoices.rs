//! Invoice mutations: create, update and delete.
//!
//! Each action validates its input, issues one statement against the store,
//! revalidates the cached invoice list and tells the caller where to go next.

use chrono::Utc;
use log::{error, info};

use crate::core::cache::PageCache;
use crate::core::models::{ActionOutcome, ActionState, FieldErrors, InvoiceInput, InvoiceStatus};
use crate::core::store::InvoiceStore;

/// List page every successful mutation revalidates and redirects to
pub const INVOICES_PATH: &str = "/dashboard/invoices";

pub const MSG_SELECT_CUSTOMER: &str = "Please select a customer.";
pub const MSG_INVALID_AMOUNT: &str = "Please enter a valid amount.";
pub const MSG_AMOUNT_POSITIVE: &str = "Amount must be greater than 0.";
pub const MSG_SELECT_STATUS: &str = "Please select a status.";
pub const MSG_INVOICE_DELETED: &str = "Invoice deleted.";
pub const MSG_INVOICE_NOT_FOUND: &str = "Invoice not found.";

/// Raw invoice form fields, exactly as submitted
#[derive(Debug, Clone, Default)]
pub struct InvoiceForm {
    pub customer_id: Option<String>,
    pub amount: Option<String>,
    pub status: Option<String>,
}

impl InvoiceForm {
    /// Validate every field, collecting all errors rather than stopping at the first
    pub fn validate(&self) -> Result<InvoiceInput, FieldErrors> {
        let mut errors = FieldErrors::default();

        let customer_id = match self.customer_id.as_deref().map(str::trim) {
            Some(id) if !id.is_empty() => Some(id.to_string()),
            _ => {
                errors.customer_id.push(MSG_SELECT_CUSTOMER.to_string());
                None
            }
        };

        let amount_cents = match parse_amount(self.amount.as_deref().unwrap_or("")) {
            Ok(cents) => Some(cents),
            Err(msg) => {
                errors.amount.push(msg.to_string());
                None
            }
        };

        let status = match self.status.as_deref().map(str::parse::<InvoiceStatus>) {
            Some(Ok(status)) => Some(status),
            _ => {
                errors.status.push(MSG_SELECT_STATUS.to_string());
                None
            }
        };

        match (customer_id, amount_cents, status) {
            (Some(customer_id), Some(amount_cents), Some(status)) => Ok(InvoiceInput {
                customer_id,
                amount_cents,
                status,
            }),
            _ => Err(errors),
        }
    }
}

/// Coerce a dollar amount to cents. Blank input counts as zero.
fn parse_amount(raw: &str) -> Result<i64, &'static str> {
    let raw = raw.trim();
    let amount = if raw.is_empty() {
        0.0
    } else {
        raw.parse::<f64>().map_err(|_| MSG_INVALID_AMOUNT)?
    };

    if !amount.is_finite() {
        return Err(MSG_INVALID_AMOUNT);
    }
    if amount <= 0.0 {
        return Err(MSG_AMOUNT_POSITIVE);
    }

    let cents = (amount * 100.0).round();
    if cents >= i64::MAX as f64 {
        return Err(MSG_INVALID_AMOUNT);
    }
    if cents < 1.0 {
        return Err(MSG_AMOUNT_POSITIVE);
    }
    Ok(cents as i64)
}

fn today() -> String {
    Utc::now().format("%Y-%m-%d").to_string()
}

fn invalid(errors: FieldErrors, message: &str) -> ActionOutcome {
    ActionOutcome::State(ActionState {
        errors: Some(errors),
        message: Some(message.to_string()),
    })
}

/// Create an invoice dated today
pub async fn create_invoice(store: &dyn InvoiceStore, cache: &PageCache, form: &InvoiceForm) -> ActionOutcome {
    let input = match form.validate() {
        Ok(input) => input,
        Err(errors) => return invalid(errors, "Missing Fields. Failed to Create Invoice."),
    };

    match store.insert_invoice(&input, &today()).await {
        Ok(id) => info!("Created invoice {} for customer {}", id, input.customer_id),
        Err(e) => {
            error!("Failed to create invoice: {}", e);
            return ActionOutcome::State(ActionState::message("Database Error: Failed to create invoice."));
        }
    }

    cache.revalidate_path(INVOICES_PATH).await;
    ActionOutcome::Redirect(INVOICES_PATH.to_string())
}

/// Replace customer, amount and status of an existing invoice
pub async fn update_invoice(
    store: &dyn InvoiceStore,
    cache: &PageCache,
    id: Option<&str>,
    form: &InvoiceForm,
) -> ActionOutcome {
    let id = match id.map(str::trim) {
        Some(id) if !id.is_empty() => id,
        _ => return ActionOutcome::State(ActionState::message("Invoice ID is required.")),
    };

    let input = match form.validate() {
        Ok(input) => input,
        Err(errors) => return invalid(errors, "Missing Fields. Failed to Update Invoice."),
    };

    match store.update_invoice(id, &input).await {
        Ok(0) => return ActionOutcome::State(ActionState::message(MSG_INVOICE_NOT_FOUND)),
        Ok(_) => info!("Updated invoice {}", id),
        Err(e) => {
            error!("Failed to update invoice {}: {}", id, e);
            return ActionOutcome::State(ActionState::message("Database Error: Failed to update invoice."));
        }
    }

    cache.revalidate_path(INVOICES_PATH).await;
    ActionOutcome::Redirect(INVOICES_PATH.to_string())
}

/// Delete an invoice; the list is revalidated only when a row was removed
pub async fn delete_invoice(store: &dyn InvoiceStore, cache: &PageCache, id: &str) -> ActionState {
    match store.delete_invoice(id).await {
        Ok(0) => ActionState::message(MSG_INVOICE_NOT_FOUND),
        Ok(_) => {
            info!("Deleted invoice {}", id);
            cache.revalidate_path(INVOICES_PATH).await;
            ActionState::message(MSG_INVOICE_DELETED)
        }
        Err(e) => {
            error!("Failed to delete invoice {}: {}", id, e);
            ActionState::message("Database Error: Failed to delete invoice.")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::StoreError;
    use crate::core::store::{MockInvoiceStore, SqliteStore};

    const CUSTOMER: &str = "cc27c14a-0acf-4f4a-a6c9-d45682c144b9";

    fn form(customer_id: Option<&str>, amount: Option<&str>, status: Option<&str>) -> InvoiceForm {
        InvoiceForm {
            customer_id: customer_id.map(String::from),
            amount: amount.map(String::from),
            status: status.map(String::from),
        }
    }

    async fn seeded_store() -> SqliteStore {
        let store = SqliteStore::open_in_memory().unwrap();
        store.init_schema().await.unwrap();
        store.seed_demo_data().await.unwrap();
        store
    }

    async fn warm_cache() -> PageCache {
        let cache = PageCache::new(4);
        cache.put(INVOICES_PATH, "<html>stale</html>".to_string()).await;
        cache
    }

    #[test]
    fn test_validate_collects_all_errors() {
        let errors = form(None, Some("abc"), Some("overdue")).validate().unwrap_err();
        assert_eq!(errors.customer_id, vec![MSG_SELECT_CUSTOMER]);
        assert_eq!(errors.amount, vec![MSG_INVALID_AMOUNT]);
        assert_eq!(errors.status, vec![MSG_SELECT_STATUS]);
    }

    #[test]
    fn test_amount_coercion() {
        assert_eq!(parse_amount("15.50"), Ok(1550));
        assert_eq!(parse_amount(" 20 "), Ok(2000));
        assert_eq!(parse_amount("0.1"), Ok(10));
        assert_eq!(parse_amount(""), Err(MSG_AMOUNT_POSITIVE));
        assert_eq!(parse_amount("0"), Err(MSG_AMOUNT_POSITIVE));
        assert_eq!(parse_amount("-3"), Err(MSG_AMOUNT_POSITIVE));
        assert_eq!(parse_amount("0.001"), Err(MSG_AMOUNT_POSITIVE));
        assert_eq!(parse_amount("NaN"), Err(MSG_INVALID_AMOUNT));
        assert_eq!(parse_amount("inf"), Err(MSG_INVALID_AMOUNT));
        assert_eq!(parse_amount("1e30"), Err(MSG_INVALID_AMOUNT));
    }

    #[test]
    fn test_blank_customer_is_rejected() {
        let errors = form(Some("  "), Some("10"), Some("paid")).validate().unwrap_err();
        assert_eq!(errors.customer_id, vec![MSG_SELECT_CUSTOMER]);
        assert!(errors.amount.is_empty());
        assert!(errors.status.is_empty());
    }

    #[tokio::test]
    async fn test_create_invoice_persists_and_redirects() {
        let store = seeded_store().await;
        let cache = warm_cache().await;
        let before = store.fetch_filtered_invoices("Amy", 1).await.unwrap().len();

        let outcome = create_invoice(&store, &cache, &form(Some(CUSTOMER), Some("12.34"), Some("pending"))).await;

        assert_eq!(outcome, ActionOutcome::Redirect(INVOICES_PATH.to_string()));
        assert!(cache.get(INVOICES_PATH).await.is_none());
        let rows = store.fetch_filtered_invoices("Amy", 1).await.unwrap();
        assert_eq!(rows.len(), before + 1);
        let created = rows.iter().find(|row| row.amount_cents == 1234).unwrap();
        assert_eq!(created.status, InvoiceStatus::Pending);
        assert_eq!(created.date, today());
    }

    #[tokio::test]
    async fn test_create_invoice_validation_failure() {
        let store = MockInvoiceStore::new();
        let cache = warm_cache().await;

        let outcome = create_invoice(&store, &cache, &form(Some(CUSTOMER), Some("0"), None)).await;

        match outcome {
            ActionOutcome::State(state) => {
                assert_eq!(state.message.as_deref(), Some("Missing Fields. Failed to Create Invoice."));
                let errors = state.errors.unwrap();
                assert_eq!(errors.amount, vec![MSG_AMOUNT_POSITIVE]);
                assert_eq!(errors.status, vec![MSG_SELECT_STATUS]);
            }
            other => panic!("expected state, got {:?}", other),
        }
        assert!(cache.get(INVOICES_PATH).await.is_some());
    }

    #[tokio::test]
    async fn test_create_invoice_database_error() {
        let mut store = MockInvoiceStore::new();
        store
            .expect_insert_invoice()
            .returning(|_, _| Err(StoreError::DatabaseError("locked".to_string())));
        let cache = warm_cache().await;

        let outcome = create_invoice(&store, &cache, &form(Some(CUSTOMER), Some("5"), Some("paid"))).await;

        assert_eq!(
            outcome,
            ActionOutcome::State(ActionState::message("Database Error: Failed to create invoice."))
        );
        assert!(cache.get(INVOICES_PATH).await.is_some());
    }

    #[tokio::test]
    async fn test_update_invoice() {
        let store = seeded_store().await;
        let cache = warm_cache().await;
        let id = store
            .fetch_filtered_invoices("Amy", 1)
            .await
            .unwrap()
            .remove(0)
            .id;

        let outcome = update_invoice(&store, &cache, Some(&id), &form(Some(CUSTOMER), Some("99.99"), Some("paid"))).await;

        assert_eq!(outcome, ActionOutcome::Redirect(INVOICES_PATH.to_string()));
        assert!(cache.get(INVOICES_PATH).await.is_none());
        let invoice = store.fetch_invoice(&id).await.unwrap().unwrap();
        assert_eq!(invoice.amount_cents, 9999);
        assert_eq!(invoice.status, InvoiceStatus::Paid);
    }

    #[tokio::test]
    async fn test_update_invoice_requires_id() {
        let store = MockInvoiceStore::new();
        let cache = warm_cache().await;
        let valid = form(Some(CUSTOMER), Some("1"), Some("paid"));

        for id in [None, Some(""), Some("   ")] {
            let outcome = update_invoice(&store, &cache, id, &valid).await;
            assert_eq!(outcome, ActionOutcome::State(ActionState::message("Invoice ID is required.")));
        }
    }

    #[tokio::test]
    async fn test_update_invoice_validation_and_missing_row() {
        let store = seeded_store().await;
        let cache = warm_cache().await;

        let outcome = update_invoice(&store, &cache, Some("missing"), &form(None, Some("1"), Some("paid"))).await;
        match outcome {
            ActionOutcome::State(state) => {
                assert_eq!(state.message.as_deref(), Some("Missing Fields. Failed to Update Invoice."));
                assert_eq!(state.errors.unwrap().customer_id, vec![MSG_SELECT_CUSTOMER]);
            }
            other => panic!("expected state, got {:?}", other),
        }

        let outcome = update_invoice(&store, &cache, Some("missing"), &form(Some(CUSTOMER), Some("1"), Some("paid"))).await;
        assert_eq!(outcome, ActionOutcome::State(ActionState::message("Invoice not found.")));
        assert!(cache.get(INVOICES_PATH).await.is_some());
    }

    #[tokio::test]
    async fn test_update_invoice_database_error() {
        let mut store = MockInvoiceStore::new();
        store
            .expect_update_invoice()
            .returning(|_, _| Err(StoreError::DatabaseError("constraint".to_string())));
        let cache = warm_cache().await;

        let outcome = update_invoice(&store, &cache, Some("id-1"), &form(Some(CUSTOMER), Some("1"), Some("paid"))).await;
        assert_eq!(
            outcome,
            ActionOutcome::State(ActionState::message("Database Error: Failed to update invoice."))
        );
    }

    #[tokio::test]
    async fn test_delete_invoice() {
        let store = seeded_store().await;
        let cache = warm_cache().await;
        let id = store.fetch_filtered_invoices("", 1).await.unwrap().remove(0).id;

        let state = delete_invoice(&store, &cache, &id).await;
        assert_eq!(state, ActionState::message("Invoice deleted."));
        assert!(cache.get(INVOICES_PATH).await.is_none());
        assert!(store.fetch_invoice(&id).await.unwrap().is_none());

        let again = delete_invoice(&store, &cache, &id).await;
        assert_eq!(again, ActionState::message("Invoice not found."));
    }

    #[tokio::test]
    async fn test_delete_invoice_database_error() {
        let mut store = MockInvoiceStore::new();
        store
            .expect_delete_invoice()
            .returning(|_| Err(StoreError::DatabaseError("busy".to_string())));
        let cache = warm_cache().await;

        let state = delete_invoice(&store, &cache, "id-1").await;
        assert_eq!(state, ActionState::message("Database Error: Failed to delete invoice."));
        assert!(cache.get(INVOICES_PATH).await.is_some());
    }
}
