use std::path::Path;

use async_trait::async_trait;
use log::{debug, info};
use rusqlite::{params, Connection, OptionalExtension};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::core::auth::hash_password;
use crate::core::error::StoreError;
use crate::core::models::{Customer, Invoice, InvoiceInput, InvoiceRow, InvoiceStatus, User};

/// Number of invoices shown per list page
pub const ITEMS_PER_PAGE: usize = 6;

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS users (
        id TEXT PRIMARY KEY,
        name TEXT NOT NULL,
        email TEXT NOT NULL UNIQUE,
        password TEXT NOT NULL
    );
    CREATE TABLE IF NOT EXISTS customers (
        id TEXT PRIMARY KEY,
        name TEXT NOT NULL,
        email TEXT NOT NULL,
        image_url TEXT NOT NULL
    );
    CREATE TABLE IF NOT EXISTS invoices (
        id TEXT PRIMARY KEY,
        customer_id TEXT NOT NULL REFERENCES customers(id),
        amount INTEGER NOT NULL,
        status TEXT NOT NULL CHECK (status IN ('paid', 'pending')),
        date TEXT NOT NULL
    );
";

const INVOICE_ROW_SELECT: &str = "
    SELECT invoices.id, customers.name, customers.email,
           invoices.amount, invoices.status, invoices.date
    FROM invoices
    JOIN customers ON invoices.customer_id = customers.id
    WHERE customers.name LIKE ?1 ESCAPE '\\'
       OR customers.email LIKE ?1 ESCAPE '\\'
       OR CAST(invoices.amount AS TEXT) LIKE ?1 ESCAPE '\\'
       OR invoices.date LIKE ?1 ESCAPE '\\'
       OR invoices.status LIKE ?1 ESCAPE '\\'
";

/// Persistence operations used by the invoice actions and pages
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait InvoiceStore: Send + Sync {
    /// Insert a new invoice dated `date`, returning its id
    async fn insert_invoice(&self, input: &InvoiceInput, date: &str) -> Result<String, StoreError>;

    /// Overwrite customer, amount and status; returns rows affected
    async fn update_invoice(&self, id: &str, input: &InvoiceInput) -> Result<usize, StoreError>;

    /// Delete by id; returns rows affected
    async fn delete_invoice(&self, id: &str) -> Result<usize, StoreError>;

    async fn fetch_invoice(&self, id: &str) -> Result<Option<Invoice>, StoreError>;

    /// One page (1-based) of invoices matching `query`, newest first
    async fn fetch_filtered_invoices(&self, query: &str, page: usize) -> Result<Vec<InvoiceRow>, StoreError>;

    /// Number of pages `fetch_filtered_invoices` can return for `query`
    async fn fetch_invoice_pages(&self, query: &str) -> Result<usize, StoreError>;

    async fn fetch_customers(&self) -> Result<Vec<Customer>, StoreError>;

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;
}

/// SQLite-backed store holding a single connection
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) a database file; `:memory:` opens a private in-memory database
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        Self::from_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        Ok(SqliteStore {
            conn: Mutex::new(conn),
        })
    }

    /// Create the tables if they do not exist yet
    pub async fn init_schema(&self) -> Result<(), StoreError> {
        let conn = self.conn.lock().await;
        conn.execute_batch(SCHEMA)
            .map_err(|e| StoreError::InitializationError(e.to_string()))?;
        debug!("Database schema ready");
        Ok(())
    }

    /// Insert the demo user, customers and invoices; rows that already exist are kept
    pub async fn seed_demo_data(&self) -> Result<(), StoreError> {
        let password = hash_password(DEMO_USER.3)
            .map_err(|e| StoreError::InitializationError(e.to_string()))?;
        let mut conn = self.conn.lock().await;
        let tx = conn.transaction()?;

        tx.execute(
            "INSERT OR IGNORE INTO users (id, name, email, password) VALUES (?1, ?2, ?3, ?4)",
            params![DEMO_USER.0, DEMO_USER.1, DEMO_USER.2, password],
        )?;

        for (id, name, email, image_url) in DEMO_CUSTOMERS {
            tx.execute(
                "INSERT OR IGNORE INTO customers (id, name, email, image_url) VALUES (?1, ?2, ?3, ?4)",
                params![id, name, email, image_url],
            )?;
        }

        let existing: i64 = tx.query_row("SELECT COUNT(*) FROM invoices", [], |row| row.get(0))?;
        if existing == 0 {
            for (customer, amount, status, date) in DEMO_INVOICES {
                tx.execute(
                    "INSERT INTO invoices (id, customer_id, amount, status, date) VALUES (?1, ?2, ?3, ?4, ?5)",
                    params![Uuid::new_v4().to_string(), DEMO_CUSTOMERS[*customer].0, amount, status, date],
                )?;
            }
        }

        tx.commit()?;
        info!(
            "Seeded demo data: {} customers, {} invoices",
            DEMO_CUSTOMERS.len(),
            if existing == 0 { DEMO_INVOICES.len() } else { 0 }
        );
        Ok(())
    }
}

fn parse_status(raw: String) -> Result<InvoiceStatus, StoreError> {
    raw.parse().map_err(StoreError::CorruptRowError)
}

/// Substring pattern for `LIKE ... ESCAPE '\\'`; wildcards in the query match literally
fn like_pattern(query: &str) -> String {
    let mut pattern = String::with_capacity(query.len() + 2);
    pattern.push('%');
    for ch in query.trim().chars() {
        if matches!(ch, '\\' | '%' | '_') {
            pattern.push('\\');
        }
        pattern.push(ch);
    }
    pattern.push('%');
    pattern
}

#[async_trait]
impl InvoiceStore for SqliteStore {
    async fn insert_invoice(&self, input: &InvoiceInput, date: &str) -> Result<String, StoreError> {
        let id = Uuid::new_v4().to_string();
        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT INTO invoices (id, customer_id, amount, status, date) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![id, input.customer_id, input.amount_cents, input.status.as_str(), date],
        )?;
        Ok(id)
    }

    async fn update_invoice(&self, id: &str, input: &InvoiceInput) -> Result<usize, StoreError> {
        let conn = self.conn.lock().await;
        let changed = conn.execute(
            "UPDATE invoices SET customer_id = ?1, amount = ?2, status = ?3 WHERE id = ?4",
            params![input.customer_id, input.amount_cents, input.status.as_str(), id],
        )?;
        Ok(changed)
    }

    async fn delete_invoice(&self, id: &str) -> Result<usize, StoreError> {
        let conn = self.conn.lock().await;
        let changed = conn.execute("DELETE FROM invoices WHERE id = ?1", params![id])?;
        Ok(changed)
    }

    async fn fetch_invoice(&self, id: &str) -> Result<Option<Invoice>, StoreError> {
        let conn = self.conn.lock().await;
        let row = conn
            .query_row(
                "SELECT id, customer_id, amount, status, date FROM invoices WHERE id = ?1",
                params![id],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, i64>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, String>(4)?,
                    ))
                },
            )
            .optional()?;

        match row {
            Some((id, customer_id, amount_cents, status, date)) => Ok(Some(Invoice {
                id,
                customer_id,
                amount_cents,
                status: parse_status(status)?,
                date,
            })),
            None => Ok(None),
        }
    }

    async fn fetch_filtered_invoices(&self, query: &str, page: usize) -> Result<Vec<InvoiceRow>, StoreError> {
        // Pages past any representable offset are simply empty
        let offset = match page
            .saturating_sub(1)
            .checked_mul(ITEMS_PER_PAGE)
            .and_then(|offset| i64::try_from(offset).ok())
        {
            Some(offset) => offset,
            None => return Ok(Vec::new()),
        };
        let sql = format!("{} ORDER BY invoices.date DESC, invoices.id LIMIT ?2 OFFSET ?3", INVOICE_ROW_SELECT);

        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare(&sql)?;
        let raw_rows = stmt
            .query_map(params![like_pattern(query), ITEMS_PER_PAGE as i64, offset], |row| {
                Ok((
                    InvoiceRow {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        email: row.get(2)?,
                        amount_cents: row.get(3)?,
                        status: InvoiceStatus::Pending,
                        date: row.get(5)?,
                    },
                    row.get::<_, String>(4)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        raw_rows
            .into_iter()
            .map(|(mut invoice, status)| {
                invoice.status = parse_status(status)?;
                Ok(invoice)
            })
            .collect()
    }

    async fn fetch_invoice_pages(&self, query: &str) -> Result<usize, StoreError> {
        let sql = format!("SELECT COUNT(*) FROM ({})", INVOICE_ROW_SELECT);
        let conn = self.conn.lock().await;
        let count: i64 = conn.query_row(&sql, params![like_pattern(query)], |row| row.get(0))?;
        let count = count.max(0) as usize;
        Ok((count + ITEMS_PER_PAGE - 1) / ITEMS_PER_PAGE)
    }

    async fn fetch_customers(&self) -> Result<Vec<Customer>, StoreError> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare("SELECT id, name, email, image_url FROM customers ORDER BY name ASC")?;
        let customers = stmt
            .query_map([], |row| {
                Ok(Customer {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    email: row.get(2)?,
                    image_url: row.get(3)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(customers)
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let conn = self.conn.lock().await;
        let user = conn
            .query_row(
                "SELECT id, name, email, password FROM users WHERE email = ?1",
                params![email],
                |row| {
                    Ok(User {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        email: row.get(2)?,
                        password: row.get(3)?,
                    })
                },
            )
            .optional()?;
        Ok(user)
    }
}

/// Demo login: id, name, email, plain-text password
pub const DEMO_USER: (&str, &str, &str, &str) = (
    "410544b2-4001-4271-9855-fec4b6a6442a",
    "User",
    "user@nextmail.com",
    "123456",
);

const DEMO_CUSTOMERS: &[(&str, &str, &str, &str)] = &[
    ("d6e15727-9fe1-4961-8c5b-ea44a9bd81aa", "Evil Rabbit", "evil@rabbit.com", "/static/customers/evil-rabbit.png"),
    ("3958dc9e-712f-4377-85e9-fec4b6a6442a", "Delba de Oliveira", "delba@oliveira.com", "/static/customers/delba-de-oliveira.png"),
    ("3958dc9e-742f-4377-85e9-fec4b6a6442a", "Lee Robinson", "lee@robinson.com", "/static/customers/lee-robinson.png"),
    ("76d65c26-f784-44a2-ac19-586678f7c2f2", "Michael Novotny", "michael@novotny.com", "/static/customers/michael-novotny.png"),
    ("cc27c14a-0acf-4f4a-a6c9-d45682c144b9", "Amy Burns", "amy@burns.com", "/static/customers/amy-burns.png"),
    ("13d07535-c59e-4157-a011-f8d2ef4e0cbb", "Balazs Orban", "balazs@orban.com", "/static/customers/balazs-orban.png"),
];

/// Demo invoices: customer index, amount in cents, status, date
const DEMO_INVOICES: &[(usize, i64, &str, &str)] = &[
    (0, 15795, "pending", "2022-12-06"),
    (1, 20348, "pending", "2022-11-14"),
    (4, 3040, "paid", "2022-10-29"),
    (3, 44800, "paid", "2023-09-10"),
    (5, 34577, "pending", "2023-08-05"),
    (2, 54246, "pending", "2023-07-16"),
    (0, 666, "pending", "2023-06-27"),
    (3, 32545, "paid", "2023-06-09"),
    (4, 1250, "paid", "2023-06-17"),
    (5, 8546, "paid", "2023-06-07"),
    (1, 500, "paid", "2023-08-19"),
    (5, 8945, "paid", "2023-06-03"),
    (2, 1000, "paid", "2022-06-05"),
];

#[cfg(test)]
mod tests {
    use super::*;

    async fn seeded_store() -> SqliteStore {
        let store = SqliteStore::open_in_memory().unwrap();
        store.init_schema().await.unwrap();
        store.seed_demo_data().await.unwrap();
        store
    }

    fn input(customer_index: usize, amount_cents: i64, status: InvoiceStatus) -> InvoiceInput {
        InvoiceInput {
            customer_id: DEMO_CUSTOMERS[customer_index].0.to_string(),
            amount_cents,
            status,
        }
    }

    #[tokio::test]
    async fn test_seed_is_idempotent() {
        let store = seeded_store().await;
        store.seed_demo_data().await.unwrap();

        assert_eq!(store.fetch_customers().await.unwrap().len(), DEMO_CUSTOMERS.len());
        let pages = store.fetch_invoice_pages("").await.unwrap();
        assert_eq!(pages, (DEMO_INVOICES.len() + ITEMS_PER_PAGE - 1) / ITEMS_PER_PAGE);
    }

    #[tokio::test]
    async fn test_insert_update_delete() {
        let store = seeded_store().await;

        let id = store
            .insert_invoice(&input(0, 4200, InvoiceStatus::Pending), "2024-01-02")
            .await
            .unwrap();
        let stored = store.fetch_invoice(&id).await.unwrap().unwrap();
        assert_eq!(stored.amount_cents, 4200);
        assert_eq!(stored.status, InvoiceStatus::Pending);
        assert_eq!(stored.date, "2024-01-02");

        let changed = store
            .update_invoice(&id, &input(1, 9900, InvoiceStatus::Paid))
            .await
            .unwrap();
        assert_eq!(changed, 1);
        let stored = store.fetch_invoice(&id).await.unwrap().unwrap();
        assert_eq!(stored.customer_id, DEMO_CUSTOMERS[1].0);
        assert_eq!(stored.amount_cents, 9900);
        assert_eq!(stored.status, InvoiceStatus::Paid);
        assert_eq!(stored.date, "2024-01-02");

        assert_eq!(store.delete_invoice(&id).await.unwrap(), 1);
        assert_eq!(store.delete_invoice(&id).await.unwrap(), 0);
        assert!(store.fetch_invoice(&id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_unknown_customer_is_rejected() {
        let store = seeded_store().await;
        let bad = InvoiceInput {
            customer_id: "no-such-customer".to_string(),
            amount_cents: 100,
            status: InvoiceStatus::Paid,
        };
        let result = store.insert_invoice(&bad, "2024-01-02").await;
        assert!(matches!(result, Err(StoreError::DatabaseError(_))));
    }

    #[tokio::test]
    async fn test_filtered_invoices_search_and_paging() {
        let store = seeded_store().await;

        let first = store.fetch_filtered_invoices("", 1).await.unwrap();
        assert_eq!(first.len(), ITEMS_PER_PAGE);
        assert!(first.windows(2).all(|w| w[0].date >= w[1].date));

        let amy = store.fetch_filtered_invoices("amy", 1).await.unwrap();
        assert_eq!(amy.len(), 2);
        assert!(amy.iter().all(|row| row.name == "Amy Burns"));

        let pending = store.fetch_invoice_pages("pending").await.unwrap();
        assert_eq!(pending, 1);

        let beyond = store.fetch_filtered_invoices("", 99).await.unwrap();
        assert!(beyond.is_empty());
    }

    #[tokio::test]
    async fn test_huge_page_number_is_empty() {
        let store = seeded_store().await;
        for page in [usize::MAX, usize::MAX / ITEMS_PER_PAGE + 2, (i64::MAX as usize) / ITEMS_PER_PAGE + 2] {
            let rows = store.fetch_filtered_invoices("", page).await.unwrap();
            assert!(rows.is_empty(), "page {} should be empty", page);
        }
    }

    #[tokio::test]
    async fn test_search_wildcards_match_literally() {
        let store = seeded_store().await;
        assert!(store.fetch_filtered_invoices("_", 1).await.unwrap().is_empty());
        assert!(store.fetch_filtered_invoices("%", 1).await.unwrap().is_empty());
        assert_eq!(store.fetch_invoice_pages("_").await.unwrap(), 0);
        assert_eq!(like_pattern(" a_b%c\\ "), "%a\\_b\\%c\\\\%");
    }

    #[tokio::test]
    async fn test_get_user_by_email() {
        let store = seeded_store().await;
        let user = store.get_user_by_email(DEMO_USER.2).await.unwrap().unwrap();
        assert_eq!(user.name, "User");
        assert_ne!(user.password, DEMO_USER.3);
        assert!(store.get_user_by_email("nobody@example.com").await.unwrap().is_none());
    }
}
