//! SQLite-backed catalog store — connection wrapper, migrations, CRUD,
//! and the append-only message log.

use std::path::Path;
use std::str::FromStr;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use rusqlite::Connection;
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{debug, info};
use uuid::Uuid;

use super::model::{Brand, Category, Condition, Product, ProductDraft};
use crate::error::CatalogError;

/// Shared database handle wrapping a SQLite connection behind a Mutex.
///
/// Using `Mutex` (not `RwLock`) because rusqlite `Connection` is `!Sync`.
/// All DB access is serialized — fine for our write-light workload.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open (or create) a SQLite database at the given path and run migrations.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                CatalogError::Query(format!(
                    "failed to create directory {}: {e}",
                    parent.display()
                ))
            })?;
        }

        let conn = Connection::open(path)?;
        let db = Self {
            conn: Mutex::new(conn),
        };
        db.run_migrations()?;
        info!(path = %path.display(), "Database opened");
        Ok(db)
    }

    /// Open an in-memory database (for tests).
    pub fn open_in_memory() -> Result<Self, CatalogError> {
        let conn = Connection::open_in_memory()?;
        let db = Self {
            conn: Mutex::new(conn),
        };
        db.run_migrations()?;
        Ok(db)
    }

    /// Get a lock on the underlying connection.
    ///
    /// Callers hold the lock for the duration of their DB operation.
    fn conn(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn.lock().expect("Database mutex poisoned")
    }

    /// Run all schema migrations (idempotent).
    fn run_migrations(&self) -> Result<(), CatalogError> {
        let conn = self.conn();

        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS categories (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL UNIQUE,
                description TEXT,
                created_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS brands (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL UNIQUE,
                description TEXT,
                created_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS products (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                category_id TEXT,
                brand_id TEXT,
                price TEXT NOT NULL DEFAULT '0',
                description TEXT NOT NULL DEFAULT '',
                specs TEXT NOT NULL DEFAULT '',
                condition TEXT NOT NULL DEFAULT 'new',
                stock INTEGER NOT NULL DEFAULT 0,
                active INTEGER NOT NULL DEFAULT 1,
                created_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_products_active ON products(active);

            CREATE TABLE IF NOT EXISTS message_log (
                id TEXT PRIMARY KEY,
                text TEXT NOT NULL,
                origin TEXT NOT NULL,
                user_id TEXT NOT NULL,
                response TEXT NOT NULL,
                escalated INTEGER NOT NULL DEFAULT 0,
                processed_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_message_log_user ON message_log(user_id);",
        )?;

        info!("Database migrations complete");
        Ok(())
    }
}

/// One row of the append-only message log.
#[derive(Debug, Clone, Serialize)]
pub struct LoggedExchange {
    pub id: String,
    pub text: String,
    pub origin: String,
    pub user_id: String,
    pub response: String,
    pub escalated: bool,
    pub processed_at: DateTime<Utc>,
}

/// Catalog CRUD over the shared database handle.
pub struct Catalog {
    db: Arc<Database>,
}

impl Catalog {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    // ── Products ────────────────────────────────────────────────────

    /// List active products with joined category/brand names, ordered by name.
    pub fn list_active_products(&self) -> Result<Vec<Product>, CatalogError> {
        let conn = self.db.conn();
        let mut stmt = conn.prepare(
            "SELECT p.id, p.name, p.category_id, p.brand_id, c.name, b.name,
                    p.price, p.description, p.specs, p.condition, p.stock,
                    p.active, p.created_at
             FROM products p
             LEFT JOIN categories c ON p.category_id = c.id
             LEFT JOIN brands b ON p.brand_id = b.id
             WHERE p.active = 1
             ORDER BY p.name",
        )?;
        let rows = stmt.query_map([], row_to_product)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// Get one product (active or not) by id.
    pub fn get_product(&self, id: &str) -> Result<Option<Product>, CatalogError> {
        let conn = self.db.conn();
        let mut stmt = conn.prepare(
            "SELECT p.id, p.name, p.category_id, p.brand_id, c.name, b.name,
                    p.price, p.description, p.specs, p.condition, p.stock,
                    p.active, p.created_at
             FROM products p
             LEFT JOIN categories c ON p.category_id = c.id
             LEFT JOIN brands b ON p.brand_id = b.id
             WHERE p.id = ?1",
        )?;
        let mut rows = stmt.query_map(rusqlite::params![id], row_to_product)?;
        match rows.next() {
            Some(Ok(product)) => Ok(Some(product)),
            Some(Err(e)) => Err(e.into()),
            None => Ok(None),
        }
    }

    /// Create a product. Returns the generated id.
    ///
    /// Fails with `Constraint` on negative price or a dangling
    /// category/brand reference.
    pub fn create_product(&self, draft: &ProductDraft) -> Result<String, CatalogError> {
        self.validate_draft(draft)?;
        let id = Uuid::new_v4().to_string();
        let conn = self.db.conn();
        conn.execute(
            "INSERT INTO products
                (id, name, category_id, brand_id, price, description, specs,
                 condition, stock, active, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, 1, ?10)",
            rusqlite::params![
                id,
                draft.name,
                draft.category_id,
                draft.brand_id,
                draft.price.to_string(),
                draft.description,
                draft.specs,
                draft.condition.as_str(),
                draft.stock,
                Utc::now().to_rfc3339(),
            ],
        )?;
        debug!(id = %id, name = %draft.name, "Product created");
        Ok(id)
    }

    /// Update a product in place. Returns false if no such product exists.
    pub fn update_product(&self, id: &str, draft: &ProductDraft) -> Result<bool, CatalogError> {
        self.validate_draft(draft)?;
        let conn = self.db.conn();
        let changed = conn.execute(
            "UPDATE products
             SET name = ?1, category_id = ?2, brand_id = ?3, price = ?4,
                 description = ?5, specs = ?6, condition = ?7, stock = ?8
             WHERE id = ?9",
            rusqlite::params![
                draft.name,
                draft.category_id,
                draft.brand_id,
                draft.price.to_string(),
                draft.description,
                draft.specs,
                draft.condition.as_str(),
                draft.stock,
                id,
            ],
        )?;
        Ok(changed > 0)
    }

    /// Soft-delete a product (`active = false`). Returns false if absent.
    pub fn deactivate_product(&self, id: &str) -> Result<bool, CatalogError> {
        let conn = self.db.conn();
        let changed = conn.execute(
            "UPDATE products SET active = 0 WHERE id = ?1",
            rusqlite::params![id],
        )?;
        Ok(changed > 0)
    }

    fn validate_draft(&self, draft: &ProductDraft) -> Result<(), CatalogError> {
        if draft.price < Decimal::ZERO {
            return Err(CatalogError::Constraint(format!(
                "price must be non-negative, got {}",
                draft.price
            )));
        }
        if let Some(ref cat) = draft.category_id {
            if !self.exists("categories", cat)? {
                return Err(CatalogError::Constraint(format!(
                    "category {cat} does not exist"
                )));
            }
        }
        if let Some(ref brand) = draft.brand_id {
            if !self.exists("brands", brand)? {
                return Err(CatalogError::Constraint(format!(
                    "brand {brand} does not exist"
                )));
            }
        }
        Ok(())
    }

    fn exists(&self, table: &str, id: &str) -> Result<bool, CatalogError> {
        // `table` is always a literal from this module, never user input.
        let conn = self.db.conn();
        let count: i64 = conn.query_row(
            &format!("SELECT COUNT(*) FROM {table} WHERE id = ?1"),
            rusqlite::params![id],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    // ── Categories ──────────────────────────────────────────────────

    pub fn list_categories(&self) -> Result<Vec<Category>, CatalogError> {
        let conn = self.db.conn();
        let mut stmt = conn.prepare(
            "SELECT id, name, description, created_at FROM categories ORDER BY name",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(Category {
                id: row.get(0)?,
                name: row.get(1)?,
                description: row.get(2)?,
                created_at: parse_datetime(&row.get::<_, String>(3)?),
            })
        })?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    pub fn create_category(
        &self,
        name: &str,
        description: Option<&str>,
    ) -> Result<String, CatalogError> {
        let id = Uuid::new_v4().to_string();
        let conn = self.db.conn();
        conn.execute(
            "INSERT INTO categories (id, name, description, created_at) VALUES (?1, ?2, ?3, ?4)",
            rusqlite::params![id, name, description, Utc::now().to_rfc3339()],
        )
        .map_err(|e| match e {
            rusqlite::Error::SqliteFailure(err, _)
                if err.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                CatalogError::Constraint(format!("category name '{name}' already exists"))
            }
            other => other.into(),
        })?;
        Ok(id)
    }

    /// Delete a category. RESTRICT policy: fails while any product (active
    /// or not) references it.
    pub fn delete_category(&self, id: &str) -> Result<bool, CatalogError> {
        if self.referenced_by_products("category_id", id)? {
            return Err(CatalogError::Constraint(format!(
                "category {id} is referenced by existing products"
            )));
        }
        let conn = self.db.conn();
        let changed = conn.execute(
            "DELETE FROM categories WHERE id = ?1",
            rusqlite::params![id],
        )?;
        Ok(changed > 0)
    }

    // ── Brands ──────────────────────────────────────────────────────

    pub fn list_brands(&self) -> Result<Vec<Brand>, CatalogError> {
        let conn = self.db.conn();
        let mut stmt =
            conn.prepare("SELECT id, name, description, created_at FROM brands ORDER BY name")?;
        let rows = stmt.query_map([], |row| {
            Ok(Brand {
                id: row.get(0)?,
                name: row.get(1)?,
                description: row.get(2)?,
                created_at: parse_datetime(&row.get::<_, String>(3)?),
            })
        })?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    pub fn create_brand(
        &self,
        name: &str,
        description: Option<&str>,
    ) -> Result<String, CatalogError> {
        let id = Uuid::new_v4().to_string();
        let conn = self.db.conn();
        conn.execute(
            "INSERT INTO brands (id, name, description, created_at) VALUES (?1, ?2, ?3, ?4)",
            rusqlite::params![id, name, description, Utc::now().to_rfc3339()],
        )
        .map_err(|e| match e {
            rusqlite::Error::SqliteFailure(err, _)
                if err.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                CatalogError::Constraint(format!("brand name '{name}' already exists"))
            }
            other => other.into(),
        })?;
        Ok(id)
    }

    /// Delete a brand. Same RESTRICT policy as categories.
    pub fn delete_brand(&self, id: &str) -> Result<bool, CatalogError> {
        if self.referenced_by_products("brand_id", id)? {
            return Err(CatalogError::Constraint(format!(
                "brand {id} is referenced by existing products"
            )));
        }
        let conn = self.db.conn();
        let changed =
            conn.execute("DELETE FROM brands WHERE id = ?1", rusqlite::params![id])?;
        Ok(changed > 0)
    }

    fn referenced_by_products(&self, column: &str, id: &str) -> Result<bool, CatalogError> {
        let conn = self.db.conn();
        let count: i64 = conn.query_row(
            &format!("SELECT COUNT(*) FROM products WHERE {column} = ?1"),
            rusqlite::params![id],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    // ── Message log ─────────────────────────────────────────────────

    /// Append one processed exchange to the log. Returns the row id.
    pub fn record_exchange(
        &self,
        text: &str,
        origin: &str,
        user_id: &str,
        response: &str,
        escalated: bool,
    ) -> Result<String, CatalogError> {
        let id = Uuid::new_v4().to_string();
        let conn = self.db.conn();
        conn.execute(
            "INSERT INTO message_log (id, text, origin, user_id, response, escalated, processed_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            rusqlite::params![
                id,
                text,
                origin,
                user_id,
                response,
                escalated,
                Utc::now().to_rfc3339(),
            ],
        )?;
        Ok(id)
    }

    /// Most recent exchanges, newest first.
    pub fn recent_exchanges(&self, limit: usize) -> Result<Vec<LoggedExchange>, CatalogError> {
        let conn = self.db.conn();
        let mut stmt = conn.prepare(
            "SELECT id, text, origin, user_id, response, escalated, processed_at
             FROM message_log ORDER BY processed_at DESC LIMIT ?1",
        )?;
        let rows = stmt.query_map(rusqlite::params![limit as i64], |row| {
            Ok(LoggedExchange {
                id: row.get(0)?,
                text: row.get(1)?,
                origin: row.get(2)?,
                user_id: row.get(3)?,
                response: row.get(4)?,
                escalated: row.get(5)?,
                processed_at: parse_datetime(&row.get::<_, String>(6)?),
            })
        })?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    // ── Seeds ───────────────────────────────────────────────────────

    /// Insert the default categories and brands if the tables are empty.
    pub fn seed_defaults(&self) -> Result<(), CatalogError> {
        if !self.list_categories()?.is_empty() || !self.list_brands()?.is_empty() {
            return Ok(());
        }
        for (name, description) in [
            ("Celulares e Smartphones", Some("Dispositivos móveis")),
            ("Tablets", Some("Tablets e iPads")),
            ("Acessórios", Some("Capas, fones, carregadores")),
            ("Notebooks", Some("Computadores portáteis")),
            ("Smartwatches", Some("Relógios inteligentes")),
        ] {
            self.create_category(name, description)?;
        }
        for name in [
            "Apple", "Samsung", "Xiaomi", "Motorola", "LG", "Google", "OnePlus",
        ] {
            self.create_brand(name, None)?;
        }
        info!("Seeded default categories and brands");
        Ok(())
    }
}

// ── Helpers ─────────────────────────────────────────────────────────

fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| DateTime::<Utc>::MIN_UTC)
}

fn parse_price(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap_or_default()
}

fn row_to_product(row: &rusqlite::Row<'_>) -> Result<Product, rusqlite::Error> {
    let price_str: String = row.get(6)?;
    let condition_str: String = row.get(9)?;
    let created_str: String = row.get(12)?;

    Ok(Product {
        id: row.get(0)?,
        name: row.get(1)?,
        category_id: row.get(2)?,
        brand_id: row.get(3)?,
        category_name: row.get(4)?,
        brand_name: row.get(5)?,
        price: parse_price(&price_str),
        description: row.get(7)?,
        specs: row.get(8)?,
        condition: Condition::from_str_lossy(&condition_str),
        stock: row.get(10)?,
        active: row.get::<_, i64>(11)? != 0,
        created_at: parse_datetime(&created_str),
    })
}

// ── Tests ───────────────────────────────────────────────────────────
