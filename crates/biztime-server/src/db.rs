use std::str::FromStr;

use sqlx::Row;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use thiserror::Error;

use biztime_core::model::*;
use biztime_core::shape::{PaymentChange, group_industry_companies};

#[derive(Debug, Error)]
pub enum DbError {
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),
    #[error("not found")]
    NotFound,
}

/// Outcome of linking a company to an industry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Association {
    Added,
    MissingCompany,
    MissingIndustry,
}

const INVOICE_COLUMNS: &str = "id, comp_code, amt, paid, add_date, paid_date";

#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    pub async fn new(url: &str, max_connections: u32) -> Result<Self, DbError> {
        let options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await?;
        let db = Self { pool };
        db.ensure_schema().await?;
        Ok(db)
    }

    async fn ensure_schema(&self) -> Result<(), DbError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS companies (
                code TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                description TEXT NOT NULL
            )",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS invoices (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                comp_code TEXT NOT NULL REFERENCES companies(code) ON DELETE CASCADE,
                amt REAL NOT NULL,
                paid BOOLEAN NOT NULL DEFAULT 0,
                add_date TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
                paid_date TEXT
            )",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS industries (
                code TEXT PRIMARY KEY,
                industry TEXT NOT NULL
            )",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS industry_company (
                industry_code TEXT NOT NULL REFERENCES industries(code) ON DELETE CASCADE,
                company_code TEXT NOT NULL REFERENCES companies(code) ON DELETE CASCADE,
                PRIMARY KEY (industry_code, company_code)
            )",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    // -----------------------------------------------------------------------
    // Companies
    // -----------------------------------------------------------------------

    pub async fn list_companies(&self) -> Result<Vec<Company>, DbError> {
        let rows = sqlx::query("SELECT code, name, description FROM companies ORDER BY code")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.iter().map(row_to_company).collect())
    }

    pub async fn get_company(&self, code: &str) -> Result<Company, DbError> {
        let row = sqlx::query("SELECT code, name, description FROM companies WHERE code = ?")
            .bind(code)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(DbError::NotFound)?;
        Ok(row_to_company(&row))
    }

    /// Loads a company with its invoices and the names of its industries.
    pub async fn company_detail(&self, code: &str) -> Result<CompanyDetail, DbError> {
        let company = self.get_company(code).await?;

        let invoices: Vec<Invoice> = sqlx::query(&format!(
            "SELECT {INVOICE_COLUMNS} FROM invoices WHERE comp_code = ? ORDER BY id"
        ))
        .bind(code)
        .fetch_all(&self.pool)
        .await?
        .iter()
        .map(row_to_invoice)
        .collect();

        let industries = sqlx::query_scalar::<_, String>(
            "SELECT i.industry
             FROM industry_company AS ic
             JOIN industries AS i ON i.code = ic.industry_code
             WHERE ic.company_code = ?
             ORDER BY i.industry",
        )
        .bind(code)
        .fetch_all(&self.pool)
        .await?;

        Ok(CompanyDetail {
            company,
            invoices,
            industries,
        })
    }

    pub async fn create_company(
        &self,
        code: &str,
        name: &str,
        description: &str,
    ) -> Result<Company, DbError> {
        let row = sqlx::query(
            "INSERT INTO companies (code, name, description) VALUES (?, ?, ?)
             RETURNING code, name, description",
        )
        .bind(code)
        .bind(name)
        .bind(description)
        .fetch_one(&self.pool)
        .await?;
        Ok(row_to_company(&row))
    }

    pub async fn update_company(
        &self,
        code: &str,
        name: &str,
        description: &str,
    ) -> Result<Company, DbError> {
        let row = sqlx::query(
            "UPDATE companies SET name = ?, description = ? WHERE code = ?
             RETURNING code, name, description",
        )
        .bind(name)
        .bind(description)
        .bind(code)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(DbError::NotFound)?;
        Ok(row_to_company(&row))
    }

    pub async fn delete_company(&self, code: &str) -> Result<(), DbError> {
        let result = sqlx::query("DELETE FROM companies WHERE code = ?")
            .bind(code)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(DbError::NotFound);
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Invoices
    // -----------------------------------------------------------------------

    pub async fn list_invoices(&self) -> Result<Vec<Invoice>, DbError> {
        let rows = sqlx::query(&format!("SELECT {INVOICE_COLUMNS} FROM invoices ORDER BY id"))
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.iter().map(row_to_invoice).collect())
    }

    /// Loads an invoice joined against the company it is billed to.
    pub async fn invoice_detail(&self, id: i64) -> Result<InvoiceDetail, DbError> {
        let row = sqlx::query(
            "SELECT inv.id, inv.comp_code, inv.amt, inv.paid, inv.add_date, inv.paid_date,
                    c.code, c.name, c.description
             FROM invoices AS inv
             JOIN companies AS c ON inv.comp_code = c.code
             WHERE inv.id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(DbError::NotFound)?;

        Ok(InvoiceDetail {
            invoice: row_to_invoice(&row),
            company: row_to_company(&row),
        })
    }

    /// Inserts an unpaid invoice; `comp_code` must name an existing company
    /// or the foreign key rejects the row.
    pub async fn create_invoice(&self, comp_code: &str, amt: f64) -> Result<Invoice, DbError> {
        let row = sqlx::query(&format!(
            "INSERT INTO invoices (comp_code, amt) VALUES (?, ?) RETURNING {INVOICE_COLUMNS}"
        ))
        .bind(comp_code)
        .bind(amt)
        .fetch_one(&self.pool)
        .await?;
        Ok(row_to_invoice(&row))
    }

    pub async fn update_invoice(
        &self,
        id: i64,
        amt: f64,
        payment: &PaymentChange,
    ) -> Result<Invoice, DbError> {
        let row = sqlx::query(&format!(
            "UPDATE invoices SET amt = ?, paid = ?, paid_date = ? WHERE id = ?
             RETURNING {INVOICE_COLUMNS}"
        ))
        .bind(amt)
        .bind(payment.paid)
        .bind(payment.paid_date.as_deref())
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(DbError::NotFound)?;
        Ok(row_to_invoice(&row))
    }

    pub async fn delete_invoice(&self, id: i64) -> Result<(), DbError> {
        let result = sqlx::query("DELETE FROM invoices WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(DbError::NotFound);
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Industries
    // -----------------------------------------------------------------------

    pub async fn create_industry(&self, code: &str, industry: &str) -> Result<Industry, DbError> {
        let row = sqlx::query(
            "INSERT INTO industries (code, industry) VALUES (?, ?) RETURNING code, industry",
        )
        .bind(code)
        .bind(industry)
        .fetch_one(&self.pool)
        .await?;
        Ok(Industry {
            code: row.get("code"),
            industry: row.get("industry"),
        })
    }

    /// Links a company to an industry. Both existence checks and the insert
    /// share one transaction, which is committed before returning `Added`.
    /// The write lock is taken at `BEGIN` so concurrent callers queue on the
    /// busy timeout instead of failing a read-to-write lock upgrade.
    pub async fn associate(
        &self,
        company_code: &str,
        industry_code: &str,
    ) -> Result<Association, DbError> {
        let mut tx = self.pool.begin_with("BEGIN IMMEDIATE").await?;

        let company = sqlx::query("SELECT code FROM companies WHERE code = ?")
            .bind(company_code)
            .fetch_optional(&mut *tx)
            .await?;
        if company.is_none() {
            return Ok(Association::MissingCompany);
        }

        let industry = sqlx::query("SELECT code FROM industries WHERE code = ?")
            .bind(industry_code)
            .fetch_optional(&mut *tx)
            .await?;
        if industry.is_none() {
            return Ok(Association::MissingIndustry);
        }

        sqlx::query("INSERT INTO industry_company (industry_code, company_code) VALUES (?, ?)")
            .bind(industry_code)
            .bind(company_code)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(Association::Added)
    }

    pub async fn industry_companies(&self) -> Result<IndustryCompanies, DbError> {
        let rows = sqlx::query(
            "SELECT i.code, ic.company_code
             FROM industries AS i
             LEFT JOIN industry_company AS ic ON i.code = ic.industry_code
             ORDER BY i.code, ic.company_code",
        )
        .fetch_all(&self.pool)
        .await?;

        let pairs = rows.iter().map(|row| {
            let industry: String = row.get("code");
            let company: Option<String> = row.get("company_code");
            (industry, company)
        });
        Ok(group_industry_companies(pairs))
    }
}

// ---------------------------------------------------------------------------
// Row mapping
// ---------------------------------------------------------------------------

fn row_to_company(row: &SqliteRow) -> Company {
    Company {
        code: row.get("code"),
        name: row.get("name"),
        description: row.get("description"),
    }
}

fn row_to_invoice(row: &SqliteRow) -> Invoice {
    Invoice {
        id: row.get("id"),
        comp_code: row.get("comp_code"),
        amt: row.get("amt"),
        paid: row.get("paid"),
        add_date: row.get("add_date"),
        paid_date: row.get("paid_date"),
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    async fn test_db() -> Database {
        Database::new("sqlite::memory:", 1).await.unwrap()
    }

    async fn seed_tesla(db: &Database) -> Company {
        db.create_company("tesla", "Tesla Car Inc", "Maker of Tesla Model Y")
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_company_crud() {
        let db = test_db().await;

        let c = seed_tesla(&db).await;
        assert_eq!(c.code, "tesla");

        let companies = db.list_companies().await.unwrap();
        assert_eq!(companies, vec![c.clone()]);

        let fetched = db.get_company("tesla").await.unwrap();
        assert_eq!(fetched.name, "Tesla Car Inc");

        let updated = db
            .update_company("tesla", "Tesla Inc", "Electric cars")
            .await
            .unwrap();
        assert_eq!(updated.code, "tesla");
        assert_eq!(updated.description, "Electric cars");

        db.delete_company("tesla").await.unwrap();
        assert!(matches!(db.get_company("tesla").await, Err(DbError::NotFound)));
        assert!(matches!(
            db.update_company("tesla", "x", "y").await,
            Err(DbError::NotFound)
        ));
        assert!(matches!(db.delete_company("tesla").await, Err(DbError::NotFound)));
    }

    #[tokio::test]
    async fn test_company_detail_without_invoices() {
        let db = test_db().await;
        seed_tesla(&db).await;

        let detail = db.company_detail("tesla").await.unwrap();
        assert_eq!(detail.company.name, "Tesla Car Inc");
        assert!(detail.invoices.is_empty());
        assert!(detail.industries.is_empty());

        assert!(matches!(db.company_detail("nope").await, Err(DbError::NotFound)));
    }

    #[tokio::test]
    async fn test_company_detail_collects_invoices_and_industries() {
        let db = test_db().await;
        seed_tesla(&db).await;
        db.create_invoice("tesla", 100.0).await.unwrap();
        db.create_invoice("tesla", 250.5).await.unwrap();
        db.create_industry("tech", "Technology").await.unwrap();
        db.create_industry("auto", "Automotive").await.unwrap();
        db.associate("tesla", "tech").await.unwrap();
        db.associate("tesla", "auto").await.unwrap();

        let detail = db.company_detail("tesla").await.unwrap();
        assert_eq!(detail.invoices.len(), 2);
        assert_eq!(detail.invoices[1].amt, 250.5);
        assert_eq!(detail.industries, vec!["Automotive", "Technology"]);
    }

    #[tokio::test]
    async fn test_invoice_crud() {
        let db = test_db().await;
        seed_tesla(&db).await;

        let inv = db.create_invoice("tesla", 100.0).await.unwrap();
        assert!(inv.id > 0);
        assert!(!inv.paid);
        assert!(inv.paid_date.is_none());
        assert!(!inv.add_date.is_empty());

        let detail = db.invoice_detail(inv.id).await.unwrap();
        assert_eq!(detail.invoice, inv);
        assert_eq!(detail.company.code, "tesla");

        let paid = db
            .update_invoice(inv.id, 500.0, &PaymentChange::resolve(Some(true), Utc::now()))
            .await
            .unwrap();
        assert!(paid.paid);
        assert!(paid.paid_date.is_some());

        let unpaid = db
            .update_invoice(inv.id, 500.0, &PaymentChange::resolve(None, Utc::now()))
            .await
            .unwrap();
        assert!(!unpaid.paid);
        assert!(unpaid.paid_date.is_none());

        db.delete_invoice(inv.id).await.unwrap();
        assert!(matches!(db.invoice_detail(inv.id).await, Err(DbError::NotFound)));
        assert!(matches!(db.delete_invoice(inv.id).await, Err(DbError::NotFound)));
    }

    #[tokio::test]
    async fn test_invoice_requires_existing_company() {
        let db = test_db().await;
        assert!(matches!(
            db.create_invoice("ghost", 10.0).await,
            Err(DbError::Sqlx(_))
        ));
    }

    #[tokio::test]
    async fn test_delete_company_cascades() {
        let db = test_db().await;
        seed_tesla(&db).await;
        db.create_invoice("tesla", 100.0).await.unwrap();
        db.create_industry("tech", "Technology").await.unwrap();
        db.associate("tesla", "tech").await.unwrap();

        db.delete_company("tesla").await.unwrap();
        assert!(db.list_invoices().await.unwrap().is_empty());
        assert!(db.industry_companies().await.unwrap()["tech"].is_empty());
    }

    #[tokio::test]
    async fn test_associate_checks_both_sides() {
        let db = test_db().await;
        seed_tesla(&db).await;
        db.create_industry("tech", "Technology").await.unwrap();

        assert_eq!(
            db.associate("ghost", "tech").await.unwrap(),
            Association::MissingCompany
        );
        assert_eq!(
            db.associate("tesla", "ghost").await.unwrap(),
            Association::MissingIndustry
        );
        assert_eq!(db.associate("tesla", "tech").await.unwrap(), Association::Added);

        // A rolled-back check must leave the connection usable.
        let grouped = db.industry_companies().await.unwrap();
        assert_eq!(grouped["tech"], vec!["tesla"]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_associations_all_commit() {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite:{}", dir.path().join("biztime.db").display());
        let db = Database::new(&url, 5).await.unwrap();
        db.create_industry("tech", "Technology").await.unwrap();
        for i in 0..40 {
            let code = format!("c{i}");
            db.create_company(&code, &code, "concurrent").await.unwrap();
        }

        let handles: Vec<_> = (0..40)
            .map(|i| {
                let db = db.clone();
                tokio::spawn(async move { db.associate(&format!("c{i}"), "tech").await })
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.await.unwrap().unwrap(), Association::Added);
        }
        assert_eq!(db.industry_companies().await.unwrap()["tech"].len(), 40);
    }

    #[tokio::test]
    async fn test_industry_companies_grouping() {
        let db = test_db().await;
        seed_tesla(&db).await;
        db.create_company("rivian", "Rivian", "Trucks").await.unwrap();
        db.create_industry("tech", "Technology").await.unwrap();
        db.create_industry("energy", "Energy").await.unwrap();
        db.associate("tesla", "tech").await.unwrap();
        db.associate("rivian", "tech").await.unwrap();

        let grouped = db.industry_companies().await.unwrap();
        assert_eq!(grouped.len(), 2);
        assert_eq!(grouped["tech"], vec!["rivian", "tesla"]);
        assert!(grouped["energy"].is_empty());
    }
}
