use lms_core::model::Quote;

use super::SqliteRepository;
use super::mapping::{map_quote_row, read_err};
use crate::repository::{NewQuoteRecord, QuoteRepository, StorageError};

#[async_trait::async_trait]
impl QuoteRepository for SqliteRepository {
    async fn insert_quote(&self, quote: NewQuoteRecord) -> Result<i64, StorageError> {
        let res = sqlx::query("INSERT INTO quotes (quote, author) VALUES (?1, ?2)")
            .bind(quote.quote)
            .bind(quote.author)
            .execute(&self.pool)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(res.last_insert_rowid())
    }

    async fn list_quotes(&self) -> Result<Vec<Quote>, StorageError> {
        let rows = sqlx::query("SELECT id, quote, author FROM quotes ORDER BY id ASC")
            .fetch_all(&self.pool)
            .await
            .map_err(read_err)?;
        rows.iter().map(map_quote_row).collect()
    }
}
