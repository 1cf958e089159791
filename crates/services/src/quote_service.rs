use std::sync::Arc;

use rand::seq::IndexedRandom;

use lms_core::model::Quote;
use storage::repository::{NewQuoteRecord, QuoteRepository};

use crate::error::QuoteServiceError;

/// Serves decorative quotes for dashboards.
#[derive(Clone)]
pub struct QuoteService {
    quotes: Arc<dyn QuoteRepository>,
}

impl QuoteService {
    #[must_use]
    pub fn new(quotes: Arc<dyn QuoteRepository>) -> Self {
        Self { quotes }
    }

    /// Store a quote.
    ///
    /// # Errors
    ///
    /// Returns validation errors for blank text, or storage failures.
    pub async fn add_quote(
        &self,
        quote: &str,
        author: Option<String>,
    ) -> Result<Quote, QuoteServiceError> {
        let draft = Quote::new(0, quote, author)?;
        let id = self
            .quotes
            .insert_quote(NewQuoteRecord {
                quote: draft.quote.clone(),
                author: draft.author.clone(),
            })
            .await?;
        Ok(Quote { id, ..draft })
    }

    /// A random quote, or `None` when nothing is stored.
    ///
    /// # Errors
    ///
    /// Returns `QuoteServiceError::Storage` on repository failures.
    pub async fn random_quote(&self) -> Result<Option<Quote>, QuoteServiceError> {
        let quotes = self.quotes.list_quotes().await?;
        Ok(quotes.choose(&mut rand::rng()).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use storage::repository::InMemoryRepository;

    #[tokio::test]
    async fn random_quote_on_empty_store_is_none() {
        let service = QuoteService::new(Arc::new(InMemoryRepository::new()));
        assert_eq!(service.random_quote().await.unwrap(), None);
    }

    #[tokio::test]
    async fn random_quote_draws_from_stored_set() {
        let service = QuoteService::new(Arc::new(InMemoryRepository::new()));
        service
            .add_quote("Practice beats talent.", Some("Anonymous".into()))
            .await
            .unwrap();

        let quote = service.random_quote().await.unwrap().unwrap();
        assert_eq!(quote.quote, "Practice beats talent.");
        assert_eq!(quote.author.as_deref(), Some("Anonymous"));
    }
}
