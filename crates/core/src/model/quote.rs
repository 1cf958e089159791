use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuoteError {
    #[error("quote text cannot be empty")]
    EmptyQuote,
}

/// Decorative quote shown on dashboards; unrelated to progress or grading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Quote {
    pub id: i64,
    pub quote: String,
    pub author: Option<String>,
}

impl Quote {
    /// Creates a quote, trimming the text and dropping a blank author.
    ///
    /// # Errors
    ///
    /// Returns `QuoteError::EmptyQuote` for blank text.
    pub fn new(id: i64, quote: impl Into<String>, author: Option<String>) -> Result<Self, QuoteError> {
        let quote = quote.into().trim().to_owned();
        if quote.is_empty() {
            return Err(QuoteError::EmptyQuote);
        }
        let author = author.map(|a| a.trim().to_owned()).filter(|a| !a.is_empty());
        Ok(Self { id, quote, author })
    }
}
