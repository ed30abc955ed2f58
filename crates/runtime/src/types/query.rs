use serde::{Deserialize, Serialize};

use super::error::ReflectionError;

/// A user question. Never empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "QueryBody", into = "QueryBody")]
pub struct Query {
    text: String,
}

impl Query {
    /// Create a query, rejecting empty or whitespace-only text.
    pub fn new(text: impl Into<String>) -> Result<Self, ReflectionError> {
        let text = text.into();
        if text.trim().is_empty() {
            return Err(ReflectionError::InvalidQuery(
                "query must not be empty".to_string(),
            ));
        }
        Ok(Self { text })
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }
}

/// Wire shape: `{ "query": "..." }`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryBody {
    pub query: String,
}

impl TryFrom<QueryBody> for Query {
    type Error = ReflectionError;

    fn try_from(body: QueryBody) -> Result<Self, Self::Error> {
        Query::new(body.query)
    }
}

impl From<Query> for QueryBody {
    fn from(query: Query) -> Self {
        QueryBody { query: query.text }
    }
}
