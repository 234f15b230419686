// SPDX-License-Identifier: MIT

//! Document retrieval for the blog handler

use crate::adk::error::BoxError;
use crate::adk::tool::Tool;
use async_trait::async_trait;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashSet;
use std::error::Error;
use std::path::Path;
use std::sync::Arc;

/// Number of documents returned per retrieval
pub const DEFAULT_TOP_K: usize = 2;

static RETRIEVE_SCHEMA: Lazy<Value> = Lazy::new(|| {
    json!({
        "type": "object",
        "properties": {
            "query": {
                "type": "string",
                "description": "The topic or question to look up in the blog archive"
            }
        },
        "required": ["query"]
    })
});

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Document {
    pub source: String,
    pub content: String,
}

/// Similarity search over a document corpus
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn similarity_search(&self, query: &str, k: usize) -> Result<Vec<Document>, BoxError>;
}

/// Keeps every document in memory and ranks by shared terms with the query
#[derive(Debug, Default)]
pub struct InMemoryDocumentStore {
    documents: Vec<Document>,
}

impl InMemoryDocumentStore {
    pub fn new(documents: Vec<Document>) -> Self {
        Self { documents }
    }

    /// Load every `.md` and `.txt` file directly under `dir`
    pub fn from_dir(dir: impl AsRef<Path>) -> std::io::Result<Self> {
        let mut documents = Vec::new();
        for entry in std::fs::read_dir(dir.as_ref())? {
            let path = entry?.path();
            let is_text = matches!(
                path.extension().and_then(|e| e.to_str()),
                Some("md") | Some("txt")
            );
            if !path.is_file() || !is_text {
                continue;
            }
            let content = std::fs::read_to_string(&path)?;
            documents.push(Document {
                source: path.display().to_string(),
                content,
            });
        }
        // read_dir order is platform dependent
        documents.sort_by(|a, b| a.source.cmp(&b.source));
        log::info!(
            "Loaded {} documents from {}",
            documents.len(),
            dir.as_ref().display()
        );
        Ok(Self { documents })
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

fn terms(text: &str) -> HashSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| t.chars().count() > 2)
        .map(|t| t.to_lowercase())
        .collect()
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn similarity_search(&self, query: &str, k: usize) -> Result<Vec<Document>, BoxError> {
        let query_terms = terms(query);
        let mut scored: Vec<(usize, &Document)> = self
            .documents
            .iter()
            .map(|doc| (terms(&doc.content).intersection(&query_terms).count(), doc))
            .filter(|(score, _)| *score > 0)
            .collect();

        // Stable sort keeps load order among equal scores
        scored.sort_by(|a, b| b.0.cmp(&a.0));
        Ok(scored
            .into_iter()
            .take(k)
            .map(|(_, doc)| doc.clone())
            .collect())
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RetrieveArgs {
    pub query: String,
}

/// Retrieves blog content related to a query
pub struct RetrieveTool {
    store: Arc<dyn DocumentStore>,
    top_k: usize,
}

impl RetrieveTool {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            store,
            top_k: DEFAULT_TOP_K,
        }
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }
}

/// Render retrieved documents the way the blog agent expects to read them
pub fn format_documents(documents: &[Document]) -> String {
    documents
        .iter()
        .map(|d| format!("Source: {}\nContent: {}", d.source, d.content))
        .collect::<Vec<_>>()
        .join("\n")
}

#[async_trait]
impl Tool for RetrieveTool {
    fn name(&self) -> &str {
        "retrieve"
    }

    fn description(&self) -> &str {
        "Retrieve information related to a query from the blog archive"
    }

    fn schema(&self) -> &Value {
        &RETRIEVE_SCHEMA
    }

    async fn execute(&self, input: Value) -> Result<Value, Box<dyn Error + Send + Sync>> {
        let args: RetrieveArgs = serde_json::from_value(input)?;
        log::debug!("Retrieving documents for: {}", args.query);

        let documents = self.store.similarity_search(&args.query, self.top_k).await?;
        Ok(json!({
            "content": format_documents(&documents),
            "documents": documents,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> InMemoryDocumentStore {
        InMemoryDocumentStore::new(vec![
            Document {
                source: "ai.md".into(),
                content: "Artificial intelligence in clinics and hospitals".into(),
            },
            Document {
                source: "diet.md".into(),
                content: "Healthy diet for heart patients".into(),
            },
            Document {
                source: "ai-ethics.md".into(),
                content: "Ethics of artificial intelligence in medicine".into(),
            },
        ])
    }

    #[tokio::test]
    async fn test_ranks_by_term_overlap() {
        let docs = store()
            .similarity_search("artificial intelligence in medicine", 2)
            .await
            .unwrap();

        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].source, "ai-ethics.md");
        assert_eq!(docs[1].source, "ai.md");
    }

    #[tokio::test]
    async fn test_no_overlap_returns_nothing() {
        let docs = store().similarity_search("xyzzy", 2).await.unwrap();
        assert!(docs.is_empty());
    }

    #[tokio::test]
    async fn test_retrieve_tool_formats_content() {
        let tool = RetrieveTool::new(Arc::new(store())).with_top_k(1);
        let result = tool.execute(json!({"query": "heart diet"})).await.unwrap();

        assert_eq!(
            result["content"],
            "Source: diet.md\nContent: Healthy diet for heart patients"
        );
        assert_eq!(result["documents"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn test_from_dir_loads_text_files_only() {
        let dir = std::env::temp_dir().join(format!("triage-docs-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("a.md"), "first post").unwrap();
        std::fs::write(dir.join("b.txt"), "second post").unwrap();
        std::fs::write(dir.join("c.json"), "{}").unwrap();

        let store = InMemoryDocumentStore::from_dir(&dir).unwrap();
        assert_eq!(store.len(), 2);

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
