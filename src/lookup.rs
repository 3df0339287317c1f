//! Fixed-query publication lookup over an opaque query engine.
//!
//! The annex never plans or executes graph queries itself: the engine is a
//! host collaborator behind `QueryEngine`. `MemoryGraph` is the bundled
//! reference engine for standalone runs and tests; it answers only the one
//! publication statement and applies whole-string regex matching to the
//! `doi` parameter, the way Cypher's `=~` operator reads.

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use thiserror::Error;

/// The one statement the lookup endpoint issues. Engines treat the text as
/// opaque; the constant only exists so adapter and engine agree on it.
pub const PUBLICATION_LOOKUP: &str =
    "MATCH (n:publication) WHERE n.doi =~ $doi RETURN n.key AS key, n.title AS title";

#[derive(Debug, Error)]
pub enum QueryError {
    /// The engine did not recognise the statement.
    #[error("{0}")]
    Syntax(String),
    /// The statement failed while running.
    #[error("{0}")]
    Execution(String),
}

/// One result row, positionally aligned with `ResultStream::columns`.
pub type Row = Vec<Value>;

/// Column names plus a lazily-produced row stream. Rows may fail
/// individually; draining stops at the first fault.
pub struct ResultStream {
    pub columns: Vec<String>,
    pub rows: Box<dyn Iterator<Item = Result<Row, QueryError>> + Send>,
}

pub trait QueryEngine: Send + Sync {
    fn execute(&self, query: &str, params: &Map<String, Value>) -> Result<ResultStream, QueryError>;
}

/// One publication node as seeded from `publications.json` or the demo set.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Publication {
    pub key: String,
    pub title: String,
    pub doi: String,
}

/// In-memory reference engine over a fixed publication list.
pub struct MemoryGraph {
    publications: Vec<Publication>,
}

impl MemoryGraph {
    pub fn new(publications: Vec<Publication>) -> Self {
        Self { publications }
    }

    /// Built-in dataset for first runs without a publications file.
    pub fn demo() -> Self {
        Self::new(vec![
            Publication {
                key: "publication/citnet-2019".to_string(),
                title: "Graph connectivity in large citation networks".to_string(),
                doi: "10.1000/annex.1".to_string(),
            },
            Publication {
                key: "publication/dedup-2020".to_string(),
                title: "Deduplicating scholarly identifiers at scale".to_string(),
                doi: "10.1000/annex.2".to_string(),
            },
            Publication {
                key: "publication/switchboard-2015".to_string(),
                title: "A survey of research data switchboards".to_string(),
                doi: "10.5555/annex.3".to_string(),
            },
        ])
    }

    pub fn len(&self) -> usize {
        self.publications.len()
    }

    pub fn is_empty(&self) -> bool {
        self.publications.is_empty()
    }
}

impl QueryEngine for MemoryGraph {
    fn execute(&self, query: &str, params: &Map<String, Value>) -> Result<ResultStream, QueryError> {
        if query.trim() != PUBLICATION_LOOKUP {
            return Err(QueryError::Syntax(format!("Unrecognised query: {}", query)));
        }
        let Some(doi) = params.get("doi").and_then(|v| v.as_str()) else {
            return Err(QueryError::Execution("Expected parameter(s): doi".to_string()));
        };
        // `=~` matches the whole property value; anchor accordingly.
        let pattern = Regex::new(&format!("^(?:{})$", doi))
            .map_err(|e| QueryError::Execution(format!("Invalid regular expression: {}", e)))?;
        let rows: Vec<Result<Row, QueryError>> = self
            .publications
            .iter()
            .filter(|p| pattern.is_match(&p.doi))
            .map(|p| Ok(vec![json!(p.key), json!(p.title)]))
            .collect();
        Ok(ResultStream {
            columns: vec!["key".to_string(), "title".to_string()],
            rows: Box::new(rows.into_iter()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doi_params(doi: &str) -> Map<String, Value> {
        let mut params = Map::new();
        params.insert("doi".to_string(), json!(doi));
        params
    }

    fn drain(stream: ResultStream) -> Vec<Row> {
        stream.rows.map(|r| r.expect("row")).collect()
    }

    #[test]
    fn unknown_statement_is_a_syntax_fault() {
        let engine = MemoryGraph::demo();
        let err = engine.execute("MATCH (n) RETURN n", &doi_params("x")).err().unwrap();
        assert!(matches!(err, QueryError::Syntax(_)));
    }

    #[test]
    fn missing_doi_parameter_is_an_execution_fault() {
        let engine = MemoryGraph::demo();
        let err = engine.execute(PUBLICATION_LOOKUP, &Map::new()).err().unwrap();
        match err {
            QueryError::Execution(msg) => assert_eq!(msg, "Expected parameter(s): doi"),
            other => panic!("unexpected fault: {other:?}"),
        }
    }

    #[test]
    fn exact_doi_matches_one_publication() {
        let engine = MemoryGraph::demo();
        let stream = engine.execute(PUBLICATION_LOOKUP, &doi_params("10.1000/annex.1")).unwrap();
        assert_eq!(stream.columns, vec!["key", "title"]);
        let rows = drain(stream);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0][0], "publication/citnet-2019");
        assert_eq!(rows[0][1], "Graph connectivity in large citation networks");
    }

    #[test]
    fn matching_is_anchored_to_the_whole_doi() {
        let engine = MemoryGraph::demo();
        // A bare prefix must not match any of the demo DOIs.
        let stream = engine.execute(PUBLICATION_LOOKUP, &doi_params("10.1000/annex")).unwrap();
        assert!(drain(stream).is_empty());
    }

    #[test]
    fn regex_patterns_match_families() {
        let engine = MemoryGraph::demo();
        let stream = engine
            .execute(PUBLICATION_LOOKUP, &doi_params(r"10\.1000/annex\..*"))
            .unwrap();
        assert_eq!(drain(stream).len(), 2);
    }

    #[test]
    fn invalid_pattern_is_an_execution_fault() {
        let engine = MemoryGraph::demo();
        let err = engine.execute(PUBLICATION_LOOKUP, &doi_params("(")).err().unwrap();
        assert!(matches!(err, QueryError::Execution(_)));
    }
}
