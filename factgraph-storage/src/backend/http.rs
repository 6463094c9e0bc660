// Copyright 2025 Factgraph Contributors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! HTTP graph backend.
//!
//! Speaks the graph database's transaction-commit endpoint
//! (`POST {uri}/db/{database}/tx/commit`) with parameterized Cypher.
//! Entities are `:Entity {name}` nodes, facts are `:REL` relationships
//! carrying id, predicate, timestamps, provenance, and version. Every call
//! shares one client with a bounded timeout; timeouts and transport errors
//! map to `BackendUnavailable`, server-reported statement errors to
//! `WriteFailed`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use factgraph_core::{BackendConfig, Fact, FactStoreError, Result};

use super::GraphBackend;

const RETURN_FIELDS: &str = "s.name AS subject, r.predicate AS predicate, o.name AS object, \
     r.id AS id, r.created_at AS created_at, r.src AS src, \
     r.original_message AS original_message, r.version AS version";

/// Production [`GraphBackend`] over the HTTP transaction API.
pub struct HttpGraphBackend {
    client: reqwest::Client,
    commit_url: String,
    username: String,
    password: String,
}

#[derive(Debug, Deserialize)]
struct TxResponse {
    #[serde(default)]
    results: Vec<TxResult>,
    #[serde(default)]
    errors: Vec<TxError>,
}

#[derive(Debug, Deserialize)]
struct TxResult {
    #[serde(default)]
    data: Vec<TxRow>,
}

#[derive(Debug, Deserialize)]
struct TxRow {
    #[serde(default)]
    row: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct TxError {
    #[serde(default)]
    code: String,
    #[serde(default)]
    message: String,
}

impl HttpGraphBackend {
    pub fn new(config: &BackendConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| FactStoreError::BackendUnavailable(e.to_string()))?;
        let commit_url = format!(
            "{}/db/{}/tx/commit",
            config.uri.trim_end_matches('/'),
            config.database
        );
        Ok(Self {
            client,
            commit_url,
            username: config.username.clone(),
            password: config.password.clone(),
        })
    }

    /// Run one Cypher statement and return the decoded response.
    async fn execute(&self, statement: &str, parameters: Value) -> Result<TxResponse> {
        let payload = json!({
            "statements": [{ "statement": statement, "parameters": parameters }]
        });
        let response = self
            .client
            .post(&self.commit_url)
            .basic_auth(&self.username, Some(&self.password))
            .json(&payload)
            .send()
            .await
            .map_err(|e| FactStoreError::BackendUnavailable(e.to_string()))?;

        let status = response.status();
        if status.is_server_error() {
            return Err(FactStoreError::BackendUnavailable(format!(
                "server error: {status}"
            )));
        }
        if !status.is_success() {
            return Err(FactStoreError::WriteFailed(format!(
                "unexpected status: {status}"
            )));
        }

        let decoded: TxResponse = response
            .json()
            .await
            .map_err(|e| FactStoreError::WriteFailed(format!("undecodable response: {e}")))?;
        if !decoded.errors.is_empty() {
            let summary = decoded
                .errors
                .iter()
                .map(|e| format!("{}: {}", e.code, e.message))
                .collect::<Vec<_>>()
                .join("; ");
            return Err(FactStoreError::WriteFailed(summary));
        }
        Ok(decoded)
    }

    async fn fetch_facts(&self, statement: &str, parameters: Value) -> Result<Vec<Fact>> {
        let response = self.execute(statement, parameters).await?;
        Ok(decode_facts(&response))
    }

    async fn fetch_count(&self, statement: &str, parameters: Value) -> Result<u64> {
        let response = self.execute(statement, parameters).await?;
        Ok(decode_count(&response))
    }
}

fn fact_parameters(fact: &Fact) -> Value {
    json!({
        "subject": fact.subject,
        "object": fact.object,
        "id": fact.id.to_string(),
        "predicate": fact.predicate,
        "created_at": fact.created_at.to_rfc3339(),
        "src": fact.source,
        "original_message": fact.original_message,
        "version": fact.version,
    })
}

/// Decode one `RETURN_FIELDS` row into a fact. Rows with a missing triple or
/// id are dropped; missing provenance and version fall back to the same
/// defaults the durable store has historically tolerated.
fn fact_from_row(row: &[Value]) -> Option<Fact> {
    let subject = row.first()?.as_str()?.to_string();
    let predicate = row.get(1)?.as_str()?.to_string();
    let object = row.get(2)?.as_str()?.to_string();
    let id = Uuid::parse_str(row.get(3)?.as_str()?).ok()?;
    let created_at = row
        .get(4)
        .and_then(Value::as_str)
        .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
        .map(|ts| ts.with_timezone(&Utc))
        .unwrap_or_else(Utc::now);
    let source = row
        .get(5)
        .and_then(Value::as_str)
        .unwrap_or("unknown")
        .to_string();
    let original_message = row
        .get(6)
        .and_then(Value::as_str)
        .map(str::to_string);
    let version = row.get(7).and_then(Value::as_u64).unwrap_or(1) as u32;

    Some(Fact {
        id,
        subject,
        predicate,
        object,
        version,
        created_at,
        source,
        original_message,
    })
}

fn decode_facts(response: &TxResponse) -> Vec<Fact> {
    response
        .results
        .iter()
        .flat_map(|result| result.data.iter())
        .filter_map(|row| {
            let fact = fact_from_row(&row.row);
            if fact.is_none() {
                tracing::warn!("dropping undecodable backend row");
            }
            fact
        })
        .collect()
}

fn decode_count(response: &TxResponse) -> u64 {
    response
        .results
        .first()
        .and_then(|result| result.data.first())
        .and_then(|row| row.row.first())
        .and_then(Value::as_u64)
        .unwrap_or(0)
}

fn rows_statement(match_clause: &str, tail: &str) -> String {
    format!("MATCH {match_clause} RETURN {RETURN_FIELDS} {tail}")
}

#[async_trait]
impl GraphBackend for HttpGraphBackend {
    async fn ping(&self) -> Result<()> {
        self.execute("RETURN 1", json!({})).await?;
        Ok(())
    }

    async fn count_matching(&self, subject: &str, predicate: &str, object: &str) -> Result<u64> {
        self.fetch_count(
            "MATCH (s:Entity {name: $subject})-[r:REL {predicate: $predicate}]->\
             (o:Entity {name: $object}) RETURN count(r) AS count",
            json!({ "subject": subject, "predicate": predicate, "object": object }),
        )
        .await
    }

    async fn create_fact(&self, fact: &Fact) -> Result<()> {
        self.execute(
            "MERGE (s:Entity {name: $subject}) MERGE (o:Entity {name: $object}) \
             CREATE (s)-[r:REL {id: $id, predicate: $predicate, created_at: $created_at, \
             src: $src, original_message: $original_message, version: $version}]->(o)",
            fact_parameters(fact),
        )
        .await?;
        Ok(())
    }

    async fn replace_fact(&self, old_predicate: &str, successor: &Fact) -> Result<u64> {
        let mut parameters = fact_parameters(successor);
        parameters["old_predicate"] = json!(old_predicate);
        self.fetch_count(
            "MATCH (s:Entity {name: $subject})-[r:REL {predicate: $old_predicate, id: $id}]->\
             (o:Entity {name: $object}) DELETE r WITH s, o \
             CREATE (s)-[new_r:REL {id: $id, predicate: $predicate, created_at: $created_at, \
             src: $src, original_message: $original_message, version: $version}]->(o) \
             RETURN count(new_r) AS count",
            parameters,
        )
        .await
    }

    async fn delete_matching(&self, subject: &str, predicate: &str, object: &str) -> Result<u64> {
        self.fetch_count(
            "MATCH (s:Entity {name: $subject})-[r:REL {predicate: $predicate}]->\
             (o:Entity {name: $object}) DELETE r RETURN count(r) AS count",
            json!({ "subject": subject, "predicate": predicate, "object": object }),
        )
        .await
    }

    async fn clear(&self) -> Result<()> {
        self.execute("MATCH (n) DETACH DELETE n", json!({})).await?;
        Ok(())
    }

    async fn fetch_page(&self, skip: usize, limit: usize) -> Result<Vec<Fact>> {
        self.fetch_facts(
            &rows_statement("(s:Entity)-[r:REL]->(o:Entity)", "SKIP $skip LIMIT $limit"),
            json!({ "skip": skip, "limit": limit }),
        )
        .await
    }

    async fn facts_by_subject(&self, entity: &str) -> Result<Vec<Fact>> {
        self.fetch_facts(
            &rows_statement(
                "(s:Entity {name: $entity})-[r:REL]->(o:Entity)",
                "ORDER BY r.version DESC LIMIT 50",
            ),
            json!({ "entity": entity }),
        )
        .await
    }

    async fn facts_by_predicate(&self, predicate: &str) -> Result<Vec<Fact>> {
        self.fetch_facts(
            &rows_statement(
                "(s:Entity)-[r:REL {predicate: $predicate}]->(o:Entity)",
                "ORDER BY r.version DESC",
            ),
            json!({ "predicate": predicate }),
        )
        .await
    }

    async fn facts_by_object(&self, entity: &str) -> Result<Vec<Fact>> {
        self.fetch_facts(
            &rows_statement(
                "(s:Entity)-[r:REL]->(o:Entity {name: $entity})",
                "ORDER BY r.version DESC",
            ),
            json!({ "entity": entity }),
        )
        .await
    }

    async fn all_facts(&self) -> Result<Vec<Fact>> {
        self.fetch_facts(
            &rows_statement("(s:Entity)-[r:REL]->(o:Entity)", "ORDER BY r.version DESC"),
            json!({}),
        )
        .await
    }

    async fn find_by_id(&self, subject: &str, object: &str, id: Uuid) -> Result<Option<Fact>> {
        let facts = self
            .fetch_facts(
                &rows_statement(
                    "(s:Entity {name: $subject})-[r:REL {id: $id}]->(o:Entity {name: $object})",
                    "LIMIT 1",
                ),
                json!({ "subject": subject, "object": object, "id": id.to_string() }),
            )
            .await?;
        Ok(facts.into_iter().next())
    }
}
