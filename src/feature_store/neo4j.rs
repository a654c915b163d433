//! Neo4j graph backend over the HTTP transactional endpoint

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info};

use super::{GraphBackend, TransferFilter, TransferRecord};
use crate::config::GraphConfig;
use crate::error::BackendError;
use crate::types::{AccountFeatures, AccountRecord};

const ACCOUNT_QUERY: &str = "MATCH (a:Account {id: $id}) \
     RETURN a.pagerank AS pagerank, a.degree AS degree, \
            a.betweenness AS betweenness, a.community AS community";

const PING_QUERY: &str = "RETURN 1 AS ok";

const ALL_ACCOUNTS_QUERY: &str = "MATCH (a:Account) \
     RETURN a.id AS id, a.pagerank AS pagerank, a.degree AS degree, \
            a.betweenness AS betweenness, a.community AS community";

const SAMPLE_ACCOUNTS_QUERY: &str = "MATCH (a:Account) \
     RETURN a.id AS id, a.pagerank AS pagerank, a.degree AS degree, \
            a.betweenness AS betweenness, a.community AS community \
     LIMIT $limit";

const SAMPLE_TRANSFERS_QUERY: &str = "MATCH (s:Account)-[t:TRANSFER]->(d:Account) \
     WHERE $is_fraud IS NULL OR toInteger(t.isFraud) = $is_fraud \
     RETURN s.id AS source_id, d.id AS destination_id, \
            t.amount AS amount, t.isFraud AS is_fraud \
     LIMIT $limit";

/// Graph backend reading account attributes written by the analytics job.
pub struct Neo4jBackend {
    http: reqwest::Client,
    commit_url: String,
    user: String,
    password: String,
}

impl Neo4jBackend {
    pub fn new(config: &GraphConfig) -> Result<Self, BackendError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout())
            .connect_timeout(config.timeout())
            .build()?;

        let commit_url = format!(
            "{}/db/{}/tx/commit",
            config.uri.trim_end_matches('/'),
            config.database
        );
        info!(endpoint = %commit_url, "Neo4j graph backend configured");

        Ok(Self {
            http,
            commit_url,
            user: config.user.clone(),
            password: config.password.clone(),
        })
    }

    /// Every account in the graph. Used to export a feature snapshot.
    pub async fn export_accounts(&self) -> Result<Vec<AccountRecord>, BackendError> {
        let result = self.run(ALL_ACCOUNTS_QUERY, json!({})).await?;
        Ok(result.records().filter_map(|r| r.account_record()).collect())
    }

    async fn run(&self, statement: &str, parameters: Value) -> Result<QueryResult, BackendError> {
        let body = json!({
            "statements": [{ "statement": statement, "parameters": parameters }]
        });

        let response = self
            .http
            .post(&self.commit_url)
            .basic_auth(&self.user, Some(&self.password))
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(BackendError::Status(status.as_u16()));
        }

        let commit: CommitResponse = response.json().await?;
        if let Some(err) = commit.errors.into_iter().next() {
            return Err(BackendError::Query {
                code: err.code,
                message: err.message,
            });
        }

        commit
            .results
            .into_iter()
            .next()
            .ok_or_else(|| BackendError::Decode("no statement result".to_string()))
    }
}

#[async_trait]
impl GraphBackend for Neo4jBackend {
    async fn get_attributes(
        &self,
        account_id: &str,
    ) -> Result<Option<AccountFeatures>, BackendError> {
        let result = self.run(ACCOUNT_QUERY, json!({ "id": account_id })).await?;
        let features = result.records().next().map(|r| r.account_features());
        debug!(account_id = %account_id, found = features.is_some(), "Neo4j account lookup");
        Ok(features)
    }

    async fn ping(&self) -> Result<(), BackendError> {
        self.run(PING_QUERY, json!({})).await.map(|_| ())
    }

    async fn sample_accounts(&self, limit: usize) -> Result<Vec<AccountRecord>, BackendError> {
        let result = self.run(SAMPLE_ACCOUNTS_QUERY, json!({ "limit": limit })).await?;
        Ok(result.records().filter_map(|r| r.account_record()).collect())
    }

    async fn sample_transfers(
        &self,
        filter: TransferFilter,
        limit: usize,
    ) -> Result<Vec<TransferRecord>, BackendError> {
        let is_fraud = match filter {
            TransferFilter::All => Value::Null,
            TransferFilter::FraudOnly => json!(1),
            TransferFilter::NormalOnly => json!(0),
        };
        let result = self
            .run(
                SAMPLE_TRANSFERS_QUERY,
                json!({ "is_fraud": is_fraud, "limit": limit }),
            )
            .await?;
        Ok(result.records().filter_map(|r| r.transfer_record()).collect())
    }
}

#[derive(Debug, Deserialize)]
struct CommitResponse {
    #[serde(default)]
    results: Vec<QueryResult>,
    #[serde(default)]
    errors: Vec<Neo4jError>,
}

#[derive(Debug, Deserialize)]
struct Neo4jError {
    code: String,
    message: String,
}

#[derive(Debug, Deserialize)]
struct QueryResult {
    columns: Vec<String>,
    #[serde(default)]
    data: Vec<RowData>,
}

#[derive(Debug, Deserialize)]
struct RowData {
    row: Vec<Value>,
}

impl QueryResult {
    fn records(&self) -> impl Iterator<Item = Record<'_>> {
        self.data.iter().map(move |d| Record {
            columns: &self.columns,
            row: &d.row,
        })
    }
}

/// One result row addressed by column name. Missing columns and nulls read as `None`.
struct Record<'a> {
    columns: &'a [String],
    row: &'a [Value],
}

impl Record<'_> {
    fn get(&self, column: &str) -> Option<&Value> {
        self.columns
            .iter()
            .position(|c| c == column)
            .and_then(|idx| self.row.get(idx))
            .filter(|v| !v.is_null())
    }

    fn f64(&self, column: &str) -> Option<f64> {
        self.get(column).and_then(Value::as_f64)
    }

    // Graph algorithms may write integral properties as floats.
    fn i64(&self, column: &str) -> Option<i64> {
        let value = self.get(column)?;
        value
            .as_i64()
            .or_else(|| value.as_f64().filter(|v| v.is_finite()).map(|v| v as i64))
    }

    fn string(&self, column: &str) -> Option<String> {
        match self.get(column)? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    fn flag(&self, column: &str) -> bool {
        match self.get(column) {
            Some(Value::Bool(b)) => *b,
            Some(Value::Number(n)) => n.as_f64().map(|v| v != 0.0).unwrap_or(false),
            Some(Value::String(s)) => matches!(s.as_str(), "1" | "true" | "True"),
            _ => false,
        }
    }

    fn account_features(&self) -> AccountFeatures {
        AccountFeatures::from_raw(
            self.f64("pagerank"),
            self.i64("degree"),
            self.f64("betweenness"),
            self.i64("community"),
        )
    }

    fn account_record(&self) -> Option<AccountRecord> {
        Some(AccountRecord {
            id: self.string("id")?,
            features: self.account_features(),
        })
    }

    fn transfer_record(&self) -> Option<TransferRecord> {
        Some(TransferRecord {
            source_id: self.string("source_id")?,
            destination_id: self.string("destination_id")?,
            amount: self.f64("amount")?,
            is_fraud: self.flag("is_fraud"),
        })
    }
}
