//! CSV readers and writers for ledgers, account snapshots and training tables

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::Path;

use super::LabeledRow;
use crate::schema::FEATURE_NAMES;
use crate::types::{
    normalize_account_id, AccountFeatures, AccountRecord, LabeledTransaction, Transaction,
};

/// Ledger row in the PaySim layout. Other columns are ignored.
#[derive(Debug, Deserialize)]
struct LedgerRow {
    #[serde(rename = "nameOrig")]
    source_id: String,
    #[serde(rename = "nameDest")]
    destination_id: String,
    amount: f64,
    #[serde(rename = "isFraud")]
    is_fraud: u8,
}

/// Exported account row. Numeric columns may be empty or written as floats.
#[derive(Debug, Deserialize)]
struct SnapshotRow {
    id: String,
    pagerank: Option<f64>,
    degree: Option<f64>,
    betweenness: Option<f64>,
    community: Option<f64>,
}

/// Read a labeled transaction ledger.
pub fn read_ledger<P: AsRef<Path>>(path: P) -> Result<Vec<LabeledTransaction>> {
    let path = path.as_ref();
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("Failed to open ledger {}", path.display()))?;

    let mut transactions = Vec::new();
    for (idx, row) in reader.deserialize::<LedgerRow>().enumerate() {
        // header is line 1
        let line = idx + 2;
        let row = row.with_context(|| format!("Invalid ledger row at line {line}"))?;
        if !row.amount.is_finite() {
            bail!("Non-finite amount {} at ledger line {line}", row.amount);
        }
        transactions.push(LabeledTransaction {
            transaction: Transaction::unchecked(&row.source_id, &row.destination_id, row.amount),
            is_fraud: row.is_fraud != 0,
        });
    }
    Ok(transactions)
}

/// Read an exported account feature snapshot.
pub fn read_account_snapshot<P: AsRef<Path>>(path: P) -> Result<Vec<AccountRecord>> {
    let path = path.as_ref();
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("Failed to open account snapshot {}", path.display()))?;

    reader
        .deserialize::<SnapshotRow>()
        .enumerate()
        .map(|(idx, row)| {
            let row = row.with_context(|| format!("Invalid snapshot row at line {}", idx + 2))?;
            Ok(AccountRecord {
                id: normalize_account_id(&row.id),
                features: AccountFeatures::from_raw(
                    row.pagerank,
                    row.degree.filter(|d| d.is_finite()).map(|d| d as i64),
                    row.betweenness,
                    row.community.filter(|c| c.is_finite()).map(|c| c as i64),
                ),
            })
        })
        .collect()
}

/// Write an account feature snapshot.
pub fn write_account_snapshot<P: AsRef<Path>>(records: &[AccountRecord], path: P) -> Result<()> {
    let path = path.as_ref();
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;

    writer.write_record(["id", "pagerank", "degree", "betweenness", "community"])?;
    for record in records {
        let f = &record.features;
        writer.write_record([
            record.id.clone(),
            f.pagerank.to_string(),
            f.degree.to_string(),
            f.betweenness.to_string(),
            f.community.to_string(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

/// Write training rows with the schema's feature columns and the label.
pub fn write_training_csv<P: AsRef<Path>>(rows: &[LabeledRow], path: P) -> Result<()> {
    let path = path.as_ref();
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;

    let mut header = vec!["source_id", "destination_id"];
    header.extend(FEATURE_NAMES);
    header.push("is_fraud");
    writer.write_record(&header)?;

    for row in rows {
        let mut record = Vec::with_capacity(header.len());
        record.push(row.source_id.clone());
        record.push(row.destination_id.clone());
        record.extend(row.features.as_slice().iter().map(|v| v.to_string()));
        record.push(u8::from(row.is_fraud).to_string());
        writer.write_record(&record)?;
    }
    writer.flush()?;
    Ok(())
}
