//! Offline training dataset construction.
//!
//! Joins a labeled transaction ledger with exported account features. Account
//! resolution and feature assembly are the exact functions the online scorer
//! uses, so training rows and serving vectors cannot drift apart.

mod io;

use serde::Serialize;
use std::collections::HashMap;
use tracing::info;

use crate::feature_assembler::FeatureAssembler;
use crate::schema::FeatureVector;
use crate::types::{AccountFeatures, LabeledTransaction};

pub use io::{read_account_snapshot, read_ledger, write_account_snapshot, write_training_csv};

/// Synchronous account attribute lookup for offline joins.
pub trait FeatureSource {
    /// `None` for accounts the graph has no record of.
    fn lookup(&self, account_id: &str) -> Option<AccountFeatures>;
}

impl FeatureSource for HashMap<String, AccountFeatures> {
    fn lookup(&self, account_id: &str) -> Option<AccountFeatures> {
        self.get(account_id).copied()
    }
}

/// One training example.
#[derive(Debug, Clone, PartialEq)]
pub struct LabeledRow {
    pub source_id: String,
    pub destination_id: String,
    pub features: FeatureVector,
    pub is_fraud: bool,
}

/// Counts gathered while building a dataset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DatasetStats {
    pub rows: usize,
    pub fraud_rows: usize,
    pub cold_start_sources: usize,
    pub cold_start_destinations: usize,
}

/// Labeled rows in ledger order.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    pub rows: Vec<LabeledRow>,
    pub stats: DatasetStats,
}

/// Builds labeled feature rows from a ledger.
#[derive(Debug, Clone, Default)]
pub struct DatasetBuilder {
    assembler: FeatureAssembler,
}

impl DatasetBuilder {
    pub fn new(assembler: FeatureAssembler) -> Self {
        Self { assembler }
    }

    /// Featurize every transaction.
    ///
    /// Unknown accounts get the cold-start attributes; no row is dropped or
    /// resampled, so order and label distribution match the input.
    pub fn build<S>(&self, transactions: &[LabeledTransaction], source: &S) -> Dataset
    where
        S: FeatureSource + ?Sized,
    {
        let mut stats = DatasetStats::default();
        let mut rows = Vec::with_capacity(transactions.len());

        for labeled in transactions {
            let tx = &labeled.transaction;
            let src = source.lookup(&tx.source_id);
            let dst = source.lookup(&tx.destination_id);

            stats.cold_start_sources += usize::from(src.is_none());
            stats.cold_start_destinations += usize::from(dst.is_none());
            stats.fraud_rows += usize::from(labeled.is_fraud);

            let features = self.assembler.build(
                tx,
                &AccountFeatures::resolve(src),
                &AccountFeatures::resolve(dst),
            );
            rows.push(LabeledRow {
                source_id: tx.source_id.clone(),
                destination_id: tx.destination_id.clone(),
                features,
                is_fraud: labeled.is_fraud,
            });
        }
        stats.rows = rows.len();

        info!(
            rows = stats.rows,
            fraud_rows = stats.fraud_rows,
            cold_start_sources = stats.cold_start_sources,
            cold_start_destinations = stats.cold_start_destinations,
            "Training dataset built"
        );

        Dataset { rows, stats }
    }
}
