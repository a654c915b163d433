//! Type definitions for the risk scorer

pub mod account;
pub mod transaction;

pub use account::{
    AccountFeatures, AccountRecord, FallbackReason, FeatureCacheEntry, FeatureLookup,
    FeatureOrigin, COLD_START,
};
pub use transaction::{
    normalize_account_id, InvalidTransaction, LabeledTransaction, ScoreRequest, Transaction,
};
