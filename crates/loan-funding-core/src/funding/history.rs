//! Immutable audit trail of funding calculations.
//!
//! Every successful calculation is appended as a `FundingCalculationHistoryRecord`
//! snapshotting both the input and the result. Records are never updated or
//! deleted; the most recent record is the application's current funding
//! position.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::RwLock;

use crate::funding::calculation::{FundingCalculationInput, FundingCalculationResult};
use crate::types::{ApplicationId, RecordId};
use crate::FundingResult;

/// One appended funding calculation: input and result snapshots plus
/// provenance. Immutable once written.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FundingCalculationHistoryRecord {
    pub record_id: RecordId,
    pub application_id: ApplicationId,
    pub calculation_input: FundingCalculationInput,
    pub calculation_result: FundingCalculationResult,
    pub created_by: String,
    /// Store-assigned and monotonically non-decreasing across appends.
    pub created_at: DateTime<Utc>,
}

/// Append-only persistence seam for the funding audit trail.
///
/// Implementations must never mutate or delete an appended record.
pub trait FundingHistoryStore: Send + Sync {
    /// Append a calculation. `now` is the caller's clock reading; the store
    /// assigns the final `created_at`, clamped so timestamps never go
    /// backwards.
    fn append(
        &self,
        application_id: ApplicationId,
        input: &FundingCalculationInput,
        result: &FundingCalculationResult,
        created_by: &str,
        now: DateTime<Utc>,
    ) -> FundingResult<FundingCalculationHistoryRecord>;

    /// All records for an application, newest first.
    fn list(&self, application_id: ApplicationId)
        -> FundingResult<Vec<FundingCalculationHistoryRecord>>;

    /// The application's current funding record, if any calculation has run.
    fn latest(
        &self,
        application_id: ApplicationId,
    ) -> FundingResult<Option<FundingCalculationHistoryRecord>> {
        Ok(self.list(application_id)?.into_iter().next())
    }
}

#[derive(Debug, Default)]
struct HistoryInner {
    records: HashMap<ApplicationId, Vec<FundingCalculationHistoryRecord>>,
    next_record_id: RecordId,
    last_created_at: Option<DateTime<Utc>>,
}

/// In-memory reference implementation of the audit trail.
#[derive(Debug, Default)]
pub struct InMemoryFundingHistory {
    inner: RwLock<HistoryInner>,
}

impl InMemoryFundingHistory {
    pub fn new() -> Self {
        Self::default()
    }
}

impl FundingHistoryStore for InMemoryFundingHistory {
    fn append(
        &self,
        application_id: ApplicationId,
        input: &FundingCalculationInput,
        result: &FundingCalculationResult,
        created_by: &str,
        now: DateTime<Utc>,
    ) -> FundingResult<FundingCalculationHistoryRecord> {
        let mut inner = self.inner.write().unwrap_or_else(|e| e.into_inner());

        // Clamp against the last assigned timestamp so ordering by
        // created_at matches append order even with a jittery clock.
        let created_at = match inner.last_created_at {
            Some(last) if now < last => last,
            _ => now,
        };
        inner.last_created_at = Some(created_at);

        inner.next_record_id += 1;
        let record = FundingCalculationHistoryRecord {
            record_id: inner.next_record_id,
            application_id,
            calculation_input: input.clone(),
            calculation_result: result.clone(),
            created_by: created_by.to_string(),
            created_at,
        };

        inner
            .records
            .entry(application_id)
            .or_default()
            .push(record.clone());
        Ok(record)
    }

    fn list(
        &self,
        application_id: ApplicationId,
    ) -> FundingResult<Vec<FundingCalculationHistoryRecord>> {
        let inner = self.inner.read().unwrap_or_else(|e| e.into_inner());
        let mut records = inner
            .records
            .get(&application_id)
            .cloned()
            .unwrap_or_default();
        records.reverse();
        Ok(records)
    }
}
