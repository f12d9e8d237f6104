//! Installment persistence seam.
//!
//! The trait is the logical layout from the design: each installment row
//! carries the four escalation flags as separate columns, flag writes are a
//! per-installment compare-and-set, and schedule replacement is transactional
//! behind an optimistic per-application version.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::RwLock;

use crate::error::FundingError;
use crate::schedule::generator::{EscalationFlag, InstallmentStatus, RepaymentInstallment};
use crate::schedule::payments::apply_payment;
use crate::types::{ApplicationId, InstallmentId, Money};
use crate::FundingResult;

/// Persistence contract for repayment installments.
///
/// Implementations must be safe to share across threads; mutations to a
/// single installment are serialized by the store, so the sweep never holds a
/// lock of its own while dispatching.
pub trait InstallmentStore: Send + Sync {
    /// Current schedule version for an application (0 before any schedule).
    fn schedule_version(&self, application_id: ApplicationId) -> FundingResult<u64>;

    /// Atomically replace the application's schedule: removes every
    /// non-`Paid` installment, keeps `Paid` ones untouched, and stores the
    /// new installments with fresh ids. Fails with
    /// [`FundingError::ScheduleRegenerationConflict`] when `expected_version`
    /// is stale; the caller should re-read and retry.
    fn replace_schedule(
        &self,
        application_id: ApplicationId,
        expected_version: u64,
        installments: Vec<RepaymentInstallment>,
    ) -> FundingResult<Vec<RepaymentInstallment>>;

    /// Applications that currently have installments, in stable order.
    fn application_ids(&self) -> FundingResult<Vec<ApplicationId>>;

    /// All installments for an application, ordered by sequence number.
    fn for_application(
        &self,
        application_id: ApplicationId,
    ) -> FundingResult<Vec<RepaymentInstallment>>;

    fn get(&self, installment_id: InstallmentId) -> FundingResult<RepaymentInstallment>;

    /// Record a received payment against an installment.
    fn record_payment(
        &self,
        installment_id: InstallmentId,
        paid_amount: Money,
        paid_date: NaiveDate,
    ) -> FundingResult<RepaymentInstallment>;

    /// Set an escalation flag iff it was previously unset. Returns whether
    /// this call latched it; `Ok(false)` means another writer got there
    /// first and the caller must not notify again.
    fn latch_flag(
        &self,
        installment_id: InstallmentId,
        flag: EscalationFlag,
    ) -> FundingResult<bool>;
}

/// Serializable snapshot of a store's contents, for export or state files.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScheduleSnapshot {
    #[serde(default)]
    pub versions: HashMap<ApplicationId, u64>,
    #[serde(default)]
    pub installments: Vec<RepaymentInstallment>,
}

#[derive(Debug, Default)]
struct StoreInner {
    installments: BTreeMap<InstallmentId, RepaymentInstallment>,
    versions: HashMap<ApplicationId, u64>,
    next_installment_id: InstallmentId,
}

/// In-memory reference implementation of [`InstallmentStore`].
#[derive(Debug, Default)]
pub struct InMemoryInstallmentStore {
    inner: RwLock<StoreInner>,
}

impl InMemoryInstallmentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a store from a snapshot, preserving ids and versions.
    pub fn from_snapshot(snapshot: ScheduleSnapshot) -> Self {
        let mut inner = StoreInner {
            versions: snapshot.versions,
            ..Default::default()
        };
        for installment in snapshot.installments {
            inner.next_installment_id = inner.next_installment_id.max(installment.installment_id);
            inner
                .installments
                .insert(installment.installment_id, installment);
        }
        Self {
            inner: RwLock::new(inner),
        }
    }

    pub fn snapshot(&self) -> ScheduleSnapshot {
        let inner = self.inner.read().unwrap_or_else(|e| e.into_inner());
        ScheduleSnapshot {
            versions: inner.versions.clone(),
            installments: inner.installments.values().cloned().collect(),
        }
    }
}

impl InstallmentStore for InMemoryInstallmentStore {
    fn schedule_version(&self, application_id: ApplicationId) -> FundingResult<u64> {
        let inner = self.inner.read().unwrap_or_else(|e| e.into_inner());
        Ok(inner.versions.get(&application_id).copied().unwrap_or(0))
    }

    fn replace_schedule(
        &self,
        application_id: ApplicationId,
        expected_version: u64,
        installments: Vec<RepaymentInstallment>,
    ) -> FundingResult<Vec<RepaymentInstallment>> {
        let mut inner = self.inner.write().unwrap_or_else(|e| e.into_inner());

        let current = inner.versions.get(&application_id).copied().unwrap_or(0);
        if current != expected_version {
            return Err(FundingError::ScheduleRegenerationConflict { application_id });
        }

        // Paid installments are settled history and survive regeneration.
        inner.installments.retain(|_, i| {
            i.application_id != application_id || i.status == InstallmentStatus::Paid
        });

        let mut stored = Vec::with_capacity(installments.len());
        for mut installment in installments {
            installment.application_id = application_id;
            inner.next_installment_id += 1;
            installment.installment_id = inner.next_installment_id;
            inner
                .installments
                .insert(installment.installment_id, installment.clone());
            stored.push(installment);
        }

        inner.versions.insert(application_id, current + 1);
        Ok(stored)
    }

    fn application_ids(&self) -> FundingResult<Vec<ApplicationId>> {
        let inner = self.inner.read().unwrap_or_else(|e| e.into_inner());
        let ids: BTreeSet<ApplicationId> = inner
            .installments
            .values()
            .map(|i| i.application_id)
            .collect();
        Ok(ids.into_iter().collect())
    }

    fn for_application(
        &self,
        application_id: ApplicationId,
    ) -> FundingResult<Vec<RepaymentInstallment>> {
        let inner = self.inner.read().unwrap_or_else(|e| e.into_inner());
        let mut installments: Vec<RepaymentInstallment> = inner
            .installments
            .values()
            .filter(|i| i.application_id == application_id)
            .cloned()
            .collect();
        installments.sort_by_key(|i| i.sequence_no);
        Ok(installments)
    }

    fn get(&self, installment_id: InstallmentId) -> FundingResult<RepaymentInstallment> {
        let inner = self.inner.read().unwrap_or_else(|e| e.into_inner());
        inner
            .installments
            .get(&installment_id)
            .cloned()
            .ok_or(FundingError::InstallmentNotFound { installment_id })
    }

    fn record_payment(
        &self,
        installment_id: InstallmentId,
        paid_amount: Money,
        paid_date: NaiveDate,
    ) -> FundingResult<RepaymentInstallment> {
        let mut inner = self.inner.write().unwrap_or_else(|e| e.into_inner());
        let installment = inner
            .installments
            .get_mut(&installment_id)
            .ok_or(FundingError::InstallmentNotFound { installment_id })?;
        apply_payment(installment, paid_amount, paid_date)?;
        Ok(installment.clone())
    }

    fn latch_flag(
        &self,
        installment_id: InstallmentId,
        flag: EscalationFlag,
    ) -> FundingResult<bool> {
        let mut inner = self.inner.write().unwrap_or_else(|e| e.into_inner());
        let installment = inner
            .installments
            .get_mut(&installment_id)
            .ok_or(FundingError::InstallmentNotFound { installment_id })?;
        if installment.flag(flag) {
            return Ok(false);
        }
        installment.set_flag(flag);
        Ok(true)
    }
}
