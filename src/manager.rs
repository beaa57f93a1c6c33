//! Request-level façade over the school ledger.
//!
//! Each write loads the latest committed snapshot, applies one service call
//! and saves the result; a rejected call saves nothing. Reads load a fresh
//! snapshot and recompute every aggregate. No state is cached between calls.

use std::collections::BTreeMap;

use chrono::{NaiveDate, NaiveDateTime};
use tracing::{debug, info, warn};
use uuid::Uuid;

use scola_config::Config;
use scola_core::{
    storage::{LedgerBackupInfo, LedgerStorage},
    time::{Clock, SystemClock},
    AnalyticsService, CascadeService, CompensationService, CoreError, EnrollmentService,
    NewEnrollment, NewPayment, NewTransaction, PaymentAnalytics, PaymentService, PricingService,
    ProjectedExpenses, ProjectionAssumptions, ReconciliationReport, RegisteredStudent,
    RevenueSummary, StudentAnalytics, StudentRegistration, StudentService, SubscriptionService,
    TeacherProjection, TeacherReport, TransactionService, DEFAULT_MAX_ATTEMPTS,
};
use scola_domain::{
    CascadeStatus, Enrollment, EnrollmentPatch, Group, Payment, PeriodStats, PricingEntry,
    ReportingPeriod, SchoolLedger, Session, Student, SubscriptionEntry, SubscriptionMap, Teacher,
    Transaction,
};
use scola_storage_json::{JsonLedgerStorage, StoragePaths};

use crate::errors::SchoolError;

/// Tunables the manager applies to every request.
#[derive(Debug, Clone)]
pub struct ManagerSettings {
    pub ledger_name: String,
    pub assumptions: ProjectionAssumptions,
    pub max_cascade_attempts: u32,
    pub recent_enrollments_limit: usize,
}

impl Default for ManagerSettings {
    fn default() -> Self {
        Self {
            ledger_name: Config::default_school_name(),
            assumptions: ProjectionAssumptions::default(),
            max_cascade_attempts: DEFAULT_MAX_ATTEMPTS,
            recent_enrollments_limit: Config::default_recent_enrollments_limit(),
        }
    }
}

impl ManagerSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            ledger_name: config.school_name.clone(),
            assumptions: ProjectionAssumptions {
                hours_per_group_per_month: config.projection.hours_per_group_per_month,
                revenue_per_student: config.projection.revenue_per_student,
            },
            max_cascade_attempts: config.cascade.max_attempts,
            recent_enrollments_limit: config.recent_enrollments_limit,
        }
    }
}

/// Result of dispatching one cascade event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CascadeOutcome {
    Applied(Uuid),
    /// Attempt failed; the event stays pending for the next processing pass.
    Retrying,
    Failed,
}

/// Counts from one [`SchoolLedgerManager::process_cascades`] pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CascadeRun {
    pub applied: usize,
    pub retrying: usize,
    pub failed: usize,
}

/// Facade that routes requests through services and persistence.
pub struct SchoolLedgerManager {
    storage: Box<dyn LedgerStorage>,
    clock: Box<dyn Clock>,
    settings: ManagerSettings,
}

impl SchoolLedgerManager {
    pub fn new(storage: Box<dyn LedgerStorage>, settings: ManagerSettings) -> Self {
        Self {
            storage,
            clock: Box::new(SystemClock),
            settings,
        }
    }

    /// JSON-backed manager using the config's directories and tunables.
    pub fn from_config(config: &Config) -> Result<Self, SchoolError> {
        config.validate()?;
        let paths = StoragePaths {
            ledger_root: config.resolve_data_root(),
            backup_root: config.resolve_backup_root(),
        };
        let storage = JsonLedgerStorage::with_retention(paths, config.backup_retention)?;
        Ok(Self::new(
            Box::new(storage),
            ManagerSettings::from_config(config),
        ))
    }

    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    pub fn current_month(&self) -> ReportingPeriod {
        self.clock.current_month()
    }

    /// Latest committed ledger, or an empty one when nothing was saved yet.
    pub fn snapshot(&self) -> Result<SchoolLedger, SchoolError> {
        self.load().map_err(SchoolError::into_aggregation)
    }

    // Pricing catalog

    pub fn lookup_price(
        &self,
        category: &str,
        level: &str,
        subject: &str,
    ) -> Result<f64, SchoolError> {
        self.read(|ledger| Ok(PricingService::lookup(ledger, category, level, subject)))
    }

    pub fn upsert_pricing(&self, entry: PricingEntry) -> Result<Uuid, SchoolError> {
        self.commit(|ledger, _| PricingService::upsert(ledger, entry))
    }

    pub fn deactivate_pricing(&self, id: Uuid) -> Result<(), SchoolError> {
        self.commit(|ledger, _| PricingService::deactivate(ledger, id))
    }

    pub fn active_pricing(&self) -> Result<Vec<PricingEntry>, SchoolError> {
        self.read(|ledger| {
            Ok(PricingService::list_active(ledger)
                .into_iter()
                .cloned()
                .collect())
        })
    }

    // Students and subscriptions

    /// Student, fee enrollment and deposit payment are committed together.
    pub fn register_student(
        &self,
        registration: StudentRegistration,
    ) -> Result<RegisteredStudent, SchoolError> {
        let registered =
            self.commit(|ledger, now| StudentService::register(ledger, registration, now))?;
        if let Some(event_id) = registered.fee_cascade_event_id {
            self.dispatch_cascade(event_id);
        }
        Ok(registered)
    }

    pub fn remove_student(&self, student_id: Uuid) -> Result<Student, SchoolError> {
        self.commit(|ledger, _| StudentService::remove(ledger, student_id))
    }

    pub fn set_subscriptions(
        &self,
        student_id: Uuid,
        subscriptions: SubscriptionMap,
    ) -> Result<(), SchoolError> {
        self.commit(|ledger, _| {
            SubscriptionService::set_subscriptions(ledger, student_id, subscriptions)
        })
    }

    pub fn set_subscription(
        &self,
        student_id: Uuid,
        subject: &str,
        entry: SubscriptionEntry,
    ) -> Result<(), SchoolError> {
        self.commit(|ledger, _| {
            SubscriptionService::set_subscription(ledger, student_id, subject, entry)
        })
    }

    pub fn remove_subscription(
        &self,
        student_id: Uuid,
        subject: &str,
    ) -> Result<Option<SubscriptionEntry>, SchoolError> {
        self.commit(|ledger, _| {
            SubscriptionService::remove_subscription(ledger, student_id, subject)
        })
    }

    pub fn student_recurring_revenue(&self, student_id: Uuid) -> Result<f64, SchoolError> {
        self.read(|ledger| SubscriptionService::student_recurring_revenue(ledger, student_id))
    }

    pub fn recurring_revenue(&self) -> Result<f64, SchoolError> {
        self.read(|ledger| Ok(SubscriptionService::recurring_revenue(ledger)))
    }

    // Enrollments

    /// Records the enrollment, then dispatches its payment cascade.
    ///
    /// The enrollment is committed before the cascade runs; a failed cascade
    /// is kept on its outbox event and never turns into an error here.
    pub fn record_enrollment(&self, request: NewEnrollment) -> Result<Enrollment, SchoolError> {
        let recorded = self.commit(|ledger, now| EnrollmentService::record(ledger, request, now))?;
        if let Some(event_id) = recorded.cascade_event_id {
            self.dispatch_cascade(event_id);
        }
        Ok(recorded.enrollment)
    }

    pub fn correct_enrollment(
        &self,
        id: Uuid,
        patch: EnrollmentPatch,
    ) -> Result<Enrollment, SchoolError> {
        let (updated, queued) = self.commit(|ledger, now| {
            let updated = EnrollmentService::correct(ledger, id, patch, now)?;
            let queued: Vec<Uuid> = ledger
                .outbox
                .iter()
                .filter(|event| event.is_pending() && event.enrollment_id() == Some(id))
                .map(|event| event.id)
                .collect();
            Ok((updated, queued))
        })?;
        for event_id in queued {
            self.dispatch_cascade(event_id);
        }
        Ok(updated)
    }

    pub fn remove_enrollment(&self, id: Uuid) -> Result<Enrollment, SchoolError> {
        self.commit(|ledger, _| EnrollmentService::remove(ledger, id))
    }

    pub fn enrollments_for_student(
        &self,
        student_id: Uuid,
    ) -> Result<Vec<Enrollment>, SchoolError> {
        self.read(|ledger| {
            Ok(EnrollmentService::list_for_student(ledger, student_id)
                .into_iter()
                .cloned()
                .collect())
        })
    }

    // Payments and transactions

    /// Payment and its income transaction are committed together.
    pub fn record_payment(&self, request: NewPayment) -> Result<Payment, SchoolError> {
        self.commit(|ledger, now| PaymentService::record(ledger, request, now))
    }

    pub fn payments_for_student(&self, student_id: Uuid) -> Result<Vec<Payment>, SchoolError> {
        self.read(|ledger| {
            Ok(PaymentService::list_for_student(ledger, student_id)
                .into_iter()
                .cloned()
                .collect())
        })
    }

    pub fn append_transaction(&self, request: NewTransaction) -> Result<Transaction, SchoolError> {
        self.commit(|ledger, now| TransactionService::append(ledger, request, now))
    }

    pub fn list_transactions(&self) -> Result<Vec<Transaction>, SchoolError> {
        self.read(|ledger| {
            Ok(TransactionService::list_all(ledger)
                .into_iter()
                .cloned()
                .collect())
        })
    }

    pub fn delete_transaction(&self, id: Uuid) -> Result<Transaction, SchoolError> {
        self.commit(|ledger, _| TransactionService::delete_by_id(ledger, id))
    }

    pub fn stats_for_range(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<PeriodStats, SchoolError> {
        let period = ReportingPeriod::for_dates(from, to).map_err(CoreError::from)?;
        self.read(|ledger| Ok(TransactionService::stats_for_range(ledger, &period)))
    }

    /// Current month's expenses per category.
    pub fn expense_breakdown(&self) -> Result<BTreeMap<String, f64>, SchoolError> {
        let period = self.current_month();
        self.read(|ledger| Ok(TransactionService::expense_breakdown(ledger, &period)))
    }

    // Teachers

    pub fn add_teacher(&self, teacher: Teacher) -> Result<Uuid, SchoolError> {
        self.commit(|ledger, _| {
            if teacher.name.trim().is_empty() {
                return Err(CoreError::Validation("teacher name is required".into()));
            }
            Ok(ledger.add_teacher(teacher))
        })
    }

    pub fn add_group(&self, group: Group) -> Result<Uuid, SchoolError> {
        self.commit(|ledger, _| {
            if ledger.teacher(group.teacher_id).is_none() {
                return Err(CoreError::TeacherNotFound(group.teacher_id));
            }
            Ok(ledger.add_group(group))
        })
    }

    pub fn record_session(&self, session: Session) -> Result<Uuid, SchoolError> {
        self.commit(|ledger, _| {
            if !ledger.groups.iter().any(|group| group.id == session.group_id) {
                return Err(CoreError::Validation(format!(
                    "session references unknown group {}",
                    session.group_id
                )));
            }
            Ok(ledger.add_session(session))
        })
    }

    pub fn project_teacher_expense(
        &self,
        teacher_id: Uuid,
    ) -> Result<TeacherProjection, SchoolError> {
        let assumptions = self.settings.assumptions;
        self.read(|ledger| {
            CompensationService::project_monthly_expense(ledger, teacher_id, &assumptions)
        })
    }

    pub fn projected_expenses(&self) -> Result<ProjectedExpenses, SchoolError> {
        let assumptions = self.settings.assumptions;
        self.read(|ledger| Ok(CompensationService::project_all(ledger, &assumptions)))
    }

    pub fn pay_salary(
        &self,
        teacher_id: Uuid,
        amount: f64,
        date: Option<NaiveDateTime>,
    ) -> Result<Transaction, SchoolError> {
        self.commit(|ledger, now| {
            CompensationService::pay_salary(ledger, teacher_id, amount, date, now)
        })
    }

    // Analytics

    pub fn monthly_revenue(&self) -> Result<f64, SchoolError> {
        let period = self.current_month();
        self.read(|ledger| Ok(AnalyticsService::monthly_revenue(ledger, &period)))
    }

    pub fn cash_flow_stats(&self) -> Result<PeriodStats, SchoolError> {
        let period = self.current_month();
        self.read(|ledger| Ok(AnalyticsService::cash_flow_stats(ledger, &period)))
    }

    pub fn revenue_summary(&self) -> Result<RevenueSummary, SchoolError> {
        let period = self.current_month();
        let assumptions = self.settings.assumptions;
        self.read(|ledger| Ok(AnalyticsService::revenue_summary(ledger, &period, &assumptions)))
    }

    pub fn student_analytics(&self) -> Result<StudentAnalytics, SchoolError> {
        let period = self.current_month();
        let limit = self.settings.recent_enrollments_limit;
        self.read(|ledger| Ok(AnalyticsService::student_analytics(ledger, &period, limit)))
    }

    pub fn payment_analytics(&self) -> Result<PaymentAnalytics, SchoolError> {
        let period = self.current_month();
        let assumptions = self.settings.assumptions;
        self.read(|ledger| Ok(AnalyticsService::payment_analytics(ledger, &period, &assumptions)))
    }

    /// Report over `range` (inclusive days), or the current month when absent.
    pub fn teacher_report(
        &self,
        teacher_id: Uuid,
        range: Option<(NaiveDate, NaiveDate)>,
    ) -> Result<TeacherReport, SchoolError> {
        let period = match range {
            Some((from, to)) => ReportingPeriod::for_dates(from, to).map_err(CoreError::from)?,
            None => self.current_month(),
        };
        self.read(|ledger| AnalyticsService::teacher_report(ledger, teacher_id, &period))
    }

    // Cascades

    /// Retries every pending cascade event, oldest first.
    pub fn process_cascades(&self) -> Result<CascadeRun, SchoolError> {
        let pending = self.read(|ledger| Ok(CascadeService::pending(ledger)))?;
        let mut run = CascadeRun::default();
        for event_id in pending {
            match self.dispatch_cascade(event_id) {
                CascadeOutcome::Applied(_) => run.applied += 1,
                CascadeOutcome::Retrying => run.retrying += 1,
                CascadeOutcome::Failed => run.failed += 1,
            }
        }
        if run != CascadeRun::default() {
            info!(
                applied = run.applied,
                retrying = run.retrying,
                failed = run.failed,
                "cascade pass finished"
            );
        }
        Ok(run)
    }

    pub fn requeue_cascade(&self, event_id: Uuid) -> Result<(), SchoolError> {
        self.commit(|ledger, _| CascadeService::requeue(ledger, event_id))
    }

    pub fn reconciliation_report(&self) -> Result<ReconciliationReport, SchoolError> {
        self.read(|ledger| Ok(CascadeService::reconciliation_report(ledger)))
    }

    // Backups

    pub fn backup(&self, note: Option<&str>) -> Result<LedgerBackupInfo, SchoolError> {
        let ledger = self.load()?;
        let info = self
            .storage
            .backup_ledger(&self.settings.ledger_name, &ledger, note)?;
        info!(backup = %info.id, "ledger backup created");
        Ok(info)
    }

    pub fn list_backups(&self) -> Result<Vec<LedgerBackupInfo>, SchoolError> {
        Ok(self.storage.list_backups(&self.settings.ledger_name)?)
    }

    pub fn restore_backup(&self, backup_id: &str) -> Result<SchoolLedger, SchoolError> {
        let backup = self.find_backup(backup_id)?;
        let ledger = self.storage.restore_backup(&backup)?;
        info!(backup = %backup.id, "ledger restored from backup");
        Ok(ledger)
    }

    /// Removes a backup; labelled backups are only ever removed this way.
    pub fn delete_backup(&self, backup_id: &str) -> Result<(), SchoolError> {
        let backup = self.find_backup(backup_id)?;
        self.storage.delete_backup(&backup)?;
        info!(backup = %backup.id, "ledger backup deleted");
        Ok(())
    }

    fn find_backup(&self, backup_id: &str) -> Result<LedgerBackupInfo, SchoolError> {
        self.list_backups()?
            .into_iter()
            .find(|info| info.id == backup_id)
            .ok_or_else(|| SchoolError::NotFound(format!("backup `{backup_id}`")))
    }

    fn load(&self) -> Result<SchoolLedger, SchoolError> {
        let name = &self.settings.ledger_name;
        if !self.storage.ledger_exists(name) {
            return Ok(SchoolLedger::new(name.clone()));
        }
        Ok(self.storage.load_ledger(name)?)
    }

    fn commit<T>(
        &self,
        op: impl FnOnce(&mut SchoolLedger, NaiveDateTime) -> Result<T, CoreError>,
    ) -> Result<T, SchoolError> {
        let mut ledger = self.load()?;
        let value = op(&mut ledger, self.clock.now_naive())?;
        self.storage
            .save_ledger(&self.settings.ledger_name, &ledger)?;
        Ok(value)
    }

    fn read<T>(
        &self,
        op: impl FnOnce(&SchoolLedger) -> Result<T, CoreError>,
    ) -> Result<T, SchoolError> {
        let ledger = self.snapshot()?;
        debug!(ledger = %ledger.name, "aggregating from fresh snapshot");
        Ok(op(&ledger)?)
    }

    /// Applies one event in its own commit; failures are recorded on the event.
    fn dispatch_cascade(&self, event_id: Uuid) -> CascadeOutcome {
        let err = match self.commit(|ledger, now| CascadeService::apply(ledger, event_id, now)) {
            Ok(produced) => return CascadeOutcome::Applied(produced),
            Err(err) => err,
        };
        warn!(%event_id, %err, "enrollment payment cascade failed");

        let message = err.to_string();
        let max_attempts = self.settings.max_cascade_attempts;
        match self.commit(|ledger, now| {
            CascadeService::record_failure(ledger, event_id, &message, max_attempts, now)
        }) {
            Ok(CascadeStatus::Failed) => CascadeOutcome::Failed,
            Ok(_) => CascadeOutcome::Retrying,
            Err(record_err) => {
                warn!(%event_id, err = %record_err, "could not record cascade failure");
                CascadeOutcome::Retrying
            }
        }
    }
}
