//! Order records and the merge rules that fold reports into them.
//!
//! An [`OrderRecord`] is created on the first report seen for an order and
//! mutated by exactly three writers, one per [`Dimension`]. Its status moves
//! from `Pending` to a terminal value once, through [`OrderRecord::finalize`].

use crate::report::Report;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Correlation key shared by all three report types.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(String);

impl OrderId {
    /// Creates a new `OrderId`.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the inner string value
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for OrderId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// One of the three report kinds an order waits for.
///
/// A dimension doubles as the failure tag recorded when its report fails.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dimension {
    /// Payment confirmation
    Payment,
    /// Fraud check result
    Fraud,
    /// Vendor confirmation
    Vendor,
}

impl Dimension {
    /// All dimensions, in the order failure tags are conventionally listed.
    pub const ALL: [Self; 3] = [Self::Payment, Self::Fraud, Self::Vendor];

    /// Wire name of the dimension (also its failure tag).
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Payment => "payment",
            Self::Fraud => "fraud",
            Self::Vendor => "vendor",
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status of an order in its lifecycle
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    /// Still waiting for at least one report
    #[default]
    Pending,
    /// All reports arrived and none failed
    Confirmed,
    /// All reports arrived and at least one failed
    Errored,
}

impl OrderStatus {
    /// Returns `true` once the order has been finalized.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Confirmed | Self::Errored)
    }

    /// Wire name of the status.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Errored => "errored",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a report for an already-processed dimension is treated.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DuplicatePolicy {
    /// Merge every delivery. A failing report delivered twice records its
    /// failure tag twice.
    #[default]
    Reapply,
    /// Drop a report whose dimension has already reported in.
    Ignore,
}

/// Error returned when a duplicate policy name is not recognized.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown duplicate policy '{0}' (expected 'reapply' or 'ignore')")]
pub struct UnknownDuplicatePolicy(String);

impl FromStr for DuplicatePolicy {
    type Err = UnknownDuplicatePolicy;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "reapply" => Ok(Self::Reapply),
            "ignore" => Ok(Self::Ignore),
            _ => Err(UnknownDuplicatePolicy(s.to_string())),
        }
    }
}

/// Result of folding one report into a record.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MergeOutcome {
    /// The report was merged and its dimension approved
    Passed,
    /// The report was merged and its failure tag recorded
    Failed,
    /// The dimension had already reported in and the policy drops redeliveries
    Duplicate,
    /// The record was already finalized; nothing changed
    Late,
}

impl MergeOutcome {
    /// Label used in logs and metrics.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Passed => "passed",
            Self::Failed => "failed",
            Self::Duplicate => "duplicate",
            Self::Late => "late",
        }
    }

    /// Returns `true` if the record was changed.
    #[must_use]
    pub const fn is_applied(self) -> bool {
        matches!(self, Self::Passed | Self::Failed)
    }
}

/// Errors from finalizing a record.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FinalizeError {
    /// At least one dimension has not reported in
    #[error("order {0} is still waiting for reports")]
    NotReady(OrderId),
    /// The record already carries a terminal status
    #[error("order {0} has already been finalized")]
    AlreadyFinal(OrderId),
}

/// Immutable snapshot of a finalized order, handed to the notifier.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OrderOutcome {
    /// Order the outcome belongs to
    pub order_id: OrderId,
    /// Amount from the payment report
    pub amount: i64,
    /// Terminal status
    pub status: OrderStatus,
    /// Failure tags in the order they were recorded
    pub failure_reasons: Vec<Dimension>,
    /// Time between the first report and finalization
    pub processing_duration: Duration,
}

/// Join state for a single order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OrderRecord {
    order_id: OrderId,
    amount: i64,
    payment_processed: bool,
    fraud_processed: bool,
    vendor_processed: bool,
    failure_reasons: Vec<Dimension>,
    status: OrderStatus,
    start_time: DateTime<Utc>,
    processing_duration: Option<Duration>,
}

impl OrderRecord {
    /// Creates an empty, pending record first seen at `start_time`.
    #[must_use]
    pub const fn new(order_id: OrderId, start_time: DateTime<Utc>) -> Self {
        Self {
            order_id,
            amount: 0,
            payment_processed: false,
            fraud_processed: false,
            vendor_processed: false,
            failure_reasons: Vec::new(),
            status: OrderStatus::Pending,
            start_time,
            processing_duration: None,
        }
    }

    /// Correlation key of the record.
    #[must_use]
    pub const fn order_id(&self) -> &OrderId {
        &self.order_id
    }

    /// Amount set by the payment report, zero until it arrives.
    #[must_use]
    pub const fn amount(&self) -> i64 {
        self.amount
    }

    /// Failure tags recorded so far.
    #[must_use]
    pub fn failure_reasons(&self) -> &[Dimension] {
        &self.failure_reasons
    }

    /// Current status.
    #[must_use]
    pub const fn status(&self) -> OrderStatus {
        self.status
    }

    /// When the first report for this order was seen.
    #[must_use]
    pub const fn start_time(&self) -> DateTime<Utc> {
        self.start_time
    }

    /// Processing time, available once finalized.
    #[must_use]
    pub const fn processing_duration(&self) -> Option<Duration> {
        self.processing_duration
    }

    /// Whether the given dimension has reported in.
    #[must_use]
    pub const fn is_processed(&self, dimension: Dimension) -> bool {
        match dimension {
            Dimension::Payment => self.payment_processed,
            Dimension::Fraud => self.fraud_processed,
            Dimension::Vendor => self.vendor_processed,
        }
    }

    /// Readiness predicate: every dimension has reported in.
    #[must_use]
    pub const fn is_ready(&self) -> bool {
        self.payment_processed && self.fraud_processed && self.vendor_processed
    }

    /// Folds a report into the record.
    ///
    /// The processed flag for the report's dimension is set whether the report
    /// approved or failed; a failing report also appends its tag. Terminal
    /// records are never changed.
    pub fn apply(&mut self, report: &Report, policy: DuplicatePolicy) -> MergeOutcome {
        if self.status.is_terminal() {
            return MergeOutcome::Late;
        }

        let dimension = report.dimension();
        if policy == DuplicatePolicy::Ignore && self.is_processed(dimension) {
            return MergeOutcome::Duplicate;
        }

        match report {
            Report::Payment(payment) => {
                self.amount = payment.amount;
                self.payment_processed = true;
            },
            Report::Fraud(_) => self.fraud_processed = true,
            Report::Vendor(_) => self.vendor_processed = true,
        }

        if report.is_failure() {
            self.failure_reasons.push(dimension);
            MergeOutcome::Failed
        } else {
            MergeOutcome::Passed
        }
    }

    /// Moves a ready record to its terminal status and returns the outcome.
    ///
    /// # Errors
    ///
    /// - `NotReady` if a dimension is still missing
    /// - `AlreadyFinal` if the record was finalized before
    pub fn finalize(&mut self, now: DateTime<Utc>) -> Result<OrderOutcome, FinalizeError> {
        if self.status.is_terminal() {
            return Err(FinalizeError::AlreadyFinal(self.order_id.clone()));
        }
        if !self.is_ready() {
            return Err(FinalizeError::NotReady(self.order_id.clone()));
        }

        self.status = if self.failure_reasons.is_empty() {
            OrderStatus::Confirmed
        } else {
            OrderStatus::Errored
        };
        // A clock that stepped backwards yields zero rather than an error
        let elapsed = (now - self.start_time).to_std().unwrap_or(Duration::ZERO);
        self.processing_duration = Some(elapsed);

        Ok(OrderOutcome {
            order_id: self.order_id.clone(),
            amount: self.amount,
            status: self.status,
            failure_reasons: self.failure_reasons.clone(),
            processing_duration: elapsed,
        })
    }
}
