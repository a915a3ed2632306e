use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use aangan_core::{
    Aggregate, AggregateRoot, AppealId, CenterId, EngineError, EngineResult, ItemType, UserId,
    ValueObject,
};
use aangan_events::Event;
use aangan_inventory::BucketKey;

use crate::audit::AuditTrail;

/// How urgently the center needs the requested resources.
///
/// Informational for human reviewers only — allocation is strictly
/// first-come-first-served at approval time, never preempted by urgency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Urgency {
    Low,
    Medium,
    High,
    Urgent,
}

/// Per-item priority, informational like [`Urgency`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
}

/// Appeal status lifecycle.
///
/// `pending -> under_review -> {approved, rejected}`; `approved -> fulfilled`.
/// `rejected` and `fulfilled` are terminal. No transition skips a state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppealStatus {
    Pending,
    UnderReview,
    Approved,
    Rejected,
    Fulfilled,
}

impl AppealStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            AppealStatus::Pending => "pending",
            AppealStatus::UnderReview => "under_review",
            AppealStatus::Approved => "approved",
            AppealStatus::Rejected => "rejected",
            AppealStatus::Fulfilled => "fulfilled",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, AppealStatus::Rejected | AppealStatus::Fulfilled)
    }
}

impl core::fmt::Display for AppealStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Shape of one requested item, keyed by what is being asked for.
///
/// Money and goods carry different field sets; the tagged variant keeps
/// validation exhaustive per shape instead of an open record of optional
/// fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum RequestKind {
    Money {
        /// Smallest currency unit.
        amount: i64,
        purpose: String,
    },
    Goods {
        item_type: ItemType,
        item_name: String,
        quantity: i64,
        specification: String,
    },
}

/// One line of an appeal. Immutable once the appeal leaves `pending`
/// (structurally: no command edits items after submission).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestedItem {
    pub kind: RequestKind,
    pub reason: String,
    pub priority: Priority,
}

impl ValueObject for RequestedItem {}

impl RequestedItem {
    pub fn item_type(&self) -> ItemType {
        match &self.kind {
            RequestKind::Money { .. } => ItemType::Money,
            RequestKind::Goods { item_type, .. } => *item_type,
        }
    }

    /// The bucket this item draws from and how many units it needs.
    pub fn demand(&self) -> (BucketKey, i64) {
        match &self.kind {
            RequestKind::Money { amount, .. } => (BucketKey::new(ItemType::Money, ""), *amount),
            RequestKind::Goods {
                item_type,
                quantity,
                specification,
                ..
            } => (BucketKey::new(*item_type, specification), *quantity),
        }
    }

    fn validate(&self, index: usize) -> EngineResult<()> {
        let line = index + 1;
        match &self.kind {
            RequestKind::Money { amount, purpose } => {
                if *amount <= 0 {
                    return Err(EngineError::validation(format!(
                        "item {line}: amount must be positive"
                    )));
                }
                if purpose.trim().is_empty() {
                    return Err(EngineError::validation(format!(
                        "item {line}: purpose is required for money requests"
                    )));
                }
            }
            RequestKind::Goods {
                item_type,
                item_name,
                quantity,
                ..
            } => {
                if item_type.is_money() {
                    return Err(EngineError::validation(format!(
                        "item {line}: money requests must use the money shape"
                    )));
                }
                if item_name.trim().is_empty() {
                    return Err(EngineError::validation(format!(
                        "item {line}: item name is required"
                    )));
                }
                if *quantity <= 0 {
                    return Err(EngineError::validation(format!(
                        "item {line}: quantity must be positive"
                    )));
                }
            }
        }
        if self.reason.trim().is_empty() {
            return Err(EngineError::validation(format!(
                "item {line}: reason is required"
            )));
        }
        Ok(())
    }
}

/// Aggregate root: Appeal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Appeal {
    id: AppealId,
    center_id: Option<CenterId>,
    title: String,
    description: String,
    urgency: Urgency,
    justification: String,
    current_situation: String,
    expected_fulfillment: Option<DateTime<Utc>>,
    items: Vec<RequestedItem>,
    status: AppealStatus,
    reviewer: Option<UserId>,
    reviewer_comment: Option<String>,
    audit: AuditTrail,
    version: u64,
    created: bool,
}

impl Appeal {
    /// Create an empty, not-yet-submitted aggregate instance for rehydration.
    pub fn empty(id: AppealId) -> Self {
        Self {
            id,
            center_id: None,
            title: String::new(),
            description: String::new(),
            urgency: Urgency::Low,
            justification: String::new(),
            current_situation: String::new(),
            expected_fulfillment: None,
            items: Vec::new(),
            status: AppealStatus::Pending,
            reviewer: None,
            reviewer_comment: None,
            audit: AuditTrail::new(),
            version: 0,
            created: false,
        }
    }

    pub fn id_typed(&self) -> AppealId {
        self.id
    }

    pub fn center_id(&self) -> Option<CenterId> {
        self.center_id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn urgency(&self) -> Urgency {
        self.urgency
    }

    pub fn status(&self) -> AppealStatus {
        self.status
    }

    pub fn items(&self) -> &[RequestedItem] {
        &self.items
    }

    pub fn reviewer(&self) -> Option<UserId> {
        self.reviewer
    }

    pub fn reviewer_comment(&self) -> Option<&str> {
        self.reviewer_comment.as_deref()
    }

    pub fn audit_trail(&self) -> &AuditTrail {
        &self.audit
    }
}

impl AggregateRoot for Appeal {
    type Id = AppealId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: SubmitAppeal.
///
/// Submission records intent only — it never touches the inventory ledger,
/// so an appeal exceeding current stock is still accepted for review.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitAppeal {
    pub appeal_id: AppealId,
    pub center_id: CenterId,
    pub submitted_by: UserId,
    pub title: String,
    pub description: String,
    pub urgency: Urgency,
    pub justification: String,
    pub current_situation: String,
    pub expected_fulfillment: Option<DateTime<Utc>>,
    pub items: Vec<RequestedItem>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: StartReview.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartReview {
    pub appeal_id: AppealId,
    pub reviewer: UserId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: ApproveAppeal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApproveAppeal {
    pub appeal_id: AppealId,
    pub reviewer: UserId,
    pub comment: String,
    pub occurred_at: DateTime<Utc>,
}

/// Command: RejectAppeal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RejectAppeal {
    pub appeal_id: AppealId,
    pub reviewer: UserId,
    pub comment: String,
    pub occurred_at: DateTime<Utc>,
}

/// Command: FulfillAppeal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FulfillAppeal {
    pub appeal_id: AppealId,
    pub actor: UserId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AppealCommand {
    SubmitAppeal(SubmitAppeal),
    StartReview(StartReview),
    ApproveAppeal(ApproveAppeal),
    RejectAppeal(RejectAppeal),
    FulfillAppeal(FulfillAppeal),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AppealEvent {
    AppealSubmitted(SubmitAppeal),
    ReviewStarted(StartReview),
    AppealApproved(ApproveAppeal),
    AppealRejected(RejectAppeal),
    AppealFulfilled(FulfillAppeal),
}

impl Event for AppealEvent {
    fn event_type(&self) -> &'static str {
        match self {
            AppealEvent::AppealSubmitted(_) => "appeal.submitted",
            AppealEvent::ReviewStarted(_) => "appeal.review_started",
            AppealEvent::AppealApproved(_) => "appeal.approved",
            AppealEvent::AppealRejected(_) => "appeal.rejected",
            AppealEvent::AppealFulfilled(_) => "appeal.fulfilled",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            AppealEvent::AppealSubmitted(e) => e.occurred_at,
            AppealEvent::ReviewStarted(e) => e.occurred_at,
            AppealEvent::AppealApproved(e) => e.occurred_at,
            AppealEvent::AppealRejected(e) => e.occurred_at,
            AppealEvent::AppealFulfilled(e) => e.occurred_at,
        }
    }
}

impl Aggregate for Appeal {
    type Command = AppealCommand;
    type Event = AppealEvent;
    type Error = EngineError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            AppealEvent::AppealSubmitted(e) => {
                self.id = e.appeal_id;
                self.center_id = Some(e.center_id);
                self.title = e.title.clone();
                self.description = e.description.clone();
                self.urgency = e.urgency;
                self.justification = e.justification.clone();
                self.current_situation = e.current_situation.clone();
                self.expected_fulfillment = e.expected_fulfillment;
                self.items = e.items.clone();
                self.status = AppealStatus::Pending;
                self.created = true;
                self.audit
                    .append("appeal submitted", e.submitted_by, e.occurred_at);
            }
            AppealEvent::ReviewStarted(e) => {
                self.status = AppealStatus::UnderReview;
                self.reviewer = Some(e.reviewer);
                self.audit.append("review started", e.reviewer, e.occurred_at);
            }
            AppealEvent::AppealApproved(e) => {
                self.status = AppealStatus::Approved;
                self.reviewer = Some(e.reviewer);
                self.reviewer_comment = Some(e.comment.clone());
                self.audit
                    .append(transition_message("appeal approved", &e.comment), e.reviewer, e.occurred_at);
            }
            AppealEvent::AppealRejected(e) => {
                self.status = AppealStatus::Rejected;
                self.reviewer = Some(e.reviewer);
                self.reviewer_comment = Some(e.comment.clone());
                self.audit
                    .append(transition_message("appeal rejected", &e.comment), e.reviewer, e.occurred_at);
            }
            AppealEvent::AppealFulfilled(e) => {
                self.status = AppealStatus::Fulfilled;
                self.audit.append("appeal fulfilled", e.actor, e.occurred_at);
            }
        }

        // Deterministic version tracking: +1 per applied event.
        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            AppealCommand::SubmitAppeal(cmd) => self.handle_submit(cmd),
            AppealCommand::StartReview(cmd) => self.handle_start_review(cmd),
            AppealCommand::ApproveAppeal(cmd) => self.handle_approve(cmd),
            AppealCommand::RejectAppeal(cmd) => self.handle_reject(cmd),
            AppealCommand::FulfillAppeal(cmd) => self.handle_fulfill(cmd),
        }
    }
}

fn transition_message(base: &str, comment: &str) -> String {
    if comment.trim().is_empty() {
        base.to_string()
    } else {
        format!("{base}: {comment}")
    }
}

impl Appeal {
    fn ensure_exists(&self) -> EngineResult<()> {
        if !self.created {
            return Err(EngineError::appeal_not_found());
        }
        Ok(())
    }

    fn ensure_appeal_id(&self, appeal_id: AppealId) -> EngineResult<()> {
        if self.id != appeal_id {
            return Err(EngineError::validation("appeal_id mismatch"));
        }
        Ok(())
    }

    fn ensure_status(&self, allowed: &[AppealStatus], attempted: AppealStatus) -> EngineResult<()> {
        if !allowed.contains(&self.status) {
            return Err(EngineError::invalid_transition(
                self.status.as_str(),
                attempted.as_str(),
            ));
        }
        Ok(())
    }

    fn handle_submit(&self, cmd: &SubmitAppeal) -> EngineResult<Vec<AppealEvent>> {
        if self.created {
            return Err(EngineError::validation("appeal already submitted"));
        }
        if cmd.title.trim().is_empty() {
            return Err(EngineError::validation("title is required"));
        }
        if cmd.justification.trim().is_empty() {
            return Err(EngineError::validation("justification is required"));
        }
        if cmd.items.is_empty() {
            return Err(EngineError::validation(
                "appeal must request at least one item",
            ));
        }
        for (index, item) in cmd.items.iter().enumerate() {
            item.validate(index)?;
        }

        Ok(vec![AppealEvent::AppealSubmitted(cmd.clone())])
    }

    fn handle_start_review(&self, cmd: &StartReview) -> EngineResult<Vec<AppealEvent>> {
        self.ensure_exists()?;
        self.ensure_appeal_id(cmd.appeal_id)?;
        self.ensure_status(&[AppealStatus::Pending], AppealStatus::UnderReview)?;

        Ok(vec![AppealEvent::ReviewStarted(cmd.clone())])
    }

    fn handle_approve(&self, cmd: &ApproveAppeal) -> EngineResult<Vec<AppealEvent>> {
        self.ensure_exists()?;
        self.ensure_appeal_id(cmd.appeal_id)?;
        // An explicit review step is mandatory: pending -> approved is not
        // a legal shortcut.
        self.ensure_status(&[AppealStatus::UnderReview], AppealStatus::Approved)?;

        Ok(vec![AppealEvent::AppealApproved(cmd.clone())])
    }

    fn handle_reject(&self, cmd: &RejectAppeal) -> EngineResult<Vec<AppealEvent>> {
        self.ensure_exists()?;
        self.ensure_appeal_id(cmd.appeal_id)?;
        self.ensure_status(
            &[AppealStatus::Pending, AppealStatus::UnderReview],
            AppealStatus::Rejected,
        )?;

        Ok(vec![AppealEvent::AppealRejected(cmd.clone())])
    }

    fn handle_fulfill(&self, cmd: &FulfillAppeal) -> EngineResult<Vec<AppealEvent>> {
        self.ensure_exists()?;
        self.ensure_appeal_id(cmd.appeal_id)?;
        self.ensure_status(&[AppealStatus::Approved], AppealStatus::Fulfilled)?;

        Ok(vec![AppealEvent::AppealFulfilled(cmd.clone())])
    }
}
