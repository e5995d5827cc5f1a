//! LifecycleLog - append-only business event log embedded in orders
//!
//! ```text
//! state change (write txn)
//!     ├─ append(order, actor, draft)   → event pushed onto order.lifecycle
//!     ├─ commit
//!     └─ publish(jobs)                 → bounded outbox (never blocks)
//!
//! NotificationWorker
//!     ├─ dispatch(job)
//!     └─ attach_outcome(order, event)  → notificationSent.n8n, once
//! ```
//!
//! Recording never rolls back because of a dispatch failure.

use serde::Serialize;
use serde_json::{Map, Value};
use shared::order::{LifecycleEvent, LifecycleEventType, NotificationOutcome, Order, TriggeredBy};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use crate::db::{MarketStorage, StorageResult};
use crate::orders::{FulfillmentError, FulfillmentResult};

/// Outcome errors for jobs that never reached the worker
pub const OUTBOX_FULL: &str = "Notification outbox full";
pub const WORKER_STOPPED: &str = "Notification worker stopped";

/// How an item got its merchant
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AssignmentKind {
    Manual,
    Auto,
    Claim,
}

impl AssignmentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssignmentKind::Manual => "manual",
            AssignmentKind::Auto => "auto",
            AssignmentKind::Claim => "claim",
        }
    }
}

/// Assignment details carried to the webhook
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentData {
    pub merchant_id: String,
    pub merchant_name: String,
    pub assignment_type: AssignmentKind,
    pub assigned_at: i64,
}

/// An event about to be appended
#[derive(Debug, Clone)]
pub struct EventDraft {
    pub event_type: LifecycleEventType,
    pub description: String,
    pub metadata: Map<String, Value>,
    pub item_id: Option<String>,
    pub assignment: Option<AssignmentData>,
}

impl EventDraft {
    pub fn new(event_type: LifecycleEventType, description: impl Into<String>) -> Self {
        Self {
            event_type,
            description: description.into(),
            metadata: Map::new(),
            item_id: None,
            assignment: None,
        }
    }

    pub fn meta(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.to_string(), value.into());
        self
    }

    pub fn with_metadata(mut self, metadata: Map<String, Value>) -> Self {
        self.metadata.extend(metadata);
        self
    }

    pub fn item(mut self, item_id: impl Into<String>) -> Self {
        self.item_id = Some(item_id.into());
        self
    }

    pub fn assignment(mut self, assignment: AssignmentData) -> Self {
        self.assignment = Some(assignment);
        self
    }
}

/// Reference to an appended event awaiting dispatch
#[derive(Debug, Clone)]
pub struct PendingDispatch {
    pub event_id: String,
    pub item_id: Option<String>,
    pub assignment: Option<AssignmentData>,
}

/// Unit of work for the notification worker
///
/// Carries the committed order snapshot so the worker never reads the
/// order back while dispatching.
#[derive(Debug, Clone)]
pub struct DispatchJob {
    pub order: Order,
    pub event: LifecycleEvent,
    pub item_id: Option<String>,
    pub assignment: Option<AssignmentData>,
}

#[derive(Debug, Clone)]
pub struct LifecycleLog {
    storage: MarketStorage,
    outbox: mpsc::Sender<DispatchJob>,
}

impl LifecycleLog {
    pub fn new(storage: MarketStorage, outbox: mpsc::Sender<DispatchJob>) -> Self {
        Self { storage, outbox }
    }

    /// Append an event to the order (in memory; persisted with the order)
    pub fn append(order: &mut Order, actor: &TriggeredBy, draft: EventDraft) -> PendingDispatch {
        Self::append_event(order, actor, draft).1
    }

    fn append_event(
        order: &mut Order,
        actor: &TriggeredBy,
        draft: EventDraft,
    ) -> (LifecycleEvent, PendingDispatch) {
        let event = LifecycleEvent::new(
            draft.event_type,
            actor.clone(),
            draft.metadata,
            draft.description,
        );
        tracing::debug!(
            order_id = %order.order_id,
            event_id = %event.event_id,
            event_type = %event.event_type,
            "Lifecycle event appended"
        );
        let pending = PendingDispatch {
            event_id: event.event_id.clone(),
            item_id: draft.item_id,
            assignment: draft.assignment,
        };
        order.lifecycle.push(event.clone());
        (event, pending)
    }

    /// Build dispatch jobs against the committed order snapshot
    pub fn jobs_for(order: &Order, pending: Vec<PendingDispatch>) -> Vec<DispatchJob> {
        pending
            .into_iter()
            .filter_map(|p| {
                let event = order.event(&p.event_id)?.clone();
                Some(DispatchJob {
                    order: order.clone(),
                    event,
                    item_id: p.item_id,
                    assignment: p.assignment,
                })
            })
            .collect()
    }

    /// Hand jobs to the notification worker (fire-and-forget)
    ///
    /// A job the outbox cannot take is marked as a failed dispatch on its
    /// event, so it never stays without an outcome.
    pub fn publish(&self, jobs: Vec<DispatchJob>) {
        for job in jobs {
            let (job, reason) = match self.outbox.try_send(job) {
                Ok(()) => continue,
                Err(TrySendError::Full(job)) => (job, OUTBOX_FULL),
                Err(TrySendError::Closed(job)) => (job, WORKER_STOPPED),
            };
            tracing::warn!(
                order_id = %job.order.order_id,
                event_id = %job.event.event_id,
                event_type = %job.event.event_type,
                reason,
                "Notification dispatch skipped"
            );
            self.mark_undelivered(&job, reason);
        }
    }

    fn mark_undelivered(&self, job: &DispatchJob, reason: &str) {
        let outcome = NotificationOutcome {
            sent: false,
            sent_at: shared::util::now_millis(),
            attempts: 0,
            response: None,
            error: Some(reason.to_string()),
        };
        if let Err(e) = self.attach_outcome(&job.order.order_id, &job.event.event_id, outcome) {
            tracing::error!(
                order_id = %job.order.order_id,
                event_id = %job.event.event_id,
                error = %e,
                "Failed to record skipped dispatch"
            );
        }
    }

    /// Re-publish every stored event that has no dispatch outcome yet
    ///
    /// Covers jobs lost when the process stopped with a non-empty outbox.
    /// Item ids are recovered from `itemId` metadata; assignment details
    /// are not. Returns the number of jobs handed over.
    pub fn requeue_unnotified(&self) -> StorageResult<usize> {
        let mut jobs = Vec::new();
        for order in self.storage.list_orders()? {
            for event in order.lifecycle.iter().filter(|e| !e.is_notified()) {
                jobs.push(DispatchJob {
                    order: order.clone(),
                    event: event.clone(),
                    item_id: event
                        .metadata
                        .get("itemId")
                        .and_then(Value::as_str)
                        .map(str::to_string),
                    assignment: None,
                });
            }
        }

        let count = jobs.len();
        if count > 0 {
            tracing::info!(count, "Re-publishing undelivered lifecycle events");
        }
        self.publish(jobs);
        Ok(count)
    }

    /// Append an event to a stored order and publish it
    ///
    /// Used for events raised outside the order state machine
    /// (payments, refunds, stock adjustments).
    pub fn record(
        &self,
        order_id: &str,
        actor: &TriggeredBy,
        draft: EventDraft,
    ) -> FulfillmentResult<LifecycleEvent> {
        let txn = self.storage.begin_write()?;
        let mut order = self
            .storage
            .get_order_txn(&txn, order_id)?
            .ok_or_else(|| FulfillmentError::OrderNotFound(order_id.to_string()))?;

        let (event, pending) = Self::append_event(&mut order, actor, draft);
        order.updated_at = shared::util::now_millis();
        self.storage.store_order(&txn, &order)?;
        txn.commit()?;

        tracing::info!(
            order_id = %order_id,
            event_type = %event.event_type,
            user_type = actor.user_type(),
            "Lifecycle event recorded"
        );
        self.publish(Self::jobs_for(&order, vec![pending]));
        Ok(event)
    }

    /// Attach the dispatch outcome to an event, once
    ///
    /// Returns `false` when the order or event is gone, or an outcome is
    /// already attached.
    pub fn attach_outcome(
        &self,
        order_id: &str,
        event_id: &str,
        outcome: NotificationOutcome,
    ) -> StorageResult<bool> {
        let txn = self.storage.begin_write()?;
        let Some(mut order) = self.storage.get_order_txn(&txn, order_id)? else {
            return Ok(false);
        };
        let Some(event) = order.event_mut(event_id) else {
            return Ok(false);
        };
        if event.is_notified() {
            return Ok(false);
        }
        event.notification_sent.n8n = Some(outcome);

        self.storage.store_order(&txn, &order)?;
        txn.commit()?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::order::{CustomerSnapshot, OrderStatus};

    fn order() -> Order {
        Order {
            order_id: "o-1".to_string(),
            order_number: "ORD202610160001".to_string(),
            customer: CustomerSnapshot {
                customer_id: "c-1".to_string(),
                name: "Asha".to_string(),
                phone: None,
                address: None,
                area: None,
                location: None,
            },
            items: vec![],
            subtotal: 0.0,
            tax: 0.0,
            delivery_charge: 0.0,
            platform_fee: 0.0,
            total_amount: 0.0,
            payment_method: "cod".to_string(),
            delivery_instructions: None,
            order_status: OrderStatus::Pending,
            status_history: vec![],
            lifecycle: vec![],
            created_at: 0,
            updated_at: 0,
        }
    }

    fn log(storage: &MarketStorage) -> (LifecycleLog, mpsc::Receiver<DispatchJob>) {
        let (tx, rx) = mpsc::channel(8);
        (LifecycleLog::new(storage.clone(), tx), rx)
    }

    fn seed(storage: &MarketStorage, order: &Order) {
        let txn = storage.begin_write().unwrap();
        storage.store_order(&txn, order).unwrap();
        txn.commit().unwrap();
    }

    fn outcome(sent: bool) -> NotificationOutcome {
        NotificationOutcome {
            sent,
            sent_at: 1,
            attempts: 1,
            response: None,
            error: None,
        }
    }

    #[test]
    fn test_record_persists_and_publishes() {
        let storage = MarketStorage::open_in_memory().unwrap();
        seed(&storage, &order());
        let (log, mut rx) = log(&storage);

        let draft = EventDraft::new(LifecycleEventType::PaymentConfirmed, "Payment captured")
            .meta("amount", 250.0);
        let event = log.record("o-1", &TriggeredBy::System, draft).unwrap();

        let stored = storage.get_order("o-1").unwrap().unwrap();
        assert_eq!(stored.lifecycle.len(), 1);
        assert_eq!(stored.lifecycle[0].metadata["amount"], 250.0);

        let job = rx.try_recv().unwrap();
        assert_eq!(job.event.event_id, event.event_id);
        assert_eq!(job.order.lifecycle.len(), 1);
    }

    #[test]
    fn test_record_unknown_order() {
        let storage = MarketStorage::open_in_memory().unwrap();
        let (log, _rx) = log(&storage);
        let err = log
            .record(
                "missing",
                &TriggeredBy::System,
                EventDraft::new(LifecycleEventType::RefundInitiated, "Refund"),
            )
            .unwrap_err();
        assert!(matches!(err, FulfillmentError::OrderNotFound(_)));
    }

    #[test]
    fn test_outcome_attached_once() {
        let storage = MarketStorage::open_in_memory().unwrap();
        let mut o = order();
        let pending = LifecycleLog::append(
            &mut o,
            &TriggeredBy::System,
            EventDraft::new(LifecycleEventType::OrderCreated, "Order placed"),
        );
        seed(&storage, &o);
        let (log, _rx) = log(&storage);

        assert!(log.attach_outcome("o-1", &pending.event_id, outcome(false)).unwrap());
        assert!(!log.attach_outcome("o-1", &pending.event_id, outcome(true)).unwrap());

        let stored = storage.get_order("o-1").unwrap().unwrap();
        let n8n = stored.lifecycle[0].notification_sent.n8n.as_ref().unwrap();
        assert!(!n8n.sent);
    }

    #[test]
    fn test_publish_never_blocks_when_full() {
        let storage = MarketStorage::open_in_memory().unwrap();
        let (tx, mut rx) = mpsc::channel(1);
        let log = LifecycleLog::new(storage.clone(), tx);

        let mut o = order();
        let a = LifecycleLog::append(
            &mut o,
            &TriggeredBy::System,
            EventDraft::new(LifecycleEventType::OrderCreated, "a"),
        );
        let b = LifecycleLog::append(
            &mut o,
            &TriggeredBy::System,
            EventDraft::new(LifecycleEventType::StockUpdated, "b"),
        );
        seed(&storage, &o);
        log.publish(LifecycleLog::jobs_for(&o, vec![a, b.clone()]));

        assert!(rx.try_recv().is_ok());
        assert!(rx.try_recv().is_err());

        // 被丢弃的任务记录为派发失败
        let stored = storage.get_order("o-1").unwrap().unwrap();
        assert!(!stored.lifecycle[0].is_notified());
        let skipped = stored.event(&b.event_id).unwrap();
        let n8n = skipped.notification_sent.n8n.as_ref().unwrap();
        assert!(!n8n.sent);
        assert_eq!(n8n.attempts, 0);
        assert_eq!(n8n.error.as_deref(), Some(OUTBOX_FULL));
    }

    #[test]
    fn test_publish_after_worker_stopped_records_failure() {
        let storage = MarketStorage::open_in_memory().unwrap();
        let (tx, rx) = mpsc::channel(8);
        drop(rx);
        let log = LifecycleLog::new(storage.clone(), tx);

        let mut o = order();
        let pending = LifecycleLog::append(
            &mut o,
            &TriggeredBy::System,
            EventDraft::new(LifecycleEventType::PaymentFailed, "Card declined"),
        );
        seed(&storage, &o);
        log.publish(LifecycleLog::jobs_for(&o, vec![pending]));

        let stored = storage.get_order("o-1").unwrap().unwrap();
        let n8n = stored.lifecycle[0].notification_sent.n8n.as_ref().unwrap();
        assert_eq!(n8n.error.as_deref(), Some(WORKER_STOPPED));
    }

    #[test]
    fn test_requeue_unnotified_skips_attached_events() {
        let storage = MarketStorage::open_in_memory().unwrap();
        let mut o = order();
        let done = LifecycleLog::append(
            &mut o,
            &TriggeredBy::System,
            EventDraft::new(LifecycleEventType::OrderCreated, "Order placed"),
        );
        LifecycleLog::append(
            &mut o,
            &TriggeredBy::System,
            EventDraft::new(LifecycleEventType::OrderRejected, "Rejected").meta("itemId", "i-1"),
        );
        seed(&storage, &o);
        let (log, mut rx) = log(&storage);
        assert!(log.attach_outcome("o-1", &done.event_id, outcome(true)).unwrap());

        assert_eq!(log.requeue_unnotified().unwrap(), 1);
        let job = rx.try_recv().unwrap();
        assert_eq!(job.event.event_type, LifecycleEventType::OrderRejected);
        assert_eq!(job.item_id.as_deref(), Some("i-1"));
        assert!(job.assignment.is_none());
        assert!(rx.try_recv().is_err());
    }
}
