//! Notification worker
//!
//! Consumes the outbox filled by committed commands:
//!
//! ```text
//! DispatchJob
//!     ├─ order_created → fan out to top-ranked eligible merchants per item
//!     ├─ generic dispatch of the event
//!     └─ attach outcome to the event (once)
//! ```
//!
//! Storage work runs on the blocking pool; no order or inventory row is held
//! while a webhook is in flight.

use shared::models::Merchant;
use shared::order::{ItemStatus, LifecycleEventType, NotificationOutcome};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::dispatcher::WebhookDispatcher;
use super::payload::WebhookPayload;
use crate::db::MarketStorage;
use crate::eligibility::{self, EligibilityQuery, MerchantEligibility, RankedMerchant};
use crate::lifecycle::{DispatchJob, LifecycleLog};

/// Smart notification targeting parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SmartConfig {
    pub max_distance_km: f64,
    pub max_current_orders: u32,
    pub top_n: usize,
}

impl Default for SmartConfig {
    fn default() -> Self {
        Self {
            max_distance_km: 15.0,
            max_current_orders: 10,
            top_n: 5,
        }
    }
}

pub struct NotificationWorker {
    storage: MarketStorage,
    lifecycle: LifecycleLog,
    eligibility: MerchantEligibility,
    dispatcher: WebhookDispatcher,
    smart: SmartConfig,
    tz: chrono_tz::Tz,
}

impl NotificationWorker {
    pub fn new(
        storage: MarketStorage,
        lifecycle: LifecycleLog,
        dispatcher: WebhookDispatcher,
        smart: SmartConfig,
        tz: chrono_tz::Tz,
    ) -> Self {
        Self {
            eligibility: MerchantEligibility::new(storage.clone()),
            storage,
            lifecycle,
            dispatcher,
            smart,
            tz,
        }
    }

    /// Run until the channel closes or shutdown is requested
    pub async fn run(self, mut rx: mpsc::Receiver<DispatchJob>, shutdown: CancellationToken) {
        tracing::info!(
            webhook_enabled = self.dispatcher.config().target().is_some(),
            "Notification worker started"
        );

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    tracing::info!("Notification worker received shutdown signal");
                    break;
                }
                job = rx.recv() => match job {
                    Some(job) => {
                        self.handle(job).await;
                    }
                    None => {
                        tracing::info!("Notification outbox closed");
                        break;
                    }
                },
            }
        }
    }

    /// Process one job; returns the outcome of the generic dispatch
    pub async fn handle(&self, job: DispatchJob) -> NotificationOutcome {
        if job.event.event_type == LifecycleEventType::OrderCreated {
            self.fan_out(&job).await;
        }

        let mut payload = WebhookPayload::from_job(&job);
        if let Some(assignment) = &job.assignment {
            if let Some(merchant) = self.load_merchant(&assignment.merchant_id).await {
                payload = payload.with_merchant(&merchant);
            }
        }

        let outcome = self.dispatcher.dispatch(&payload).await;
        self.attach(&job, outcome.clone()).await;
        outcome
    }

    /// One notification per top-ranked merchant per item
    async fn fan_out(&self, job: &DispatchJob) {
        let Some(location) = job.order.customer.location.filter(|p| !p.is_unset()) else {
            tracing::debug!(
                order_id = %job.order.order_id,
                "Customer location unknown, merchant fan-out skipped"
            );
            return;
        };
        if self.dispatcher.config().target().is_none() {
            return;
        }

        let base = WebhookPayload::from_job(job);
        for item in job
            .order
            .items
            .iter()
            .filter(|i| i.item_status == ItemStatus::Pending)
        {
            let query = EligibilityQuery {
                product_id: item.product_id.clone(),
                customer_location: location,
                max_distance_km: self.smart.max_distance_km,
                max_current_orders: self.smart.max_current_orders,
            };
            let candidates = self.ranked_candidates(query).await;
            tracing::debug!(
                order_id = %job.order.order_id,
                item_id = %item.item_id,
                candidates = candidates.len(),
                "Smart notification targets"
            );

            for candidate in &candidates {
                let payload = base.clone().for_candidate(&item.item_id, candidate);
                let outcome = self.dispatcher.dispatch(&payload).await;
                if !outcome.sent {
                    tracing::warn!(
                        order_id = %job.order.order_id,
                        item_id = %item.item_id,
                        merchant_id = %candidate.merchant.merchant_id,
                        error = outcome.error.as_deref().unwrap_or_default(),
                        "Merchant notification failed"
                    );
                }
            }
        }
    }

    async fn ranked_candidates(&self, query: EligibilityQuery) -> Vec<RankedMerchant> {
        let finder = self.eligibility.clone();
        let tz = self.tz;
        let top_n = self.smart.top_n;
        let result = tokio::task::spawn_blocking(move || {
            let now = chrono::Utc::now();
            let local_now = now.with_timezone(&tz).naive_local();
            finder
                .find_eligible(&query, local_now)
                .map(|eligible| eligibility::rank(eligible, now.timestamp_millis(), top_n))
        })
        .await;

        match result {
            Ok(Ok(ranked)) => ranked,
            Ok(Err(e)) => {
                tracing::error!(error = %e, "Eligible merchant lookup failed");
                Vec::new()
            }
            Err(e) => {
                tracing::error!(error = %e, "Eligible merchant lookup panicked");
                Vec::new()
            }
        }
    }

    async fn load_merchant(&self, merchant_id: &str) -> Option<Merchant> {
        let storage = self.storage.clone();
        let merchant_id = merchant_id.to_string();
        match tokio::task::spawn_blocking(move || storage.get_merchant(&merchant_id)).await {
            Ok(Ok(merchant)) => merchant,
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "Failed to load merchant for notification");
                None
            }
            Err(e) => {
                tracing::error!(error = %e, "Merchant lookup panicked");
                None
            }
        }
    }

    async fn attach(&self, job: &DispatchJob, outcome: NotificationOutcome) {
        let lifecycle = self.lifecycle.clone();
        let order_id = job.order.order_id.clone();
        let event_id = job.event.event_id.clone();
        let result = tokio::task::spawn_blocking(move || {
            lifecycle.attach_outcome(&order_id, &event_id, outcome)
        })
        .await;

        match result {
            Ok(Ok(true)) => {}
            Ok(Ok(false)) => {
                tracing::debug!(
                    order_id = %job.order.order_id,
                    event_id = %job.event.event_id,
                    "Notification outcome not attached (event gone or already notified)"
                );
            }
            Ok(Err(e)) => {
                tracing::error!(
                    order_id = %job.order.order_id,
                    event_id = %job.event.event_id,
                    error = %e,
                    "Failed to attach notification outcome"
                );
            }
            Err(e) => {
                tracing::error!(error = %e, "Outcome patch panicked");
            }
        }
    }
}
