//! CreateOrder command handler
//!
//! Validates lines, prices them, reserves stock across merchants and builds
//! the order with every item `pending`.

use chrono::Datelike;
use serde::Deserialize;
use shared::models::StockValidationMode;
use shared::order::{
    CustomerSnapshot, ItemStatus, LifecycleEventType, Order, OrderItem, OrderLineInput,
    OrderStatus, StatusHistoryEntry, TriggeredBy,
};

use crate::lifecycle::EventDraft;
use crate::orders::error::{FulfillmentError, FulfillmentResult};
use crate::orders::traits::{CommandContext, CommandHandler};
use crate::pricing::{self, DeliveryContext, PricedLine};

/// CreateOrder action
#[derive(Debug, Clone, Deserialize)]
pub struct CreateOrderAction {
    pub customer: CustomerSnapshot,
    pub items: Vec<OrderLineInput>,
    pub payment_method: String,
    #[serde(default)]
    pub delivery_instructions: Option<String>,
    /// Delivery distance for distance-based charges
    #[serde(default)]
    pub delivery_distance_km: Option<f64>,
}

impl CreateOrderAction {
    fn authorize(&self, actor: &TriggeredBy) -> FulfillmentResult<()> {
        match actor {
            TriggeredBy::Customer { user_id, .. } if *user_id == self.customer.customer_id => Ok(()),
            TriggeredBy::Customer { .. } => Err(FulfillmentError::Forbidden(
                "Customers may only place orders for themselves".to_string(),
            )),
            TriggeredBy::Admin { .. } | TriggeredBy::System => Ok(()),
            TriggeredBy::Merchant { .. } => Err(FulfillmentError::Forbidden(
                "Merchants cannot place orders".to_string(),
            )),
        }
    }

    fn validate(&self) -> FulfillmentResult<()> {
        if self.items.is_empty() {
            return Err(FulfillmentError::Validation(
                "Order must contain at least one item".to_string(),
            ));
        }
        if self.payment_method.trim().is_empty() {
            return Err(FulfillmentError::Validation(
                "Payment method is required".to_string(),
            ));
        }
        if self.customer.customer_id.trim().is_empty() {
            return Err(FulfillmentError::Validation(
                "Customer is required".to_string(),
            ));
        }
        if let Some(line) = self.items.iter().find(|l| l.quantity == 0) {
            return Err(FulfillmentError::Validation(format!(
                "Quantity for product {} must be positive",
                line.product_id
            )));
        }
        Ok(())
    }
}

impl CommandHandler for CreateOrderAction {
    fn execute(
        &self,
        ctx: &mut CommandContext<'_>,
        actor: &TriggeredBy,
    ) -> FulfillmentResult<Order> {
        // 1. Authorization + input
        self.authorize(actor)?;
        self.validate()?;

        let txn = ctx.txn();
        let storage = ctx.storage();
        let ledger = ctx.ledger();
        let now = ctx.now;

        // 2. Per line: availability check, price, reservation
        //    (later lines see earlier reservations of the same product)
        let mut items = Vec::with_capacity(self.items.len());
        let mut priced = Vec::with_capacity(self.items.len());
        for line in &self.items {
            let product = ctx.load_product(&line.product_id)?;
            if !product.enabled {
                return Err(FulfillmentError::Validation(format!(
                    "Product {} is not available",
                    product.name
                )));
            }

            let rows = storage.list_product_rows_txn(txn, &product.product_id)?;
            let available = ledger.total_available(txn, &product.product_id)?;
            if available < line.quantity {
                match ctx.settings.stock_validation {
                    StockValidationMode::Strict => {
                        return Err(FulfillmentError::OutOfStock {
                            product_id: product.product_id.clone(),
                            requested: line.quantity,
                            available,
                        });
                    }
                    StockValidationMode::Lenient => {
                        tracing::warn!(
                            product_id = %product.product_id,
                            requested = line.quantity,
                            available,
                            "Aggregate stock below requested quantity, accepting order"
                        );
                    }
                }
            }

            let unit_price = pricing::unit_price_for(&product, &rows, ctx.settings.price_display);
            let line_price = PricedLine {
                unit_price,
                quantity: line.quantity,
                weight: product.weight,
            };

            let reservation = ledger.reserve(txn, &product.product_id, line.quantity)?;
            if reservation.shortfall > 0 {
                tracing::warn!(
                    product_id = %product.product_id,
                    requested = line.quantity,
                    reserved = reservation.reserved(),
                    shortfall = reservation.shortfall,
                    "Stock reservation shortfall"
                );
            }

            items.push(OrderItem {
                item_id: uuid::Uuid::new_v4().to_string(),
                product_id: product.product_id.clone(),
                product_name: product.name.clone(),
                sku: product.sku.clone(),
                unit: product.unit.clone(),
                weight: product.weight,
                quantity: line.quantity,
                unit_price,
                total_price: line_price.total_price(),
                assigned_merchant_id: None,
                assigned_merchant_name: None,
                assigned_at: None,
                item_status: ItemStatus::Pending,
                rejected_by: Default::default(),
                allocations: reservation.allocations,
                stock_settled: false,
            });
            priced.push(line_price);
        }

        // 3. Totals
        let totals = pricing::calculate_order_totals(
            &priced,
            &DeliveryContext {
                distance_km: self.delivery_distance_km,
            },
            &ctx.settings,
        );
        if totals.subtotal < ctx.settings.min_order_value {
            return Err(FulfillmentError::Validation(format!(
                "Minimum order value is {:.2}, subtotal is {:.2}",
                ctx.settings.min_order_value, totals.subtotal
            )));
        }

        // 4. Order number: ORD + business date + daily sequence
        let local = ctx.local_now();
        let date = local.year() as u64 * 10000 + local.month() as u64 * 100 + local.day() as u64;
        let seq = storage.next_daily_sequence(txn, date)?;
        let order_number = format!("ORD{date}{seq:04}");

        let mut order = Order {
            order_id: uuid::Uuid::new_v4().to_string(),
            order_number,
            customer: self.customer.clone(),
            items,
            subtotal: totals.subtotal,
            tax: totals.tax,
            delivery_charge: totals.delivery_charge,
            platform_fee: totals.platform_fee,
            total_amount: totals.total_amount,
            payment_method: self.payment_method.clone(),
            delivery_instructions: self.delivery_instructions.clone(),
            order_status: OrderStatus::Pending,
            status_history: vec![StatusHistoryEntry {
                status: OrderStatus::Pending,
                timestamp: now,
                note: Some("Order placed".to_string()),
            }],
            lifecycle: Vec::new(),
            created_at: now,
            updated_at: now,
        };

        // 5. Lifecycle
        let draft = EventDraft::new(
            LifecycleEventType::OrderCreated,
            format!(
                "Order {} placed by {}",
                order.order_number, order.customer.name
            ),
        )
        .meta("orderNumber", order.order_number.as_str())
        .meta("itemCount", order.items.len())
        .meta("totalAmount", order.total_amount)
        .meta("paymentMethod", order.payment_method.as_str());
        ctx.record(&mut order, actor, draft);

        Ok(order)
    }
}
