use super::*;
use crate::lifecycle::{AssignmentKind, DispatchJob};
use shared::models::{
    AppSettings, GeoPoint, Merchant, MerchantAvailability, MerchantProduct, MerchantStatus, Product,
};
use shared::order::{
    CustomerSnapshot, ItemStatus, LifecycleEventType, OrderLineInput, OrderStatus,
};
use tokio::sync::mpsc;

fn create_test_manager() -> (OrdersManager, mpsc::Receiver<DispatchJob>) {
    let storage = MarketStorage::open_in_memory().unwrap();
    OrdersManager::with_storage(storage)
}

fn seed_product(manager: &OrdersManager, product_id: &str, base_price: f64) {
    manager
        .storage()
        .upsert_product(&Product {
            product_id: product_id.to_string(),
            name: format!("Product {product_id}"),
            sku: Some(format!("SKU-{product_id}")),
            unit: Some("pcs".to_string()),
            weight: Some(0.5),
            base_price,
            enabled: true,
        })
        .unwrap();
}

fn seed_merchant(manager: &OrdersManager, merchant_id: &str) {
    manager
        .storage()
        .upsert_merchant(&Merchant {
            merchant_id: merchant_id.to_string(),
            name: format!("Merchant {merchant_id}"),
            phone: Some("+910000000000".to_string()),
            email: None,
            active_status: MerchantStatus::Approved,
            location: GeoPoint::new(77.6, 12.97),
            availability: MerchantAvailability::default(),
            rating: Some(4.2),
        })
        .unwrap();
}

fn seed_stock(manager: &OrdersManager, merchant_id: &str, product_id: &str, price: f64, stock: u32) {
    manager
        .storage()
        .upsert_merchant_product(&MerchantProduct {
            merchant_id: merchant_id.to_string(),
            product_id: product_id.to_string(),
            price,
            stock,
            enabled: true,
            updated_at: 0,
        })
        .unwrap();
}

fn stock_of(manager: &OrdersManager, merchant_id: &str, product_id: &str) -> u32 {
    manager
        .storage()
        .get_merchant_product(merchant_id, product_id)
        .unwrap()
        .unwrap()
        .stock
}

fn update_settings(manager: &OrdersManager, f: impl FnOnce(&mut AppSettings)) {
    let mut settings = manager.settings().snapshot().unwrap();
    f(&mut settings);
    manager.settings().update(settings).unwrap();
}

fn customer() -> TriggeredBy {
    TriggeredBy::customer("c-1", "Asha")
}

fn admin() -> TriggeredBy {
    TriggeredBy::admin("a-1", "Ops")
}

fn merchant(merchant_id: &str) -> TriggeredBy {
    TriggeredBy::merchant(merchant_id, format!("Merchant {merchant_id}"))
}

fn customer_snapshot() -> CustomerSnapshot {
    CustomerSnapshot {
        customer_id: "c-1".to_string(),
        name: "Asha".to_string(),
        phone: Some("+919999999999".to_string()),
        address: Some("12 MG Road".to_string()),
        area: Some("Indiranagar".to_string()),
        location: Some(GeoPoint::new(77.64, 12.97)),
    }
}

fn create_order_action(lines: &[(&str, u32)]) -> CreateOrderAction {
    CreateOrderAction {
        customer: customer_snapshot(),
        items: lines
            .iter()
            .map(|(product_id, quantity)| OrderLineInput {
                product_id: product_id.to_string(),
                quantity: *quantity,
            })
            .collect(),
        payment_method: "cod".to_string(),
        delivery_instructions: None,
        delivery_distance_km: None,
    }
}

fn place_order(manager: &OrdersManager, lines: &[(&str, u32)]) -> Order {
    manager
        .create_order(&customer(), create_order_action(lines))
        .unwrap()
}

fn assign(manager: &OrdersManager, order: &Order, idx: usize, merchant_id: &str) -> Order {
    manager
        .assign_item(
            &admin(),
            AssignItemAction {
                order_id: order.order_id.clone(),
                item_id: order.items[idx].item_id.clone(),
                merchant_id: Some(merchant_id.to_string()),
                bypass_validation: false,
            },
        )
        .unwrap()
}

fn set_status(
    manager: &OrdersManager,
    actor: &TriggeredBy,
    order: &Order,
    idx: usize,
    status: ItemStatus,
) -> FulfillmentResult<Order> {
    manager.update_item_status(
        actor,
        UpdateItemStatusAction {
            order_id: order.order_id.clone(),
            item_id: order.items[idx].item_id.clone(),
            status,
            note: None,
        },
    )
}

fn drain(rx: &mut mpsc::Receiver<DispatchJob>) -> Vec<DispatchJob> {
    let mut jobs = Vec::new();
    while let Ok(job) = rx.try_recv() {
        jobs.push(job);
    }
    jobs
}

fn event_count(order: &Order, event_type: LifecycleEventType) -> usize {
    order
        .lifecycle
        .iter()
        .filter(|e| e.event_type == event_type)
        .count()
}
