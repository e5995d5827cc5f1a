//! 集成测试公共工具
//!
//! 每个测试使用独立的临时目录和磁盘 redb 数据库。

#![allow(dead_code)]

use std::sync::Arc;

use market_server::orders::CreateOrderAction;
use market_server::{Config, MarketStorage, OrdersManager, ServerState};
use shared::models::{
    GeoPoint, Merchant, MerchantAvailability, MerchantProduct, MerchantStatus, Product,
};
use shared::order::{CustomerSnapshot, OrderLineInput, TriggeredBy};
use tempfile::TempDir;

/// 测试服务器状态 (持有临时目录，drop 时删除)
pub struct TestEnv {
    pub state: ServerState,
    _dir: TempDir,
}

impl TestEnv {
    pub fn new() -> Self {
        Self::with_config(|_| {})
    }

    pub fn with_config(f: impl FnOnce(&mut Config)) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::with_overrides(dir.path().to_string_lossy(), 0);
        f(&mut config);
        let storage = MarketStorage::open(config.database_path()).unwrap();
        Self {
            state: ServerState::with_storage(config, storage),
            _dir: dir,
        }
    }

    pub fn orders(&self) -> Arc<OrdersManager> {
        self.state.orders()
    }

    pub fn storage(&self) -> &MarketStorage {
        &self.state.storage
    }

    pub fn seed_product(&self, product_id: &str, base_price: f64) {
        self.storage()
            .upsert_product(&Product {
                product_id: product_id.to_string(),
                name: format!("Product {product_id}"),
                sku: None,
                unit: Some("kg".to_string()),
                weight: None,
                base_price,
                enabled: true,
            })
            .unwrap();
    }

    /// 商户位于 (77.6, 12.97)，默认营业
    pub fn seed_merchant(&self, merchant_id: &str) {
        self.storage()
            .upsert_merchant(&Merchant {
                merchant_id: merchant_id.to_string(),
                name: format!("Merchant {merchant_id}"),
                phone: Some("+910000000001".to_string()),
                email: None,
                active_status: MerchantStatus::Approved,
                location: GeoPoint::new(77.6, 12.97),
                availability: MerchantAvailability::default(),
                rating: Some(4.0),
            })
            .unwrap();
    }

    pub fn seed_stock(&self, merchant_id: &str, product_id: &str, price: f64, stock: u32) {
        self.storage()
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

    pub fn stock_of(&self, merchant_id: &str, product_id: &str) -> u32 {
        self.storage()
            .get_merchant_product(merchant_id, product_id)
            .unwrap()
            .map(|row| row.stock)
            .unwrap_or(0)
    }
}

pub fn customer(customer_id: &str) -> TriggeredBy {
    TriggeredBy::customer(customer_id, format!("Customer {customer_id}"))
}

pub fn merchant(merchant_id: &str) -> TriggeredBy {
    TriggeredBy::merchant(merchant_id, format!("Merchant {merchant_id}"))
}

pub fn admin() -> TriggeredBy {
    TriggeredBy::admin("a-1", "Ops")
}

/// 下单请求，顾客位于商户附近 (约 4km)
pub fn order_request(customer_id: &str, lines: &[(&str, u32)]) -> CreateOrderAction {
    CreateOrderAction {
        customer: CustomerSnapshot {
            customer_id: customer_id.to_string(),
            name: format!("Customer {customer_id}"),
            phone: Some("+919999999999".to_string()),
            address: Some("12 MG Road".to_string()),
            area: None,
            location: Some(GeoPoint::new(77.64, 12.97)),
        },
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
