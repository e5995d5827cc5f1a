//! 通知规则表
//!
//! Static per-event-type table of audiences and channels. The orchestrator
//! decides delivery; the table is echoed in every payload.

use serde::Serialize;
use shared::order::LifecycleEventType;

/// Channels enabled for one audience
#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
pub struct Channels {
    pub sms: bool,
    pub whatsapp: bool,
    pub email: bool,
}

impl Channels {
    const NONE: Channels = Channels {
        sms: false,
        whatsapp: false,
        email: false,
    };
    const SMS: Channels = Channels {
        sms: true,
        whatsapp: false,
        email: false,
    };
    const EMAIL: Channels = Channels {
        sms: false,
        whatsapp: false,
        email: true,
    };
    const MESSAGING: Channels = Channels {
        sms: true,
        whatsapp: true,
        email: false,
    };
    const ALL: Channels = Channels {
        sms: true,
        whatsapp: true,
        email: true,
    };

    pub fn any(&self) -> bool {
        self.sms || self.whatsapp || self.email
    }
}

/// Audiences for one event type
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct NotificationRules {
    pub customer: Channels,
    pub merchant: Channels,
    pub admin: Channels,
}

/// Rules for an event type
pub fn rules_for(event_type: LifecycleEventType) -> NotificationRules {
    use LifecycleEventType::*;

    let (customer, merchant, admin) = match event_type {
        OrderCreated => (Channels::MESSAGING, Channels::MESSAGING, Channels::EMAIL),
        OrderAssigned => (Channels::SMS, Channels::MESSAGING, Channels::NONE),
        OrderAccepted => (Channels::MESSAGING, Channels::NONE, Channels::EMAIL),
        OrderRejected => (Channels::NONE, Channels::NONE, Channels::EMAIL),
        OrderShipped => (Channels::MESSAGING, Channels::NONE, Channels::NONE),
        OrderDelivered => (Channels::ALL, Channels::SMS, Channels::EMAIL),
        OrderCancelled => (Channels::ALL, Channels::MESSAGING, Channels::EMAIL),
        PaymentConfirmed => (Channels::ALL, Channels::NONE, Channels::NONE),
        PaymentFailed => (Channels::MESSAGING, Channels::NONE, Channels::EMAIL),
        StockUpdated => (Channels::NONE, Channels::EMAIL, Channels::EMAIL),
        RefundInitiated => (Channels::EMAIL, Channels::NONE, Channels::EMAIL),
        RefundCompleted => (Channels::ALL, Channels::NONE, Channels::NONE),
    };

    NotificationRules {
        customer,
        merchant,
        admin,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejection_only_reaches_admin() {
        let rules = rules_for(LifecycleEventType::OrderRejected);
        assert!(!rules.customer.any());
        assert!(!rules.merchant.any());
        assert!(rules.admin.email);
    }

    #[test]
    fn test_created_notifies_merchants() {
        let rules = rules_for(LifecycleEventType::OrderCreated);
        assert!(rules.merchant.whatsapp);
        assert!(rules.customer.sms);
    }

    #[test]
    fn test_rules_serialize_flat() {
        let json = serde_json::to_value(rules_for(LifecycleEventType::OrderShipped)).unwrap();
        assert_eq!(json["customer"]["whatsapp"], true);
        assert_eq!(json["admin"]["email"], false);
    }
}
