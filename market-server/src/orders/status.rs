//! Order / item state machine
//!
//! Item: `pending → assigned → processing → shipped → delivered`,
//! `cancelled` reachable from pending / assigned / processing.
//!
//! Order status is derived from item statuses and never set by clients.

use shared::order::{ItemStatus, Order, OrderStatus, StatusHistoryEntry};

/// Derive the order status from its item statuses
///
/// Precedence (first match wins):
/// 1. all delivered → delivered
/// 2. all cancelled → cancelled
/// 3. any processing / assigned → processing
/// 4. any pending → pending
/// 5. any shipped → shipped
/// 6. otherwise → approved
pub fn derive_order_status(statuses: &[ItemStatus]) -> OrderStatus {
    let all = |s: ItemStatus| !statuses.is_empty() && statuses.iter().all(|x| *x == s);
    let any = |s: ItemStatus| statuses.contains(&s);

    if all(ItemStatus::Delivered) {
        OrderStatus::Delivered
    } else if all(ItemStatus::Cancelled) {
        OrderStatus::Cancelled
    } else if any(ItemStatus::Processing) || any(ItemStatus::Assigned) {
        OrderStatus::Processing
    } else if any(ItemStatus::Pending) {
        OrderStatus::Pending
    } else if any(ItemStatus::Shipped) {
        OrderStatus::Shipped
    } else {
        OrderStatus::Approved
    }
}

/// Check an item transition, returning the reason when rejected
pub fn check_item_transition(from: ItemStatus, to: ItemStatus) -> Result<(), String> {
    if from == to {
        return Err(format!("Item is already {from}"));
    }

    if to == ItemStatus::Cancelled {
        return if from.is_cancellable() {
            Ok(())
        } else {
            Err(format!("Cannot cancel an item that is {from}"))
        };
    }

    if to == ItemStatus::Pending || to == ItemStatus::Assigned {
        return Err(format!("Cannot move an item to {to} through a status update"));
    }

    match (from.progress(), to.progress()) {
        // pending 必须先指派
        (Some(0), _) => Err("Item must be assigned before it can progress".to_string()),
        (Some(a), Some(b)) if b > a => Ok(()),
        (None, _) => Err("Item is cancelled".to_string()),
        _ => Err(format!("Cannot move an item back from {from} to {to}")),
    }
}

/// Recompute the derived status and append history
///
/// A history entry is appended when the status changes, or when a note is
/// supplied (recorded against the current status). With `all_assigned_shortcut`
/// an order whose every item is assigned is marked `assigned` directly.
///
/// Returns whether the order status changed.
pub fn refresh_order_status(
    order: &mut Order,
    now: i64,
    note: Option<String>,
    all_assigned_shortcut: bool,
) -> bool {
    let next = if all_assigned_shortcut && order.all_items_assigned() {
        OrderStatus::Assigned
    } else {
        derive_order_status(&order.item_statuses())
    };

    let changed = next != order.order_status;
    order.order_status = next;

    if changed || note.is_some() {
        order.status_history.push(StatusHistoryEntry {
            status: next,
            timestamp: now,
            note,
        });
    }
    order.updated_at = now;
    changed
}
