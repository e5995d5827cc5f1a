//! 订单生命周期事件日志
//!
//! 事件追加在订单文档内，随订单一起提交；提交后投递到通知发件箱。

mod log;

pub use log::{
    AssignmentData, AssignmentKind, DispatchJob, EventDraft, LifecycleLog, OUTBOX_FULL,
    PendingDispatch, WORKER_STOPPED,
};
