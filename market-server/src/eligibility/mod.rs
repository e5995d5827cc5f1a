//! 商户资格筛选与智能排序
//!
//! 只用于通知目标选择，自动指派不使用这里的评分。

mod finder;

pub use finder::{EligibilityQuery, EligibleMerchant, MerchantEligibility, RankedMerchant, rank};
