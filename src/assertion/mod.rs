/// 断言模块 - 对响应状态码与耗时进行检查
mod rule;

pub use rule::{AssertionRule, CheckOutcome};
