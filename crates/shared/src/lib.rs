//! 共享库
//!
//! 包含模拟器各 crate 共用的配置、错误处理、重试策略与可观测性初始化代码。

pub mod config;
pub mod error;
pub mod events;
pub mod observability;
pub mod retry;
