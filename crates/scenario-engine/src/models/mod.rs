//! 模拟数据模型
//!
//! 包含模拟用户（Actor）与商品（Product），用于驱动合成流量。

pub mod actor;
pub mod product;

pub use actor::{Actor, ActorProfile, ActorState, DeviceType};
pub use product::{Price, Product};
