//! Traffic Server
//!
//! 合成流量模拟器的进程外壳：命令行入口、HTTP 启停控制面、
//! WebSocket 事件推送以及可选的静态前端。

pub mod cli;
pub mod routes;
pub mod state;

pub use routes::app;
pub use state::AppState;
