//! CLI 模块
//!
//! - `serve` - 启动生成循环与 HTTP/WebSocket 控制面
//! - `generate` - 同步执行固定数量的 tick 并输出记录
//!
//! # 使用示例
//!
//! ```bash
//! # 启动服务（默认立即开始生成）
//! traffic-sim serve --port 3000
//!
//! # 启动服务但等待控制面的 start 指令
//! traffic-sim serve --no-autostart
//!
//! # 生成 500 个 tick 的记录到文件
//! traffic-sim generate -c 500 --seed 42 -o events.jsonl
//! ```

pub mod commands;
pub mod runner;

pub use commands::{Cli, Commands};
pub use runner::CommandRunner;
