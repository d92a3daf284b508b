//! 观察者通知
//!
//! 每条主记录发出一条通知，发送即忘：没有订阅者时忽略，
//! 落后的订阅者由 broadcast 通道丢弃旧消息，生成循环从不阻塞。

use serde::Serialize;
use tokio::sync::broadcast;
use traffic_shared::events::{EventKind, Severity};

/// 默认通道容量
pub const DEFAULT_CAPACITY: usize = 1024;

/// 单条事件通知
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EventNotice {
    /// 从 1 开始的全局序号，跨启停持续递增
    pub sequence: u64,
    pub event: EventKind,
    pub severity: Severity,
}

/// 事件通知广播器
#[derive(Debug, Clone)]
pub struct EventNotifier {
    sender: broadcast::Sender<EventNotice>,
}

impl EventNotifier {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn notify(&self, notice: EventNotice) {
        // 没有订阅者时 send 返回错误，直接忽略
        let _ = self.sender.send(notice);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<EventNotice> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventNotifier {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
