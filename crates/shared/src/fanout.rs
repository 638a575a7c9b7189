//! 街区实时推送（fan-out）
//!
//! 将"已连接客户端/房间"的全局注册表抽象为可注入的发布订阅接口：
//! - `EventBroker`：`publish(topic, event)` 与 `subscribe(topic) -> Stream`
//! - `InMemoryBroker`：基于 tokio broadcast 的进程内实现，每个主题一个通道
//! - `FanoutPublisher`：业务侧使用的发送封装，失败或超时只记录日志，绝不影响主流程
//!
//! 投递语义为至多一次、尽力而为：无确认、无重放；同一主题内按发布顺序投递，
//! 跨主题不保证顺序。

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use futures::StreamExt;
use futures::stream::BoxStream;
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::config::FanoutConfig;
use crate::error::Result;
use crate::events::{EventKind, FanoutEvent, Topic};

/// 发布订阅接口
///
/// 业务核心只依赖此接口，不依赖任何具体传输实现。
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EventBroker: Send + Sync {
    /// 发布事件到主题，返回本次投递到的订阅者数量
    async fn publish(&self, topic: &Topic, event: FanoutEvent) -> Result<usize>;

    /// 订阅主题，返回此刻之后发布到该主题的事件流
    fn subscribe(&self, topic: &Topic) -> BoxStream<'static, FanoutEvent>;
}

// ---------------------------------------------------------------------------
// InMemoryBroker
// ---------------------------------------------------------------------------

/// 进程内广播器
///
/// 使用 DashMap 按主题维护 broadcast 通道，首次订阅时创建。
/// 慢订阅者超出缓冲后会丢失最旧事件（记录告警后继续接收）。
pub struct InMemoryBroker {
    channels: DashMap<String, broadcast::Sender<FanoutEvent>>,
    capacity: usize,
}

impl InMemoryBroker {
    pub fn new(capacity: usize) -> Self {
        Self {
            channels: DashMap::new(),
            capacity: capacity.max(1),
        }
    }

    pub fn from_config(config: &FanoutConfig) -> Self {
        Self::new(config.channel_capacity)
    }

    /// 当前主题的订阅者数量
    pub fn subscriber_count(&self, topic: &Topic) -> usize {
        self.channels
            .get(&topic.to_string())
            .map(|tx| tx.receiver_count())
            .unwrap_or(0)
    }
}

impl Default for InMemoryBroker {
    fn default() -> Self {
        Self::from_config(&FanoutConfig::default())
    }
}

#[async_trait]
impl EventBroker for InMemoryBroker {
    async fn publish(&self, topic: &Topic, event: FanoutEvent) -> Result<usize> {
        let key = topic.to_string();

        let delivered = match self.channels.get(&key) {
            Some(tx) => tx.send(event).unwrap_or(0),
            None => 0,
        };

        // 无订阅者的主题及时回收，避免街区名无限增长
        if delivered == 0 {
            self.channels.remove_if(&key, |_, tx| tx.receiver_count() == 0);
        }

        debug!(topic = %key, delivered, "fan-out 事件已发布");
        Ok(delivered)
    }

    fn subscribe(&self, topic: &Topic) -> BoxStream<'static, FanoutEvent> {
        let key = topic.to_string();
        // 持有 entry 期间完成订阅，publish 的回收无法在两者之间移除通道
        let rx = self
            .channels
            .entry(key.clone())
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .subscribe();
        debug!(topic = %key, "新增 fan-out 订阅");

        futures::stream::unfold((rx, key), |(mut rx, key)| async move {
            loop {
                match rx.recv().await {
                    Ok(event) => return Some((event, (rx, key))),
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(topic = %key, skipped, "订阅者处理过慢，已丢弃部分事件");
                    }
                    Err(broadcast::error::RecvError::Closed) => return None,
                }
            }
        })
        .boxed()
    }
}

// ---------------------------------------------------------------------------
// FanoutPublisher
// ---------------------------------------------------------------------------

/// 业务侧推送封装
///
/// 推送失败、超时或序列化失败都只记录告警，调用方无需处理结果。
#[derive(Clone)]
pub struct FanoutPublisher {
    broker: Arc<dyn EventBroker>,
    timeout: Duration,
}

impl FanoutPublisher {
    pub fn new(broker: Arc<dyn EventBroker>, config: &FanoutConfig) -> Self {
        Self {
            broker,
            timeout: Duration::from_millis(config.publish_timeout_ms),
        }
    }

    /// 底层广播器，供订阅端使用
    pub fn broker(&self) -> Arc<dyn EventBroker> {
        self.broker.clone()
    }

    /// 发布事件（fire-and-forget）
    pub async fn publish<P: Serialize>(&self, topic: Topic, kind: EventKind, payload: &P) {
        let payload = match serde_json::to_value(payload) {
            Ok(value) => value,
            Err(e) => {
                warn!(topic = %topic, kind = %kind, error = %e, "推送负载序列化失败，跳过推送");
                record(kind, "serialize_error");
                return;
            }
        };

        let event = FanoutEvent::new(kind, &topic, payload);
        let event_id = event.event_id.clone();

        match tokio::time::timeout(self.timeout, self.broker.publish(&topic, event)).await {
            Ok(Ok(delivered)) => {
                debug!(topic = %topic, kind = %kind, event_id = %event_id, delivered, "推送成功");
                record(kind, "ok");
            }
            Ok(Err(e)) => {
                warn!(topic = %topic, kind = %kind, event_id = %event_id, error = %e, "推送失败，不影响主流程");
                record(kind, "error");
            }
            Err(_) => {
                warn!(
                    topic = %topic,
                    kind = %kind,
                    event_id = %event_id,
                    timeout_ms = self.timeout.as_millis() as u64,
                    "推送超时，不影响主流程"
                );
                record(kind, "timeout");
            }
        }
    }
}

fn record(kind: EventKind, outcome: &'static str) {
    metrics::counter!(
        "aid_fanout_published_total",
        "kind" => kind.as_str(),
        "outcome" => outcome
    )
    .increment(1);
}
