// ==========================================
// 管道工厂订单管理系统 - 写入事件发布
// ==========================================
// 职责: 定义订单写入事件与发布 trait
// 说明: Engine 层定义 trait, API 层读缓存实现失效
// 红线: 事件只用于失效读缓存,数据库是唯一事实源
// ==========================================

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::sync::Arc;

// ==========================================
// 订单事件类型
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderEventType {
    /// 订单创建
    OrderCreated,
    /// 订单头修改
    OrderHeaderUpdated,
    /// 订单软删除
    OrderDeleted,
    /// 生产记录追加
    ProductionAppended,
    /// 发货记录追加
    ShippingAppended,
    /// 子订单台账重放
    SubOrderRecomputed,
}

impl OrderEventType {
    /// 转换为字符串标识
    pub fn as_str(&self) -> &str {
        match self {
            OrderEventType::OrderCreated => "OrderCreated",
            OrderEventType::OrderHeaderUpdated => "OrderHeaderUpdated",
            OrderEventType::OrderDeleted => "OrderDeleted",
            OrderEventType::ProductionAppended => "ProductionAppended",
            OrderEventType::ShippingAppended => "ShippingAppended",
            OrderEventType::SubOrderRecomputed => "SubOrderRecomputed",
        }
    }
}

/// 订单事件
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderEvent {
    pub order_id: String,
    pub sub_order_id: Option<String>,
    pub event_type: OrderEventType,
    /// 事件来源描述
    pub source: Option<String>,
}

impl OrderEvent {
    /// 订单级事件
    pub fn for_order(order_id: &str, event_type: OrderEventType, source: Option<String>) -> Self {
        Self {
            order_id: order_id.to_string(),
            sub_order_id: None,
            event_type,
            source,
        }
    }

    /// 子订单级事件
    pub fn for_sub_order(
        order_id: &str,
        sub_order_id: &str,
        event_type: OrderEventType,
        source: Option<String>,
    ) -> Self {
        Self {
            order_id: order_id.to_string(),
            sub_order_id: Some(sub_order_id.to_string()),
            event_type,
            source,
        }
    }
}

// ==========================================
// 事件发布 Trait
// ==========================================

/// 订单事件发布者
///
/// # 实现说明
/// - `OrderReadCache` 实现此 trait,收到事件即失效对应条目
pub trait OrderEventPublisher: Send + Sync {
    /// 发布订单事件
    fn publish(&self, event: OrderEvent) -> Result<(), Box<dyn Error + Send + Sync>>;
}

/// 空操作事件发布者
#[derive(Debug, Clone, Default)]
pub struct NoOpEventPublisher;

impl OrderEventPublisher for NoOpEventPublisher {
    fn publish(&self, event: OrderEvent) -> Result<(), Box<dyn Error + Send + Sync>> {
        tracing::debug!(
            "NoOpEventPublisher: 跳过事件发布 - order_id={}, event_type={}",
            event.order_id,
            event.event_type.as_str()
        );
        Ok(())
    }
}

/// 可选的事件发布者包装
///
/// 发布失败只记录告警,不影响已提交的写入
#[derive(Clone, Default)]
pub struct OptionalEventPublisher {
    inner: Option<Arc<dyn OrderEventPublisher>>,
}

impl OptionalEventPublisher {
    pub fn with_publisher(publisher: Arc<dyn OrderEventPublisher>) -> Self {
        Self {
            inner: Some(publisher),
        }
    }

    pub fn none() -> Self {
        Self { inner: None }
    }

    pub fn from_option(publisher: Option<Arc<dyn OrderEventPublisher>>) -> Self {
        Self { inner: publisher }
    }

    /// 发布事件（如果有发布者）
    pub fn publish(&self, event: OrderEvent) {
        match &self.inner {
            Some(publisher) => {
                let event_type = event.event_type;
                let order_id = event.order_id.clone();
                if let Err(e) = publisher.publish(event) {
                    tracing::warn!(
                        "事件发布失败: order_id={}, event_type={}, error={}",
                        order_id,
                        event_type.as_str(),
                        e
                    );
                }
            }
            None => {
                tracing::debug!(
                    "OptionalEventPublisher: 未配置发布者，跳过事件 - order_id={}, event_type={}",
                    event.order_id,
                    event.event_type.as_str()
                );
            }
        }
    }

    pub fn is_configured(&self) -> bool {
        self.inner.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct RecordingPublisher {
        seen: Mutex<Vec<OrderEventType>>,
    }

    impl OrderEventPublisher for RecordingPublisher {
        fn publish(&self, event: OrderEvent) -> Result<(), Box<dyn Error + Send + Sync>> {
            self.seen.lock().unwrap().push(event.event_type);
            Ok(())
        }
    }

    #[test]
    fn test_sub_order_event_carries_both_ids() {
        let event = OrderEvent::for_sub_order("O1", "S1", OrderEventType::ShippingAppended, None);
        assert_eq!(event.order_id, "O1");
        assert_eq!(event.sub_order_id.as_deref(), Some("S1"));
        assert_eq!(event.event_type.as_str(), "ShippingAppended");
    }

    #[test]
    fn test_noop_publisher() {
        let publisher = NoOpEventPublisher;
        let event = OrderEvent::for_order("O1", OrderEventType::OrderCreated, None);
        assert!(publisher.publish(event).is_ok());
    }

    #[test]
    fn test_optional_publisher_none() {
        let publisher = OptionalEventPublisher::none();
        assert!(!publisher.is_configured());
        publisher.publish(OrderEvent::for_order("O1", OrderEventType::OrderDeleted, None));
    }

    #[test]
    fn test_optional_publisher_forwards_events() {
        let recorder = Arc::new(RecordingPublisher {
            seen: Mutex::new(Vec::new()),
        });
        let publisher = OptionalEventPublisher::with_publisher(recorder.clone());
        assert!(publisher.is_configured());

        publisher.publish(OrderEvent::for_order("O1", OrderEventType::OrderCreated, None));
        publisher.publish(OrderEvent::for_sub_order(
            "O1",
            "S1",
            OrderEventType::ProductionAppended,
            None,
        ));

        let seen = recorder.seen.lock().unwrap();
        assert_eq!(
            *seen,
            vec![OrderEventType::OrderCreated, OrderEventType::ProductionAppended]
        );
    }
}
