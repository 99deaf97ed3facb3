// ==========================================
// 管道工厂订单管理系统 - 订单读缓存
// ==========================================
// 语义: 读穿透缓存,写入事件到达即失效
// 红线: 数据库是唯一事实源,缓存不参与任何写入判定
// ==========================================

use crate::domain::order::OrderWithSubOrders;
use crate::engine::events::{OrderEvent, OrderEventPublisher};
use std::collections::HashMap;
use std::error::Error;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use tracing::debug;

#[derive(Default)]
struct CacheState {
    orders: HashMap<String, OrderWithSubOrders>,
    // key: list limit
    lists: HashMap<i64, Vec<OrderWithSubOrders>>,
    // 每次失效 +1; 回填时代数变化说明加载期间发生过写入
    generation: u64,
}

/// 缓存命中统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub invalidations: u64,
}

/// 订单读缓存
#[derive(Default)]
pub struct OrderReadCache {
    state: Mutex<CacheState>,
    hits: AtomicU64,
    misses: AtomicU64,
    invalidations: AtomicU64,
}

impl OrderReadCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// 读取单个订单,未命中时调用 loader 并回填
    ///
    /// loader 返回 None（不存在/已删除）时不缓存;
    /// 加载期间发生失效时结果照常返回但不回填
    pub fn get_order_or_load<F, E>(&self, order_id: &str, loader: F) -> Result<Option<OrderWithSubOrders>, E>
    where
        F: FnOnce() -> Result<Option<OrderWithSubOrders>, E>,
    {
        let generation = {
            let state = self.lock_state();
            if let Some(hit) = state.orders.get(order_id).cloned() {
                self.hits.fetch_add(1, Ordering::Relaxed);
                debug!(order_id = %order_id, "订单缓存命中");
                return Ok(Some(hit));
            }
            state.generation
        };

        self.misses.fetch_add(1, Ordering::Relaxed);
        let loaded = loader()?;
        if let Some(value) = &loaded {
            let mut state = self.lock_state();
            if state.generation == generation {
                state.orders.insert(order_id.to_string(), value.clone());
            } else {
                debug!(order_id = %order_id, "加载期间缓存已失效,跳过回填");
            }
        }
        Ok(loaded)
    }

    /// 读取订单列表,未命中时调用 loader 并回填
    pub fn get_list_or_load<F, E>(&self, limit: i64, loader: F) -> Result<Vec<OrderWithSubOrders>, E>
    where
        F: FnOnce() -> Result<Vec<OrderWithSubOrders>, E>,
    {
        let generation = {
            let state = self.lock_state();
            if let Some(hit) = state.lists.get(&limit).cloned() {
                self.hits.fetch_add(1, Ordering::Relaxed);
                debug!(limit, "订单列表缓存命中");
                return Ok(hit);
            }
            state.generation
        };

        self.misses.fetch_add(1, Ordering::Relaxed);
        let loaded = loader()?;
        let mut state = self.lock_state();
        if state.generation == generation {
            state.lists.insert(limit, loaded.clone());
        } else {
            debug!(limit, "加载期间缓存已失效,跳过回填");
        }
        Ok(loaded)
    }

    /// 失效单个订单及全部列表
    pub fn invalidate_order(&self, order_id: &str) {
        let mut state = self.lock_state();
        state.orders.remove(order_id);
        state.lists.clear();
        state.generation = state.generation.wrapping_add(1);
        self.invalidations.fetch_add(1, Ordering::Relaxed);
    }

    pub fn clear(&self) {
        let mut state = self.lock_state();
        state.orders.clear();
        state.lists.clear();
        state.generation = state.generation.wrapping_add(1);
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            invalidations: self.invalidations.load(Ordering::Relaxed),
        }
    }

    // 毒化的锁直接接管内部数据: 缓存内容可随时丢弃重建
    fn lock_state(&self) -> std::sync::MutexGuard<'_, CacheState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                let mut guard = poisoned.into_inner();
                let generation = guard.generation.wrapping_add(1);
                *guard = CacheState {
                    generation,
                    ..CacheState::default()
                };
                guard
            }
        }
    }
}

impl OrderEventPublisher for OrderReadCache {
    fn publish(&self, event: OrderEvent) -> Result<(), Box<dyn Error + Send + Sync>> {
        debug!(
            order_id = %event.order_id,
            event_type = event.event_type.as_str(),
            "订单缓存失效"
        );
        self.invalidate_order(&event.order_id);
        Ok(())
    }
}
