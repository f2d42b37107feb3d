//! 集合缓存
//!
//! 每个 store 独占一份 [`CollectionCache`]，是该集合唯一的写入方。
//! 缓存只在服务端返回结果之后更新，以服务端返回的数据为准。

use std::sync::{Mutex, MutexGuard};

/// 带服务端 ID 的实体
pub trait Identified {
    /// 服务端分配的 ID，本地草稿为 `None`
    fn id(&self) -> Option<i64>;
}

/// store 状态快照
#[derive(Debug, Clone, PartialEq)]
pub struct StoreSnapshot<T> {
    pub loading: bool,
    pub error: Option<String>,
    pub items: Vec<T>,
}

impl<T> Default for StoreSnapshot<T> {
    fn default() -> Self {
        Self {
            loading: false,
            error: None,
            items: Vec::new(),
        }
    }
}

/// 有序实体缓存，同一 ID 至多出现一次
pub struct CollectionCache<T> {
    state: Mutex<StoreSnapshot<T>>,
}

impl<T> Default for CollectionCache<T> {
    fn default() -> Self {
        Self {
            state: Mutex::new(StoreSnapshot::default()),
        }
    }
}

/// 请求期间的 loading 标记，drop 时恢复为 false
///
/// future 被中途丢弃时同样会复位。
pub struct LoadingGuard<'a, T> {
    cache: &'a CollectionCache<T>,
}

impl<T> Drop for LoadingGuard<'_, T> {
    fn drop(&mut self) {
        self.cache.lock().loading = false;
    }
}

impl<T> CollectionCache<T> {
    fn lock(&self) -> MutexGuard<'_, StoreSnapshot<T>> {
        // 持锁期间不会 panic，锁中毒时沿用内部数据
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl<T: Identified + Clone> CollectionCache<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// 开始一次操作：loading=true，清空 error
    pub fn begin(&self) -> LoadingGuard<'_, T> {
        let mut state = self.lock();
        state.loading = true;
        state.error = None;
        LoadingGuard { cache: self }
    }

    pub fn set_error(&self, message: impl Into<String>) {
        self.lock().error = Some(message.into());
    }

    pub fn snapshot(&self) -> StoreSnapshot<T> {
        self.lock().clone()
    }

    pub fn items(&self) -> Vec<T> {
        self.lock().items.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.lock().loading
    }

    pub fn error(&self) -> Option<String> {
        self.lock().error.clone()
    }

    pub fn len(&self) -> usize {
        self.lock().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn find(&self, id: i64) -> Option<T> {
        self.lock()
            .items
            .iter()
            .find(|item| item.id() == Some(id))
            .cloned()
    }

    pub fn filter<F>(&self, predicate: F) -> Vec<T>
    where
        F: Fn(&T) -> bool,
    {
        self.lock()
            .items
            .iter()
            .filter(|item| predicate(item))
            .cloned()
            .collect()
    }

    /// 用服务端列表整体替换，不做合并
    ///
    /// 服务端列表中重复的 ID 只保留第一次出现的条目。
    pub fn replace_all(&self, items: Vec<T>) {
        let mut deduped: Vec<T> = Vec::with_capacity(items.len());
        for item in items {
            let duplicate = item
                .id()
                .is_some_and(|id| deduped.iter().any(|d| d.id() == Some(id)));
            if !duplicate {
                deduped.push(item);
            }
        }
        self.lock().items = deduped;
    }

    /// 已存在则原位替换，否则追加到末尾
    pub fn upsert(&self, item: T) {
        let mut state = self.lock();
        match item
            .id()
            .and_then(|id| state.items.iter().position(|i| i.id() == Some(id)))
        {
            Some(index) => state.items[index] = item,
            None => state.items.push(item),
        }
    }

    /// 追加到末尾；若已有同 ID 的条目则先移除
    pub fn push(&self, item: T) {
        let mut state = self.lock();
        if let Some(id) = item.id() {
            state.items.retain(|i| i.id() != Some(id));
        }
        state.items.push(item);
    }

    /// 只替换已存在的条目，返回是否命中
    pub fn replace_existing(&self, id: i64, item: T) -> bool {
        let mut state = self.lock();
        match state.items.iter().position(|i| i.id() == Some(id)) {
            Some(index) => {
                state.items[index] = item;
                true
            }
            None => false,
        }
    }

    /// 删除指定 ID，返回是否命中
    pub fn remove(&self, id: i64) -> bool {
        let mut state = self.lock();
        let before = state.items.len();
        state.items.retain(|i| i.id() != Some(id));
        state.items.len() != before
    }
}
