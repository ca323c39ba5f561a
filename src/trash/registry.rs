// 条目占用注册表
//
// 恢复和后台清扫可能同时触碰同一个暂存条目，通过按暂存名
// 加锁串行化对单个条目的变更

use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

/// 按暂存名的在途操作注册表
#[derive(Debug, Clone, Default)]
pub struct EntryLocks {
    inner: Arc<DashMap<String, ()>>,
}

impl EntryLocks {
    /// 创建新的注册表
    pub fn new() -> Self {
        Self::default()
    }

    /// 尝试占用一个暂存名
    ///
    /// 已被占用时返回 None，调用方自行决定跳过还是报错
    pub fn try_acquire(&self, staged_name: &str) -> Option<EntryGuard> {
        match self.inner.entry(staged_name.to_string()) {
            Entry::Occupied(_) => None,
            Entry::Vacant(vacant) => {
                vacant.insert(());
                Some(EntryGuard {
                    staged_name: staged_name.to_string(),
                    locks: Arc::clone(&self.inner),
                })
            }
        }
    }

    /// 检查暂存名是否被占用
    pub fn is_locked(&self, staged_name: &str) -> bool {
        self.inner.contains_key(staged_name)
    }

    /// 当前在途操作数量
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

/// 占用凭据，释放时解除占用
#[derive(Debug)]
pub struct EntryGuard {
    staged_name: String,
    locks: Arc<DashMap<String, ()>>,
}

impl Drop for EntryGuard {
    fn drop(&mut self) {
        self.locks.remove(&self.staged_name);
    }
}
