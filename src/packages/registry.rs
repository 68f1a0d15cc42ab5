use super::protected::ProtectedSet;
use super::state::{Action, PackageState, StateError};
use std::collections::HashMap;

/// 按插入顺序保存的包集合，同时支持按名字查找。
///
/// `by_index[i].index() == i` 恒成立。重复 add 同一个名字会追加一条新记录，
/// 名字索引指向最新的一条，旧记录仍可按索引访问。
#[derive(Debug, Clone, Default)]
pub struct PackageRegistry {
    by_index: Vec<PackageState>,
    by_name: HashMap<String, usize>,
    protected: ProtectedSet,
}

impl PackageRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_protected(protected: ProtectedSet) -> Self {
        Self {
            protected,
            ..Self::new()
        }
    }

    pub fn add(&mut self, name: &str, action: Option<Action>) -> &PackageState {
        let index = self.by_index.len();
        if self.by_name.contains_key(name) {
            log::debug!("重复添加包 {}，新索引 {}", name, index);
        }
        self.by_index
            .push(PackageState::new(name, index, action, &self.protected));
        self.by_name.insert(name.to_string(), index);
        &self.by_index[index]
    }

    pub fn get_by_index(&self, index: usize) -> Result<&PackageState, StateError> {
        let len = self.by_index.len();
        self.by_index
            .get(index)
            .ok_or(StateError::IndexOutOfRange { index, len })
    }

    pub fn get_by_index_mut(&mut self, index: usize) -> Result<&mut PackageState, StateError> {
        let len = self.by_index.len();
        self.by_index
            .get_mut(index)
            .ok_or(StateError::IndexOutOfRange { index, len })
    }

    pub fn get_by_name(&self, name: &str) -> Option<&PackageState> {
        self.by_name.get(name).map(|&i| &self.by_index[i])
    }

    /// 按索引升序遍历，可重复调用
    pub fn all_in_order(&self) -> impl Iterator<Item = &PackageState> {
        self.by_index.iter()
    }

    pub fn len(&self) -> usize {
        self.by_index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_index.is_empty()
    }

    pub fn count_marked(&self) -> usize {
        self.by_index
            .iter()
            .filter(|p| p.is_marked_for_removal())
            .count()
    }

    /// 同一锁定列表下的空集合
    pub fn emptied(&self) -> Self {
        Self::with_protected(self.protected.clone())
    }
}
