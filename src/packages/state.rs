use super::protected::ProtectedSet;
use std::fmt;
use thiserror::Error;

/// 包的目标操作
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Keep,
    Remove,
    Locked,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Keep => "keep",
            Action::Remove => "remove",
            Action::Locked => "locked",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 包状态模型的逻辑错误（UI 与数据不同步），不应被吞掉
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StateError {
    #[error("无法卸载锁定的应用: {name}")]
    Locked { name: String },

    #[error("包索引越界: {index}（共 {len} 个）")]
    IndexOutOfRange { index: usize, len: usize },
}

/// 设备上的一个包及其目标操作
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageState {
    name: String,
    index: usize,
    action: Action,
}

impl PackageState {
    /// 名字在锁定列表中时强制为 `Locked`，否则使用给定操作，默认 `Keep`
    pub fn new(
        name: impl Into<String>,
        index: usize,
        action: Option<Action>,
        protected: &ProtectedSet,
    ) -> Self {
        let name = name.into();
        let action = if protected.contains(&name) {
            Action::Locked
        } else {
            action.unwrap_or(Action::Keep)
        };
        Self {
            name,
            index,
            action,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn action(&self) -> Action {
        self.action
    }

    pub fn is_locked(&self) -> bool {
        self.action == Action::Locked
    }

    pub fn is_kept(&self) -> bool {
        self.action == Action::Keep
    }

    pub fn is_marked_for_removal(&self) -> bool {
        self.action == Action::Remove
    }

    pub fn set_keep(&mut self) {
        self.action = Action::Keep;
    }

    pub fn set_remove(&mut self) -> Result<(), StateError> {
        if self.is_locked() {
            return Err(StateError::Locked {
                name: self.name.clone(),
            });
        }
        self.action = Action::Remove;
        Ok(())
    }

    /// keep ↔ remove 切换；锁定的包返回错误
    pub fn toggle(&mut self) -> Result<Action, StateError> {
        match self.action {
            Action::Keep => self.set_remove()?,
            Action::Remove => self.set_keep(),
            Action::Locked => {
                return Err(StateError::Locked {
                    name: self.name.clone(),
                })
            }
        }
        Ok(self.action)
    }
}

impl fmt::Display for PackageState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.index, self.action, self.name)
    }
}
