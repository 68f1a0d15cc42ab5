//! 批量执行：对所有标记为 remove 的包调用 adb

use super::registry::PackageRegistry;
use crate::adb::Bridge;
use std::time::Duration;

/// 批量操作类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchAction {
    /// `pm uninstall --user 0`
    Uninstall,
    /// `pm disable-user`
    Disable,
}

impl BatchAction {
    pub fn label(&self) -> &'static str {
        match self {
            BatchAction::Uninstall => "uninstall",
            BatchAction::Disable => "disable",
        }
    }

    fn header(&self, package: &str) -> String {
        match self {
            BatchAction::Uninstall => format!("── Uninstall app: {} ──", package),
            BatchAction::Disable => format!("── Disable app: {} ──", package),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub attempted: usize,
    /// 失败的包名（按处理顺序）
    pub failed: Vec<String>,
}

impl BatchSummary {
    pub fn succeeded(&self) -> usize {
        self.attempted - self.failed.len()
    }
}

pub struct BatchApplier<'a> {
    bridge: &'a Bridge,
    action: BatchAction,
}

impl<'a> BatchApplier<'a> {
    pub fn new(bridge: &'a Bridge, action: BatchAction) -> Self {
        Self { bridge, action }
    }

    fn argv_and_timeout(&self, package: &str) -> (Vec<String>, Duration) {
        match self.action {
            BatchAction::Uninstall => (
                self.bridge.uninstall_argv(package),
                self.bridge.timeouts().uninstall,
            ),
            BatchAction::Disable => (
                self.bridge.disable_argv(package),
                self.bridge.timeouts().disable,
            ),
        }
    }

    /// 按顺序处理所有标记为 remove 的包。
    ///
    /// keep / locked 的包静默跳过；单个包失败只向 sink 输出一行 `ERROR: ...`，
    /// 然后继续处理下一个。包的状态不会被修改。
    pub fn apply(&self, registry: &PackageRegistry, sink: &mut dyn FnMut(&str)) -> BatchSummary {
        let mut summary = BatchSummary::default();

        for package in registry.all_in_order() {
            if !package.is_marked_for_removal() {
                continue;
            }
            summary.attempted += 1;

            sink(&self.action.header(package.name()));
            let (argv, timeout) = self.argv_and_timeout(package.name());
            if let Err(e) = self.bridge.run(&argv, timeout, sink) {
                log::warn!("{} {} 失败: {}", self.action.label(), package.name(), e);
                sink(&format!("ERROR: {}", e));
                summary.failed.push(package.name().to_string());
            }
        }

        log::info!(
            "{}: {} 个包，{} 个失败",
            self.action.label(),
            summary.attempted,
            summary.failed.len()
        );
        summary
    }
}
