use super::layout;
use crate::adb::Bridge;
use crate::config::Config;
use crate::packages::{BatchAction, BatchSummary, PackageRegistry, ProtectedSet, StateError};

/// 分隔线（每个任务开始时输出）
pub const SEPARATOR: &str = "________________________________________________________________________________";

// ========== 枚举 ==========

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Focus {
    Packages,
    Output,
}

// ========== 事件 ==========

#[derive(Debug)]
pub enum AppEvent {
    /// 子进程输出或诊断信息
    Line(String),
    Status(String),
    DeviceDetected(String),
    DeviceLost(String),
    PackagesListed(Vec<String>),
    BatchComplete {
        action: BatchAction,
        summary: BatchSummary,
    },
    ReportSaved(String),
    TaskFinished,
}

// ========== 主状态 ==========

pub struct App {
    pub config: Config,
    pub bridge: Bridge,
    pub registry: PackageRegistry,
    pub selected: usize,
    pub focus: Focus,
    pub output: Vec<String>,
    pub output_scroll: usize,
    /// 输出面板是否自动跟随最新一行
    pub follow_output: bool,
    pub device: Option<String>,
    pub status: String,
    pub busy: bool,
    /// 正在执行的批量操作及其日志（用于保存报告）
    pub batch: Option<BatchAction>,
    pub batch_log: Vec<String>,
    pub confirm_quit: bool,
    pub should_quit: bool,
}

impl App {
    pub fn new(config: Config) -> Self {
        let bridge = Bridge::from_config(&config);
        let protected = ProtectedSet::with_extra(config.extra_locked.iter().cloned());
        log::debug!("锁定列表共 {} 个包", protected.len());
        Self {
            config,
            bridge,
            registry: PackageRegistry::with_protected(protected),
            selected: 0,
            focus: Focus::Packages,
            output: Vec::new(),
            output_scroll: 0,
            follow_output: true,
            device: None,
            status: "loading...".to_string(),
            busy: false,
            batch: None,
            batch_log: Vec::new(),
            confirm_quit: false,
            should_quit: false,
        }
    }

    pub fn add_line(&mut self, line: String) {
        if self.batch.is_some() {
            self.batch_log.push(line.clone());
        }
        self.output.push(line);
        if self.follow_output {
            self.output_scroll = self.output.len().saturating_sub(layout::visible_output_height());
        }
    }

    /// 用新的包列表替换当前内容（列表已排序）。
    /// 重新获取列表时，仍在设备上的包保留之前的标记
    pub fn load_packages(&mut self, names: Vec<String>) {
        let fresh = self.registry.emptied();
        let previous = std::mem::replace(&mut self.registry, fresh);
        for name in &names {
            let action = previous.get_by_name(name).map(|p| p.action());
            self.registry.add(name, action);
        }
        self.selected = self.selected.min(self.registry.len().saturating_sub(1));
    }

    pub fn select_prev(&mut self, step: usize) {
        self.selected = self.selected.saturating_sub(step);
    }

    pub fn select_next(&mut self, step: usize) {
        let max = self.registry.len().saturating_sub(1);
        self.selected = (self.selected + step).min(max);
    }

    pub fn scroll_output_up(&mut self, step: usize) {
        self.follow_output = false;
        self.output_scroll = self.output_scroll.saturating_sub(step);
    }

    pub fn scroll_output_down(&mut self, step: usize, visible: usize) {
        let max_scroll = self.output.len().saturating_sub(visible);
        self.output_scroll = (self.output_scroll + step).min(max_scroll);
        self.follow_output = self.output_scroll >= max_scroll;
    }

    /// 切换当前行的 keep/remove；锁定的包只输出提示
    pub fn toggle_selected(&mut self) -> Result<(), StateError> {
        if self.registry.is_empty() {
            return Ok(());
        }
        let package = self.registry.get_by_index(self.selected)?;
        if package.is_locked() {
            let line = format!("ignore locked app: {}", package.name());
            self.add_line(line);
            return Ok(());
        }
        let package = self.registry.get_by_index_mut(self.selected)?;
        let action = package.toggle()?;
        log::debug!("Clicked on package: {} -> {}", package.name(), action);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn app_with(names: &[&str]) -> App {
        let mut app = App::new(Config::default());
        app.load_packages(names.iter().map(|s| s.to_string()).collect());
        app
    }

    #[test]
    fn toggle_marks_and_unmarks() {
        let mut app = app_with(&["com.a", "com.b"]);
        app.select_next(1);
        app.toggle_selected().unwrap();
        assert!(app.registry.get_by_index(1).unwrap().is_marked_for_removal());
        app.toggle_selected().unwrap();
        assert!(app.registry.get_by_index(1).unwrap().is_kept());
    }

    #[test]
    fn locked_rows_are_ignored_with_a_message() {
        let mut app = app_with(&["com.android.systemui"]);
        app.toggle_selected().unwrap();
        assert!(app.registry.get_by_index(0).unwrap().is_locked());
        assert_eq!(app.output.last().unwrap(), "ignore locked app: com.android.systemui");
    }

    #[test]
    fn toggle_on_empty_list_is_a_no_op() {
        let mut app = app_with(&[]);
        assert!(app.toggle_selected().is_ok());
        assert!(app.output.is_empty());
    }

    #[test]
    fn reloading_keeps_marks_of_packages_still_present() {
        let mut app = app_with(&["com.a", "com.b", "com.c"]);
        app.select_next(1);
        app.toggle_selected().unwrap();
        app.select_next(1);

        app.load_packages(vec!["com.b".to_string(), "com.d".to_string()]);
        assert_eq!(app.registry.len(), 2);
        assert!(app.registry.get_by_index(0).unwrap().is_marked_for_removal());
        assert!(app.registry.get_by_index(1).unwrap().is_kept());
        assert_eq!(app.selected, 1);
        assert_eq!(app.registry.count_marked(), 1);
    }

    #[test]
    fn selection_is_clamped() {
        let mut app = app_with(&["com.a", "com.b", "com.c"]);
        app.select_next(10);
        assert_eq!(app.selected, 2);
        app.select_prev(10);
        assert_eq!(app.selected, 0);
    }

    #[test]
    fn batch_lines_are_recorded_for_the_report() {
        let mut app = app_with(&[]);
        app.add_line("before".to_string());
        app.batch = Some(BatchAction::Uninstall);
        app.add_line("during".to_string());
        assert_eq!(app.batch_log, vec!["during"]);
        assert_eq!(app.output.len(), 2);
        assert_eq!(app.output_scroll, 0);
    }

    #[test]
    fn manual_scroll_stops_following() {
        let mut app = app_with(&[]);
        for i in 0..20 {
            app.add_line(format!("line {}", i));
        }
        assert_eq!(app.output_scroll, 20 - layout::visible_output_height());
        app.scroll_output_up(5);
        assert!(!app.follow_output);
        app.add_line("new".to_string());
        assert_eq!(app.output_scroll, 15 - layout::visible_output_height());
        app.scroll_output_down(100, 10);
        assert!(app.follow_output);
    }
}
