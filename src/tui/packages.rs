use super::layout;
use super::state::{App, AppEvent, Focus, SEPARATOR};
use super::theme::{BRIGHT_WHITE, DIM, KEEP, LOCKED, REMOVE, SEL_BG};
use crate::adb::Bridge;
use crate::packages::{BatchAction, BatchApplier, BatchSummary, PackageState, StateError};
use crate::report::ReportSaver;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::{
    layout::{Alignment, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph},
    Frame,
};
use tokio::sync::mpsc;

const FOOTER_KEYS: &[(&str, &str)] = &[
    ("↑↓/PgUp/PgDn", "移动"),
    ("Space", "切换"),
    ("u", "卸载"),
    ("d", "停用"),
    ("r", "重连"),
    ("l", "设备"),
    ("Tab", "焦点"),
    ("q", "退出"),
];

/// 处理主界面按键。包状态错误说明 UI 与数据不同步，直接向上返回
pub fn handle_key(
    key: KeyEvent,
    app: &mut App,
    tx: &mpsc::Sender<AppEvent>,
    term_height: u16,
) -> Result<(), StateError> {
    if app.confirm_quit {
        match key.code {
            KeyCode::Char('y') | KeyCode::Char('Y') => app.should_quit = true,
            _ => {
                app.confirm_quit = false;
                app.status = "继续".to_string();
            }
        }
        return Ok(());
    }

    let page = layout::visible_list_height(term_height).max(1);
    let output_visible = layout::visible_output_height();

    match key.code {
        KeyCode::Char('q') => app.confirm_quit = true,
        KeyCode::Tab => {
            app.focus = match app.focus {
                Focus::Packages => Focus::Output,
                Focus::Output => Focus::Packages,
            };
        }
        KeyCode::Up => match app.focus {
            Focus::Packages => app.select_prev(1),
            Focus::Output => app.scroll_output_up(1),
        },
        KeyCode::Down => match app.focus {
            Focus::Packages => app.select_next(1),
            Focus::Output => app.scroll_output_down(1, output_visible),
        },
        KeyCode::PageUp => match app.focus {
            Focus::Packages => app.select_prev(page),
            Focus::Output => app.scroll_output_up(output_visible),
        },
        KeyCode::PageDown => match app.focus {
            Focus::Packages => app.select_next(page),
            Focus::Output => app.scroll_output_down(output_visible, output_visible),
        },
        KeyCode::Home => match app.focus {
            Focus::Packages => app.selected = 0,
            Focus::Output => app.scroll_output_up(usize::MAX),
        },
        KeyCode::End => match app.focus {
            Focus::Packages => app.select_next(usize::MAX / 2),
            Focus::Output => app.scroll_output_down(usize::MAX / 2, output_visible),
        },
        KeyCode::Char(' ') if app.focus == Focus::Packages => {
            app.toggle_selected()?;
            // 切换后自动下移
            app.select_next(1);
        }
        KeyCode::Enter if app.focus == Focus::Packages => app.toggle_selected()?,
        KeyCode::Char('u') => start_batch(app, tx, BatchAction::Uninstall),
        KeyCode::Char('d') => start_batch(app, tx, BatchAction::Disable),
        KeyCode::Char('r') => spawn_refresh(app, tx),
        KeyCode::Char('l') => spawn_list_devices(app, tx),
        _ => {}
    }
    Ok(())
}

/// 同一时间只允许一个设备任务
fn begin_task(app: &mut App, status: String) -> bool {
    if app.busy {
        app.status = "正在执行其它操作，请稍候...".to_string();
        return false;
    }
    app.busy = true;
    app.status = status;
    true
}

fn send(tx: &mpsc::Sender<AppEvent>, event: AppEvent) {
    let _ = tx.blocking_send(event);
}

/// 等待设备并读取设备信息
fn detect_device(bridge: &Bridge, tx: &mpsc::Sender<AppEvent>, sink: &mut dyn FnMut(&str)) {
    sink(SEPARATOR);
    sink("List devices via adb...");
    match bridge.list_devices(sink) {
        Ok(info) => send(tx, AppEvent::DeviceDetected(info)),
        Err(e) => {
            sink(&format!("ERROR: {}", e));
            send(tx, AppEvent::DeviceLost(e.to_string()));
        }
    }
}

/// 重启 adb server → 检测设备 → 获取包列表（启动时自动执行）
pub fn spawn_refresh(app: &mut App, tx: &mpsc::Sender<AppEvent>) {
    if !begin_task(app, "Reconnect device...".to_string()) {
        return;
    }
    let bridge = app.bridge.clone();
    let tx = tx.clone();

    std::thread::spawn(move || {
        let mut sink = |line: &str| send(&tx, AppEvent::Line(line.to_string()));

        sink(SEPARATOR);
        sink("Reconnect device...");
        bridge.reconnect(&mut sink);

        detect_device(&bridge, &tx, &mut sink);

        sink(SEPARATOR);
        sink("Fetch package list via adb...");
        match bridge.list_packages(&mut sink) {
            Ok(names) => send(&tx, AppEvent::PackagesListed(names)),
            Err(e) => {
                sink(&format!("ERROR: {}", e));
                send(&tx, AppEvent::Status("Fetch package list - ERROR".to_string()));
            }
        }
        send(&tx, AppEvent::TaskFinished);
    });
}

pub fn spawn_list_devices(app: &mut App, tx: &mpsc::Sender<AppEvent>) {
    if !begin_task(app, "List devices...".to_string()) {
        return;
    }
    let bridge = app.bridge.clone();
    let tx = tx.clone();

    std::thread::spawn(move || {
        let mut sink = |line: &str| send(&tx, AppEvent::Line(line.to_string()));
        detect_device(&bridge, &tx, &mut sink);
        send(&tx, AppEvent::TaskFinished);
    });
}

/// 对所有标记为 remove 的包执行批量操作
pub fn start_batch(app: &mut App, tx: &mpsc::Sender<AppEvent>, action: BatchAction) {
    let marked = app.registry.count_marked();
    if marked == 0 {
        app.add_line("No packages selected !".to_string());
        return;
    }
    if !begin_task(app, format!("{} {} apps...", action.label(), marked)) {
        return;
    }
    app.batch = Some(action);
    app.batch_log.clear();

    // 批量执行期间 UI 线程仍持有原始 registry，这里用快照
    let registry = app.registry.clone();
    let bridge = app.bridge.clone();
    let tx = tx.clone();

    std::thread::spawn(move || {
        let mut sink = |line: &str| send(&tx, AppEvent::Line(line.to_string()));
        let summary = BatchApplier::new(&bridge, action).apply(&registry, &mut sink);
        send(&tx, AppEvent::BatchComplete { action, summary });
        send(&tx, AppEvent::TaskFinished);
    });
}

/// 处理批量完成事件：输出汇总并保存日志
pub fn handle_batch_complete(
    app: &mut App,
    tx: &mpsc::Sender<AppEvent>,
    action: BatchAction,
    summary: BatchSummary,
) {
    app.add_line(SEPARATOR.to_string());
    app.add_line(format!(
        "{}: {} 成功, {} 失败",
        action.label(),
        summary.succeeded(),
        summary.failed.len()
    ));
    if !summary.failed.is_empty() {
        app.add_line(format!("失败: {}", summary.failed.join(", ")));
        app.status = format!("{} - ERROR", action.label());
    }

    app.batch = None;
    let lines = std::mem::take(&mut app.batch_log);
    if !app.config.save_reports {
        return;
    }

    let report_dir = app.config.report_dir.clone();
    let device = app
        .device
        .clone()
        .unwrap_or_else(|| "unknown".to_string());
    let tx_clone = tx.clone();
    tokio::spawn(async move {
        // 写文件是阻塞 IO，放到 blocking 线程池
        let saved = tokio::task::spawn_blocking(move || {
            ReportSaver::new(report_dir).save(&lines, &device, action.label())
        })
        .await;
        match saved {
            Ok(Ok(path)) => {
                let _ = tx_clone
                    .send(AppEvent::ReportSaved(path.display().to_string()))
                    .await;
            }
            Ok(Err(e)) => log::error!("保存日志失败: {}", e),
            Err(e) => log::error!("保存日志任务异常: {}", e),
        }
    });
}

// ===== 渲染 =====

pub fn render(f: &mut Frame, app: &App) {
    let chunks = layout::main_layout(f.area());

    layout::render_header(f, app.device.as_deref(), chunks[0]);
    render_package_list(f, app, chunks[1]);
    layout::render_output(
        f,
        &app.output,
        app.output_scroll,
        app.focus == Focus::Output,
        chunks[2],
    );
    render_status_bar(f, app, chunks[3]);
    layout::render_footer(f, FOOTER_KEYS, chunks[4]);
}

fn row_style(pkg: &PackageState) -> (Color, &'static str) {
    if pkg.is_locked() {
        (LOCKED, "[-]")
    } else if pkg.is_kept() {
        (KEEP, "[ ]")
    } else {
        (REMOVE, "[x]")
    }
}

fn render_package_list(f: &mut Frame, app: &App, area: Rect) {
    let border = if app.focus == Focus::Packages {
        Color::Yellow
    } else {
        DIM
    };
    let block = Block::default()
        .title(format!(
            " Package List ({} 个, {} 个待处理) ",
            app.registry.len(),
            app.registry.count_marked()
        ))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border));

    if app.registry.is_empty() {
        let placeholder = Paragraph::new(if app.busy {
            "正在获取包列表..."
        } else {
            "没有包，按 r 重新连接设备"
        })
        .style(Style::default().fg(DIM))
        .alignment(Alignment::Center)
        .block(block);
        f.render_widget(placeholder, area);
        return;
    }

    let items: Vec<ListItem> = app
        .registry
        .all_in_order()
        .map(|pkg| {
            let (color, mark) = row_style(pkg);
            ListItem::new(Line::from(vec![
                Span::styled(format!("{:>4} ", pkg.index()), Style::default().fg(DIM)),
                Span::styled(format!("{} ", mark), Style::default().fg(color)),
                Span::styled(pkg.name().to_string(), Style::default().fg(color)),
                Span::styled(format!("  {}", pkg.action()), Style::default().fg(DIM)),
            ]))
        })
        .collect();

    let list = List::new(items)
        .block(block)
        .highlight_style(
            Style::default()
                .bg(SEL_BG)
                .fg(BRIGHT_WHITE)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("▶ ");

    let mut state = ListState::default();
    state.select(Some(app.selected));
    f.render_stateful_widget(list, area, &mut state);
}

fn render_status_bar(f: &mut Frame, app: &App, area: Rect) {
    let (dot, text) = if app.confirm_quit {
        (Color::Red, "Quit? (y/n)".to_string())
    } else if app.busy {
        (Color::Yellow, app.status.clone())
    } else {
        (Color::Green, app.status.clone())
    };
    let bar = Paragraph::new(Line::from(vec![
        Span::styled(" ● ", Style::default().fg(dot)),
        Span::raw(text),
    ]));
    f.render_widget(bar, area);
}
