mod layout;
mod packages;
pub mod state;
mod theme;

use crate::config::Config;
use anyhow::Result;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use state::{App, AppEvent};
use std::io;
use tokio::sync::mpsc;

pub async fn run(config: Config) -> Result<()> {
    // 终端初始化
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new(config);
    let (tx, mut rx) = mpsc::channel(32);

    // 启动时：重连设备并获取包列表
    packages::spawn_refresh(&mut app, &tx);

    let result = event_loop(&mut terminal, &mut app, &tx, &mut rx);

    // 恢复终端
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    result
}

fn event_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
    tx: &mpsc::Sender<AppEvent>,
    rx: &mut mpsc::Receiver<AppEvent>,
) -> Result<()> {
    loop {
        terminal.draw(|f| packages::render(f, app))?;

        // 处理按键
        if event::poll(std::time::Duration::from_millis(100))? {
            if let Event::Key(key) = event::read()? {
                if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
                    app.should_quit = true;
                } else {
                    let term_size = terminal.size()?;
                    packages::handle_key(key, app, tx, term_size.height)?;
                }
            }
        }

        // 处理后台任务事件
        while let Ok(event) = rx.try_recv() {
            handle_event(app, tx, event);
        }

        if app.should_quit {
            return Ok(());
        }
    }
}

fn handle_event(app: &mut App, tx: &mpsc::Sender<AppEvent>, event: AppEvent) {
    match event {
        AppEvent::Line(line) => app.add_line(line),
        AppEvent::Status(status) => app.status = status,
        AppEvent::DeviceDetected(info) => app.device = Some(info),
        AppEvent::DeviceLost(reason) => {
            app.device = None;
            app.status = format!("设备不可用: {}", reason);
        }
        AppEvent::PackagesListed(names) => {
            let count = names.len();
            app.load_packages(names);
            app.add_line(format!("已加载 {} 个包", count));
        }
        AppEvent::BatchComplete { action, summary } => {
            packages::handle_batch_complete(app, tx, action, summary);
        }
        AppEvent::ReportSaved(path) => app.add_line(format!("日志已保存: {}", path)),
        AppEvent::TaskFinished => {
            app.busy = false;
            if let Some(task) = app.status.strip_suffix("...") {
                app.status = format!("{} - done", task);
            }
        }
    }
}
