use super::theme::DIM;
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Margin, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Scrollbar, ScrollbarOrientation, ScrollbarState},
    Frame,
};

/// 输出面板高度（含边框）
pub const OUTPUT_HEIGHT: u16 = 12;

/// 布局：Header(3) + 包列表(弹性) + 输出(OUTPUT_HEIGHT) + 状态栏(1) + Footer(3)
pub fn main_layout(area: Rect) -> Vec<Rect> {
    Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(5),
            Constraint::Length(OUTPUT_HEIGHT),
            Constraint::Length(1),
            Constraint::Length(3),
        ])
        .split(area)
        .to_vec()
}

/// 标题栏：左侧应用名，右侧当前设备（未连接时标红）
pub fn render_header(f: &mut Frame, device: Option<&str>, area: Rect) {
    let device_span = match device {
        Some(info) => Span::styled(info.to_string(), Style::default().fg(Color::Green)),
        None => Span::styled("未连接设备", Style::default().fg(Color::Red)),
    };
    let title = Line::from(vec![
        Span::styled(
            "📱 Android 应用清理",
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        ),
        Span::styled("  |  ", Style::default().fg(DIM)),
        device_span,
    ]);
    let header = Paragraph::new(title)
        .block(Block::default().borders(Borders::ALL))
        .alignment(Alignment::Center);
    f.render_widget(header, area);
}

/// 按键提示栏，`keys` 为 (按键, 说明) 对
pub fn render_footer(f: &mut Frame, keys: &[(&str, &str)], area: Rect) {
    let mut spans = vec![Span::raw(" ")];
    for (key, label) in keys {
        spans.push(Span::styled(
            key.to_string(),
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
        ));
        spans.push(Span::styled(format!(" {}  ", label), Style::default().fg(DIM)));
    }
    let footer = Paragraph::new(Line::from(spans)).block(Block::default().borders(Borders::ALL));
    f.render_widget(footer, area);
}

/// 输出行配色：错误标红，批量操作的包标题高亮，分隔线变暗
fn output_style(line: &str) -> Style {
    if line.starts_with("ERROR:") {
        Style::default().fg(Color::Red)
    } else if line.starts_with("── ") {
        Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
    } else if line.starts_with("____") {
        Style::default().fg(DIM)
    } else {
        Style::default()
    }
}

/// adb 输出面板。`scroll` 超出范围时按最后一页显示
pub fn render_output(f: &mut Frame, lines: &[String], scroll: usize, focused: bool, area: Rect) {
    let border = if focused { Color::Yellow } else { DIM };
    let block = Block::default()
        .title(format!(" Status ({} 行) ", lines.len()))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border));
    let inner = block.inner(area).inner(Margin {
        horizontal: 1,
        vertical: 0,
    });
    f.render_widget(block, area);

    let height = inner.height as usize;
    let top = scroll.min(lines.len().saturating_sub(height));
    let shown: Vec<Line> = lines[top..]
        .iter()
        .take(height)
        .map(|line| Line::styled(line.clone(), output_style(line)))
        .collect();
    f.render_widget(Paragraph::new(shown), inner);

    if lines.len() > height {
        let mut state = ScrollbarState::new(lines.len()).position(top);
        f.render_stateful_widget(
            Scrollbar::new(ScrollbarOrientation::VerticalRight),
            area.inner(Margin {
                horizontal: 0,
                vertical: 1,
            }),
            &mut state,
        );
    }
}

/// 输出面板可见行数（去掉上下边框）
pub fn visible_output_height() -> usize {
    OUTPUT_HEIGHT.saturating_sub(2) as usize
}

/// 包列表可见行数：总高度减去其它区域和边框
pub fn visible_list_height(term_height: u16) -> usize {
    term_height.saturating_sub(3 + OUTPUT_HEIGHT + 1 + 3 + 2) as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_lines_are_coloured_by_kind() {
        assert_eq!(output_style("ERROR: 命令 'adb' 超时").fg, Some(Color::Red));
        assert_eq!(output_style("── Uninstall app: com.a ──").fg, Some(Color::Cyan));
        assert_eq!(output_style(super::super::state::SEPARATOR).fg, Some(DIM));
        assert_eq!(output_style("Success"), Style::default());
    }

    #[test]
    fn list_height_leaves_room_for_other_panels() {
        assert_eq!(visible_list_height(40), 40 - 3 - 12 - 1 - 3 - 2);
        assert_eq!(visible_list_height(5), 0);
    }
}
