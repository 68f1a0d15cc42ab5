//! 包状态配色，全局统一使用

use ratatui::style::Color;

/// keep（浅绿）
pub const KEEP: Color = Color::Rgb(160, 230, 160);
/// remove（浅红）
pub const REMOVE: Color = Color::Rgb(255, 140, 140);
/// locked（灰红）
pub const LOCKED: Color = Color::Rgb(150, 110, 110);
/// 选中行背景色
pub const SEL_BG: Color = Color::Rgb(45, 35, 55);
/// 亮白色
pub const BRIGHT_WHITE: Color = Color::Rgb(255, 255, 255);
/// 暗灰色（次要信息）
pub const DIM: Color = Color::Rgb(130, 130, 140);
