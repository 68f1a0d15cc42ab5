mod adb;
mod config;
mod humanize;
mod packages;
mod report;
mod tui;

use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    // 加载配置（adb 路径可由 LIAN_ADB 覆盖）
    let config = config::Config::load_or_default()?;
    log::info!("使用 adb: {}", config.adb_path);

    tui::run(config).await?;

    Ok(())
}
