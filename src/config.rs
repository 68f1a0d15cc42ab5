use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// adb 可执行文件（可被环境变量 LIAN_ADB 覆盖）
    pub adb_path: String,
    /// 追加在 adb 之后的全局参数，例如 ["-s", "SERIAL"]
    pub adb_args: Vec<String>,
    pub list_timeout_secs: u64,
    pub uninstall_timeout_secs: u64,
    pub disable_timeout_secs: u64,
    pub devices_timeout_secs: u64,
    pub wait_device_timeout_secs: u64,
    pub server_timeout_secs: u64,
    pub report_dir: PathBuf,
    pub save_reports: bool,
    /// 额外锁定的包名，与内置列表合并
    pub extra_locked: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
        Self {
            adb_path: "adb".to_string(),
            adb_args: Vec::new(),
            list_timeout_secs: 10,
            uninstall_timeout_secs: 3,
            disable_timeout_secs: 3,
            devices_timeout_secs: 3,
            wait_device_timeout_secs: 5,
            server_timeout_secs: 10,
            report_dir: PathBuf::from(home).join(".lian/debloat"),
            save_reports: true,
            extra_locked: Vec::new(),
        }
    }
}

impl Config {
    pub fn load_or_default() -> Result<Self> {
        let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
        let config_path = PathBuf::from(home).join(".config/lian-debloat/config.toml");

        let mut config = if config_path.exists() {
            Self::load_from(&config_path)?
        } else {
            Self::default()
        };

        if let Ok(adb) = std::env::var("LIAN_ADB") {
            if !adb.trim().is_empty() {
                config.adb_path = adb;
            }
        }
        Ok(config)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("读取配置文件失败: {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("解析配置文件失败: {}", path.display()))?;
        Ok(config)
    }
}
