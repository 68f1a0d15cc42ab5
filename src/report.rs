use anyhow::Result;
use chrono::Local;
use std::fs;
use std::path::PathBuf;

/// 批量操作日志保存器
pub struct ReportSaver {
    base_dir: PathBuf,
}

impl ReportSaver {
    pub fn new(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    /// 保存到 `base_dir/YYYY/MM/DD/HH-MM-SS-<action>.log`
    pub fn save(&self, lines: &[String], device: &str, action: &str) -> Result<PathBuf> {
        let now = Local::now();

        let dir = self
            .base_dir
            .join(now.format("%Y").to_string())
            .join(now.format("%m").to_string())
            .join(now.format("%d").to_string());
        fs::create_dir_all(&dir)?;

        let filepath = dir.join(format!("{}-{}.log", now.format("%H-%M-%S"), action));

        let mut content = String::new();
        content.push_str(&format!(
            "{} 操作日志\n设备: {}\n生成时间: {}\n\n",
            action,
            device,
            now.format("%Y-%m-%d %H:%M:%S")
        ));
        for line in lines {
            content.push_str(line);
            content.push('\n');
        }

        fs::write(&filepath, content)?;
        Ok(filepath)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_dated_log() {
        let dir = tempfile::tempdir().unwrap();
        let saver = ReportSaver::new(dir.path().to_path_buf());
        let lines = vec!["Uninstall app: com.foo".to_string(), "Success".to_string()];

        let path = saver.save(&lines, "ABC123", "uninstall").unwrap();
        assert!(path.starts_with(dir.path()));
        assert!(path.to_string_lossy().ends_with("-uninstall.log"));

        let content = fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("uninstall 操作日志\n设备: ABC123\n"));
        assert!(content.ends_with("Uninstall app: com.foo\nSuccess\n"));
    }
}
