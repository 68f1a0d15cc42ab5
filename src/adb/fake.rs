//! 测试用的假 adb：由 `sh` 解释的 case 脚本

use super::Bridge;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

pub(crate) struct FakeAdb {
    _dir: TempDir,
    script: PathBuf,
}

impl FakeAdb {
    /// `arms` 是 `case "$*" in ... esac` 内的分支，未匹配的参数以退出码 127 结束
    pub(crate) fn new(arms: &str) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("adb.sh");
        let body = format!(
            "case \"$*\" in\n{}\n*) echo \"unknown: $*\"; exit 127 ;;\nesac\n",
            arms
        );
        fs::write(&script, body).unwrap();
        Self { _dir: dir, script }
    }

    /// 通过 `sh <script>` 调用，避免直接 exec 刚写入的文件
    pub(crate) fn bridge(&self) -> Bridge {
        Bridge::new("sh").with_args([self.script.display().to_string()])
    }
}
