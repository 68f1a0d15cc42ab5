//! adb 调用相关错误类型

use std::io;
use std::time::Duration;
use thiserror::Error;

/// 单次子进程调用的失败原因
#[derive(Debug, Error)]
pub enum RunError {
    #[error("无法启动命令 '{}': {source}", .argv.join(" "))]
    Spawn {
        argv: Vec<String>,
        #[source]
        source: io::Error,
    },

    #[error("读取命令 '{}' 输出失败: {source}", .argv.join(" "))]
    Io {
        argv: Vec<String>,
        #[source]
        source: io::Error,
    },

    /// 进程已结束但退出码非零；被信号终止时 code 为 -1
    #[error("命令 '{}' 返回非零退出码 {code}", .argv.join(" "))]
    NonZeroExit { argv: Vec<String>, code: i32 },

    #[error("命令 '{}' 超时（{timeout:?}）", .argv.join(" "))]
    TimedOut { argv: Vec<String>, timeout: Duration },
}

impl RunError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, RunError::TimedOut { .. })
    }
}

/// 设备枚举失败
#[derive(Debug, Error)]
pub enum DeviceError {
    #[error(transparent)]
    Run(#[from] RunError),

    #[error("没有检测到设备")]
    NoDevice,

    #[error("检测到 {0} 台设备，请只连接 *一台* 设备！")]
    MultipleDevices(usize),

    #[error("无法解析 adb devices 输出")]
    UnexpectedOutput,
}
