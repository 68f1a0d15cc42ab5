//! 设备桥模块 — 对 adb 子命令的封装

pub mod error;
pub mod parser;
pub mod streaming;

#[cfg(all(test, unix))]
pub(crate) mod fake;

pub use error::{DeviceError, RunError};
pub use streaming::run_streaming;

use crate::config::Config;
use std::time::Duration;

/// 各类 adb 调用的超时
#[derive(Debug, Clone)]
pub struct Timeouts {
    pub list: Duration,
    pub uninstall: Duration,
    pub disable: Duration,
    pub devices: Duration,
    pub wait_device: Duration,
    pub server: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            list: Duration::from_secs(10),
            uninstall: Duration::from_secs(3),
            disable: Duration::from_secs(3),
            devices: Duration::from_secs(3),
            wait_device: Duration::from_secs(5),
            server: Duration::from_secs(10),
        }
    }
}

impl Timeouts {
    pub fn from_config(config: &Config) -> Self {
        Self {
            list: Duration::from_secs(config.list_timeout_secs),
            uninstall: Duration::from_secs(config.uninstall_timeout_secs),
            disable: Duration::from_secs(config.disable_timeout_secs),
            devices: Duration::from_secs(config.devices_timeout_secs),
            wait_device: Duration::from_secs(config.wait_device_timeout_secs),
            server: Duration::from_secs(config.server_timeout_secs),
        }
    }
}

/// adb 命令前缀（程序 + 全局参数，如 `adb -s SERIAL`）与超时设置
#[derive(Debug, Clone)]
pub struct Bridge {
    command: Vec<String>,
    timeouts: Timeouts,
}

impl Bridge {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            command: vec![program.into()],
            timeouts: Timeouts::default(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.adb_path.clone())
            .with_args(config.adb_args.iter().cloned())
            .with_timeouts(Timeouts::from_config(config))
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.command.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn with_timeouts(mut self, timeouts: Timeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    pub fn timeouts(&self) -> &Timeouts {
        &self.timeouts
    }

    /// 拼接完整 argv
    pub fn argv(&self, args: &[&str]) -> Vec<String> {
        let mut argv = self.command.clone();
        argv.extend(args.iter().map(|s| s.to_string()));
        argv
    }

    pub fn list_packages_argv(&self) -> Vec<String> {
        self.argv(&["shell", "pm", "list", "packages"])
    }

    pub fn uninstall_argv(&self, package: &str) -> Vec<String> {
        self.argv(&["shell", "pm", "uninstall", "--user", "0", package])
    }

    pub fn disable_argv(&self, package: &str) -> Vec<String> {
        self.argv(&["shell", "pm", "disable-user", package])
    }

    pub fn devices_argv(&self) -> Vec<String> {
        self.argv(&["devices", "-l"])
    }

    pub fn wait_for_device_argv(&self) -> Vec<String> {
        self.argv(&["wait-for-usb-device"])
    }

    pub fn kill_server_argv(&self) -> Vec<String> {
        self.argv(&["kill-server"])
    }

    pub fn reconnect_argv(&self) -> Vec<String> {
        self.argv(&["reconnect"])
    }

    /// 执行命令：每一行实时转发给 sink，同时收集返回
    pub fn run(
        &self,
        argv: &[String],
        timeout: Duration,
        sink: &mut dyn FnMut(&str),
    ) -> Result<Vec<String>, RunError> {
        let mut lines = Vec::new();
        run_streaming(argv, timeout)?.forward_to(&mut |line: &str| {
            sink(line);
            lines.push(line.to_string());
        })?;
        Ok(lines)
    }

    /// 获取设备上的包名列表（升序）。
    ///
    /// `package:` 行只计数不转发，其它行（警告、错误）原样转发给 sink。
    pub fn list_packages(&self, sink: &mut dyn FnMut(&str)) -> Result<Vec<String>, RunError> {
        let mut names = Vec::new();
        for line in run_streaming(&self.list_packages_argv(), self.timeouts.list)? {
            let line = line?;
            match parser::parse_package_line(&line) {
                Some(name) => names.push(name.to_string()),
                None => sink(&line),
            }
        }
        names.sort();
        sink(&format!("找到 {} 个应用包", names.len()));
        Ok(names)
    }

    /// 等待 USB 设备并读取设备信息，要求只连接一台设备
    pub fn list_devices(&self, sink: &mut dyn FnMut(&str)) -> Result<String, DeviceError> {
        if let Err(e) = self.run(&self.wait_for_device_argv(), self.timeouts.wait_device, sink) {
            sink(&format!("ERROR: {}", e));
            if e.is_timeout() {
                sink("Maybe 'USB Debugging' is not enabled on device?!?");
            }
        }

        let lines = self.run(&self.devices_argv(), self.timeouts.devices, sink)?;
        parser::parse_single_device(&lines)
    }

    /// 重启 adb server 并重连设备；失败只记录，不中断
    pub fn reconnect(&self, sink: &mut dyn FnMut(&str)) {
        for argv in [self.kill_server_argv(), self.reconnect_argv()] {
            if let Err(e) = self.run(&argv, self.timeouts.server, sink) {
                sink(&format!("ERROR: {}", e));
            }
        }
    }
}
