//! adb 输出解析函数

use super::error::DeviceError;

/// 从 `pm list packages` 的一行中提取包名（`package:<name>`），其它行返回 None
pub fn parse_package_line(line: &str) -> Option<&str> {
    let name = line.strip_prefix("package:")?.trim();
    if name.is_empty() {
        None
    } else {
        Some(name)
    }
}

/// 解析 `adb devices -l` 输出，要求恰好一台设备。
///
/// 示例输出：
/// ```text
/// List of devices attached
/// XYZ1234             device usb:3-10.4 product:foo model:bar device:foobar
/// ```
/// 返回 `XYZ1234 - device usb:3-10.4 product:foo model:bar device:foobar`
pub fn parse_single_device(lines: &[String]) -> Result<String, DeviceError> {
    if !lines.iter().any(|l| l.contains("attached")) {
        return Err(DeviceError::UnexpectedOutput);
    }

    let lines: Vec<&str> = lines
        .iter()
        .map(|l| l.trim())
        .filter(|l| !l.is_empty())
        .collect();

    match lines.len() {
        0 | 1 => Err(DeviceError::NoDevice),
        2 => Ok(collapse_whitespace(lines[1])),
        n => Err(DeviceError::MultipleDevices(n - 1)),
    }
}

/// 两个及以上连续空白替换为 ` - `，单个空白保留
fn collapse_whitespace(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut run = String::new();

    for c in s.chars() {
        if c.is_whitespace() {
            run.push(c);
            continue;
        }
        match run.chars().count() {
            0 => {}
            1 => result.push_str(&run),
            _ => result.push_str(" - "),
        }
        run.clear();
        result.push(c);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn owned(lines: &[&str]) -> Vec<String> {
        lines.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn package_lines() {
        assert_eq!(parse_package_line("package:com.android.chrome"), Some("com.android.chrome"));
        assert_eq!(parse_package_line("package:com.foo.bar \t"), Some("com.foo.bar"));
        assert_eq!(parse_package_line("package:"), None);
        assert_eq!(parse_package_line("Error: something"), None);
        assert_eq!(parse_package_line(""), None);
    }

    #[test]
    fn single_device_is_formatted() {
        let out = owned(&[
            "List of devices attached",
            "XYZ1234             device usb:3-10.4 product:foo model:bar device:foobar",
            "",
        ]);
        assert_eq!(
            parse_single_device(&out).unwrap(),
            "XYZ1234 - device usb:3-10.4 product:foo model:bar device:foobar"
        );
    }

    #[test]
    fn no_device_and_many_devices() {
        let none = owned(&["List of devices attached", ""]);
        assert!(matches!(parse_single_device(&none), Err(DeviceError::NoDevice)));

        let two = owned(&[
            "List of devices attached",
            "AAA   device usb:1",
            "BBB   device usb:2",
        ]);
        assert!(matches!(
            parse_single_device(&two),
            Err(DeviceError::MultipleDevices(2))
        ));
    }

    #[test]
    fn garbage_output_is_rejected() {
        let out = owned(&["adb: command not found"]);
        assert!(matches!(
            parse_single_device(&out),
            Err(DeviceError::UnexpectedOutput)
        ));
    }
}
