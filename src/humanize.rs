use std::time::Duration;

/// 将耗时转换为易读文本：`900.0 ms` / `1.0 sec` / `1.1 min`
pub fn human_duration(d: Duration) -> String {
    let secs = d.as_secs_f64();
    if secs < 1.0 {
        format!("{:.1} ms", secs * 1000.0)
    } else if secs < 60.0 {
        format!("{:.1} sec", secs)
    } else {
        format!("{:.1} min", secs / 60.0)
    }
}
