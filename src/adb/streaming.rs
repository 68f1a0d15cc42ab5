//! 流式命令执行（合并 stdout/stderr，逐行产出，整体超时）
//!
//! 产出的每一行都去掉了末尾的 `\n`（以及紧挨着它的 `\r`），
//! 非 UTF-8 字节按 lossy 方式替换；最后一段没有换行符的输出同样作为一行产出。

use super::error::RunError;
use crate::humanize::human_duration;
use duct::ReaderHandle;
use std::io::{self, BufRead, BufReader};
use std::process::{Command, ExitStatus};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, SyncSender};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// 输出结束（或进程退出）后额外允许的最短等待时间
const MIN_FINAL_WAIT: Duration = Duration::from_secs(1);
const WAIT_POLL: Duration = Duration::from_millis(20);
/// 读取线程最多领先迭代器的行数
const LINE_BACKLOG: usize = 1024;

/// 读取线程发往迭代器的消息
enum Chunk {
    Line(String),
    Eof,
    Failed(io::Error),
}

/// 一次子进程调用的行序列。
///
/// 每次 `next()` 都会在必要时阻塞等待下一行，直到截止时间。
/// 进程退出后管道里剩余的行继续产出，但最晚到 `max(截止时间, 退出时刻) + MIN_FINAL_WAIT`；
/// 后台子孙进程一直占着管道写个不停也会在这个上限处超时。
/// 全部行产出之后，若退出码非零，最后一项是 `NonZeroExit`；
/// 超时则产出 `TimedOut`，整个进程组已被 SIGKILL，子进程已回收。之后迭代器恒为 `None`。
/// 未迭代完就 drop 时同样会杀死进程组并回收子进程。
pub struct LineStream {
    argv: Vec<String>,
    timeout: Duration,
    started: Instant,
    deadline: Instant,
    /// 首次观察到进程退出后确定的排空上限
    drain_deadline: Option<Instant>,
    /// 子进程在 pre_exec 里 setpgid(0, 0)，进程组号即其 PID
    pgid: Option<u32>,
    handle: Arc<ReaderHandle>,
    rx: Receiver<Chunk>,
    finished: bool,
}

/// 启动 `argv` 并返回其合并输出的行序列
pub fn run_streaming(argv: &[String], timeout: Duration) -> Result<LineStream, RunError> {
    let (program, args) = argv.split_first().ok_or_else(|| RunError::Spawn {
        argv: Vec::new(),
        source: io::Error::new(io::ErrorKind::InvalidInput, "命令不能为空"),
    })?;

    log::debug!("Call: {:?}...", argv.join(" "));

    let started = Instant::now();
    let handle = duct::cmd(program.as_str(), args.iter())
        .stderr_to_stdout()
        .stdin_null()
        .unchecked()
        .before_spawn(isolate_process_group)
        .reader()
        .map_err(|source| RunError::Spawn {
            argv: argv.to_vec(),
            source,
        })?;
    let pgid = handle.pids().first().copied();
    let handle = Arc::new(handle);

    let (tx, rx) = mpsc::sync_channel(LINE_BACKLOG);
    let reader = Arc::clone(&handle);
    thread::spawn(move || pump_lines(&reader, &tx));

    // 超大 timeout 视为不限时
    let deadline = started
        .checked_add(timeout)
        .unwrap_or_else(|| started + Duration::from_secs(60 * 60 * 24 * 365));

    Ok(LineStream {
        argv: argv.to_vec(),
        timeout,
        started,
        deadline,
        drain_deadline: None,
        pgid,
        handle,
        rx,
        finished: false,
    })
}

/// 创建独立进程组，超时时可以统一杀死整棵进程树
#[cfg(unix)]
fn isolate_process_group(cmd: &mut Command) -> io::Result<()> {
    use std::os::unix::process::CommandExt;

    unsafe {
        cmd.pre_exec(|| {
            libc::setpgid(0, 0);
            #[cfg(target_os = "linux")]
            {
                libc::prctl(libc::PR_SET_PDEATHSIG, libc::SIGTERM);
            }
            Ok(())
        });
    }
    Ok(())
}

#[cfg(not(unix))]
fn isolate_process_group(_cmd: &mut Command) -> io::Result<()> {
    Ok(())
}

/// 读取线程：按 `\n` 切行发送到 channel，直到 EOF 或接收端关闭
fn pump_lines(handle: &ReaderHandle, tx: &SyncSender<Chunk>) {
    let mut reader = BufReader::new(handle);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf) {
            Ok(0) => {
                let _ = tx.send(Chunk::Eof);
                return;
            }
            Ok(_) => {
                if tx.send(Chunk::Line(decode_line(&buf))).is_err() {
                    return;
                }
            }
            Err(e) => {
                let _ = tx.send(Chunk::Failed(e));
                return;
            }
        }
    }
}

fn decode_line(raw: &[u8]) -> String {
    let raw = match raw.strip_suffix(b"\n") {
        Some(rest) => rest.strip_suffix(b"\r").unwrap_or(rest),
        None => raw,
    };
    String::from_utf8_lossy(raw).into_owned()
}

impl LineStream {
    #[cfg(test)]
    fn pids(&self) -> Vec<u32> {
        self.handle.pids()
    }

    /// 把每一行转发给 sink，返回最终结果
    pub fn forward_to(self, sink: &mut dyn FnMut(&str)) -> Result<(), RunError> {
        for line in self {
            sink(&line?);
        }
        Ok(())
    }

    fn exit_status(&self) -> io::Result<Option<ExitStatus>> {
        Ok(self.handle.try_wait()?.map(|output| output.status))
    }

    fn timed_out(&self) -> RunError {
        RunError::TimedOut {
            argv: self.argv.clone(),
            timeout: self.timeout,
        }
    }

    /// 杀死整个进程组并回收子进程。
    /// 组长退出后组内其它进程仍可能存活，所以无论组长状态如何都要发信号
    fn terminate(&mut self) {
        self.finished = true;
        self.kill_process_group();
        if let Err(e) = self.handle.kill() {
            log::debug!("kill {:?} 失败: {}", self.argv.join(" "), e);
        }
    }

    #[cfg(unix)]
    fn kill_process_group(&self) {
        if let Some(pgid) = self.pgid {
            unsafe {
                libc::kill(-(pgid as i32), libc::SIGKILL);
            }
        }
    }

    #[cfg(not(unix))]
    fn kill_process_group(&self) {}

    /// 输出已经结束：用剩余预算（至少 MIN_FINAL_WAIT）等待进程退出
    fn finish(&mut self) -> Result<(), RunError> {
        let budget = self
            .deadline
            .saturating_duration_since(Instant::now())
            .max(MIN_FINAL_WAIT);
        let wait_deadline = Instant::now() + budget;

        loop {
            match self.exit_status() {
                Ok(Some(status)) => {
                    self.finished = true;
                    let code = status.code().unwrap_or(-1);
                    log::info!(
                        "{:?} (exit code: {} after {})",
                        self.argv.join(" "),
                        code,
                        human_duration(self.started.elapsed())
                    );
                    if status.success() {
                        return Ok(());
                    }
                    return Err(RunError::NonZeroExit {
                        argv: self.argv.clone(),
                        code,
                    });
                }
                Ok(None) => {}
                Err(source) => {
                    self.terminate();
                    return Err(RunError::Io {
                        argv: self.argv.clone(),
                        source,
                    });
                }
            }
            if Instant::now() >= wait_deadline {
                log::warn!("{:?} 输出已结束但进程未退出，强制终止", self.argv.join(" "));
                self.terminate();
                return Err(self.timed_out());
            }
            thread::sleep(WAIT_POLL);
        }
    }
}

impl Iterator for LineStream {
    type Item = Result<String, RunError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        let now = Instant::now();
        let cutoff = match self.drain_deadline {
            Some(cutoff) => cutoff,
            None if matches!(self.exit_status(), Ok(Some(_))) => {
                // 进程已退出：管道里剩余的行还可以排空，但上限只确定一次
                let cutoff = self.deadline.max(now) + MIN_FINAL_WAIT;
                self.drain_deadline = Some(cutoff);
                cutoff
            }
            None => self.deadline,
        };
        if now >= cutoff {
            log::warn!("{:?} 超时（{:?}），终止子进程", self.argv.join(" "), self.timeout);
            self.terminate();
            return Some(Err(self.timed_out()));
        }

        match self.rx.recv_timeout(cutoff - now) {
            Ok(Chunk::Line(line)) => Some(Ok(line)),
            Ok(Chunk::Eof) | Err(RecvTimeoutError::Disconnected) => self.finish().err().map(Err),
            Ok(Chunk::Failed(source)) => {
                self.terminate();
                Some(Err(RunError::Io {
                    argv: self.argv.clone(),
                    source,
                }))
            }
            Err(RecvTimeoutError::Timeout) => {
                log::warn!("{:?} 超时（{:?}），终止子进程", self.argv.join(" "), self.timeout);
                self.terminate();
                Some(Err(self.timed_out()))
            }
        }
    }
}

impl Drop for LineStream {
    fn drop(&mut self) {
        if !self.finished {
            self.terminate();
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn sh(script: &str) -> Vec<String> {
        vec!["sh".to_string(), "-c".to_string(), script.to_string()]
    }

    fn is_alive(pid: u32) -> bool {
        unsafe { libc::kill(pid as i32, 0) == 0 }
    }

    /// 被杀死的孤儿进程由 init 回收，回收前 kill(pid, 0) 仍然成功
    fn gone_soon(pid: u32) -> bool {
        let until = Instant::now() + Duration::from_secs(2);
        while Instant::now() < until {
            if !is_alive(pid) {
                return true;
            }
            thread::sleep(Duration::from_millis(20));
        }
        false
    }

    #[test]
    fn yields_every_line_in_order() {
        let stream = run_streaming(&sh("printf 'a\\nb\\nc\\n'"), Duration::from_secs(5)).unwrap();
        let lines: Vec<String> = stream.map(|l| l.unwrap()).collect();
        assert_eq!(lines, vec!["a", "b", "c"]);
    }

    #[test]
    fn strips_terminators_and_keeps_unterminated_tail() {
        let stream = run_streaming(&sh("printf 'one\\r\\ntwo'"), Duration::from_secs(5)).unwrap();
        let lines: Vec<String> = stream.map(|l| l.unwrap()).collect();
        assert_eq!(lines, vec!["one", "two"]);
    }

    #[test]
    fn merges_stderr_into_the_same_stream() {
        let stream =
            run_streaming(&sh("echo out; echo err 1>&2; echo out2"), Duration::from_secs(5)).unwrap();
        let lines: Vec<String> = stream.map(|l| l.unwrap()).collect();
        assert_eq!(lines, vec!["out", "err", "out2"]);
    }

    #[test]
    fn non_zero_exit_comes_after_all_lines() {
        let mut stream =
            run_streaming(&sh("echo first; echo second; exit 7"), Duration::from_secs(5)).unwrap();
        assert_eq!(stream.next().unwrap().unwrap(), "first");
        assert_eq!(stream.next().unwrap().unwrap(), "second");
        match stream.next() {
            Some(Err(RunError::NonZeroExit { code, argv })) => {
                assert_eq!(code, 7);
                assert_eq!(argv[0], "sh");
            }
            other => panic!("expected NonZeroExit, got {:?}", other.map(|r| r.is_ok())),
        }
        assert!(stream.next().is_none());
    }

    #[test]
    fn timeout_kills_and_reaps_the_child() {
        let mut stream =
            run_streaming(&sh("echo start; exec sleep 5"), Duration::from_millis(300)).unwrap();
        let pids = stream.pids();
        assert!(!pids.is_empty());

        let started = Instant::now();
        assert_eq!(stream.next().unwrap().unwrap(), "start");
        match stream.next() {
            Some(Err(RunError::TimedOut { timeout, .. })) => {
                assert_eq!(timeout, Duration::from_millis(300));
            }
            other => panic!("expected TimedOut, got {:?}", other.map(|r| r.is_ok())),
        }
        assert!(started.elapsed() < Duration::from_secs(3));
        assert!(stream.next().is_none());
        for pid in pids {
            assert!(!is_alive(pid), "child {} still running", pid);
        }
    }

    #[test]
    fn lines_written_after_the_child_exits_are_still_yielded() {
        let stream = run_streaming(
            &sh("(sleep 0.2; echo late) & echo early; exit 0"),
            Duration::from_secs(5),
        )
        .unwrap();
        let lines: Vec<String> = stream.map(|l| l.unwrap()).collect();
        assert_eq!(lines, vec!["early", "late"]);
    }

    #[test]
    fn background_writer_cannot_outlive_the_deadline() {
        // 直接子进程立即退出，后台的 yes 一直占着管道输出
        let mut stream = run_streaming(
            &sh("(sleep 0.1; exec yes) & echo $!; exit 0"),
            Duration::from_millis(300),
        )
        .unwrap();
        let writer: u32 = stream.next().unwrap().unwrap().parse().unwrap();

        let started = Instant::now();
        let mut outcome = None;
        for item in stream.by_ref() {
            if let Err(e) = item {
                outcome = Some(e);
                break;
            }
            assert!(started.elapsed() < Duration::from_secs(5), "stream never timed out");
        }
        assert!(matches!(outcome, Some(RunError::TimedOut { .. })));
        assert!(started.elapsed() < Duration::from_secs(3));
        assert!(stream.next().is_none());
        assert!(gone_soon(writer), "background writer {} still running", writer);
    }

    #[test]
    fn timeout_kills_the_group_after_the_leader_exits() {
        let mut stream = run_streaming(
            &sh("sleep 30 & echo $!; exit 0"),
            Duration::from_millis(300),
        )
        .unwrap();
        let sleeper: u32 = stream.next().unwrap().unwrap().parse().unwrap();
        assert!(is_alive(sleeper));

        match stream.next() {
            Some(Err(RunError::TimedOut { .. })) => {}
            other => panic!("expected TimedOut, got {:?}", other.map(|r| r.is_ok())),
        }
        drop(stream);
        assert!(gone_soon(sleeper), "background child {} still running", sleeper);
    }

    #[test]
    fn endless_output_still_times_out() {
        let stream = run_streaming(&["yes".to_string()], Duration::from_millis(200)).unwrap();
        let last = stream.last().unwrap();
        assert!(matches!(last, Err(RunError::TimedOut { .. })));
    }

    #[test]
    fn dropping_an_unfinished_stream_kills_the_child() {
        let mut stream =
            run_streaming(&sh("echo ready; exec sleep 5"), Duration::from_secs(10)).unwrap();
        let pids = stream.pids();
        assert_eq!(stream.next().unwrap().unwrap(), "ready");
        drop(stream);
        for pid in pids {
            assert!(!is_alive(pid));
        }
    }

    #[test]
    fn missing_program_is_a_spawn_error() {
        let result = run_streaming(
            &["definitely-not-a-real-binary-xyz".to_string()],
            Duration::from_secs(1),
        );
        assert!(matches!(result, Err(RunError::Spawn { .. })));
    }

    #[test]
    fn empty_argv_is_rejected() {
        assert!(matches!(
            run_streaming(&[], Duration::from_secs(1)),
            Err(RunError::Spawn { .. })
        ));
    }

    #[test]
    fn forward_to_feeds_sink_then_reports_failure() {
        let stream = run_streaming(&sh("echo x; echo y; exit 3"), Duration::from_secs(5)).unwrap();
        let mut seen = Vec::new();
        let result = stream.forward_to(&mut |line: &str| seen.push(line.to_string()));
        assert_eq!(seen, vec!["x", "y"]);
        assert!(matches!(result, Err(RunError::NonZeroExit { code: 3, .. })));
    }
}
