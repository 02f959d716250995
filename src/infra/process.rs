//! 进程扫描模块 - 按名称查找并强制终止残留的采集进程
//!
//! 这是上次崩溃后遗留 rtl_fm 进程的兜底清理，只在启动时调用，
//! 不用于日常的连接管理。

use serde::{Deserialize, Serialize};
use std::ffi::OsStr;
use std::path::Path;
use sysinfo::{Pid, Process, System};
use tracing::{debug, info, warn};

/// 匹配到的进程信息
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessInfo {
    pub pid: u32,
    pub name: String,
    pub args: Vec<String>,
    pub start_time: u64,
}

/// 进程扫描器
pub struct ProcessScanner {
    system: System,
}

impl ProcessScanner {
    pub fn new() -> Self {
        let mut system = System::new_all();
        system.refresh_all();
        Self { system }
    }

    /// 查找名称匹配的进程（排除自身）
    ///
    /// `name` 可以是配置中的完整路径，只比较其文件名部分。
    pub fn find_by_name(&self, name: &str) -> Vec<ProcessInfo> {
        self.matching(name)
            .map(|(pid, process)| ProcessInfo {
                pid: pid.as_u32(),
                name: process.name().to_string_lossy().to_string(),
                args: process.cmd().iter().map(|s| s.to_string_lossy().to_string()).collect(),
                start_time: process.start_time(),
            })
            .collect()
    }

    /// 强制终止所有名称匹配的进程，返回成功发送信号的数量
    pub fn kill_by_name(&self, name: &str) -> usize {
        let mut killed = 0;
        for (pid, process) in self.matching(name) {
            if process.kill() {
                debug!(pid = pid.as_u32(), name, "Killed stale process");
                killed += 1;
            } else {
                warn!(pid = pid.as_u32(), name, "Failed to kill stale process");
            }
        }
        killed
    }

    fn matching<'a>(&'a self, name: &'a str) -> impl Iterator<Item = (&'a Pid, &'a Process)> + 'a {
        let own_pid = sysinfo::get_current_pid().ok();
        let target = executable_name(name);
        self.system
            .processes()
            .iter()
            .filter(move |(pid, process)| Some(**pid) != own_pid && is_named(process, target))
    }
}

/// 程序路径的文件名部分，`/usr/local/bin/rtl_fm` → `rtl_fm`
fn executable_name(program: &str) -> &OsStr {
    Path::new(program)
        .file_name()
        .unwrap_or_else(|| OsStr::new(program))
}

/// 进程名或可执行文件名与目标一致
fn is_named(process: &Process, target: &OsStr) -> bool {
    process.name() == target || process.exe().and_then(Path::file_name) == Some(target)
}

impl Default for ProcessScanner {
    fn default() -> Self {
        Self::new()
    }
}

/// 终止系统中所有名为 `name` 的进程（相当于 `killall -9 name`）
pub fn sweep_stale(name: &str) -> usize {
    let killed = ProcessScanner::new().kill_by_name(name);
    if killed > 0 {
        info!(name, killed, "Swept stale processes");
    }
    killed
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::os::unix::fs::symlink;
    use std::os::unix::process::ExitStatusExt;
    use std::path::PathBuf;
    use std::process::{Child, Command, Stdio};

    /// 通过指向 sh 的符号链接启动一个名称唯一、阻塞在 stdin 上的进程
    fn spawn_named(dir: &Path, name: &str) -> (PathBuf, Child) {
        let program = dir.join(name);
        symlink("/bin/sh", &program).unwrap();
        let child = Command::new(&program)
            .args(["-c", "read line"])
            .stdin(Stdio::piped())
            .spawn()
            .unwrap();
        (program, child)
    }

    #[test]
    fn test_executable_name() {
        assert_eq!(executable_name("/usr/local/bin/rtl_fm"), OsStr::new("rtl_fm"));
        assert_eq!(executable_name("rtl_fm"), OsStr::new("rtl_fm"));
    }

    #[test]
    fn test_find_unknown_name_is_empty() {
        let scanner = ProcessScanner::new();
        assert!(scanner.find_by_name("p2000-no-such-process").is_empty());
    }

    #[test]
    fn test_sweep_unknown_name_is_noop() {
        assert_eq!(sweep_stale("p2000-no-such-process"), 0);
    }

    #[test]
    fn test_find_by_name_sees_child() {
        let mut child = std::process::Command::new("sleep")
            .arg("30")
            .spawn()
            .unwrap();

        let scanner = ProcessScanner::new();
        let found = scanner.find_by_name("sleep");
        assert!(found.iter().any(|p| p.pid == child.id()));

        child.kill().unwrap();
        child.wait().unwrap();
    }

    #[test]
    fn test_sweep_by_full_path_kills_process() {
        // Given: 以完整路径启动的残留进程
        let dir = tempfile::tempdir().unwrap();
        let (program, mut child) = spawn_named(dir.path(), &format!("p2ks{}", std::process::id()));
        let program = program.to_string_lossy().to_string();

        let scanner = ProcessScanner::new();
        assert!(scanner.find_by_name(&program).iter().any(|p| p.pid == child.id()));

        // When: 按配置中的完整路径清理
        let killed = sweep_stale(&program);

        // Then: 进程被 SIGKILL 终止
        assert_eq!(killed, 1);
        let status = child.wait().unwrap();
        assert_eq!(status.signal(), Some(9));
    }

    #[test]
    fn test_kill_by_bare_name() {
        let dir = tempfile::tempdir().unwrap();
        let name = format!("p2kb{}", std::process::id());
        let (_, mut child) = spawn_named(dir.path(), &name);

        assert_eq!(ProcessScanner::new().kill_by_name(&name), 1);
        assert_eq!(child.wait().unwrap().signal(), Some(9));
        assert!(ProcessScanner::new().find_by_name(&name).is_empty());
    }
}
