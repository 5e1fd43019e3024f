use std::io::Read;
use std::process::{Child, Command, Output, Stdio};
use std::time::{Duration, Instant};

use crate::error::{HwError, Result};

const POLL: Duration = Duration::from_millis(10);

/// Split a command template into argv; the first word is the program.
pub fn split_command(template: &str) -> Result<Vec<String>> {
    let parts = shell_words::split(template)
        .map_err(|e| HwError::InvalidCommand(format!("{template}: {e}")))?;
    if parts.is_empty() {
        return Err(HwError::InvalidCommand("empty command".into()));
    }
    Ok(parts)
}

/// Build a `Command` from argv, replacing `{key}` placeholders in each word.
pub fn command_from(argv: &[String], vars: &[(&str, &str)]) -> Result<Command> {
    let Some((program, args)) = argv.split_first() else {
        return Err(HwError::InvalidCommand("empty command".into()));
    };
    let mut cmd = Command::new(program);
    for a in args {
        cmd.arg(substitute(a, vars));
    }
    Ok(cmd)
}

pub fn substitute(word: &str, vars: &[(&str, &str)]) -> String {
    let mut out = word.to_string();
    for (key, value) in vars {
        out = out.replace(&format!("{{{key}}}"), value);
    }
    out
}

fn drain<R: Read + Send + 'static>(r: Option<R>) -> std::thread::JoinHandle<Vec<u8>> {
    std::thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut r) = r {
            let _ = r.read_to_end(&mut buf);
        }
        buf
    })
}

/// Run `cmd` to completion, killing it once `timeout` expires.
///
/// Output pipes are drained on helper threads so a chatty child cannot block.
/// A non-zero exit is returned as `Ok`; callers decide what failure means.
pub fn run_with_timeout(cmd: &mut Command, timeout: Duration) -> Result<Output> {
    let program = cmd.get_program().to_string_lossy().into_owned();
    let mut child: Child = cmd
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|source| HwError::Spawn {
            program: program.clone(),
            source,
        })?;
    let out = drain(child.stdout.take());
    let err = drain(child.stderr.take());

    let deadline = Instant::now() + timeout;
    let status = loop {
        if let Some(status) = child.try_wait()? {
            break status;
        }
        if Instant::now() >= deadline {
            let _ = child.kill();
            let _ = child.wait();
            tracing::warn!(%program, timeout_ms = timeout.as_millis(), "command timed out, killed");
            return Err(HwError::CommandTimeout {
                program,
                ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
            });
        }
        std::thread::sleep(POLL);
    };

    Ok(Output {
        status,
        stdout: out.join().unwrap_or_default(),
        stderr: err.join().unwrap_or_default(),
    })
}

/// `run_with_timeout` that also treats a non-zero exit as an error.
pub fn run_checked(cmd: &mut Command, timeout: Duration) -> Result<Output> {
    let program = cmd.get_program().to_string_lossy().into_owned();
    let output = run_with_timeout(cmd, timeout)?;
    if !output.status.success() {
        return Err(HwError::CommandFailed {
            program,
            status: output.status.to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }
    Ok(output)
}

/// First executable named `program` on `PATH`.
pub fn find_on_path(program: &str) -> Option<std::path::PathBuf> {
    let path = std::env::var_os("PATH")?;
    std::env::split_paths(&path)
        .map(|dir| dir.join(program))
        .find(|candidate| is_executable(candidate))
}

#[cfg(unix)]
fn is_executable(p: &std::path::Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    std::fs::metadata(p)
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(p: &std::path::Path) -> bool {
    p.is_file()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placeholders_are_replaced_per_word() {
        let argv = split_command("echo 'status=Food: {food}' {weight}").unwrap();
        assert_eq!(argv, vec!["echo", "status=Food: {food}", "{weight}"]);
        assert_eq!(
            substitute(&argv[1], &[("food", "Apple"), ("weight", "150")]),
            "status=Food: Apple"
        );
    }

    #[test]
    fn empty_and_unbalanced_commands_are_invalid() {
        assert!(matches!(split_command("   "), Err(HwError::InvalidCommand(_))));
        assert!(matches!(split_command("echo 'oops"), Err(HwError::InvalidCommand(_))));
    }

    #[cfg(unix)]
    #[test]
    fn slow_command_is_killed() {
        let mut cmd = Command::new("sleep");
        cmd.arg("5");
        let started = Instant::now();
        let err = run_with_timeout(&mut cmd, Duration::from_millis(100)).unwrap_err();
        assert!(matches!(err, HwError::CommandTimeout { .. }));
        assert!(started.elapsed() < Duration::from_secs(3));
    }

    #[cfg(unix)]
    #[test]
    fn non_zero_exit_is_reported_with_stderr() {
        let mut cmd = Command::new("sh");
        cmd.args(["-c", "echo nope >&2; exit 3"]);
        let err = run_checked(&mut cmd, Duration::from_secs(5)).unwrap_err();
        match err {
            HwError::CommandFailed { stderr, .. } => assert_eq!(stderr, "nope"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn missing_program_is_a_spawn_error() {
        let mut cmd = Command::new("definitely-not-a-real-binary-xyz");
        assert!(matches!(
            run_with_timeout(&mut cmd, Duration::from_secs(1)),
            Err(HwError::Spawn { .. })
        ));
    }
}
