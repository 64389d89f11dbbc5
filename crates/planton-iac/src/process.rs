//! Engine process helpers
//!
//! Engine output is streamed to the terminal line by line while also being
//! captured, so that failures can be classified after the process exits.

use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;

/// Captured result of an engine process
#[derive(Debug, Clone, Default)]
pub struct CommandOutput {
    pub success: bool,
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    /// stdout followed by stderr
    pub fn combined(&self) -> String {
        format!("{}{}", self.stdout, self.stderr)
    }

    /// Last non-empty stderr line, or the exit code
    pub fn failure_summary(&self) -> String {
        self.stderr
            .lines()
            .rev()
            .map(str::trim)
            .find(|l| !l.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| match self.code {
                Some(code) => format!("exited with status {code}"),
                None => "terminated by signal".to_string(),
            })
    }
}

/// Whether `binary` can be found in PATH
pub async fn binary_exists(binary: &str) -> bool {
    Command::new("which")
        .arg(binary)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await
        .map(|s| s.success())
        .unwrap_or(false)
}

/// Run `cmd`, echoing its output when `echo` is set, and capture everything
pub async fn run_streaming(mut cmd: Command, echo: bool) -> std::io::Result<CommandOutput> {
    cmd.stdin(Stdio::inherit());
    cmd.stdout(Stdio::piped());
    cmd.stderr(Stdio::piped());
    cmd.kill_on_drop(true);

    let mut child = cmd.spawn()?;
    let stdout = child.stdout.take();
    let stderr = child.stderr.take();

    let (stdout, stderr) = tokio::join!(
        pump(stdout, echo, false),
        pump(stderr, echo, true)
    );
    let status = child.wait().await?;

    Ok(CommandOutput {
        success: status.success(),
        code: status.code(),
        stdout: stdout?,
        stderr: stderr?,
    })
}

/// Run `cmd` attached to the terminal so the engine can prompt; nothing is captured
pub async fn run_interactive(mut cmd: Command) -> std::io::Result<CommandOutput> {
    cmd.stdin(Stdio::inherit());
    cmd.stdout(Stdio::inherit());
    cmd.stderr(Stdio::inherit());

    let status = cmd.status().await?;
    Ok(CommandOutput {
        success: status.success(),
        code: status.code(),
        ..Default::default()
    })
}

/// Drain `reader` to EOF; bytes that are not UTF-8 are replaced, never fatal
async fn pump<R>(reader: Option<R>, echo: bool, to_stderr: bool) -> std::io::Result<String>
where
    R: AsyncRead + Unpin,
{
    let Some(reader) = reader else {
        return Ok(String::new());
    };
    let mut reader = BufReader::new(reader);
    let mut captured = String::new();
    let mut buf = Vec::new();
    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf).await? == 0 {
            break;
        }
        let raw = buf.strip_suffix(b"\n").unwrap_or(&buf[..]);
        let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
        let line = String::from_utf8_lossy(raw);
        if echo {
            if to_stderr {
                eprintln!("{line}");
            } else {
                println!("{line}");
            }
        }
        captured.push_str(&line);
        captured.push('\n');
    }
    Ok(captured)
}
