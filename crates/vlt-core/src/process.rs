//! Running external commands and hooks
//!
//! Children inherit the tool's stdout and stderr. A child still running when
//! the cancellation token fires is killed.

use anyhow::{anyhow, bail, Context, Result};
use std::io::{self, Write};
use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Run a command with stdin inherited
pub fn run_command(cancel: &CancellationToken, name: &str, args: &[String]) -> Result<()> {
    let mut child = Command::new(name)
        .args(args)
        .stdin(Stdio::inherit())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .spawn()
        .with_context(|| format!("Failed to start {:?}", name))?;

    wait(cancel, &mut child, name)
}

/// Run a command with `input` written to its stdin.
///
/// The input is written from its own thread so a child that never reads it
/// can't block waiting or cancellation.
pub fn run_command_with_input(
    cancel: &CancellationToken,
    input: &[u8],
    name: &str,
    args: &[String],
) -> Result<()> {
    let mut child = Command::new(name)
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .spawn()
        .with_context(|| format!("Failed to start {:?}", name))?;

    let stdin = child.stdin.take();

    thread::scope(|scope| {
        // Dropping the handle closes the pipe so the child sees EOF.
        let writer = scope.spawn(move || match stdin {
            Some(mut stdin) => stdin.write_all(input),
            None => Ok(()),
        });

        let status = wait(cancel, &mut child, name);
        let written = writer
            .join()
            .map_err(|_| anyhow!("stdin writer for {:?} panicked", name))?;
        status?;

        match written {
            // The child exited successfully without reading all of its input.
            Err(e) if e.kind() == io::ErrorKind::BrokenPipe => Ok(()),
            other => other.with_context(|| format!("Failed to write to {:?}", name)),
        }
    })
}

/// Run a hook argv. An empty hook is a no-op.
pub fn run_hook(cancel: &CancellationToken, hook: &[String]) -> Result<()> {
    let Some((name, args)) = hook.split_first() else {
        return Ok(());
    };

    tracing::info!(command = %name, ?args, "running hook");

    run_command(cancel, name, args)
}

fn wait(cancel: &CancellationToken, child: &mut Child, name: &str) -> Result<()> {
    loop {
        if let Some(status) = child.try_wait()? {
            if !status.success() {
                bail!("{:?} exited with {}", name, status);
            }
            return Ok(());
        }

        if cancel.is_cancelled() {
            let _ = child.kill();
            let _ = child.wait();
            bail!("{:?} cancelled", name);
        }

        thread::sleep(POLL_INTERVAL);
    }
}
