use tokio::process::Command;
use tracing::{debug, error};

use crate::error::{Error, LAUNCH_FAILURE_EXIT_CODE, Result};

/// Runs `command` without a shell and returns its stdout on exit status 0.
pub async fn run(command: &[String]) -> Result<String> {
    let rendered = command.join(" ");
    let Some((program, args)) = command.split_first() else {
        return Err(Error::ExternalCommandFailed {
            command: rendered,
            exit_code: LAUNCH_FAILURE_EXIT_CODE,
            stderr: "empty command".to_string(),
        });
    };

    debug!("Running command: {}", rendered);
    let output = match Command::new(program).args(args).output().await {
        Ok(output) => output,
        Err(e) => {
            error!("Failed to launch `{}`: {}", program, e);
            return Err(Error::ExternalCommandFailed {
                command: rendered,
                exit_code: LAUNCH_FAILURE_EXIT_CODE,
                stderr: e.to_string(),
            });
        }
    };

    let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
    if output.status.success() {
        return Ok(stdout);
    }

    let exit_code = output.status.code().unwrap_or(LAUNCH_FAILURE_EXIT_CODE);
    let stderr = captured_failure_text(&output.stderr, &stdout, exit_code);
    error!(
        "Command exited with code {}: {} - stderr: {}",
        exit_code, rendered, stderr
    );
    Err(Error::ExternalCommandFailed {
        command: rendered,
        exit_code,
        stderr,
    })
}

/// Some tools report errors on stdout, and some report nothing at all.
fn captured_failure_text(stderr: &[u8], stdout: &str, exit_code: i32) -> String {
    let stderr = String::from_utf8_lossy(stderr);
    if !stderr.trim().is_empty() {
        return stderr.trim_end().to_string();
    }
    if !stdout.trim().is_empty() {
        return stdout.trim_end().to_string();
    }
    format!("process exited with code {exit_code} without output")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cmd(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn returns_stdout_on_success() {
        let out = run(&cmd(&["echo", "hello world"])).await.unwrap();
        assert_eq!(out.trim(), "hello world");
    }

    #[tokio::test]
    async fn false_fails_with_exit_code_and_text() {
        let err = run(&cmd(&["false"])).await.unwrap_err();
        match err {
            Error::ExternalCommandFailed {
                command,
                exit_code,
                stderr,
            } => {
                assert_eq!(command, "false");
                assert_eq!(exit_code, 1);
                assert!(!stderr.is_empty());
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn captures_stderr_of_failing_command() {
        let err = run(&cmd(&["sh", "-c", "echo boom >&2; exit 3"]))
            .await
            .unwrap_err();
        match err {
            Error::ExternalCommandFailed {
                exit_code, stderr, ..
            } => {
                assert_eq!(exit_code, 3);
                assert_eq!(stderr, "boom");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn arguments_are_not_shell_interpreted() {
        let out = run(&cmd(&["echo", "$HOME; ls"])).await.unwrap();
        assert_eq!(out.trim(), "$HOME; ls");
    }

    #[tokio::test]
    async fn missing_binary_reports_sentinel_exit_code() {
        let err = run(&cmd(&["definitely-not-a-real-binary-4242"]))
            .await
            .unwrap_err();
        match err {
            Error::ExternalCommandFailed {
                exit_code, stderr, ..
            } => {
                assert_eq!(exit_code, LAUNCH_FAILURE_EXIT_CODE);
                assert!(!stderr.is_empty());
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn empty_command_is_rejected() {
        let err = run(&[]).await.unwrap_err();
        assert!(matches!(
            err,
            Error::ExternalCommandFailed {
                exit_code: LAUNCH_FAILURE_EXIT_CODE,
                ..
            }
        ));
    }
}
