use std::{
    env,
    io::{self, Read},
    path::{Path, PathBuf},
    process::{Child, Command, Stdio},
    sync::mpsc::{self, Receiver, RecvTimeoutError},
    thread,
    time::{Duration, Instant},
};

use itertools::Itertools;
use tracing::{debug, error};

use crate::{data::EnvMap, error::LaunchError};

/// Timeout used when only the output of a command matters
pub const DEFAULT_OUTPUT_TIMEOUT: Duration = Duration::from_secs(5);

const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Settings for running a command, on top of the command itself
#[derive(Debug, Clone, Default)]
pub struct ExecOptions {
    /// Added on top of the current environment
    pub env: EnvMap,
    pub cwd: Option<PathBuf>,
    pub timeout: Option<Duration>,
    /// Piping stderr can slow some programs down, so it is discarded unless asked for
    pub capture_stderr: bool,
    /// Skip debug logs about what is being run
    pub quiet: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessOutput {
    pub stdout: String,
    pub stderr: String,
    pub success: bool,
}

/// A copy of the current environment which is safe to pass on to other processes. `BASH_FUNC`
/// variables hold exported shell functions, which break when written to a file.
pub fn get_environment() -> EnvMap {
    env::vars_os()
        .filter_map(|(key, value)| Some((key.into_string().ok()?, value.into_string().ok()?)))
        .filter(|(key, _)| !key.starts_with("BASH_FUNC"))
        .collect()
}

/// Builds a [`Command`] from a command line, with the environment prepared the same way for
/// every way of running it
fn build_command(command: &[String], options: &ExecOptions) -> Result<Command, LaunchError> {
    let Some((program, args)) = command.split_first() else {
        return Err(LaunchError::MissingExecutable(String::new()));
    };

    if Path::new(program).is_absolute() && !Path::new(program).exists() {
        return Err(LaunchError::MissingExecutable(program.to_owned()));
    }

    if !options.quiet {
        debug!("Executing {}", command.join(" "));
        if !options.env.is_empty() {
            debug!(
                "{}",
                options
                    .env
                    .iter()
                    .map(|(key, value)| format!("{key}={value}"))
                    .join(" ")
            );
        }
    }

    let mut cmd = Command::new(program);
    cmd.args(args)
        .env_clear()
        .envs(get_environment())
        .envs(&options.env)
        .stdin(Stdio::null());

    if let Some(cwd) = &options.cwd {
        cmd.current_dir(cwd);
    }

    Ok(cmd)
}

fn spawn_error(command: &[String], source: io::Error) -> LaunchError {
    match source.kind() {
        io::ErrorKind::NotFound => {
            LaunchError::MissingExecutable(command.first().cloned().unwrap_or_default())
        }
        _ => LaunchError::ProcessLaunchFailure {
            command: command.to_vec(),
            source,
        },
    }
}

/// Reads a pipe to the end on its own thread, so a chatty child can not fill it up and stall
fn read_pipe<R: Read + Send + 'static>(pipe: Option<R>) -> Receiver<String> {
    let (sender, receiver) = mpsc::channel();
    thread::spawn(move || {
        let mut buffer = Vec::new();
        if let Some(mut pipe) = pipe {
            let _ = pipe.read_to_end(&mut buffer);
        }
        let _ = sender.send(String::from_utf8_lossy(&buffer).into_owned());
    });
    receiver
}

fn timeout_error(command: &[String], timeout: Duration) -> LaunchError {
    LaunchError::ProcessTimeout {
        command: command.to_vec(),
        timeout,
    }
}

fn wait_until(
    child: &mut Child,
    command: &[String],
    deadline: Option<(Instant, Duration)>,
) -> Result<bool, LaunchError> {
    let Some((deadline, timeout)) = deadline else {
        return Ok(child.wait()?.success());
    };

    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(status.success());
        }

        if Instant::now() >= deadline {
            let _ = child.kill();
            let _ = child.wait();
            return Err(timeout_error(command, timeout));
        }

        thread::sleep(POLL_INTERVAL);
    }
}

/// Output of a pipe reader. Processes left running in the background by the child can keep
/// the pipe open after it exits, so the reader gets the same deadline as the child.
fn collect_pipe(
    receiver: &Receiver<String>,
    command: &[String],
    deadline: Option<(Instant, Duration)>,
) -> Result<String, LaunchError> {
    let Some((deadline, timeout)) = deadline else {
        return Ok(receiver.recv().unwrap_or_default());
    };

    match receiver.recv_timeout(deadline.saturating_duration_since(Instant::now())) {
        Ok(output) => Ok(output),
        Err(RecvTimeoutError::Disconnected) => Ok(String::new()),
        Err(RecvTimeoutError::Timeout) => Err(timeout_error(command, timeout)),
    }
}

/// Runs a command to completion and returns its output
pub fn run_command(command: &[String], options: &ExecOptions) -> Result<ProcessOutput, LaunchError> {
    let mut cmd = build_command(command, options)?;
    cmd.stdout(Stdio::piped()).stderr(if options.capture_stderr {
        Stdio::piped()
    } else {
        Stdio::null()
    });

    let deadline = options
        .timeout
        .map(|timeout| (Instant::now() + timeout, timeout));

    let mut child = cmd.spawn().map_err(|e| spawn_error(command, e))?;
    let stdout = read_pipe(child.stdout.take());
    let stderr = read_pipe(child.stderr.take());

    let success = wait_until(&mut child, command, deadline)?;

    Ok(ProcessOutput {
        stdout: collect_pipe(&stdout, command, deadline)?.trim().to_owned(),
        stderr: collect_pipe(&stderr, command, deadline)?.trim().to_owned(),
        success,
    })
}

/// Runs a command and returns its standard output, with standard error discarded. Failures are
/// logged and give back an empty string.
pub fn execute(command: &[String], options: &ExecOptions) -> String {
    execute_with_error(
        command,
        &ExecOptions {
            capture_stderr: false,
            ..options.clone()
        },
    )
    .0
}

/// Runs a command and returns both its standard output and standard error. Failures are
/// logged and give back empty strings.
pub fn execute_with_error(command: &[String], options: &ExecOptions) -> (String, String) {
    let options = ExecOptions {
        capture_stderr: true,
        ..options.clone()
    };

    match run_command(command, &options) {
        Ok(output) => (output.stdout, output.stderr),
        Err(e) => {
            error!("Could not run command {command:?} (env: {:?}): {e}", options.env);
            (String::new(), String::new())
        }
    }
}

/// Starts a command without waiting for it, discarding all of its output
pub fn spawn(command: &[String], options: &ExecOptions) {
    let result = build_command(command, options).and_then(|mut cmd| {
        cmd.stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| spawn_error(command, e))
    });

    match result {
        Ok(child) => debug!("Spawned {command:?} with PID {}", child.id()),
        Err(e) => error!("Could not run command {command:?} (env: {:?}): {e}", options.env),
    }
}

/// Returns the output of a command, or an empty string if it failed or took too long
pub fn read_process_output(command: &[String], timeout: Option<Duration>) -> String {
    let options = ExecOptions {
        timeout: Some(timeout.unwrap_or(DEFAULT_OUTPUT_TIMEOUT)),
        quiet: true,
        ..Default::default()
    };

    match run_command(command, &options) {
        Ok(output) if output.success => output.stdout,
        Ok(_) => {
            error!("{command:?} command failed with a non-zero exit status");
            String::new()
        }
        Err(e) => {
            error!("{command:?} command failed: {e}");
            String::new()
        }
    }
}

#[cfg(test)]
pub mod test {
    use pretty_assertions::assert_eq;

    use super::*;

    fn sh(script: &str) -> Vec<String> {
        vec!["sh".to_owned(), "-c".to_owned(), script.to_owned()]
    }

    #[test]
    fn test_run_command() {
        let output = run_command(
            &sh("echo \"  $GREETING \"; echo oops >&2"),
            &ExecOptions {
                env: EnvMap::from([("GREETING".to_owned(), "hello".to_owned())]),
                capture_stderr: true,
                ..Default::default()
            },
        )
        .unwrap();

        assert_eq!(
            output,
            ProcessOutput {
                stdout: "hello".to_owned(),
                stderr: "oops".to_owned(),
                success: true,
            }
        );
    }

    #[test]
    fn test_run_command_cwd() {
        let dir = tempfile::tempdir().unwrap();
        let output = execute(
            &sh("pwd"),
            &ExecOptions {
                cwd: Some(dir.path().to_path_buf()),
                ..Default::default()
            },
        );

        assert_eq!(
            PathBuf::from(output).canonicalize().unwrap(),
            dir.path().canonicalize().unwrap()
        );
    }

    #[test]
    fn test_run_command_timeout() {
        let result = run_command(
            &sh("sleep 5"),
            &ExecOptions {
                timeout: Some(Duration::from_millis(100)),
                ..Default::default()
            },
        );

        assert!(matches!(result, Err(LaunchError::ProcessTimeout { .. })));
    }

    #[test]
    fn test_run_command_timeout_with_background_child() {
        let start = Instant::now();
        let result = run_command(
            &sh("sleep 4 & echo hi"),
            &ExecOptions {
                timeout: Some(Duration::from_millis(500)),
                ..Default::default()
            },
        );

        assert!(start.elapsed() < Duration::from_secs(2));
        assert!(matches!(result, Err(LaunchError::ProcessTimeout { .. })));
    }

    #[test]
    fn test_run_command_background_child_without_timeout() {
        let output = run_command(&sh("sleep 1 & echo hi"), &ExecOptions::default()).unwrap();
        assert_eq!(output.stdout, "hi");
    }

    #[test]
    fn test_run_command_missing() {
        assert!(matches!(
            run_command(&[], &ExecOptions::default()),
            Err(LaunchError::MissingExecutable(_))
        ));
        assert!(matches!(
            run_command(
                &["/definitely/not/here".to_owned()],
                &ExecOptions::default()
            ),
            Err(LaunchError::MissingExecutable(_))
        ));
        assert!(matches!(
            run_command(
                &["definitely-not-a-real-command".to_owned()],
                &ExecOptions::default()
            ),
            Err(LaunchError::MissingExecutable(_))
        ));
    }

    #[test]
    fn test_execute_never_fails() {
        assert_eq!(
            execute_with_error(&sh("exit 3"), &ExecOptions::default()),
            (String::new(), String::new())
        );
        assert_eq!(
            execute(&["definitely-not-a-real-command".to_owned()], &ExecOptions::default()),
            ""
        );
    }

    #[test]
    fn test_read_process_output() {
        assert_eq!(read_process_output(&sh("echo wine-8.0"), None), "wine-8.0");
        assert_eq!(read_process_output(&sh("echo partial; exit 1"), None), "");
        assert_eq!(
            read_process_output(&sh("sleep 5"), Some(Duration::from_millis(50))),
            ""
        );
    }

    #[test]
    fn test_get_environment_has_no_bash_functions() {
        assert!(get_environment().keys().all(|k| !k.starts_with("BASH_FUNC")));
    }
}
