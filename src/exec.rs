//! Renderer process execution.
//!
//! A render is an ordered chain of [`Invocation`]s: the renderer launched
//! directly, then the same renderer launched under a virtual-display wrapper.
//! Each attempt receives the identical argument vector and stdin bytes. The
//! first attempt that exits successfully wins; if every attempt fails, the
//! last failure is returned and the earlier ones ride along as context.

use crate::config::RendererConfig;
use crate::detect;
use crate::error::{Error, Result};
use std::ffi::OsString;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, Command, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Final renderer argument: write the PDF to stdout.
pub const OUTPUT_STDOUT: &str = "-";

const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// One way of launching the renderer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    program: PathBuf,
    prefix: Vec<OsString>,
}

impl Invocation {
    /// Launch `program` with no leading arguments.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            prefix: Vec::new(),
        }
    }

    /// Set the arguments placed before the document arguments.
    pub fn with_prefix<I, S>(mut self, prefix: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.prefix = prefix.into_iter().map(Into::into).collect();
        self
    }

    /// The renderer executable launched directly.
    pub fn direct(config: &RendererConfig) -> Self {
        Self::new(&config.renderer)
    }

    /// The renderer launched as a child of the display wrapper.
    pub fn display_wrapped(config: &RendererConfig) -> Option<Self> {
        let wrapper = config.display_wrapper.as_ref()?;
        let mut prefix: Vec<OsString> = config.wrapper_args.iter().map(OsString::from).collect();
        prefix.push(config.renderer.clone().into_os_string());
        Some(Self {
            program: wrapper.clone(),
            prefix,
        })
    }

    /// Direct launch followed by the display-wrapped fallback, if configured.
    pub fn chain(config: &RendererConfig) -> Vec<Self> {
        let mut attempts = vec![Self::direct(config)];
        attempts.extend(Self::display_wrapped(config));
        attempts
    }

    /// The executable this invocation starts.
    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Arguments placed before the document arguments.
    pub fn prefix(&self) -> &[OsString] {
        &self.prefix
    }

    fn name(&self) -> String {
        self.program.display().to_string()
    }

    fn command(&self, args: &[String]) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.prefix).args(args).arg(OUTPUT_STDOUT);
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            cmd.process_group(0);
        }
        cmd
    }
}

/// Run the attempts in order until one produces a PDF.
///
/// Only the final attempt's error is returned; messages from earlier
/// attempts are attached to it as `superseded` when it is a render error.
pub fn run_chain(
    attempts: &[Invocation],
    args: &[String],
    stdin: Option<&[u8]>,
    config: &RendererConfig,
) -> Result<Vec<u8>> {
    let mut superseded = Vec::new();
    let mut last: Option<Error> = None;

    for attempt in attempts {
        if let Some(ref err) = last {
            log::warn!("{}; retrying through {}", err, attempt.name());
        }

        let result = run(attempt, args, stdin, config.timeout)
            .and_then(|output| verify(attempt, output, config.verify_output));

        match result {
            Ok(output) => return Ok(output),
            Err(err) => {
                if let Some(previous) = last.replace(err) {
                    superseded.push(previous.to_string());
                }
            }
        }
    }

    match last {
        Some(Error::Render {
            program, stderr, ..
        }) => Err(Error::Render {
            program,
            stderr,
            superseded,
        }),
        Some(err) => Err(err),
        None => Err(Error::Other("no renderer invocation configured".to_string())),
    }
}

fn verify(attempt: &Invocation, output: Vec<u8>, enabled: bool) -> Result<Vec<u8>> {
    if enabled && !detect::is_pdf_bytes(&output) {
        return Err(render_error(
            attempt,
            format!("output is not a PDF ({} bytes on stdout)", output.len()),
        ));
    }
    Ok(output)
}

/// Launch one invocation and capture its stdout.
///
/// Stdin is fed on its own thread while stdout and stderr are drained on
/// reader threads, so a renderer that writes before it finishes reading
/// cannot deadlock against us.
pub fn run(
    invocation: &Invocation,
    args: &[String],
    stdin: Option<&[u8]>,
    timeout: Option<Duration>,
) -> Result<Vec<u8>> {
    let program = invocation.name();
    log::debug!("Running {} {:?} {:?}", program, invocation.prefix, args);

    let mut child = invocation
        .command(args)
        .stdin(if stdin.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        })
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| render_error(invocation, format!("failed to launch: {}", e)))?;

    let stdout = child.stdout.take().map(spawn_reader);
    let stderr = child.stderr.take().map(spawn_reader);

    let status = thread::scope(|scope| {
        let writer = match (child.stdin.take(), stdin) {
            (Some(pipe), Some(bytes)) => Some(scope.spawn(move || feed(pipe, bytes))),
            _ => None,
        };

        let status = wait(&mut child, timeout);
        if !matches!(status, Ok(Some(_))) {
            // Kill before joining the writer, which may be blocked on a full pipe.
            terminate(&mut child);
        }

        if let Some(handle) = writer {
            match handle.join() {
                Ok(Ok(())) => {}
                // The renderer may exit without reading all input; its status decides.
                Ok(Err(e)) if e.kind() == io::ErrorKind::BrokenPipe => {}
                Ok(Err(e)) => log::warn!("Failed to feed stdin to {}: {}", program, e),
                Err(_) => log::warn!("stdin writer for {} panicked", program),
            }
        }
        status
    });

    let status = match status {
        Ok(Some(status)) => status,
        Ok(None) => {
            // Reader threads are left detached: a process that left the
            // renderer's group may still hold the pipes open.
            return Err(Error::Timeout {
                program,
                after: timeout.unwrap_or_default(),
            });
        }
        Err(e) => return Err(render_error(invocation, format!("failed to wait: {}", e))),
    };

    let output = join_reader(invocation, stdout, "stdout")?;
    let errors = join_reader(invocation, stderr, "stderr")?;

    if status.success() {
        log::debug!("{} produced {} bytes", program, output.len());
        Ok(output)
    } else {
        Err(render_error(invocation, describe_failure(status, &errors)))
    }
}

fn wait(child: &mut Child, timeout: Option<Duration>) -> io::Result<Option<ExitStatus>> {
    let Some(timeout) = timeout else {
        return child.wait().map(Some);
    };

    let deadline = crossbeam_channel::after(timeout);
    let ticker = crossbeam_channel::tick(POLL_INTERVAL);
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Some(status));
        }
        crossbeam_channel::select! {
            recv(ticker) -> _ => {}
            recv(deadline) -> _ => return child.try_wait(),
        }
    }
}

/// Kill the child and everything it started, then reap it.
///
/// The child leads its own process group, so a wrapper that forked the
/// renderer takes the renderer down with it.
#[cfg(unix)]
fn terminate(child: &mut Child) {
    let pgid = child.id() as libc::pid_t;
    // SAFETY: killpg only sends a signal. The group id is our unreaped child's
    // pid, so it cannot have been recycled.
    if unsafe { libc::killpg(pgid, libc::SIGKILL) } != 0 {
        log::debug!("killpg({}) failed: {}", pgid, io::Error::last_os_error());
        let _ = child.kill();
    }
    let _ = child.wait();
}

#[cfg(not(unix))]
fn terminate(child: &mut Child) {
    let _ = child.kill();
    let _ = child.wait();
}

/// Write `bytes` to the renderer; the pipe is closed when it is dropped here.
fn feed(mut pipe: ChildStdin, bytes: &[u8]) -> io::Result<()> {
    pipe.write_all(bytes)?;
    pipe.flush()
}

fn spawn_reader<R: Read + Send + 'static>(mut pipe: R) -> JoinHandle<io::Result<Vec<u8>>> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        pipe.read_to_end(&mut buf)?;
        Ok(buf)
    })
}

fn join_reader(
    invocation: &Invocation,
    handle: Option<JoinHandle<io::Result<Vec<u8>>>>,
    stream: &str,
) -> Result<Vec<u8>> {
    let Some(handle) = handle else {
        return Ok(Vec::new());
    };
    match handle.join() {
        Ok(Ok(buf)) => Ok(buf),
        Ok(Err(e)) => Err(render_error(
            invocation,
            format!("failed to read {}: {}", stream, e),
        )),
        Err(_) => Err(render_error(
            invocation,
            format!("{} reader panicked", stream),
        )),
    }
}

fn describe_failure(status: ExitStatus, stderr: &[u8]) -> String {
    let text = String::from_utf8_lossy(stderr);
    let text = text.trim();
    if text.is_empty() {
        status.to_string()
    } else {
        text.to_string()
    }
}

fn render_error(invocation: &Invocation, stderr: String) -> Error {
    Error::Render {
        program: invocation.name(),
        stderr,
        superseded: Vec::new(),
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn shell(script: &str) -> Invocation {
        Invocation::new("sh").with_prefix(["-c", script, "sh"])
    }

    #[test]
    fn test_invocation_chain_from_config() {
        let config = RendererConfig::new()
            .with_renderer("/opt/wkhtmltopdf")
            .with_display_wrapper("/usr/bin/xvfb-run")
            .with_wrapper_args(["-a"]);

        let chain = Invocation::chain(&config);
        assert_eq!(chain.len(), 2);
        assert_eq!(chain[0].program(), Path::new("/opt/wkhtmltopdf"));
        assert!(chain[0].prefix().is_empty());
        assert_eq!(chain[1].program(), Path::new("/usr/bin/xvfb-run"));
        assert_eq!(
            chain[1].prefix(),
            &[OsString::from("-a"), OsString::from("/opt/wkhtmltopdf")]
        );

        let chain = Invocation::chain(&config.without_display_wrapper());
        assert_eq!(chain.len(), 1);
    }

    #[test]
    fn test_run_passes_arguments_and_output_token() {
        let out = run(&shell(r#"printf '%s|' "$@""#), &["a".into(), "b c".into()], None, None)
            .unwrap();
        assert_eq!(out, b"a|b c|-|");
    }

    #[test]
    fn test_run_pipes_stdin() {
        let out = run(&shell("cat"), &[], Some(b"<h1>hello</h1>"), None).unwrap();
        assert_eq!(out, b"<h1>hello</h1>");
    }

    #[test]
    fn test_run_large_stdin_does_not_deadlock() {
        let input = vec![b'x'; 4 * 1024 * 1024];
        let out = run(&shell("cat"), &[], Some(&input), None).unwrap();
        assert_eq!(out.len(), input.len());
    }

    #[test]
    fn test_run_failure_embeds_stderr() {
        let err = run(
            &shell("echo 'Error: Failed loading page missing.html' >&2; exit 1"),
            &[],
            None,
            None,
        )
        .unwrap_err();

        match err {
            Error::Render { program, stderr, .. } => {
                assert_eq!(program, "sh");
                assert_eq!(stderr, "Error: Failed loading page missing.html");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_run_failure_without_stderr_reports_status() {
        let err = run(&shell("exit 3"), &[], None, None).unwrap_err();
        assert!(err.to_string().contains('3'), "{err}");
    }

    #[test]
    fn test_run_launch_failure() {
        let err = run(&Invocation::new("/nonexistent/wkhtmltopdf"), &[], None, None).unwrap_err();
        assert!(matches!(err, Error::Render { .. }));
        assert!(err.to_string().contains("failed to launch"), "{err}");
    }

    #[test]
    fn test_run_timeout_kills_process() {
        let err = run(
            &shell("exec sleep 5"),
            &[],
            None,
            Some(Duration::from_millis(100)),
        )
        .unwrap_err();
        assert!(matches!(err, Error::Timeout { .. }), "{err:?}");
    }

    #[test]
    fn test_run_timeout_kills_forked_children() {
        let dir = tempfile::tempdir().unwrap();
        let marker = dir.path().join("late");
        let script = format!("(sleep 1; touch '{}') ; sleep 5", marker.display());

        let err = run(&shell(&script), &[], None, Some(Duration::from_millis(200))).unwrap_err();
        assert!(matches!(err, Error::Timeout { .. }), "{err:?}");

        std::thread::sleep(Duration::from_millis(1500));
        assert!(!marker.exists());
    }

    #[test]
    fn test_run_feeds_stdin_to_each_attempt() {
        let attempts = vec![shell("cat >/dev/null; exit 1"), shell("cat")];
        let out = run_chain(
            &attempts,
            &[],
            Some(b"%PDF-1.4 from stdin"),
            &RendererConfig::default(),
        )
        .unwrap();
        assert_eq!(out, b"%PDF-1.4 from stdin");
    }

    #[test]
    fn test_run_within_timeout() {
        let out = run(&shell("printf ok"), &[], None, Some(Duration::from_secs(10))).unwrap();
        assert_eq!(out, b"ok");
    }

    #[test]
    fn test_chain_falls_back() {
        let attempts = vec![
            Invocation::new("/nonexistent/wkhtmltopdf"),
            shell("printf '%%PDF-1.4 wrapped'"),
        ];
        let out = run_chain(&attempts, &[], None, &RendererConfig::default()).unwrap();
        assert_eq!(out, b"%PDF-1.4 wrapped");
    }

    #[test]
    fn test_chain_returns_last_error() {
        let attempts = vec![
            shell("echo direct >&2; exit 1"),
            shell("echo wrapped >&2; exit 1"),
        ];
        let err = run_chain(&attempts, &[], None, &RendererConfig::default()).unwrap_err();
        match err {
            Error::Render {
                stderr, superseded, ..
            } => {
                assert_eq!(stderr, "wrapped");
                assert_eq!(superseded.len(), 1);
                assert!(superseded[0].contains("direct"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_chain_rejects_non_pdf_output() {
        let attempts = vec![shell("printf 'not a pdf'")];
        let err = run_chain(&attempts, &[], None, &RendererConfig::default()).unwrap_err();
        assert!(err.to_string().contains("not a PDF"), "{err}");

        let config = RendererConfig::default().with_verify_output(false);
        let out = run_chain(&attempts, &[], None, &config).unwrap();
        assert_eq!(out, b"not a pdf");
    }

    #[test]
    fn test_chain_stops_at_first_success() {
        let attempts = vec![
            shell("printf '%%PDF-1.4 direct'"),
            shell("echo never >&2; exit 1"),
        ];
        let out = run_chain(&attempts, &[], None, &RendererConfig::default()).unwrap();
        assert_eq!(out, b"%PDF-1.4 direct");
    }
}
