use std::env;
use std::ffi::OsString;
use std::fs;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result, anyhow};
use serde_json::Value;

use super::PlayerEvent;

#[cfg(unix)]
use std::io::{BufRead, BufReader, Write};
#[cfg(unix)]
use std::os::unix::net::UnixStream;
#[cfg(unix)]
use std::path::Path;
#[cfg(unix)]
use std::process::{Child, Command as ProcessCommand, Stdio};
#[cfg(unix)]
use std::time::Duration;
#[cfg(unix)]
use serde_json::json;

pub(crate) fn resolve_mpv_bin() -> PathBuf {
    resolve_mpv_bin_from_env(env::var_os("CHAPTRACK_MPV_BIN"))
}

pub(crate) fn resolve_mpv_bin_from_env(env_value: Option<OsString>) -> PathBuf {
    match env_value {
        Some(value) if !value.is_empty() => PathBuf::from(value),
        _ => PathBuf::from("mpv"),
    }
}

/// Maps one line of mpv's JSON IPC event stream onto the tracker's event
/// vocabulary. Lines that are not events we observe (command replies, other
/// properties) map to nothing.
pub(crate) fn parse_player_event(line: &str) -> Option<PlayerEvent> {
    let value: Value = serde_json::from_str(line).ok()?;
    let event = value.get("event")?.as_str()?;
    match event {
        "property-change" => match value.get("name").and_then(Value::as_str) {
            Some("duration") => value
                .get("data")
                .and_then(Value::as_f64)
                .map(PlayerEvent::DurationResolved),
            Some("time-pos") => value
                .get("data")
                .and_then(Value::as_f64)
                .map(PlayerEvent::TimeUpdate),
            _ => None,
        },
        "end-file" => {
            if value.get("reason").and_then(Value::as_str) == Some("eof") {
                Some(PlayerEvent::Ended)
            } else {
                Some(PlayerEvent::Closed)
            }
        }
        "shutdown" => Some(PlayerEvent::Closed),
        _ => None,
    }
}

/// Per-run scratch directory holding the IPC socket, removed on drop.
#[derive(Debug)]
pub(crate) struct TempIpcDir {
    path: PathBuf,
}

impl TempIpcDir {
    pub(crate) fn new() -> Result<Self> {
        let ts = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or(0);
        let path = env::temp_dir().join(format!("chaptrack-ipc-{}-{ts}", std::process::id()));
        fs::create_dir_all(&path)
            .with_context(|| format!("failed to create ipc directory {}", path.display()))?;
        Ok(Self { path })
    }

    pub(crate) fn socket_path(&self) -> PathBuf {
        self.path.join("mpv.sock")
    }
}

impl Drop for TempIpcDir {
    fn drop(&mut self) {
        let _ = fs::remove_dir_all(&self.path);
    }
}

/// A running mpv instance with its IPC socket attached. mpv keeps the
/// terminal for its own keybindings; we only talk over the socket.
#[cfg(unix)]
pub(crate) struct PlayerHandle {
    child: Child,
    reader: BufReader<UnixStream>,
    writer: UnixStream,
    line: String,
    _ipc_dir: TempIpcDir,
}

#[cfg(unix)]
impl PlayerHandle {
    /// Spawns mpv paused on `source`. The caller unpauses once the resume
    /// seek has been issued, so playback never starts ahead of the stored
    /// cursor.
    pub(crate) fn spawn(source: &str) -> Result<Self> {
        let ipc_dir = TempIpcDir::new()?;
        let socket = ipc_dir.socket_path();
        let mpv_bin = resolve_mpv_bin();

        let child = ProcessCommand::new(&mpv_bin)
            .arg(format!("--input-ipc-server={}", socket.display()))
            .arg("--pause")
            .arg("--msg-level=all=error")
            .arg("--")
            .arg(source)
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .spawn()
            .with_context(|| format!("failed to launch {}", mpv_bin.display()))?;

        // Property-change events are only delivered to the observing client,
        // so reads and writes share one connection.
        let stream = connect_with_retry(&socket)?;
        let reader = BufReader::new(
            stream
                .try_clone()
                .context("failed to clone mpv ipc stream")?,
        );
        let mut handle = Self {
            child,
            reader,
            writer: stream,
            line: String::new(),
            _ipc_dir: ipc_dir,
        };

        handle.send(json!({ "command": ["observe_property", 1, "time-pos"] }))?;
        handle.send(json!({ "command": ["observe_property", 2, "duration"] }))?;
        Ok(handle)
    }

    fn send(&mut self, payload: Value) -> Result<()> {
        let mut raw = payload.to_string();
        raw.push('\n');
        self.writer
            .write_all(raw.as_bytes())
            .context("failed to send mpv ipc command")
    }

    pub(crate) fn seek_to(&mut self, seconds: f64) -> Result<()> {
        self.send(json!({ "command": ["seek", seconds, "absolute"] }))
    }

    pub(crate) fn set_pause(&mut self, paused: bool) -> Result<()> {
        self.send(json!({ "command": ["set_property", "pause", paused] }))
    }

    /// Blocks for the next recognized event. `None` means the socket closed
    /// (mpv exited) and no further events will arrive.
    pub(crate) fn next_event(&mut self) -> Result<Option<PlayerEvent>> {
        loop {
            self.line.clear();
            let read = self
                .reader
                .read_line(&mut self.line)
                .context("failed to read mpv ipc event")?;
            if read == 0 {
                return Ok(None);
            }
            if let Some(event) = parse_player_event(&self.line) {
                return Ok(Some(event));
            }
        }
    }
}

#[cfg(unix)]
impl Drop for PlayerHandle {
    fn drop(&mut self) {
        // mpv normally exits on its own once the file or the user is done.
        match self.child.try_wait() {
            Ok(Some(_)) => {}
            _ => {
                let _ = self.child.kill();
                let _ = self.child.wait();
            }
        }
    }
}

/// mpv creates the socket a moment after startup; poll for it instead of
/// racing the child.
#[cfg(unix)]
fn connect_with_retry(socket: &Path) -> Result<UnixStream> {
    for _ in 0..40 {
        if let Ok(stream) = UnixStream::connect(socket) {
            return Ok(stream);
        }
        std::thread::sleep(Duration::from_millis(125));
    }
    Err(anyhow!(
        "mpv ipc socket at {} never came up",
        socket.display()
    ))
}

#[cfg(not(unix))]
pub(crate) struct PlayerHandle;

#[cfg(not(unix))]
impl PlayerHandle {
    pub(crate) fn spawn(_source: &str) -> Result<Self> {
        Err(anyhow!("playback requires a unix ipc socket"))
    }

    pub(crate) fn seek_to(&mut self, _seconds: f64) -> Result<()> {
        Ok(())
    }

    pub(crate) fn set_pause(&mut self, _paused: bool) -> Result<()> {
        Ok(())
    }

    pub(crate) fn next_event(&mut self) -> Result<Option<PlayerEvent>> {
        Ok(None)
    }
}

/// Restores the previous SIGINT disposition when dropped. While mpv owns the
/// terminal, Ctrl-C belongs to it, not to us.
#[cfg(unix)]
struct ScopedSigaction {
    signum: libc::c_int,
    old_action: libc::sigaction,
}

#[cfg(unix)]
impl ScopedSigaction {
    fn ignore(signum: libc::c_int) -> Result<Self> {
        unsafe {
            let mut new_action: libc::sigaction = std::mem::zeroed();
            new_action.sa_sigaction = libc::SIG_IGN;
            libc::sigemptyset(&mut new_action.sa_mask);
            new_action.sa_flags = 0;

            let mut old_action: libc::sigaction = std::mem::zeroed();
            if libc::sigaction(signum, &new_action, &mut old_action) != 0 {
                return Err(anyhow!("failed to update signal action for {signum}"));
            }

            Ok(Self { signum, old_action })
        }
    }
}

#[cfg(unix)]
impl Drop for ScopedSigaction {
    fn drop(&mut self) {
        unsafe {
            let _ = libc::sigaction(self.signum, &self.old_action, std::ptr::null_mut());
        }
    }
}

#[cfg(unix)]
pub(crate) fn with_sigint_ignored<F, R>(f: F) -> Result<R>
where
    F: FnOnce() -> Result<R>,
{
    let _sigint_guard = ScopedSigaction::ignore(libc::SIGINT)?;
    f()
}

#[cfg(not(unix))]
pub(crate) fn with_sigint_ignored<F, R>(f: F) -> Result<R>
where
    F: FnOnce() -> Result<R>,
{
    f()
}
