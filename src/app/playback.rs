use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command as ProcessCommand, ExitStatus, Stdio};
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result, anyhow};

use super::format::{clamp_position, clamp_rate};
use crate::store::PlaybackRecord;

#[cfg(unix)]
use std::os::unix::process::CommandExt;

/// Position and rate read back from the player after it exits.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct ResumeSnapshot {
    pub(crate) position_seconds: f64,
    pub(crate) playback_rate: f64,
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct PlaybackOutcome {
    pub(crate) success: bool,
    /// `None` on a successful exit means the player reached end-of-media
    /// without quitting, so there is no position left to save.
    pub(crate) resume: Option<ResumeSnapshot>,
}

pub(crate) fn resolve_player_bin() -> PathBuf {
    if let Ok(custom) = env::var("VIDMARK_PLAYER") {
        return PathBuf::from(custom);
    }
    PathBuf::from("mpv")
}

#[cfg(unix)]
pub(crate) fn with_sigint_ignored<F, R>(f: F) -> Result<R>
where
    F: FnOnce() -> Result<R>,
{
    unsafe {
        let mut new_action: libc::sigaction = std::mem::zeroed();
        new_action.sa_sigaction = libc::SIG_IGN;
        libc::sigemptyset(&mut new_action.sa_mask);
        new_action.sa_flags = 0;

        let mut old_action: libc::sigaction = std::mem::zeroed();
        if libc::sigaction(libc::SIGINT, &new_action, &mut old_action) != 0 {
            return Err(anyhow!("failed to ignore SIGINT"));
        }

        let result = f();
        let _ = libc::sigaction(libc::SIGINT, &old_action, std::ptr::null_mut());
        result
    }
}

#[cfg(not(unix))]
pub(crate) fn with_sigint_ignored<F, R>(f: F) -> Result<R>
where
    F: FnOnce() -> Result<R>,
{
    f()
}

#[cfg(unix)]
pub(crate) fn run_interactive_cmd(mut cmd: ProcessCommand) -> Result<ExitStatus> {
    let stdin_fd = libc::STDIN_FILENO;
    let parent_pgrp = unsafe { libc::tcgetpgrp(stdin_fd) };
    if parent_pgrp == -1 {
        return Err(anyhow!("failed to read terminal process group"));
    }

    unsafe {
        let _ = libc::signal(libc::SIGTTOU, libc::SIG_IGN);
    }

    unsafe {
        cmd.pre_exec(|| {
            libc::signal(libc::SIGINT, libc::SIG_DFL);
            libc::signal(libc::SIGQUIT, libc::SIG_DFL);
            libc::signal(libc::SIGTSTP, libc::SIG_DFL);
            if libc::setpgid(0, 0) != 0 {
                return Err(std::io::Error::last_os_error());
            }
            Ok(())
        });
    }

    let mut child = cmd.spawn().context("failed to spawn player")?;
    let child_pgid = child.id() as libc::pid_t;
    unsafe {
        let _ = libc::tcsetpgrp(stdin_fd, child_pgid);
    }

    let status = child.wait().context("failed waiting on player")?;

    unsafe {
        let _ = libc::tcsetpgrp(stdin_fd, parent_pgrp);
        let _ = libc::signal(libc::SIGTTOU, libc::SIG_DFL);
    }

    Ok(status)
}

#[cfg(not(unix))]
pub(crate) fn run_interactive_cmd(mut cmd: ProcessCommand) -> Result<ExitStatus> {
    cmd.status().context("failed to launch player")
}

/// Launches the player on `path`, seeded from the restored record, and reads
/// back where playback stopped. The player writes its quit position into a
/// private watch-later directory; quitting at end-of-media writes nothing,
/// which is how a finished video is told apart from an interrupted one.
pub(crate) fn run_player(
    path: &Path,
    restored: Option<&PlaybackRecord>,
) -> Result<PlaybackOutcome> {
    let watch_later_dir = make_temp_watch_later_dir()?;

    let player_bin = resolve_player_bin();
    let status = with_sigint_ignored(|| {
        let mut cmd = ProcessCommand::new(&player_bin);
        cmd.arg("--save-position-on-quit")
            .arg(format!("--watch-later-dir={}", watch_later_dir.display()))
            .arg("--watch-later-options=start,speed");
        if let Some(record) = restored {
            cmd.arg(format!("--start={:.3}", clamp_position(record.position_seconds)))
                .arg(format!("--speed={:.2}", clamp_rate(record.playback_rate)));
        }
        cmd.arg(path)
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());
        run_interactive_cmd(cmd).with_context(|| format!("failed to launch {}", player_bin.display()))
    });
    let status = match status {
        Ok(status) => status,
        Err(err) => {
            let _ = fs::remove_dir_all(&watch_later_dir);
            return Err(err);
        }
    };

    let resume = if status.success() {
        read_resume_snapshot(&watch_later_dir)
    } else {
        None
    };
    let _ = fs::remove_dir_all(&watch_later_dir);

    Ok(PlaybackOutcome {
        success: status.success(),
        resume,
    })
}

pub(crate) fn make_temp_watch_later_dir() -> Result<PathBuf> {
    let ts = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0);
    let dir = env::temp_dir().join(format!("vidmark-resume-{}-{ts}", std::process::id()));
    fs::create_dir_all(&dir)
        .with_context(|| format!("failed to create watch-later dir {}", dir.display()))?;
    Ok(dir)
}

/// One playback, one file: the player names the entry after the media path's
/// hash, so take whatever single file it wrote.
pub(crate) fn read_resume_snapshot(dir: &Path) -> Option<ResumeSnapshot> {
    let entries = fs::read_dir(dir).ok()?;
    for entry in entries.flatten() {
        if !entry.file_type().is_ok_and(|kind| kind.is_file()) {
            continue;
        }
        let raw = fs::read_to_string(entry.path()).ok()?;
        if let Some(snapshot) = parse_watch_later(&raw) {
            return Some(snapshot);
        }
    }
    None
}

/// Watch-later entries are `key=value` lines; `start` is the position in
/// seconds and `speed` the playback rate. `start` is required, `speed`
/// defaults to 1.
pub(crate) fn parse_watch_later(raw: &str) -> Option<ResumeSnapshot> {
    let mut position = None;
    let mut rate = 1.0_f64;
    for line in raw.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let Some((key, value)) = trimmed.split_once('=') else {
            continue;
        };
        match key.trim() {
            "start" => {
                if let Ok(parsed) = value.trim().parse::<f64>() {
                    position = Some(clamp_position(parsed));
                }
            }
            "speed" => {
                if let Ok(parsed) = value.trim().parse::<f64>() {
                    rate = clamp_rate(parsed);
                }
            }
            _ => {}
        }
    }

    position.map(|position_seconds| ResumeSnapshot {
        position_seconds,
        playback_rate: rate,
    })
}
