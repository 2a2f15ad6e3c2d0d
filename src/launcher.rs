// External viewers for attachments: a video downloader plus player for
// YouTube materials, a terminal browser for links and the desktop opener for
// downloaded files.

use crate::config::Config;
use crate::error::{Error, Result};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tracing::{debug, warn};

pub trait Launcher {
    /// Open a downloaded file without waiting for the viewer to exit.
    fn open_file(&self, path: &Path) -> Result<()>;
    /// Fetch the video, wait for the download, then start a player.
    fn play_video(&self, video_id: &str) -> Result<()>;
    /// Browse `url`, returning once the browser is closed.
    fn browse(&self, url: &str) -> Result<()>;
}

pub struct SystemLauncher {
    video_downloader: String,
    video_player: String,
    browser: String,
    opener: String,
    download_dir: PathBuf,
}

impl SystemLauncher {
    pub fn from_config(config: &Config) -> Self {
        SystemLauncher {
            video_downloader: config.video_downloader.clone(),
            video_player: config.video_player.clone(),
            browser: config.browser.clone(),
            opener: config.opener.clone(),
            download_dir: config.download_dir.clone(),
        }
    }
}

impl Launcher for SystemLauncher {
    fn open_file(&self, path: &Path) -> Result<()> {
        spawn_detached(&self.opener, path.as_os_str())
    }

    fn play_video(&self, video_id: &str) -> Result<()> {
        let template = self.download_dir.join("%(title)s-%(id)s.%(ext)s");
        let status = Command::new(locate(&self.video_downloader)?)
            .args(["-f", "best", "-4", "-o"])
            .arg(&template)
            .arg("--")
            .arg(video_id)
            .status()
            .map_err(|e| Error::Launch(format!("{}: {e}", self.video_downloader)))?;
        if !status.success() {
            return Err(Error::Launch(format!(
                "{} exited with {status}",
                self.video_downloader
            )));
        }

        let video = find_video(&self.download_dir, video_id)?.ok_or_else(|| {
            Error::Launch(format!(
                "{} finished but no file for {video_id} is in {}",
                self.video_downloader,
                self.download_dir.display()
            ))
        })?;
        spawn_detached(&self.video_player, video.as_os_str())
    }

    fn browse(&self, url: &str) -> Result<()> {
        let status = Command::new(locate(&self.browser)?)
            .arg(url)
            .status()
            .map_err(|e| Error::Launch(format!("{}: {e}", self.browser)))?;
        if !status.success() {
            warn!(browser = %self.browser, %status, "browser exited with an error");
        }
        Ok(())
    }
}

fn locate(program: &str) -> Result<PathBuf> {
    which::which(program).map_err(|e| Error::Launch(format!("{program}: {e}")))
}

fn spawn_detached(program: &str, arg: &std::ffi::OsStr) -> Result<()> {
    let child = Command::new(locate(program)?)
        .arg(arg)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .map_err(|e| Error::Launch(format!("{program}: {e}")))?;
    debug!(program, pid = child.id(), "spawned viewer");
    Ok(())
}

/// The finished download for `video_id` in `dir`, named `<title>-<id>.<ext>`
/// by the downloader. Partial files are skipped.
pub fn find_video(dir: &Path, video_id: &str) -> Result<Option<PathBuf>> {
    let local = |source: std::io::Error| Error::LocalIo {
        path: dir.to_path_buf(),
        source,
    };
    for entry in std::fs::read_dir(dir).map_err(local)? {
        let path = entry.map_err(local)?.path();
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        let partial = name.ends_with(".part") || name.ends_with(".ytdl");
        if name.contains(&format!("-{video_id}.")) && !partial {
            return Ok(Some(path));
        }
    }
    Ok(None)
}
