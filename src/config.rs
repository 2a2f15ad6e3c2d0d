// Command line and environment configuration. Every setting has a default so
// running the binary with no arguments browses the real Classroom API using
// the files under the user's config directory.

use clap::Parser;
use std::path::PathBuf;

const APP_DIR: &str = "classroom-cli";

/// Browse Google Classroom courses, coursework and announcements from the
/// terminal and open their attachments.
#[derive(Parser, Debug, Clone)]
#[command(name = "classroom", version)]
pub struct Config {
    /// OAuth client secrets of an installed app, as downloaded from the
    /// Google Cloud console
    #[arg(long, env = "CLASSROOM_CREDENTIALS", default_value_os_t = default_app_file("credentials.json"))]
    pub credentials: PathBuf,

    /// Where the OAuth token is stored between runs
    #[arg(long, env = "CLASSROOM_TOKEN", default_value_os_t = default_app_file("token.json"))]
    pub token: PathBuf,

    /// Directory downloaded attachments are written to
    #[arg(long, env = "CLASSROOM_DOWNLOAD_DIR", default_value = ".")]
    pub download_dir: PathBuf,

    #[arg(long, env = "CLASSROOM_API_URL", default_value = "https://classroom.googleapis.com")]
    pub classroom_url: String,

    #[arg(long, env = "DRIVE_API_URL", default_value = "https://www.googleapis.com")]
    pub drive_url: String,

    #[arg(long, env = "OAUTH_TOKEN_URL", default_value = "https://oauth2.googleapis.com")]
    pub oauth_url: String,

    /// Program used to fetch YouTube videos
    #[arg(long, default_value = "youtube-dl")]
    pub video_downloader: String,

    /// Program used to play fetched videos
    #[arg(long, default_value = "mpv")]
    pub video_player: String,

    /// Terminal browser used for links
    #[arg(long, default_value = "links")]
    pub browser: String,

    /// Program used to open downloaded files
    #[arg(long, default_value = "xdg-open")]
    pub opener: String,

    /// More log output on stderr (-v info, -vv debug). RUST_LOG overrides.
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl Config {
    /// Log filter used when RUST_LOG is not set.
    pub fn log_level(&self) -> &'static str {
        match self.verbose {
            0 => "warn",
            1 => "info",
            _ => "debug",
        }
    }
}

fn default_app_file(name: &str) -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
        .join(name)
}
