// API client module: a small blocking HTTP client for the Classroom v1 and
// Drive v3 REST APIs. The navigator only sees the two service traits, so the
// client can be swapped for an in-memory fake in tests.

use crate::config::Config;
use crate::error::{Error, Result};
use crate::models::{Announcement, Course, CourseWork, Item};
use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::io::Read;
use std::time::Duration;
use tracing::debug;

pub const COURSE_PAGE_SIZE: u32 = 50;
pub const COURSE_WORK_PAGE_SIZE: u32 = 50;
pub const ANNOUNCEMENT_PAGE_SIZE: u32 = 20;

const LIST_TIMEOUT: Duration = Duration::from_secs(30);

/// The classroom listing endpoints. Only the first page of each listing is
/// ever requested.
pub trait ClassroomService {
    fn list_courses(&self, page_size: u32) -> Result<Vec<Course>>;
    fn list_course_work(&self, course_id: &str, page_size: u32) -> Result<Vec<Item>>;
    fn list_announcements(&self, course_id: &str, page_size: u32) -> Result<Vec<Item>>;
}

/// The file endpoints used to download Drive attachments.
pub trait DriveService {
    fn file_mime_type(&self, file_id: &str) -> Result<String>;
    /// Stream of the file converted to `mime_type`.
    fn export(&self, file_id: &str, mime_type: &str) -> Result<Box<dyn Read>>;
    /// Stream of the file's stored bytes.
    fn media(&self, file_id: &str) -> Result<Box<dyn Read>>;
}

/// Blocking client holding the reqwest client, the API base URLs and the
/// OAuth access token sent with every request.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    classroom_url: String,
    drive_url: String,
    token: String,
}

#[derive(Deserialize)]
struct CoursePage {
    #[serde(default)]
    courses: Vec<Course>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CourseWorkPage {
    #[serde(default)]
    course_work: Vec<CourseWork>,
}

#[derive(Deserialize)]
struct AnnouncementPage {
    #[serde(default)]
    announcements: Vec<Announcement>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct FileMetadata {
    mime_type: String,
}

impl ApiClient {
    pub fn new(classroom_url: &str, drive_url: &str, token: &str) -> Result<Self> {
        // No overall timeout: downloads may take as long as they need.
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(None::<Duration>)
            .build()
            .map_err(|e| Error::remote("build HTTP client", e))?;
        Ok(ApiClient {
            client,
            classroom_url: classroom_url.trim_end_matches('/').to_string(),
            drive_url: drive_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        })
    }

    pub fn from_config(config: &Config, token: &str) -> Result<Self> {
        Self::new(&config.classroom_url, &config.drive_url, token)
    }

    fn get(&self, url: &str) -> RequestBuilder {
        debug!(%url, "GET");
        self.client.get(url).bearer_auth(&self.token)
    }

    fn fetch_json<T: DeserializeOwned>(&self, operation: &str, req: RequestBuilder) -> Result<T> {
        let res = send(operation, req.timeout(LIST_TIMEOUT))?;
        res.json()
            .map_err(|e| Error::remote(operation, format!("unexpected response: {e}")))
    }

    fn files_url(&self, file_id: &str) -> String {
        format!("{}/drive/v3/files/{}", self.drive_url, file_id)
    }
}

impl ClassroomService for ApiClient {
    fn list_courses(&self, page_size: u32) -> Result<Vec<Course>> {
        let url = format!("{}/v1/courses", self.classroom_url);
        let req = self.get(&url).query(&[("pageSize", page_size)]);
        let page: CoursePage = self.fetch_json("list courses", req)?;
        Ok(page.courses)
    }

    fn list_course_work(&self, course_id: &str, page_size: u32) -> Result<Vec<Item>> {
        let url = format!("{}/v1/courses/{}/courseWork", self.classroom_url, course_id);
        let req = self.get(&url).query(&[("pageSize", page_size)]);
        let page: CourseWorkPage = self.fetch_json("list coursework", req)?;
        Ok(page.course_work.into_iter().map(Item::CourseWork).collect())
    }

    fn list_announcements(&self, course_id: &str, page_size: u32) -> Result<Vec<Item>> {
        let url = format!("{}/v1/courses/{}/announcements", self.classroom_url, course_id);
        let req = self.get(&url).query(&[("pageSize", page_size)]);
        let page: AnnouncementPage = self.fetch_json("list announcements", req)?;
        Ok(page.announcements.into_iter().map(Item::Announcement).collect())
    }
}

impl DriveService for ApiClient {
    fn file_mime_type(&self, file_id: &str) -> Result<String> {
        let req = self
            .get(&self.files_url(file_id))
            .query(&[("fields", "mimeType")]);
        let meta: FileMetadata = self.fetch_json("get file metadata", req)?;
        Ok(meta.mime_type)
    }

    fn export(&self, file_id: &str, mime_type: &str) -> Result<Box<dyn Read>> {
        let url = format!("{}/export", self.files_url(file_id));
        let req = self.get(&url).query(&[("mimeType", mime_type)]);
        Ok(Box::new(send("export file", req)?))
    }

    fn media(&self, file_id: &str) -> Result<Box<dyn Read>> {
        let req = self.get(&self.files_url(file_id)).query(&[("alt", "media")]);
        Ok(Box::new(send("download file", req)?))
    }
}

/// Send `req` and turn transport failures and error statuses into errors.
/// A 401 means the token is no good and ends the session; anything else is
/// reported against `operation`.
pub(crate) fn send(operation: &str, req: RequestBuilder) -> Result<Response> {
    let res = req.send().map_err(|e| Error::remote(operation, e))?;
    let status = res.status();
    if status.is_success() {
        return Ok(res);
    }
    let txt = res.text().unwrap_or_else(|_| "".into());
    if status == StatusCode::UNAUTHORIZED {
        return Err(Error::Auth(format!("{operation} rejected: {status} - {txt}")));
    }
    Err(Error::remote(operation, format!("{status} - {txt}")))
}
