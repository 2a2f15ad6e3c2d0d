// Data shapes returned by the Classroom API, turned into the tagged types the
// rest of the client matches on.

use serde::{Deserialize, Deserializer};
use std::fmt;

/// Characters of announcement text shown in the item list.
pub const LABEL_WIDTH: usize = 40;

#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Course {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description_heading: Option<String>,
}

/// Calendar date as Classroom sends it. Missing parts come through as zero.
#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct DueDate {
    #[serde(default)]
    pub year: u32,
    #[serde(default)]
    pub month: u32,
    #[serde(default)]
    pub day: u32,
}

impl fmt::Display for DueDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.month, self.day, self.year)
    }
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CourseWork {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub creation_time: String,
    #[serde(default)]
    pub due_date: Option<DueDate>,
    #[serde(default)]
    pub max_points: Option<f64>,
    #[serde(default, deserialize_with = "materials")]
    pub materials: Vec<Material>,
    #[serde(default)]
    pub alternate_link: String,
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Announcement {
    pub id: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub creation_time: String,
    #[serde(default, deserialize_with = "materials")]
    pub materials: Vec<Material>,
    #[serde(default)]
    pub alternate_link: String,
}

/// One entry of a course feed.
#[derive(Debug, Clone, PartialEq)]
pub enum Item {
    CourseWork(CourseWork),
    Announcement(Announcement),
}

impl Item {
    pub fn id(&self) -> &str {
        match self {
            Item::CourseWork(w) => &w.id,
            Item::Announcement(a) => &a.id,
        }
    }

    pub fn creation_time(&self) -> &str {
        match self {
            Item::CourseWork(w) => &w.creation_time,
            Item::Announcement(a) => &a.creation_time,
        }
    }

    pub fn materials(&self) -> &[Material] {
        match self {
            Item::CourseWork(w) => &w.materials,
            Item::Announcement(a) => &a.materials,
        }
    }

    pub fn alternate_link(&self) -> &str {
        match self {
            Item::CourseWork(w) => &w.alternate_link,
            Item::Announcement(a) => &a.alternate_link,
        }
    }

    /// Text shown for this item in the item list: the coursework title, or
    /// the start of the announcement on a single line.
    pub fn label(&self) -> String {
        match self {
            Item::CourseWork(w) => w.title.clone(),
            Item::Announcement(a) => {
                let flat = a.text.split_whitespace().collect::<Vec<_>>().join(" ");
                if flat.chars().count() > LABEL_WIDTH {
                    let head: String = flat.chars().take(LABEL_WIDTH).collect();
                    format!("{}...", head.trim_end())
                } else {
                    flat
                }
            }
        }
    }
}

/// An attachment of an item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Material {
    DriveFile { id: String, title: String },
    YoutubeVideo { id: String, title: String },
    Link { url: String, title: String },
}

impl Material {
    pub fn name(&self) -> &str {
        match self {
            Material::DriveFile { title, .. }
            | Material::YoutubeVideo { title, .. }
            | Material::Link { title, .. } => title,
        }
    }
}

// Wire shape of a material: exactly one of these keys is set.
#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct RawMaterial {
    drive_file: Option<SharedDriveFile>,
    youtube_video: Option<RawVideo>,
    link: Option<RawLink>,
    form: Option<RawForm>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct SharedDriveFile {
    drive_file: RawDriveFile,
}

#[derive(Deserialize, Debug)]
struct RawDriveFile {
    id: String,
    #[serde(default)]
    title: Option<String>,
}

#[derive(Deserialize, Debug)]
struct RawVideo {
    id: String,
    #[serde(default)]
    title: Option<String>,
}

#[derive(Deserialize, Debug)]
struct RawLink {
    url: String,
    #[serde(default)]
    title: Option<String>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct RawForm {
    form_url: String,
    #[serde(default)]
    title: Option<String>,
}

impl RawMaterial {
    fn into_material(self) -> Option<Material> {
        if let Some(shared) = self.drive_file {
            let file = shared.drive_file;
            let title = file.title.unwrap_or_else(|| file.id.clone());
            return Some(Material::DriveFile { id: file.id, title });
        }
        if let Some(video) = self.youtube_video {
            let title = video.title.unwrap_or_else(|| video.id.clone());
            return Some(Material::YoutubeVideo { id: video.id, title });
        }
        if let Some(link) = self.link {
            let title = link.title.unwrap_or_else(|| link.url.clone());
            return Some(Material::Link { url: link.url, title });
        }
        if let Some(form) = self.form {
            let title = form.title.unwrap_or_else(|| form.form_url.clone());
            return Some(Material::Link {
                url: form.form_url,
                title,
            });
        }
        None
    }
}

fn materials<'de, D>(deserializer: D) -> Result<Vec<Material>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Vec<RawMaterial> = Vec::deserialize(deserializer)?;
    let total = raw.len();
    let materials: Vec<Material> = raw.into_iter().filter_map(RawMaterial::into_material).collect();
    if materials.len() < total {
        tracing::debug!(skipped = total - materials.len(), "skipping unsupported materials");
    }
    Ok(materials)
}
