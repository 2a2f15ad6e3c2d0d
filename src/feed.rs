// Merges the coursework page and the announcements page of a course into a
// single feed, newest first.

use crate::error::{Error, Result};
use crate::models::Item;
use chrono::{DateTime, Utc};

/// Concatenate both pages and sort them by creation time, most recent first.
/// Items created at the same instant keep their concatenation order.
///
/// Fails with [`Error::MalformedData`] if any item carries a creation time that
/// is not RFC 3339, so a broken item never ends up in an arbitrary position.
pub fn merge(work: Vec<Item>, announcements: Vec<Item>) -> Result<Vec<Item>> {
    let mut stamped = work
        .into_iter()
        .chain(announcements)
        .map(|item| creation_instant(&item).map(|t| (t, item)))
        .collect::<Result<Vec<_>>>()?;

    stamped.sort_by(|(a, _), (b, _)| b.cmp(a));
    Ok(stamped.into_iter().map(|(_, item)| item).collect())
}

fn creation_instant(item: &Item) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(item.creation_time())
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| Error::MalformedData {
            id: item.id().to_string(),
            message: format!("creation time {:?}: {}", item.creation_time(), e),
        })
}
