// Process-lifetime memo of the course listing. There is a single slot: the
// listing is fetched at most once per run and never refreshed.

use crate::models::Course;
use once_cell::unsync::OnceCell;

#[derive(Debug, Default)]
pub struct SessionCache {
    courses: OnceCell<Vec<Course>>,
}

impl SessionCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> Option<&[Course]> {
        self.courses.get().map(Vec::as_slice)
    }

    /// Store the listing. A value that is already cached wins.
    pub fn put(&self, courses: Vec<Course>) {
        if self.courses.set(courses).is_err() {
            tracing::debug!("course listing already cached, keeping the first one");
        }
    }

    /// Return the cached listing, calling `fetch` on a miss. A failed fetch
    /// leaves the cache empty so the next call tries again.
    pub fn get_or_fetch<E>(
        &self,
        fetch: impl FnOnce() -> Result<Vec<Course>, E>,
    ) -> Result<&[Course], E> {
        self.courses
            .get_or_try_init(|| {
                tracing::debug!("course listing not cached, fetching");
                fetch()
            })
            .map(Vec::as_slice)
    }
}
