// Menu state machine: course list -> item list -> attachment list. Every step
// blocks on exactly one remote call or one prompt before moving on.

use crate::api::{
    ClassroomService, DriveService, ANNOUNCEMENT_PAGE_SIZE, COURSE_PAGE_SIZE,
    COURSE_WORK_PAGE_SIZE,
};
use crate::cache::SessionCache;
use crate::error::{Error, Result};
use crate::feed;
use crate::launcher::Launcher;
use crate::models::{Course, Item, Material};
use crate::resolver::{destination_base, AttachmentResolver, DownloadPlan, LocalArtifact};
use std::path::PathBuf;
use tracing::{debug, warn};

pub const EXIT: &str = "exit";
pub const BACK: &str = "back";

/// What the navigator needs from the terminal.
pub trait Screen {
    /// Let the user pick one of `choices`, returning its index.
    fn select(&mut self, choices: &[String]) -> Result<usize>;
    fn show_course(&mut self, course: &Course);
    fn show_item(&mut self, item: &Item);
    fn show_saved(&mut self, artifact: &LocalArtifact);
    /// Report a failure the session recovers from.
    fn report(&mut self, err: &Error);
    /// A remote call is about to block.
    fn busy(&mut self, message: &str);
    fn done(&mut self);
}

enum State {
    CourseList,
    ItemList {
        course: Course,
        feed: Vec<Item>,
    },
    AttachmentList {
        course: Course,
        feed: Vec<Item>,
        selected: usize,
    },
    Exit,
}

pub struct Navigator<C, D, L, S> {
    classroom: C,
    resolver: AttachmentResolver<D>,
    launcher: L,
    screen: S,
    cache: SessionCache,
    download_dir: PathBuf,
}

impl<C, D, L, S> Navigator<C, D, L, S>
where
    C: ClassroomService,
    D: DriveService,
    L: Launcher,
    S: Screen,
{
    pub fn new(classroom: C, drive: D, launcher: L, screen: S, download_dir: PathBuf) -> Self {
        Navigator {
            classroom,
            resolver: AttachmentResolver::new(drive),
            launcher,
            screen,
            cache: SessionCache::new(),
            download_dir,
        }
    }

    /// Run menus until the user picks "exit" from the course list. Only
    /// fatal errors (see [`Error::is_fatal`]) and a failed course listing
    /// end the loop early.
    pub fn run(&mut self) -> Result<()> {
        let mut state = State::CourseList;
        loop {
            state = match state {
                State::Exit => return Ok(()),
                State::CourseList => self.course_list()?,
                State::ItemList { course, feed } => self.item_list(course, feed)?,
                State::AttachmentList {
                    course,
                    feed,
                    selected,
                } => self.attachment_list(course, feed, selected)?,
            };
        }
    }

    fn course_list(&mut self) -> Result<State> {
        let classroom = &self.classroom;
        let cache = &self.cache;
        let courses = waiting(&mut self.screen, "loading courses", || {
            cache.get_or_fetch(|| classroom.list_courses(COURSE_PAGE_SIZE))
        })?;

        let mut choices = vec![EXIT.to_string()];
        choices.extend(courses.iter().map(|c| c.name.clone()));
        let course = match self.screen.select(&choices)? {
            0 => return Ok(State::Exit),
            i => match courses.get(i - 1) {
                Some(course) => course.clone(),
                None => return Ok(State::CourseList),
            },
        };

        self.screen.show_course(&course);
        match self.load_feed(&course) {
            Ok(feed) => Ok(State::ItemList { course, feed }),
            Err(err) => {
                self.recover(err)?;
                Ok(State::CourseList)
            }
        }
    }

    /// Coursework page, then announcements page, merged newest first.
    fn load_feed(&mut self, course: &Course) -> Result<Vec<Item>> {
        let classroom = &self.classroom;
        waiting(&mut self.screen, "loading", || {
            let work = classroom.list_course_work(&course.id, COURSE_WORK_PAGE_SIZE)?;
            let announcements = classroom.list_announcements(&course.id, ANNOUNCEMENT_PAGE_SIZE)?;
            debug!(
                course = %course.id,
                work = work.len(),
                announcements = announcements.len(),
                "fetched course feed"
            );
            feed::merge(work, announcements)
        })
    }

    fn item_list(&mut self, course: Course, feed: Vec<Item>) -> Result<State> {
        let mut choices = vec![BACK.to_string()];
        choices.extend(feed.iter().map(Item::label));
        match self.screen.select(&choices)? {
            0 => Ok(State::CourseList),
            i if i <= feed.len() => {
                self.screen.show_item(&feed[i - 1]);
                Ok(State::AttachmentList {
                    course,
                    feed,
                    selected: i - 1,
                })
            }
            _ => Ok(State::ItemList { course, feed }),
        }
    }

    fn attachment_list(&mut self, course: Course, feed: Vec<Item>, selected: usize) -> Result<State> {
        let materials = feed[selected].materials();
        let mut choices = vec![BACK.to_string()];
        choices.extend(materials.iter().map(|m| m.name().to_string()));

        match self.screen.select(&choices)? {
            0 => return Ok(State::ItemList { course, feed }),
            i => {
                if let Some(material) = materials.get(i - 1) {
                    if let Err(err) = self.open_material(material) {
                        self.recover(err)?;
                    }
                }
            }
        }
        Ok(State::AttachmentList {
            course,
            feed,
            selected,
        })
    }

    fn open_material(&mut self, material: &Material) -> Result<()> {
        let resolver = &self.resolver;
        let plan = waiting(&mut self.screen, "resolving", || resolver.resolve(material))?;
        match plan {
            DownloadPlan::Drive(fetch) => {
                let destination = destination_base(&self.download_dir, material.name());
                let artifact = waiting(&mut self.screen, "downloading...", || {
                    resolver.execute(&fetch, &destination)
                })?;
                self.screen.show_saved(&artifact);
                self.launcher.open_file(&artifact.path)
            }
            DownloadPlan::Video { id } => self.launcher.play_video(&id),
            DownloadPlan::Browse { url } => self.launcher.browse(&url),
        }
    }

    fn recover(&mut self, err: Error) -> Result<()> {
        if err.is_fatal() {
            return Err(err);
        }
        warn!(error = %err, "navigation step failed");
        self.screen.report(&err);
        Ok(())
    }
}

/// Run a blocking call with the busy indicator up.
fn waiting<S: Screen, T>(screen: &mut S, message: &str, call: impl FnOnce() -> Result<T>) -> Result<T> {
    screen.busy(message);
    let result = call();
    screen.done();
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Announcement, CourseWork};
    use std::cell::{Cell, RefCell};
    use std::collections::{HashMap, VecDeque};
    use std::io::{self, Cursor, Read};
    use std::path::Path;

    #[derive(Default)]
    struct FakeClassroom {
        courses: Vec<Course>,
        work: HashMap<String, Vec<Item>>,
        announcements: HashMap<String, Vec<Item>>,
        course_calls: Cell<usize>,
        feed_calls: Cell<usize>,
        fail_feed: Option<fn() -> Error>,
    }

    impl ClassroomService for FakeClassroom {
        fn list_courses(&self, page_size: u32) -> Result<Vec<Course>> {
            assert_eq!(page_size, 50);
            self.course_calls.set(self.course_calls.get() + 1);
            Ok(self.courses.clone())
        }

        fn list_course_work(&self, course_id: &str, page_size: u32) -> Result<Vec<Item>> {
            assert_eq!(page_size, 50);
            self.feed_calls.set(self.feed_calls.get() + 1);
            if let Some(fail) = self.fail_feed {
                return Err(fail());
            }
            Ok(self.work.get(course_id).cloned().unwrap_or_default())
        }

        fn list_announcements(&self, course_id: &str, page_size: u32) -> Result<Vec<Item>> {
            assert_eq!(page_size, 20);
            Ok(self.announcements.get(course_id).cloned().unwrap_or_default())
        }
    }

    #[derive(Default)]
    struct FakeDrive {
        files: HashMap<String, (String, Vec<u8>)>,
    }

    impl DriveService for FakeDrive {
        fn file_mime_type(&self, file_id: &str) -> Result<String> {
            self.files
                .get(file_id)
                .map(|(mime, _)| mime.clone())
                .ok_or_else(|| Error::remote("get file metadata", "404 Not Found"))
        }

        fn export(&self, file_id: &str, _: &str) -> Result<Box<dyn Read>> {
            Ok(Box::new(Cursor::new(self.files[file_id].1.clone())))
        }

        fn media(&self, file_id: &str) -> Result<Box<dyn Read>> {
            Ok(Box::new(Cursor::new(self.files[file_id].1.clone())))
        }
    }

    #[derive(Default)]
    struct FakeLauncher {
        launched: RefCell<Vec<String>>,
    }

    impl Launcher for FakeLauncher {
        fn open_file(&self, path: &Path) -> Result<()> {
            self.launched.borrow_mut().push(format!("open {}", path.display()));
            Ok(())
        }

        fn play_video(&self, video_id: &str) -> Result<()> {
            self.launched.borrow_mut().push(format!("video {video_id}"));
            Ok(())
        }

        fn browse(&self, url: &str) -> Result<()> {
            self.launched.borrow_mut().push(format!("browse {url}"));
            Ok(())
        }
    }

    /// Answers prompts from a script and records every menu it was shown.
    struct ScriptedScreen {
        picks: VecDeque<usize>,
        menus: Vec<Vec<String>>,
        events: Vec<String>,
    }

    impl ScriptedScreen {
        fn new(picks: &[usize]) -> Self {
            ScriptedScreen {
                picks: picks.iter().copied().collect(),
                menus: vec![],
                events: vec![],
            }
        }
    }

    impl Screen for ScriptedScreen {
        fn select(&mut self, choices: &[String]) -> Result<usize> {
            self.menus.push(choices.to_vec());
            self.picks
                .pop_front()
                .ok_or_else(|| io::Error::new(io::ErrorKind::UnexpectedEof, "script ran out").into())
        }

        fn show_course(&mut self, course: &Course) {
            self.events.push(format!("course {}", course.id));
        }

        fn show_item(&mut self, item: &Item) {
            self.events.push(format!("item {}", item.id()));
        }

        fn show_saved(&mut self, artifact: &LocalArtifact) {
            self.events.push(format!("saved {}", artifact.path.display()));
        }

        fn report(&mut self, err: &Error) {
            self.events.push(format!("error {err}"));
        }

        fn busy(&mut self, _: &str) {}

        fn done(&mut self) {}
    }

    type TestNavigator = Navigator<FakeClassroom, FakeDrive, FakeLauncher, ScriptedScreen>;

    fn navigator(classroom: FakeClassroom, drive: FakeDrive, picks: &[usize], dir: &Path) -> TestNavigator {
        Navigator::new(
            classroom,
            drive,
            FakeLauncher::default(),
            ScriptedScreen::new(picks),
            dir.to_path_buf(),
        )
    }

    fn math() -> Course {
        Course {
            id: "c1".into(),
            name: "Math".into(),
            description_heading: Some("Math 101".into()),
        }
    }

    fn hi_class() -> Item {
        Item::Announcement(Announcement {
            id: "a1".into(),
            text: "Hi class".into(),
            creation_time: "2024-01-01T00:00:00Z".into(),
            materials: vec![],
            alternate_link: String::new(),
        })
    }

    fn homework(materials: Vec<Material>) -> Item {
        Item::CourseWork(CourseWork {
            id: "w1".into(),
            title: "Homework 1".into(),
            description: None,
            creation_time: "2024-02-01T00:00:00Z".into(),
            due_date: None,
            max_points: Some(10.0),
            materials,
            alternate_link: String::new(),
        })
    }

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn announcement_only_course_lists_one_entry() {
        let mut classroom = FakeClassroom {
            courses: vec![math()],
            ..Default::default()
        };
        classroom.announcements.insert("c1".into(), vec![hi_class()]);
        let dir = tempfile::tempdir().unwrap();
        // Math, back, exit
        let mut nav = navigator(classroom, FakeDrive::default(), &[1, 0, 0], dir.path());

        nav.run().unwrap();

        assert_eq!(nav.screen.menus[0], strings(&["exit", "Math"]));
        assert_eq!(nav.screen.menus[1], strings(&["back", "Hi class"]));
        assert_eq!(nav.screen.events, ["course c1"]);
    }

    #[test]
    fn course_list_is_fetched_once_per_session() {
        let classroom = FakeClassroom {
            courses: vec![math()],
            ..Default::default()
        };
        let dir = tempfile::tempdir().unwrap();
        // Math, back, Math, back, exit
        let mut nav = navigator(classroom, FakeDrive::default(), &[1, 0, 1, 0, 0], dir.path());

        nav.run().unwrap();

        assert_eq!(nav.classroom.course_calls.get(), 1);
        assert_eq!(nav.classroom.feed_calls.get(), 2);
    }

    #[test]
    fn empty_course_and_bare_item_offer_only_back() {
        let mut classroom = FakeClassroom {
            courses: vec![
                math(),
                Course {
                    id: "c2".into(),
                    name: "Empty".into(),
                    description_heading: None,
                },
            ],
            ..Default::default()
        };
        classroom.work.insert("c1".into(), vec![homework(vec![])]);
        let dir = tempfile::tempdir().unwrap();
        // Empty, back, Math, Homework 1, back, back, exit
        let mut nav = navigator(classroom, FakeDrive::default(), &[2, 0, 1, 1, 0, 0, 0], dir.path());

        nav.run().unwrap();

        let menus = &nav.screen.menus;
        assert_eq!(menus[1], strings(&["back"]));
        assert_eq!(menus[3], strings(&["back", "Homework 1"]));
        assert_eq!(menus[4], strings(&["back"]));
        // back from the attachments returns to the same feed, no refetch
        assert_eq!(menus[5], strings(&["back", "Homework 1"]));
        assert_eq!(nav.classroom.feed_calls.get(), 2);
    }

    #[test]
    fn feed_is_newest_first() {
        let mut classroom = FakeClassroom {
            courses: vec![math()],
            ..Default::default()
        };
        classroom.work.insert("c1".into(), vec![homework(vec![])]);
        classroom.announcements.insert("c1".into(), vec![hi_class()]);
        let dir = tempfile::tempdir().unwrap();
        let mut nav = navigator(classroom, FakeDrive::default(), &[1, 0, 0], dir.path());

        nav.run().unwrap();

        assert_eq!(nav.screen.menus[1], strings(&["back", "Homework 1", "Hi class"]));
    }

    #[test]
    fn each_material_kind_reaches_its_viewer() {
        let mut classroom = FakeClassroom {
            courses: vec![math()],
            ..Default::default()
        };
        classroom.work.insert(
            "c1".into(),
            vec![homework(vec![
                Material::DriveFile {
                    id: "doc".into(),
                    title: "Worksheet".into(),
                },
                Material::YoutubeVideo {
                    id: "vid42".into(),
                    title: "Lecture".into(),
                },
                Material::Link {
                    url: "https://example.com".into(),
                    title: "Reading".into(),
                },
            ])],
        );
        let mut drive = FakeDrive::default();
        drive.files.insert(
            "doc".into(),
            ("application/vnd.google-apps.document".into(), b"{\\rtf1}".to_vec()),
        );
        let dir = tempfile::tempdir().unwrap();
        // Math, Homework 1, Worksheet, Lecture, Reading, back, back, exit
        let mut nav = navigator(classroom, drive, &[1, 1, 1, 2, 3, 0, 0, 0], dir.path());

        nav.run().unwrap();

        let saved = dir.path().join("Worksheet.rtf");
        assert_eq!(std::fs::read(&saved).unwrap(), b"{\\rtf1}");
        assert_eq!(
            *nav.launcher.launched.borrow(),
            [
                format!("open {}", saved.display()),
                "video vid42".to_string(),
                "browse https://example.com".to_string(),
            ]
        );
        let attachments = strings(&["back", "Worksheet", "Lecture", "Reading"]);
        assert_eq!(nav.screen.menus[2..6], vec![attachments; 4][..]);
    }

    #[test]
    fn failed_download_is_reported_and_menu_shown_again() {
        let mut classroom = FakeClassroom {
            courses: vec![math()],
            ..Default::default()
        };
        classroom.work.insert(
            "c1".into(),
            vec![homework(vec![Material::DriveFile {
                id: "deleted".into(),
                title: "Old notes".into(),
            }])],
        );
        let dir = tempfile::tempdir().unwrap();
        // Math, Homework 1, Old notes, back, back, exit
        let mut nav = navigator(classroom, FakeDrive::default(), &[1, 1, 1, 0, 0, 0], dir.path());

        nav.run().unwrap();

        assert!(nav.screen.events.iter().any(|e| e.starts_with("error failed to get file metadata")));
        assert_eq!(nav.screen.menus[3], strings(&["back", "Old notes"]));
        assert!(nav.launcher.launched.borrow().is_empty());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn failed_feed_returns_to_course_list() {
        let classroom = FakeClassroom {
            courses: vec![math()],
            fail_feed: Some(|| Error::remote("list coursework", "503 Service Unavailable")),
            ..Default::default()
        };
        let dir = tempfile::tempdir().unwrap();
        // Math (fails), exit
        let mut nav = navigator(classroom, FakeDrive::default(), &[1, 0], dir.path());

        nav.run().unwrap();

        assert_eq!(nav.screen.menus.len(), 2);
        assert_eq!(nav.screen.menus[1], strings(&["exit", "Math"]));
        assert!(nav.cache.get().is_some());
        assert_eq!(nav.classroom.course_calls.get(), 1);
    }

    #[test]
    fn malformed_feed_is_reported_not_fatal() {
        let mut classroom = FakeClassroom {
            courses: vec![math()],
            ..Default::default()
        };
        let mut broken = hi_class();
        if let Item::Announcement(a) = &mut broken {
            a.creation_time = "not a date".into();
        }
        classroom.announcements.insert("c1".into(), vec![broken]);
        let dir = tempfile::tempdir().unwrap();
        let mut nav = navigator(classroom, FakeDrive::default(), &[1, 0], dir.path());

        nav.run().unwrap();

        assert!(nav.screen.events.iter().any(|e| e.starts_with("error malformed item a1")));
    }

    #[test]
    fn expired_session_ends_the_loop() {
        let classroom = FakeClassroom {
            courses: vec![math()],
            fail_feed: Some(|| Error::Auth("list coursework rejected: 401".into())),
            ..Default::default()
        };
        let dir = tempfile::tempdir().unwrap();
        let mut nav = navigator(classroom, FakeDrive::default(), &[1, 0], dir.path());

        assert!(matches!(nav.run(), Err(Error::Auth(_))));
    }
}
