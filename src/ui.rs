// UI layer: the terminal side of the navigator, built on `dialoguer` menus,
// an `indicatif` spinner while remote calls block, and `crossterm` colours.

use crate::error::{Error, Result};
use crate::models::{Course, Item};
use crate::navigator::Screen;
use crate::resolver::LocalArtifact;
use crossterm::style::Stylize;
use dialoguer::{Input, Select};
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Wrapped lines break at the first whitespace past this many characters.
const WRAP_AT: usize = 60;
const SPIN_CHARS: &str = "⣾⣽⣻⢿⡿⣟⣯⣷ ";

#[derive(Default)]
pub struct TerminalScreen {
    spinner: Option<ProgressBar>,
}

impl TerminalScreen {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Screen for TerminalScreen {
    /// `Select::interact()` is keyboard-driven: arrow keys and Enter.
    fn select(&mut self, choices: &[String]) -> Result<usize> {
        let selection = Select::new()
            .with_prompt("which one")
            .items(choices)
            .default(0)
            .interact()?;
        Ok(selection)
    }

    fn show_course(&mut self, course: &Course) {
        if let Some(heading) = &course.description_heading {
            println!("{}", heading);
        }
    }

    fn show_item(&mut self, item: &Item) {
        println!("{}\n", describe_item(item));
    }

    fn show_saved(&mut self, artifact: &LocalArtifact) {
        println!("saved {} ({} bytes)", artifact.path.display(), artifact.bytes);
        println!("done!");
    }

    fn report(&mut self, err: &Error) {
        println!("{}", err.to_string().red());
    }

    fn busy(&mut self, message: &str) {
        let spinner = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::with_template("{spinner} {msg}") {
            spinner.set_style(style.tick_chars(SPIN_CHARS));
        }
        spinner.set_message(message.to_string());
        spinner.enable_steady_tick(Duration::from_millis(100));
        self.spinner = Some(spinner);
    }

    fn done(&mut self) {
        if let Some(spinner) = self.spinner.take() {
            spinner.finish_and_clear();
        }
    }
}

/// Show the consent URL and read back the code the user was given.
pub fn ask_authorization_code(url: &str) -> Result<String> {
    println!("Authorize this app by visiting this url: {}", url);
    let code: String = Input::new().with_prompt("Enter code here").interact_text()?;
    Ok(code)
}

/// Detail block printed when an item is opened.
pub fn describe_item(item: &Item) -> String {
    let mut lines = Vec::new();
    match item {
        Item::CourseWork(work) => {
            lines.push(work.title.as_str().bold().to_string());
            if let Some(due) = work.due_date {
                lines.push(format!("due on {}", due.to_string().yellow()));
            }
            if let Some(points) = work.max_points {
                lines.push(format!("worth {}", format!("{} points", points).cyan()));
            }
            if let Some(description) = work.description.as_deref().filter(|d| !d.is_empty()) {
                lines.push(wrap(description));
            }
        }
        Item::Announcement(announcement) => lines.push(wrap(&announcement.text)),
    }
    if !item.alternate_link().is_empty() {
        lines.push(item.alternate_link().dark_grey().to_string());
    }
    lines.join("\n")
}

/// Wrap `text` at whitespace after [`WRAP_AT`] characters, keeping its own
/// line breaks, and prefix every line with a grey marker.
pub fn wrap(text: &str) -> String {
    let marker = "=> ".dark_grey().to_string();
    wrap_lines(text)
        .iter()
        .map(|line| format!("{}{}", marker, line))
        .collect::<Vec<_>>()
        .join("\n")
}

fn wrap_lines(text: &str) -> Vec<String> {
    let mut lines = vec![String::new()];
    for c in text.chars() {
        let current = lines.last_mut().map(|l| l.chars().count()).unwrap_or(0);
        if c == '\n' || (current > WRAP_AT && c.is_whitespace()) {
            lines.push(String::new());
        } else if let Some(line) = lines.last_mut() {
            line.push(c);
        }
    }
    lines
}
