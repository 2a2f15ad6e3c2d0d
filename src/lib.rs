// Library root
// -----------
// This crate exposes the pieces of the classroom browser. The binary
// (`main.rs`) wires them together: authorize, build the API client, then hand
// everything to the navigator loop.
//
// Module responsibilities:
// - `api`: blocking HTTP client for Classroom and Drive, behind the
//   `ClassroomService` and `DriveService` traits.
// - `auth`: OAuth client secrets, stored token, refresh and consent flow.
// - `cache`: the per-process course listing memo.
// - `feed`: merges coursework and announcements into one newest-first feed.
// - `resolver`: turns a material into a download plan and writes Drive files.
// - `launcher`: external viewers (video player, browser, file opener).
// - `navigator`: the course -> item -> attachment menu state machine.
// - `ui`: terminal implementation of the navigator's `Screen`.
pub mod api;
pub mod auth;
pub mod cache;
pub mod config;
pub mod error;
pub mod feed;
pub mod launcher;
pub mod models;
pub mod navigator;
pub mod resolver;
pub mod ui;

pub use error::{Error, Result};
