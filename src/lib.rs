//! newsdesk: a terminal admin console and reader for a remote article CMS.
//!
//! The library holds everything except argument parsing and printing:
//! - [`api`] - REST client for articles, categories, uploads and auth
//! - [`collection`] - list views with filter, sort, pagination and mutations
//! - [`forms`] - field validation for every form
//! - [`session`] - the logged-in session and role guard
//! - [`storage`] - SQLite persistence for the session and preview draft

pub mod api;
pub mod collection;
pub mod config;
pub mod forms;
pub mod models;
pub mod reader;
pub mod session;
pub mod storage;
pub mod util;
