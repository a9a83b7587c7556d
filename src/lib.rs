//! Lists the third-party apps installed on a connected Android device and
//! hands their APKs to a browser, by driving the `adb` command-line tool.

pub mod adb;
pub mod core;
pub mod probe;
pub mod ui;
pub mod web;
