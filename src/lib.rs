//! # Study Camp Bot
//!
//! A Telegram bot that keeps study groups on a daily rhythm.
//!
//! ## Features
//! - Morning, evening and custom daily schedules posted at local time
//! - Join buttons with a deadline window and points awarded once
//! - Private reminders with streaks and completion bonuses
//! - Admin-run study camps with leaderboards and daily reports
//! - A small HTTP dashboard with health checks and JSON stats

/// Command, callback and membership handlers
pub mod bot;
/// Environment configuration
pub mod config;
/// SQLite models and connection management
pub mod database;
/// Typed domain errors
pub mod error;
/// Schedule templates, join windows and streak rules
pub mod schedule;
/// Dispatching, participation, camps and background jobs
pub mod services;
/// Formatting, validation, logging and reply helpers
pub mod utils;
