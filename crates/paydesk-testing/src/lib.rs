//! Test utilities for Paydesk services.
//!
//! Provides [`db::TestDb`], a migrated in-memory database.
//! Import from dev-dependencies only, never from production code.

pub mod db;
