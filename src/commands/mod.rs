//! CLI command implementations for omicsds.
//!
//! This module contains all the command implementations for the omicsds CLI
//! tool. Each submodule implements a specific command.
//!
//! # Command Categories
//!
//! ## Ingest
//! - [`import`] - Import SAM, BED, or matrix files into a sorted array
//! - [`configure`] - Persist default import settings into a workspace
//!
//! ## Query
//! - [`query`] - Stream cells back out: generic, matrix, or SAM export
//!
//! ## Maintenance
//! - [`consolidate`] - Merge an array's fragments into one

// Blanket clippy pedantic allows for command implementations.
#![allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_possible_wrap,
    clippy::cast_sign_loss,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::unnecessary_wraps,
    clippy::needless_pass_by_value,
    clippy::items_after_statements,
    clippy::too_many_lines,
    clippy::uninlined_format_args,
    clippy::map_unwrap_or
)]

pub mod command;
pub mod configure;
pub mod consolidate;
pub mod import;
pub mod query;
