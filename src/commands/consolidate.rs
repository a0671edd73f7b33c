//! Merge an array's fragments into one.
//!
//! Imports that could not keep one globally sorted run leave multiple
//! fragments behind, which degrade query locality until consolidated.

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use log::info;
use omicsds_lib::storage::{ArrayStorage, FileArray, StorageMode};

use crate::commands::command::Command;

/// Rewrite all fragments of an array as a single sorted fragment.
#[derive(Debug, Parser)]
#[command(
    name = "consolidate",
    about = "\x1b[38;5;173m[WORKSPACE]\x1b[0m    \x1b[36mMerge an array's fragments into a single sorted fragment\x1b[0m",
    long_about = r#"
Merge all fragments of an array into a single globally sorted fragment.

An import that cannot keep its cell stream in one non-decreasing run (for
example a matrix whose file order fights the storage order) splits the array
into multiple fragments. Queries still return correct results but must merge
across fragments; consolidation restores single-fragment locality.

EXAMPLES:

  omicsds consolidate -w my_workspace -a features
"#
)]
pub struct Consolidate {
    /// Path to the workspace directory.
    #[arg(short = 'w', long = "workspace")]
    pub workspace: PathBuf,

    /// Name of the array (should not include the path to the workspace).
    #[arg(short = 'a', long = "array")]
    pub array: String,
}

impl Command for Consolidate {
    fn execute(&self, command_line: &str) -> Result<()> {
        info!("Command line: {command_line}");

        let mut storage: Box<dyn ArrayStorage> =
            Box::new(FileArray::new(&self.workspace, &self.array));
        storage.initialize(StorageMode::Read, None, false, false)?;
        storage.consolidate()?;
        Ok(())
    }
}
