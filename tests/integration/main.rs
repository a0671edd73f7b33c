//! Integration tests for the omicsds command-line tool.
//!
//! These tests validate end-to-end workflows that span multiple modules,
//! running the binary against real workspaces on disk.

mod helpers;
mod test_configure_command;
mod test_consolidate_command;
mod test_error_paths;
mod test_import_command;
mod test_query_command;
