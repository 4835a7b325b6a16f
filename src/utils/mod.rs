//! Shared helpers for paths, filesystem checks and shell quoting

pub mod fs;
pub mod path;
pub mod shell;
