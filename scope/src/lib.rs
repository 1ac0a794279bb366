//! lexpscope - inspect NaN-boxed Lisp heaps from a memory snapshot
//!
//! Provides the `render`, `dump`, `print` and `build` commands and an
//! interactive inspector, all over a [`lexp::SnapshotHost`].

pub mod commands;
pub mod repl;

pub use commands::{build_image, load_host, run_build, run_dump, run_print, run_render};
pub use repl::{ReplCommand, parse_command};
