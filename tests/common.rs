//! Common utilities for tests
#![allow(dead_code)]

use std::sync::Arc;

use bfs::{Config, FileSystem, MemDisk};

const ORANGE: &str = "\x1b[38;5;214m";
const RESET: &str = "\x1b[0m";

/// Prints a highlighted `[test]` line, taking `format!` arguments.
pub fn highlight(line: std::fmt::Arguments<'_>) {
    println!("{ORANGE}[test] {line}{RESET}");
}

#[macro_export]
macro_rules! log {
    ($($arg:tt)*) => {
        $crate::common::highlight(format_args!($($arg)*))
    };
}

/// Formats a fresh in-memory disk sized by `config.num_blocks`.
pub fn mem_fs(config: Config) -> FileSystem<MemDisk> {
    let disk = Arc::new(MemDisk::new(config.num_blocks));
    FileSystem::format_device(disk, config).unwrap()
}

pub fn default_fs() -> FileSystem<MemDisk> {
    mem_fs(Config::default())
}

/// Deterministic non-repeating-looking bytes.
pub fn pattern(len: usize, seed: u8) -> Vec<u8> {
    (0..len)
        .map(|i| (i as u8).wrapping_mul(31).wrapping_add(seed) ^ (i >> 8) as u8)
        .collect()
}
