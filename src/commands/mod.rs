//! 命令层 - 供命令行入口调用

pub mod flag;
pub mod log;
pub mod manifest;
pub mod sync;
