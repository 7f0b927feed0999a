//! Mode routing
//!
//! 一次性的运维命令直接在 CLI 中执行；常驻模式运行后台任务直到收到 Ctrl+C。

pub mod service;

pub use service::run_service;
