//! Application lifecycle
//!
//! - `lifetime`: 启动时组装存储、缓存、引擎和后台任务；退出时按顺序停止
//! - `modes`: 常驻服务模式

pub mod lifetime;
pub mod modes;
