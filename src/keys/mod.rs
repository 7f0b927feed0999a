//! 短 key 生成

mod generator;

pub use generator::{KeyGenerator, MAX_KEY_LEN};
