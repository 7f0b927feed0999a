use std::collections::HashSet;

use crate::config::KeysConfig;
use crate::errors::{Result, ShortpoolError};

/// key_pool.key / url_mappings.short_key 的列宽
pub const MAX_KEY_LEN: usize = 64;

/// 随机 key 生成器
///
/// 字母表按字符存储，允许非 ASCII 字符。
#[derive(Debug, Clone)]
pub struct KeyGenerator {
    alphabet: Vec<char>,
    length: usize,
}

impl KeyGenerator {
    pub fn new(alphabet: &str, length: usize) -> Result<Self> {
        let chars: Vec<char> = alphabet.chars().collect();
        if chars.is_empty() {
            return Err(ShortpoolError::config("key 字母表不能为空"));
        }
        if length == 0 || length > MAX_KEY_LEN {
            return Err(ShortpoolError::config(format!(
                "key 长度必须在 1..={} 之间",
                MAX_KEY_LEN
            )));
        }
        let unique: HashSet<char> = chars.iter().copied().collect();
        if unique.len() != chars.len() {
            return Err(ShortpoolError::config("key 字母表包含重复字符"));
        }
        Ok(Self {
            alphabet: chars,
            length,
        })
    }

    pub fn from_config(config: &KeysConfig) -> Result<Self> {
        Self::new(&config.alphabet, config.length)
    }

    pub fn length(&self) -> usize {
        self.length
    }

    /// 生成一个随机 key
    pub fn generate(&self) -> String {
        std::iter::repeat_with(|| self.alphabet[rand::random_range(0..self.alphabet.len())])
            .take(self.length)
            .collect()
    }

    /// 生成最多 `count` 个互不相同的 key
    ///
    /// 返回 (keys, 批内重复次数)。key 空间小于 `count` 时会提前停止。
    pub fn generate_batch(&self, count: usize) -> (Vec<String>, usize) {
        let mut seen = HashSet::with_capacity(count);
        let mut keys = Vec::with_capacity(count);
        let mut duplicates = 0usize;
        // 碰撞过多说明 key 空间接近耗尽
        let max_draws = count.saturating_mul(4).max(16);

        let mut draws = 0usize;
        while keys.len() < count && draws < max_draws {
            draws += 1;
            let key = self.generate();
            if seen.insert(key.clone()) {
                keys.push(key);
            } else {
                duplicates += 1;
            }
        }
        (keys, duplicates)
    }

    /// key 是否可能存在于 key 池：非空、不超过列宽、不含 `/`、空白或控制字符
    ///
    /// 与当前字母表和长度无关，修改 `keys.alphabet` / `keys.length` 之前发放的 key 仍然有效。
    pub fn is_well_formed(key: &str) -> bool {
        !key.is_empty()
            && key.len() <= MAX_KEY_LEN
            && !key
                .chars()
                .any(|c| c == '/' || c.is_whitespace() || c.is_control())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_uses_alphabet_and_length() {
        let generator = KeyGenerator::new("abc", 10).unwrap();
        for _ in 0..100 {
            let key = generator.generate();
            assert_eq!(key.chars().count(), 10);
            assert!(key.chars().all(|c| "abc".contains(c)));
            assert!(KeyGenerator::is_well_formed(&key));
        }
    }

    #[test]
    fn test_generate_batch_is_unique() {
        let generator = KeyGenerator::from_config(&KeysConfig::default()).unwrap();
        let (keys, duplicates) = generator.generate_batch(5000);
        assert_eq!(keys.len(), 5000);
        let unique: HashSet<_> = keys.iter().collect();
        assert_eq!(unique.len(), 5000);
        assert!(duplicates < 5);
    }

    #[test]
    fn test_generate_batch_stops_when_space_is_exhausted() {
        // 2^2 = 4 个可能的 key
        let generator = KeyGenerator::new("ab", 2).unwrap();
        let (keys, duplicates) = generator.generate_batch(10);
        assert!(keys.len() <= 4);
        assert!(duplicates > 0);
    }

    #[test]
    fn test_is_well_formed() {
        assert!(KeyGenerator::is_well_formed("abcdefg"));
        assert!(KeyGenerator::is_well_formed("abcdef"));
        assert!(KeyGenerator::is_well_formed("abcdefG"));
        assert!(!KeyGenerator::is_well_formed("abc/efg"));
        assert!(!KeyGenerator::is_well_formed("abc efg"));
        assert!(!KeyGenerator::is_well_formed("abc\nefg"));
        assert!(!KeyGenerator::is_well_formed(""));
        assert!(!KeyGenerator::is_well_formed(&"a".repeat(MAX_KEY_LEN + 1)));
    }

    #[test]
    fn test_keys_survive_alphabet_change() {
        // 旧字母表发放的 key 在换字母表后仍然可以解析
        let before = KeyGenerator::new("ABCDEFGHIJ", 6).unwrap();
        let after = KeyGenerator::new("0123456789", 8).unwrap();
        let issued = before.generate();
        assert!(!issued.chars().any(|c| after.alphabet.contains(&c)));
        assert!(KeyGenerator::is_well_formed(&issued));
    }

    #[test]
    fn test_rejects_bad_alphabet() {
        assert!(KeyGenerator::new("", 7).is_err());
        assert!(KeyGenerator::new("aa", 7).is_err());
        assert!(KeyGenerator::new("ab", 0).is_err());
        assert!(KeyGenerator::new("ab", MAX_KEY_LEN + 1).is_err());
    }
}
