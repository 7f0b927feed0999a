use chrono::{DateTime, Duration, Utc};

/// 过期时间解析
pub struct TimeParser;

impl TimeParser {
    /// 解析过期时间，支持：
    /// - RFC3339：2030-10-01T12:00:00Z
    /// - 相对时间：30s, 15m, 2h, 1d, 2w, 3M, 1y
    /// - 组合格式：1d2h30m
    pub fn parse_expire_time(input: &str) -> Result<DateTime<Utc>, String> {
        Self::parse_expire_time_from(input, Utc::now())
    }

    /// 同 `parse_expire_time`，相对时间以 `now` 为起点
    pub fn parse_expire_time_from(input: &str, now: DateTime<Utc>) -> Result<DateTime<Utc>, String> {
        let input = input.trim();
        if input.is_empty() {
            return Err("过期时间不能为空".to_string());
        }

        if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
            return Ok(dt.with_timezone(&Utc));
        }

        let duration = Self::parse_duration(input)?;
        now.checked_add_signed(duration)
            .ok_or_else(|| "计算的过期时间超出了有效范围".to_string())
    }

    /// 解析相对时长
    pub fn parse_duration(input: &str) -> Result<Duration, String> {
        let mut total = Duration::zero();
        let mut rest = input.trim();

        while !rest.is_empty() {
            let digits_end = rest
                .find(|c: char| !c.is_ascii_digit())
                .unwrap_or(rest.len());
            if digits_end == 0 {
                return Err(format!("无效的时间格式: '{}'", input));
            }
            let num: i64 = rest[..digits_end]
                .parse()
                .map_err(|_| format!("无效的数字: '{}'", &rest[..digits_end]))?;
            rest = &rest[digits_end..];

            let unit_end = rest
                .find(|c: char| !c.is_ascii_alphabetic())
                .unwrap_or(rest.len());
            if unit_end == 0 {
                return Err(format!("缺少时间单位，数字 '{}' 后应跟时间单位", num));
            }
            let unit = &rest[..unit_end];
            rest = &rest[unit_end..];

            // 大写 M 表示月，其余单位不区分大小写
            let step = match unit {
                "M" => Duration::days(num.saturating_mul(30)),
                _ => match unit.to_lowercase().as_str() {
                    "s" | "sec" | "second" | "seconds" => Duration::seconds(num),
                    "m" | "min" | "minute" | "minutes" => Duration::minutes(num),
                    "h" | "hour" | "hours" => Duration::hours(num),
                    "d" | "day" | "days" => Duration::days(num),
                    "w" | "week" | "weeks" => Duration::weeks(num),
                    "month" | "months" => Duration::days(num.saturating_mul(30)),
                    "y" | "year" | "years" => Duration::days(num.saturating_mul(365)),
                    _ => return Err(format!("不支持的时间单位: '{}'", unit)),
                },
            };
            total += step;
        }

        if total <= Duration::zero() {
            return Err("时间间隔必须大于零".to_string());
        }
        Ok(total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_relative_time() {
        let now = Utc::now();

        let result = TimeParser::parse_expire_time_from("1d", now).unwrap();
        assert_eq!((result - now).num_days(), 1);

        let result = TimeParser::parse_expire_time_from("2w", now).unwrap();
        assert_eq!((result - now).num_days(), 14);

        let result = TimeParser::parse_expire_time_from("3M", now).unwrap();
        assert_eq!((result - now).num_days(), 90);

        let result = TimeParser::parse_expire_time_from("15m", now).unwrap();
        assert_eq!((result - now).num_minutes(), 15);
    }

    #[test]
    fn test_parse_combined() {
        let now = Utc::now();
        let result = TimeParser::parse_expire_time_from("1d2h30m", now).unwrap();
        assert_eq!((result - now).num_seconds(), 24 * 3600 + 2 * 3600 + 30 * 60);
    }

    #[test]
    fn test_parse_rfc3339() {
        let result = TimeParser::parse_expire_time("2030-10-01T12:00:00Z").unwrap();
        assert_eq!(result.to_rfc3339(), "2030-10-01T12:00:00+00:00");
    }

    #[test]
    fn test_invalid_format() {
        assert!(TimeParser::parse_expire_time("").is_err());
        assert!(TimeParser::parse_expire_time("invalid").is_err());
        assert!(TimeParser::parse_expire_time("1x").is_err());
        assert!(TimeParser::parse_expire_time("10").is_err());
        assert!(TimeParser::parse_expire_time("0d").is_err());
    }
}
