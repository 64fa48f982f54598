// ==========================================
// 能力框架导入系统 - 数据清洗器实现
// ==========================================
// 职责: 纯文本清洗 / 长度截断 / 整数强转 / 布尔判定
// 红线: 不做任何 I/O; 清洗结果再次清洗保持不变
// ==========================================

use regex::Regex;
use std::sync::LazyLock;

/// 编号与简称的最大长度（字符）
pub const MAX_TEXT_LENGTH: usize = 100;

const ELLIPSIS: &str = "...";

static TAG_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^<>]*>").expect("markup pattern is a valid regex"));

pub struct DataCleaner;

impl DataCleaner {
    /// 纯文本清洗: 去控制字符（保留 \n \t）→ 去标签 → TRIM
    pub fn clean_text(&self, value: &str) -> String {
        let mut text: String = value
            .chars()
            .filter(|c| !c.is_control() || *c == '\n' || *c == '\t')
            .collect();

        // 标签剥离后可能拼出新的标签,循环至稳定
        while TAG_PATTERN.is_match(&text) {
            text = TAG_PATTERN.replace_all(&text, "").into_owned();
        }

        text.trim().to_string()
    }

    /// 截断到 max 个字符（超长时以 "..." 结尾）
    pub fn shorten_text(&self, value: &str, max: usize) -> String {
        if value.chars().count() <= max {
            return value.to_string();
        }
        let keep = max.saturating_sub(ELLIPSIS.len());
        let head: String = value.chars().take(keep).collect();
        format!("{}{}", head.trim_end(), ELLIPSIS)
    }

    /// 编号/简称清洗（清洗 + 截断）
    pub fn clean_identifier(&self, value: &str) -> String {
        self.shorten_text(&self.clean_text(value), MAX_TEXT_LENGTH)
    }

    /// 富文本原样保留
    pub fn clean_raw(&self, value: &str) -> String {
        value.to_string()
    }

    /// 整数强转: 取前导整数部分,非数字 → 0
    pub fn clean_int(&self, value: &str) -> i32 {
        let trimmed = value.trim();
        let (sign, digits) = match trimmed.strip_prefix('-') {
            Some(rest) => (-1, rest),
            None => (1, trimmed.strip_prefix('+').unwrap_or(trimmed)),
        };
        let numeric: String = digits.chars().take_while(|c| c.is_ascii_digit()).collect();
        numeric
            .parse::<i32>()
            .map(|n| sign * n)
            .unwrap_or(0)
    }

    /// 非空且不为 "0" 即为真
    pub fn is_truthy(&self, value: &str) -> bool {
        let trimmed = value.trim();
        !trimmed.is_empty() && trimmed != "0"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_text_strips_markup_and_controls() {
        let cleaner = DataCleaner;
        assert_eq!(cleaner.clean_text("  <b>COMP1</b>\u{0007} "), "COMP1");
        assert_eq!(cleaner.clean_text("<<b>script>x"), "x");
        assert_eq!(cleaner.clean_text("a < b"), "a < b");
    }

    #[test]
    fn test_shorten_text() {
        let cleaner = DataCleaner;
        let long = "x".repeat(150);
        let short = cleaner.shorten_text(&long, MAX_TEXT_LENGTH);
        assert_eq!(short.chars().count(), MAX_TEXT_LENGTH);
        assert!(short.ends_with("..."));
        assert_eq!(cleaner.shorten_text("abc", MAX_TEXT_LENGTH), "abc");
    }

    #[test]
    fn test_clean_identifier_idempotent() {
        let cleaner = DataCleaner;
        let inputs = [
            "  COMP1 ".to_string(),
            "<i>Competency</i> 1".to_string(),
            format!("{} <b>tail</b>", "y ".repeat(80)),
            "<<b>b>nested".to_string(),
            "能力 一".to_string(),
        ];
        for input in inputs {
            let once = cleaner.clean_identifier(&input);
            assert_eq!(cleaner.clean_identifier(&once), once, "input: {}", input);
            assert!(once.chars().count() <= MAX_TEXT_LENGTH);
        }
    }

    #[test]
    fn test_clean_raw_preserves_markup() {
        let cleaner = DataCleaner;
        assert_eq!(cleaner.clean_raw("<p>Body</p>"), "<p>Body</p>");
    }

    #[test]
    fn test_clean_int() {
        let cleaner = DataCleaner;
        assert_eq!(cleaner.clean_int("1"), 1);
        assert_eq!(cleaner.clean_int(" 12abc"), 12);
        assert_eq!(cleaner.clean_int("-3"), -3);
        assert_eq!(cleaner.clean_int("abc"), 0);
        assert_eq!(cleaner.clean_int(""), 0);
        assert_eq!(cleaner.clean_int("99999999999"), 0);
    }

    #[test]
    fn test_is_truthy() {
        let cleaner = DataCleaner;
        assert!(cleaner.is_truthy("1"));
        assert!(cleaner.is_truthy("yes"));
        assert!(!cleaner.is_truthy(""));
        assert!(!cleaner.is_truthy(" 0 "));
    }
}
