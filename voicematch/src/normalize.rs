use once_cell::sync::Lazy;
use regex::Regex;

/// Bracketed asides: `[...]`, `(...)`, `（...）`, `【...】`.
///
/// Each alternative is lazy and closes on its own delimiter, so pairs are
/// removed independently and never nest. `.` does not cross a line break.
static ASIDE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[.*?\]|（.*?）|\(.*?\)|【.*?】").expect("aside pattern"));

/// Remove stage directions and parenthetical asides, then trim.
///
/// Unbalanced brackets are kept as literal text.
pub fn normalize(text: &str) -> String {
    ASIDE.replace_all(text, "").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mixed_brackets() {
        assert_eq!(normalize("你好[笑]（小声）世界"), "你好世界");
    }

    #[test]
    fn test_all_kinds() {
        assert_eq!(
            normalize("[叹气]好吧(其实不想)，【内心OS】那就这样（摊手）"),
            "好吧，那就这样"
        );
    }

    #[test]
    fn test_non_greedy() {
        assert_eq!(normalize("[a]保留[b]"), "保留");
        assert_eq!(normalize("(a) 中间 (b)"), "中间");
    }

    #[test]
    fn test_unbalanced_kept() {
        assert_eq!(normalize("半个[括号"), "半个[括号");
        assert_eq!(normalize("反的]括号["), "反的]括号[");
        assert_eq!(normalize("混用（不配对)"), "混用（不配对)");
    }

    #[test]
    fn test_no_nesting() {
        // The first `]` closes the pair; the trailing `]` is literal.
        assert_eq!(normalize("[外[内]层]剩下"), "层]剩下");
    }

    #[test]
    fn test_does_not_cross_lines() {
        assert_eq!(normalize("(第一行\n第二行)"), "(第一行\n第二行)");
    }

    #[test]
    fn test_empty_and_whitespace() {
        assert_eq!(normalize(""), "");
        assert_eq!(normalize("  [只有动作]  "), "");
    }
}
