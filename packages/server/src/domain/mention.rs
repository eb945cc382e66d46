//! Pure mention-extraction logic for AI triggers.
//!
//! A text message may carry `@<aiKind>` tokens drawn from the
//! configuration-enumerated set of recognized AI identifiers. Matching
//! is longest-first so `@wayneAIPro` never resolves to `wayneAI` when
//! both are configured, and each distinct kind triggers at most once.

use super::model::AiKind;

/// Result of scanning a message body for AI mentions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MentionScan {
    /// Distinct mentioned kinds, in first-occurrence order.
    pub kinds: Vec<AiKind>,
    /// The message body with every matched `@kind` token removed and
    /// whitespace re-collapsed; this is the query forwarded to the
    /// generator.
    pub stripped: String,
}

/// Extract AI mentions from `content`, longest-match against `known`.
pub fn extract_mentions(content: &str, known: &[AiKind]) -> MentionScan {
    let mut by_length: Vec<&AiKind> = known.iter().collect();
    by_length.sort_by_key(|kind| std::cmp::Reverse(kind.as_str().len()));

    let bytes = content.as_bytes();
    let mut kinds: Vec<AiKind> = Vec::new();
    let mut kept = String::with_capacity(content.len());
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] == b'@' {
            let rest = &content[i + 1..];
            let matched = by_length.iter().find(|kind| {
                rest.starts_with(kind.as_str())
                    && rest[kind.as_str().len()..]
                        .chars()
                        .next()
                        .is_none_or(|c| !c.is_alphanumeric())
            });
            if let Some(kind) = matched {
                if !kinds.contains(*kind) {
                    kinds.push((*kind).clone());
                }
                i += 1 + kind.as_str().len();
                continue;
            }
        }
        // Advance one full character, not one byte.
        let ch_len = content[i..]
            .chars()
            .next()
            .map(char::len_utf8)
            .unwrap_or(1);
        kept.push_str(&content[i..i + ch_len]);
        i += ch_len;
    }

    let stripped = kept.split_whitespace().collect::<Vec<_>>().join(" ");

    MentionScan { kinds, stripped }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn known() -> Vec<AiKind> {
        vec![
            AiKind::new("wayneAI".to_string()).unwrap(),
            AiKind::new("consultingAI".to_string()).unwrap(),
            AiKind::new("wayneAIPro".to_string()).unwrap(),
        ]
    }

    #[test]
    fn test_extract_single_mention() {
        // テスト項目: 単一のメンションが抽出され、トークンが除去される
        // given (前提条件):
        let content = "@wayneAI hello there";

        // when (操作):
        let scan = extract_mentions(content, &known());

        // then (期待する結果):
        assert_eq!(scan.kinds, vec![AiKind::new("wayneAI".to_string()).unwrap()]);
        assert_eq!(scan.stripped, "hello there");
    }

    #[test]
    fn test_extract_prefers_longest_match() {
        // テスト項目: 最長一致が優先される（wayneAIPro が wayneAI に化けない）
        let scan = extract_mentions("@wayneAIPro review this", &known());
        assert_eq!(
            scan.kinds,
            vec![AiKind::new("wayneAIPro".to_string()).unwrap()]
        );
        assert_eq!(scan.stripped, "review this");
    }

    #[test]
    fn test_extract_deduplicates_repeated_mentions() {
        // テスト項目: 同一メンションの繰り返しは一度だけ抽出される
        let scan = extract_mentions("@wayneAI ping @wayneAI again", &known());
        assert_eq!(scan.kinds.len(), 1);
        assert_eq!(scan.stripped, "ping again");
    }

    #[test]
    fn test_extract_multiple_distinct_mentions_in_order() {
        // テスト項目: 複数メンションは初出順で抽出される
        let scan = extract_mentions("@consultingAI and @wayneAI compare notes", &known());
        assert_eq!(
            scan.kinds,
            vec![
                AiKind::new("consultingAI".to_string()).unwrap(),
                AiKind::new("wayneAI".to_string()).unwrap(),
            ]
        );
        assert_eq!(scan.stripped, "and compare notes");
    }

    #[test]
    fn test_unknown_mention_is_left_in_place() {
        // テスト項目: 未知の @ トークンはそのまま本文に残る
        let scan = extract_mentions("@nobody hello", &known());
        assert!(scan.kinds.is_empty());
        assert_eq!(scan.stripped, "@nobody hello");
    }

    #[test]
    fn test_mention_requires_word_boundary() {
        // テスト項目: 既知の識別子に英数字が続く場合はメンションではない
        let scan = extract_mentions("@wayneAI2 hello", &known());
        assert!(scan.kinds.is_empty());
        assert_eq!(scan.stripped, "@wayneAI2 hello");
    }

    #[test]
    fn test_mention_with_multibyte_text() {
        // テスト項目: マルチバイト文字を含む本文でも正しく動作する
        let scan = extract_mentions("@wayneAI こんにちは", &known());
        assert_eq!(scan.kinds.len(), 1);
        assert_eq!(scan.stripped, "こんにちは");
    }
}
