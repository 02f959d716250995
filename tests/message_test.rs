//! 消息解析与黑名单测试

use p2000_monitor::{Blacklist, Encoding, Error, Message, ParseOptions};

const SAMPLE: &str = "FLEX 184600000 2 W 5 [1234567] ALM ALPHA TEST MESSAGE";

// ============================================================================
// 解析
// ============================================================================

mod parsing {
    use super::*;

    #[test]
    fn test_end_to_end_sample() {
        // Given: 一行典型的解码器输出
        // When: 解析
        let message = Message::parse(SAMPLE).unwrap();

        // Then: 各字段按固定位置提取
        assert_eq!(message.timestamp(), "184600000");
        assert_eq!(message.monitor_code(), "1234567");
        assert_eq!(message.payload(), "ALM ALPHA TEST MESSAGE");
    }

    #[test]
    fn test_reparsing_is_identical() {
        let lines = [
            SAMPLE,
            "FLEX 184600001 2 W 5 [0101001] A1 Dorpsstraat Leeuwarden",
            "FLEX 184600002 2 W 5 0120901 P 2 BR woning",
        ];
        for line in lines {
            assert_eq!(Message::parse(line).unwrap(), Message::parse(line).unwrap());
        }
    }

    #[test]
    fn test_bracket_stripping() {
        let bracketed = Message::parse("FLEX 1 2 W 5 [0101001] A1 x").unwrap();
        let bare = Message::parse("FLEX 1 2 W 5 0101001 A1 x").unwrap();
        assert_eq!(bracketed.monitor_code(), "0101001");
        assert_eq!(bare.monitor_code(), "0101001");
    }

    #[test]
    fn test_fewer_than_seven_tokens() {
        for line in ["", "FLEX", "FLEX 184600000 2 W 5 [1234567]"] {
            let err = Message::parse(line).unwrap_err();
            assert!(matches!(err, Error::MalformedLine { .. }), "line {line:?}");
        }
    }

    #[test]
    fn test_bytes_with_trailing_newline() {
        let raw = format!("{SAMPLE}\r\n");
        let message = Message::from_bytes(raw.as_bytes(), &ParseOptions::default()).unwrap();
        assert_eq!(message.raw_line(), SAMPLE);
        assert_eq!(message.payload(), "ALM ALPHA TEST MESSAGE");
    }

    #[test]
    fn test_latin1_payload() {
        let options = ParseOptions {
            encoding: Encoding::Latin1,
            ..Default::default()
        };
        let mut raw = b"FLEX 1 2 W 5 [42] Br".to_vec();
        raw.push(0xfc);
        raw.extend_from_slice(b"ckenweg\n");
        let message = Message::from_bytes(&raw, &options).unwrap();
        assert_eq!(message.payload(), "Brückenweg");
    }
}

// ============================================================================
// 黑名单
// ============================================================================

mod suppression {
    use super::*;

    #[test]
    fn test_denied_text_scenario() {
        // Given: 正文黑名单包含测试消息
        let blacklist = Blacklist::new(Vec::<String>::new(), ["ALM ALPHA TEST MESSAGE"]);

        // Then: 测试消息被屏蔽，只有正文不同的消息不被屏蔽
        let test = Message::parse(SAMPLE).unwrap();
        let other = Message::parse("FLEX 184600000 2 W 5 [1234567] ALM ALPHA OTHER MESSAGE").unwrap();
        assert!(blacklist.is_suppressed(&test));
        assert!(!blacklist.is_suppressed(&other));
    }

    #[test]
    fn test_denied_code_ignores_payload() {
        let blacklist = Blacklist::new(["123"], Vec::<String>::new());
        for payload in ["A1 x", "P 1 BRAND", "ALM ALPHA TEST MESSAGE"] {
            let message = Message::parse(&format!("FLEX 1 2 W 5 [123] {payload}")).unwrap();
            assert!(blacklist.is_suppressed(&message));
            assert!(blacklist.is_monitor_code_suppressed(&message));
            assert!(!blacklist.is_payload_suppressed(&message));
        }
    }

    #[test]
    fn test_either_check_is_sufficient() {
        let blacklist = Blacklist::new(["123"], ["PROEFALARM"]);
        let neither = Message::parse("FLEX 1 2 W 5 [456] A1 x").unwrap();
        let both = Message::parse("FLEX 1 2 W 5 [123] PROEFALARM").unwrap();
        assert!(!blacklist.is_suppressed(&neither));
        assert!(blacklist.is_suppressed(&both));
    }
}
