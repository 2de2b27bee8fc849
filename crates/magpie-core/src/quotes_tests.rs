#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::sync::Arc;

    use crate::gateway::Button;
    use crate::mocks::{GatewayCall, MockGateway};
    use crate::quotes::{
        parse_callback, quote_key, quote_link, ListingTable, PageMove, StoredQuote,
    };
    use crate::types::{ChatId, MessageId};

    const CHAT: ChatId = ChatId(10);

    fn quote(author: &str, text: &str) -> StoredQuote {
        StoredQuote {
            chat: CHAT,
            message: MessageId(1),
            author: author.to_string(),
            text: text.to_string(),
        }
    }

    /// `n` quotes keyed `"10_1"` through `"10_n"`, n at most 9 so the
    /// string order matches the numeric one.
    fn seed(n: usize) -> BTreeMap<String, StoredQuote> {
        (1..=n)
            .map(|m| (format!("10_{m}"), quote("Ada", &format!("quote {m}"))))
            .collect()
    }

    fn table() -> (ListingTable, MockGateway) {
        let gateway = MockGateway::new();
        let table = ListingTable::new(Arc::new(gateway.clone()));
        (table, gateway)
    }

    // ── rendering ─────────────────────────────────────────────────────────

    #[tokio::test]
    async fn first_page_renders_header_links_and_entries() {
        let (table, gateway) = table();
        let mut quotes = BTreeMap::new();
        quotes.insert(
            "-1001234_5".to_string(),
            StoredQuote {
                chat: ChatId(-1001234),
                message: MessageId(5),
                author: "Ada".to_string(),
                text: "first".to_string(),
            },
        );
        quotes.insert(
            "42_9".to_string(),
            StoredQuote {
                chat: ChatId(42),
                message: MessageId(9),
                author: "Bob".to_string(),
                text: "second".to_string(),
            },
        );
        table.open(CHAT, quotes).await.unwrap();

        let expected = "Quotes 1-3, total 2\n\n\
                        ID:-1001234_5\nt.me/c/1234/5\nBy Ada:\nfirst\n\n\
                        ID:42_9\nBy Bob:\nsecond";
        assert_eq!(
            gateway.calls(),
            vec![GatewayCall::SendButtons {
                chat: CHAT,
                text: expected.to_string(),
                keyboard: vec![
                    vec![Button::new("Previous Page", "lsquotes_previous")],
                    vec![Button::new("Next Page", "lsquotes_next")],
                ],
            }]
        );
    }

    #[tokio::test]
    async fn header_bounds_double_past_page_one() {
        let (table, gateway) = table();
        table.open(CHAT, seed(7)).await.unwrap();
        assert!(gateway.texts()[0].starts_with("Quotes 1-3, total 7\n\n"));

        table.turn(CHAT, MessageId(1000), PageMove::Next).await.unwrap();
        let second = &gateway.texts()[1];
        assert!(second.starts_with("Quotes 4-9, total 7\n\n"));
        assert!(second.contains("quote 4") && second.contains("quote 6"));

        table.turn(CHAT, MessageId(1000), PageMove::Next).await.unwrap();
        let third = &gateway.texts()[2];
        assert!(third.starts_with("Quotes 7-15, total 7\n\n"));
        assert!(third.contains("quote 7") && !third.contains("quote 6"));
    }

    #[tokio::test]
    async fn empty_collection_reports_no_quotes() {
        let (table, gateway) = table();
        table.open(CHAT, BTreeMap::new()).await.unwrap();
        assert_eq!(
            gateway.calls(),
            vec![GatewayCall::SendText {
                chat: CHAT,
                text: "No quotes found".to_string(),
            }]
        );
    }

    // ── cursor movement ───────────────────────────────────────────────────

    #[tokio::test]
    async fn out_of_range_presses_are_silent() {
        let (table, gateway) = table();
        table.open(CHAT, seed(7)).await.unwrap();

        // page one has no previous page
        table
            .turn(CHAT, MessageId(1000), PageMove::Previous)
            .await
            .unwrap();
        assert_eq!(gateway.call_count(), 1);

        // two steps forward is the last page; a third does nothing
        table.turn(CHAT, MessageId(1000), PageMove::Next).await.unwrap();
        table.turn(CHAT, MessageId(1000), PageMove::Next).await.unwrap();
        let at_last = gateway.call_count();
        table.turn(CHAT, MessageId(1000), PageMove::Next).await.unwrap();
        assert_eq!(gateway.call_count(), at_last);

        // and back down to page one again
        table
            .turn(CHAT, MessageId(1000), PageMove::Previous)
            .await
            .unwrap();
        table
            .turn(CHAT, MessageId(1000), PageMove::Previous)
            .await
            .unwrap();
        assert!(gateway.texts().last().unwrap().starts_with("Quotes 1-3"));
    }

    #[tokio::test]
    async fn page_turns_edit_the_page_message_in_place() {
        let (table, gateway) = table();
        table.open(CHAT, seed(4)).await.unwrap();
        table.turn(CHAT, MessageId(1000), PageMove::Next).await.unwrap();

        let calls = gateway.calls();
        assert!(matches!(
            &calls[1],
            GatewayCall::EditButtons { chat, message, .. }
                if *chat == CHAT && *message == MessageId(1000)
        ));
    }

    #[tokio::test]
    async fn missing_session_turns_the_pressed_message_into_a_notice() {
        let (table, gateway) = table();
        table.turn(CHAT, MessageId(77), PageMove::Next).await.unwrap();
        assert_eq!(
            gateway.calls(),
            vec![GatewayCall::EditText {
                chat: CHAT,
                message: MessageId(77),
                text: "Session not found, maybe expired, please /lsquotes again to start a new one."
                    .to_string(),
            }]
        );
    }

    // ── session table ─────────────────────────────────────────────────────

    #[tokio::test]
    async fn eleventh_session_flushes_all_ten() {
        let (table, gateway) = table();
        for chat in 1..=10 {
            table.open(ChatId(chat), seed(4)).await.unwrap();
        }
        table.turn(ChatId(1), MessageId(1000), PageMove::Next).await.unwrap();
        assert!(gateway.texts().last().unwrap().starts_with("Quotes 4-9"));

        table.open(ChatId(11), seed(4)).await.unwrap();

        table.turn(ChatId(1), MessageId(1000), PageMove::Next).await.unwrap();
        assert!(gateway
            .texts()
            .last()
            .unwrap()
            .starts_with("Session not found"));

        // the fresh session still works
        table.turn(ChatId(11), MessageId(1011), PageMove::Next).await.unwrap();
        assert!(gateway.texts().last().unwrap().starts_with("Quotes 4-9"));
    }

    #[tokio::test]
    async fn reopening_a_chat_restarts_from_page_one() {
        let (table, gateway) = table();
        table.open(CHAT, seed(7)).await.unwrap();
        table.turn(CHAT, MessageId(1000), PageMove::Next).await.unwrap();

        table.open(CHAT, seed(7)).await.unwrap();
        assert!(gateway.texts().last().unwrap().starts_with("Quotes 1-3"));
        table.turn(CHAT, MessageId(1002), PageMove::Next).await.unwrap();
        assert!(gateway.texts().last().unwrap().starts_with("Quotes 4-9"));
    }

    // ── helpers ───────────────────────────────────────────────────────────

    #[test]
    fn supergroup_keys_get_permalinks() {
        assert_eq!(quote_link("-1001234_567"), "t.me/c/1234/567\n");
        assert_eq!(quote_link("42_9"), "");
        assert_eq!(quote_link("-99_5"), "");
        assert_eq!(quote_link("no-separator"), "");
    }

    #[test]
    fn keys_join_chat_and_message() {
        assert_eq!(quote_key(ChatId(-1001), MessageId(7)), "-1001_7");
    }

    #[test]
    fn callback_data_maps_to_directions() {
        assert_eq!(parse_callback("lsquotes_previous"), Some(PageMove::Previous));
        assert_eq!(parse_callback("lsquotes_next"), Some(PageMove::Next));
        assert_eq!(parse_callback("lsquotes_sideways"), None);
    }
}
