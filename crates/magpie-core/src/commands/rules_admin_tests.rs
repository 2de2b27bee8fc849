#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::commands::rules_admin;
    use crate::error::BotError;
    use crate::events::IncomingMessage;
    use crate::mocks::{command_msg, group_chat, sticker_msg, test_user, text_msg, TestBot};
    use crate::store::{collections, Store};

    fn owner_msg(name: &str, args: &[&str]) -> IncomingMessage {
        let chat = group_chat(-1001);
        let owner = test_user(500, "Owner");
        command_msg(&chat, &owner, 1, name, args)
    }

    // ── sticker rules ─────────────────────────────────────────────────────

    #[tokio::test]
    async fn setsres_rejects_short_or_malformed_args() {
        let bot = TestBot::new();
        for args in [
            &["STK", "0.5", "60", "sticker"][..],
            &["STK", "high", "60", "sticker", "RSP"][..],
            &["STK", "0.5", "soon", "sticker", "RSP"][..],
            &["STK", "0.5", "60", "video", "RSP"][..],
        ] {
            let err = rules_admin::setsres(&bot.state, &owner_msg("setsres", args))
                .await
                .unwrap_err();
            assert_eq!(
                err,
                BotError::Usage(
                    "Usage: /setsres <sticker_id> <chance> <cooldown> <response_type> <response_content>"
                )
            );
        }
        let stored = bot.store.get_all(collections::STICKER_RESPONSE).await.unwrap();
        assert!(stored.is_empty());
    }

    #[tokio::test]
    async fn setsres_persists_and_answers_immediately() {
        let bot = TestBot::new();
        rules_admin::setsres(
            &bot.state,
            &owner_msg("setsres", &["STK", "0.5", "0", "sticker", "RSP"]),
        )
        .await
        .unwrap();
        assert_eq!(bot.gateway.texts(), vec!["Entry updated".to_string()]);

        let stored = bot.store.get_all(collections::STICKER_RESPONSE).await.unwrap();
        assert_eq!(stored.get("STK"), Some(&json!([0.5, 0, "sticker", "RSP"])));

        // The live registry picks it up without a restart.
        let chat = group_chat(-1001);
        let sender = test_user(7, "Nina");
        bot.gateway.clear();
        bot.dispatcher
            .handle_message(sticker_msg(&chat, &sender, 2, "STK"))
            .await;
        assert_eq!(bot.gateway.call_count(), 1);
    }

    #[tokio::test]
    async fn rule_content_joins_the_tail_arguments() {
        let bot = TestBot::new();
        rules_admin::setsres(
            &bot.state,
            &owner_msg("setsres", &["STK", "1", "0", "text", "hello", "there", "friend"]),
        )
        .await
        .unwrap();

        let rules = bot.state.sticker_rules.read().await;
        assert_eq!(rules.get("STK").unwrap().content, "hello there friend");
    }

    #[tokio::test]
    async fn delsres_removes_the_rule_everywhere() {
        let bot = TestBot::new();
        rules_admin::setsres(
            &bot.state,
            &owner_msg("setsres", &["STK", "1", "0", "sticker", "RSP"]),
        )
        .await
        .unwrap();
        bot.gateway.clear();

        rules_admin::delsres(&bot.state, &owner_msg("delsres", &["STK"]))
            .await
            .unwrap();
        assert_eq!(bot.gateway.texts(), vec!["Entry deleted".to_string()]);
        assert!(bot.state.sticker_rules.read().await.is_empty());
        let stored = bot.store.get_all(collections::STICKER_RESPONSE).await.unwrap();
        assert!(stored.is_empty());

        // Deleting again is not an error.
        bot.gateway.clear();
        rules_admin::delsres(&bot.state, &owner_msg("delsres", &["STK"]))
            .await
            .unwrap();
        assert_eq!(bot.gateway.texts(), vec!["Entry deleted".to_string()]);
    }

    #[tokio::test]
    async fn delsres_without_a_key_is_usage() {
        let bot = TestBot::new();
        let err = rules_admin::delsres(&bot.state, &owner_msg("delsres", &[]))
            .await
            .unwrap_err();
        assert_eq!(err, BotError::Usage("Usage: /delsres <sticker_id>"));
    }

    #[tokio::test]
    async fn lssres_lists_rules_or_an_empty_set() {
        let bot = TestBot::new();
        rules_admin::lssres(&bot.state, &owner_msg("lssres", &[]))
            .await
            .unwrap();
        assert_eq!(bot.gateway.texts(), vec!["{}".to_string()]);

        rules_admin::setsres(
            &bot.state,
            &owner_msg("setsres", &["A", "1", "0", "text", "hi"]),
        )
        .await
        .unwrap();
        rules_admin::setsres(
            &bot.state,
            &owner_msg("setsres", &["B", "0.5", "60", "sticker", "S"]),
        )
        .await
        .unwrap();
        bot.gateway.clear();
        rules_admin::lssres(&bot.state, &owner_msg("lssres", &[]))
            .await
            .unwrap();
        assert_eq!(
            bot.gateway.texts(),
            vec!["A: (1, 0, text, hi)\nB: (0.5, 60, sticker, S)\n".to_string()]
        );
    }

    // ── text rules ────────────────────────────────────────────────────────

    #[tokio::test]
    async fn settres_registers_live_and_persists() {
        let bot = TestBot::new();
        rules_admin::settres(
            &bot.state,
            &owner_msg("settres", &["he+llo", "1", "0", "text", "matched"]),
        )
        .await
        .unwrap();
        assert_eq!(bot.gateway.texts(), vec!["Entry updated".to_string()]);

        let stored = bot.store.get_all(collections::TEXT_RESPONSE).await.unwrap();
        assert_eq!(stored.get("he+llo"), Some(&json!([1.0, 0, "text", "matched"])));

        let chat = group_chat(-1001);
        let sender = test_user(7, "Nina");
        bot.gateway.clear();
        bot.dispatcher
            .handle_message(text_msg(&chat, &sender, 2, "heeello world"))
            .await;
        assert_eq!(bot.gateway.texts(), vec!["matched".to_string()]);
    }

    #[tokio::test]
    async fn settres_rejects_an_invalid_pattern_before_storing() {
        let bot = TestBot::new();
        let err = rules_admin::settres(
            &bot.state,
            &owner_msg("settres", &["[", "1", "0", "text", "matched"]),
        )
        .await
        .unwrap_err();
        assert_eq!(
            err,
            BotError::Usage(
                "Usage: /settres <regex> <chance> <cooldown> <response_type> <response_content> "
            )
        );
        let stored = bot.store.get_all(collections::TEXT_RESPONSE).await.unwrap();
        assert!(stored.is_empty());
    }

    #[tokio::test]
    async fn deltres_unregisters_the_pattern() {
        let bot = TestBot::new();
        rules_admin::settres(
            &bot.state,
            &owner_msg("settres", &["hi", "1", "0", "text", "hello"]),
        )
        .await
        .unwrap();
        rules_admin::deltres(&bot.state, &owner_msg("deltres", &["hi"]))
            .await
            .unwrap();

        assert!(bot.state.text_rules.first_match("hi").await.is_none());
        let stored = bot.store.get_all(collections::TEXT_RESPONSE).await.unwrap();
        assert!(stored.is_empty());
    }

    #[tokio::test]
    async fn lstres_lists_the_registered_patterns() {
        let bot = TestBot::new();
        rules_admin::settres(
            &bot.state,
            &owner_msg("settres", &["hi", "0.25", "30", "gif", "cat"]),
        )
        .await
        .unwrap();
        bot.gateway.clear();
        rules_admin::lstres(&bot.state, &owner_msg("lstres", &[]))
            .await
            .unwrap();
        assert_eq!(
            bot.gateway.texts(),
            vec!["hi: (0.25, 30, gif, cat)\n".to_string()]
        );
    }
}
