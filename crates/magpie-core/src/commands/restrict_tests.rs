#[cfg(test)]
mod tests {
    use std::time::Duration;

    use crate::commands::restrict;
    use crate::dispatch::{STICKER_JAIL, STICKER_REFUSE, STICKER_RELEASE};
    use crate::error::{BotError, Refusal};
    use crate::events::IncomingMessage;
    use crate::gateway::MemberPermissions;
    use crate::mocks::{command_msg, group_chat, replied, test_user, GatewayCall, TestBot};
    use crate::types::{ChatId, MemberInfo, MemberStatus, MessageId, UserId};

    const CHAT: ChatId = ChatId(-1001);

    async fn settle() {
        for _ in 0..32 {
            tokio::task::yield_now().await;
        }
    }

    fn ban_msg(command: &str, args: &[&str]) -> IncomingMessage {
        let chat = group_chat(-1001);
        let sender = test_user(7, "Nina");
        let target = test_user(9, "Tanya");
        let mut msg = command_msg(&chat, &sender, 2, command, args);
        msg.reply_to = Some(replied(CHAT, 1, &target));
        msg
    }

    fn releases(bot: &TestBot) -> usize {
        bot.gateway
            .calls()
            .iter()
            .filter(|call| {
                matches!(call, GatewayCall::SendMarkdown { text, .. } if text.contains("刑满释放"))
            })
            .count()
    }

    // ── bans ──────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn ban_requires_a_reply() {
        let bot = TestBot::new();
        let chat = group_chat(-1001);
        let sender = test_user(7, "Nina");
        let msg = command_msg(&chat, &sender, 1, "ban", &[]);

        let err = restrict::ban(&bot.state, &msg).await.unwrap_err();
        assert_eq!(
            err,
            BotError::Usage("Usage:\n\nReplying to the user you wish to ban.\n/ban [Ban Time]\n")
        );
    }

    #[tokio::test]
    async fn ban_refuses_an_admin_target() {
        let bot = TestBot::new();
        bot.gateway.set_member(
            CHAT,
            MemberInfo {
                user: test_user(9, "Tanya"),
                status: MemberStatus::Administrator,
                can_restrict: true,
            },
        );

        let err = restrict::ban(&bot.state, &ban_msg("ban", &[])).await.unwrap_err();
        assert_eq!(
            err,
            BotError::Permission(Refusal {
                message: "呃呃，我没有处理管理员的权限啊！",
                sticker: Some(STICKER_REFUSE),
                sticker_as_reply: false,
            })
        );
        assert_eq!(bot.gateway.call_count(), 0);
    }

    #[tokio::test]
    async fn ban_mutes_and_announces() {
        let bot = TestBot::new();
        bot.gateway.set_member(
            CHAT,
            MemberInfo {
                user: test_user(9, "Tanya"),
                status: MemberStatus::Member,
                can_restrict: false,
            },
        );

        restrict::ban(&bot.state, &ban_msg("ban", &[])).await.unwrap();
        assert_eq!(
            bot.gateway.calls(),
            vec![
                GatewayCall::Restrict {
                    chat: CHAT,
                    user: UserId(9),
                    perms: MemberPermissions::none(),
                    until: None,
                },
                GatewayCall::ReplyMarkdown {
                    chat: CHAT,
                    to: MessageId(2),
                    text: "[Tanya ](tg://user?id=9) 跟我乖乖到小黑屋里走一趟吧".to_string(),
                },
                GatewayCall::SendSticker {
                    chat: CHAT,
                    file_id: STICKER_JAIL.to_string(),
                },
            ]
        );
    }

    #[tokio::test]
    async fn banpic_blocks_media_only() {
        let bot = TestBot::new();

        restrict::banpic(&bot.state, &ban_msg("banpic", &[])).await.unwrap();
        let calls = bot.gateway.calls();
        assert_eq!(
            calls[0],
            GatewayCall::Restrict {
                chat: CHAT,
                user: UserId(9),
                perms: MemberPermissions::text_only(),
                until: None,
            }
        );
        assert!(matches!(
            &calls[1],
            GatewayCall::ReplyMarkdown { text, .. } if text.ends_with("把头伸过来，我给你加个不能发图的buff")
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn timed_ban_schedules_the_release() {
        let bot = TestBot::new();

        restrict::ban(&bot.state, &ban_msg("ban", &["10m"])).await.unwrap();
        assert_eq!(bot.gateway.call_count(), 3);
        bot.gateway.clear();

        tokio::time::advance(Duration::from_secs(600)).await;
        settle().await;
        assert_eq!(
            bot.gateway.calls(),
            vec![
                GatewayCall::Restrict {
                    chat: CHAT,
                    user: UserId(9),
                    perms: MemberPermissions::all(),
                    until: None,
                },
                GatewayCall::SendMarkdown {
                    chat: CHAT,
                    text: "[user9 ](tg://user?id=9) 刑满释放了！".to_string(),
                },
                GatewayCall::SendSticker {
                    chat: CHAT,
                    file_id: STICKER_RELEASE.to_string(),
                },
            ]
        );
    }

    #[tokio::test]
    async fn ban_with_a_bad_duration_still_bans_but_reports_usage() {
        let bot = TestBot::new();

        let err = restrict::ban(&bot.state, &ban_msg("ban", &["forever"]))
            .await
            .unwrap_err();
        assert!(matches!(err, BotError::Usage(_)));
        assert_eq!(bot.gateway.call_count(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn rebanning_replaces_the_release_schedule() {
        let bot = TestBot::new();

        restrict::ban(&bot.state, &ban_msg("ban", &["10s"])).await.unwrap();
        restrict::ban(&bot.state, &ban_msg("ban", &["100s"])).await.unwrap();

        tokio::time::advance(Duration::from_secs(10)).await;
        settle().await;
        assert_eq!(releases(&bot), 0);

        tokio::time::advance(Duration::from_secs(90)).await;
        settle().await;
        assert_eq!(releases(&bot), 1);
    }

    // ── releases ──────────────────────────────────────────────────────────

    #[tokio::test]
    async fn unban_requires_a_restricted_target() {
        let bot = TestBot::new();

        let err = restrict::unban(&bot.state, &ban_msg("unban", &[])).await.unwrap_err();
        assert_eq!(
            err,
            BotError::Permission(Refusal {
                message: "呃呃，他就不在小黑屋里面啊",
                sticker: Some(STICKER_REFUSE),
                sticker_as_reply: false,
            })
        );
    }

    #[tokio::test(start_paused = true)]
    async fn unban_releases_and_cancels_the_timer() {
        let bot = TestBot::new();
        restrict::ban(&bot.state, &ban_msg("ban", &["1h"])).await.unwrap();

        bot.gateway.set_member(
            CHAT,
            MemberInfo {
                user: test_user(9, "Tanya"),
                status: MemberStatus::Restricted,
                can_restrict: false,
            },
        );
        bot.gateway.clear();
        restrict::unban(&bot.state, &ban_msg("unban", &[])).await.unwrap();
        assert_eq!(
            bot.gateway.calls(),
            vec![
                GatewayCall::Restrict {
                    chat: CHAT,
                    user: UserId(9),
                    perms: MemberPermissions::all(),
                    until: None,
                },
                GatewayCall::ReplyMarkdown {
                    chat: CHAT,
                    to: MessageId(2),
                    text: "[Tanya ](tg://user?id=9) 从小黑屋里放出来了！".to_string(),
                },
                GatewayCall::SendSticker {
                    chat: CHAT,
                    file_id: STICKER_RELEASE.to_string(),
                },
            ]
        );

        bot.gateway.clear();
        tokio::time::advance(Duration::from_secs(3600)).await;
        settle().await;
        assert_eq!(bot.gateway.call_count(), 0);
    }
}
