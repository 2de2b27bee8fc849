#[cfg(test)]
mod tests {
    use crate::commands::duel;
    use crate::error::BotError;
    use crate::gateway::Button;
    use crate::mocks::{command_msg, group_chat, replied, test_user, GatewayCall, TestBot};
    use crate::types::ChatId;

    #[tokio::test]
    async fn challenge_requires_a_reply() {
        let bot = TestBot::new();
        let chat = group_chat(-1001);
        let sender = test_user(7, "Nina");
        let msg = command_msg(&chat, &sender, 1, "duel", &[]);

        let err = duel::challenge(&bot.state, &msg).await.unwrap_err();
        assert_eq!(
            err,
            BotError::Usage("Usage:\n\nReplying to the user you wish to duel.\n/duel [lethal]\n")
        );
    }

    #[tokio::test]
    async fn challenge_posts_the_prompt_in_the_group() {
        let bot = TestBot::new();
        let chat = group_chat(-1001);
        let sender = test_user(7, "Nina");
        let target = test_user(9, "Tanya");
        let mut msg = command_msg(&chat, &sender, 2, "duel", &[]);
        msg.reply_to = Some(replied(ChatId(-1001), 1, &target));

        duel::challenge(&bot.state, &msg).await.unwrap();
        assert_eq!(
            bot.gateway.calls(),
            vec![GatewayCall::SendButtons {
                chat: ChatId(-1001),
                text: "Nina 向 Tanya 发起了决斗！".to_string(),
                keyboard: vec![vec![
                    Button::new("应战", "duel_ok:1"),
                    Button::new("拒绝", "duel_no:1"),
                ]],
            }]
        );
    }

    #[tokio::test]
    async fn lethal_flag_changes_the_challenge() {
        let bot = TestBot::new();
        let chat = group_chat(-1001);
        let sender = test_user(7, "Nina");
        let target = test_user(9, "Tanya");
        let mut msg = command_msg(&chat, &sender, 2, "duel", &["lethal"]);
        msg.reply_to = Some(replied(ChatId(-1001), 1, &target));

        duel::challenge(&bot.state, &msg).await.unwrap();
        assert_eq!(
            bot.gateway.texts(),
            vec!["Nina 向 Tanya 发起了生死决斗！".to_string()]
        );
    }

    #[tokio::test]
    async fn other_arguments_stay_non_lethal() {
        let bot = TestBot::new();
        let chat = group_chat(-1001);
        let sender = test_user(7, "Nina");
        let target = test_user(9, "Tanya");
        let mut msg = command_msg(&chat, &sender, 2, "duel", &["soon"]);
        msg.reply_to = Some(replied(ChatId(-1001), 1, &target));

        duel::challenge(&bot.state, &msg).await.unwrap();
        assert_eq!(
            bot.gateway.texts(),
            vec!["Nina 向 Tanya 发起了决斗！".to_string()]
        );
    }
}
