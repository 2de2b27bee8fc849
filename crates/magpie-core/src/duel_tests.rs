#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use crate::duel::{
        flavor_for, parse_callback, DiceRoller, DuelAction, DuelArena, MAX_ROLL_USER,
    };
    use crate::error::BotError;
    use crate::gateway::MemberPermissions;
    use crate::mocks::{FixedDice, GatewayCall, MockGateway, ScriptedDice};
    use crate::scheduler::Scheduler;
    use crate::types::{ChatId, DuelId, UserId, UserRef};

    const CHAT: ChatId = ChatId(-1001);

    fn user(id: i64, name: &str) -> UserRef {
        UserRef {
            id: UserId(id),
            first_name: name.to_string(),
            last_name: None,
            username: None,
        }
    }

    fn arena_with(dice: Arc<dyn DiceRoller>) -> (DuelArena, MockGateway) {
        let gateway = MockGateway::new();
        let (jobs, actor) = Scheduler::new();
        tokio::spawn(actor.run());
        let arena = DuelArena::new(Arc::new(gateway.clone()), dice, jobs);
        (arena, gateway)
    }

    async fn settle() {
        for _ in 0..32 {
            tokio::task::yield_now().await;
        }
    }

    /// Advances past one round interval and lets the round job run.
    async fn round() {
        tokio::time::advance(Duration::from_secs(5)).await;
        settle().await;
    }

    // ── rounds and conclusions ────────────────────────────────────────────

    #[tokio::test(start_paused = true)]
    async fn even_rounds_leave_both_at_full_hp() {
        let (arena, gateway) = arena_with(Arc::new(FixedDice(50)));
        let kirito = user(1, "Kirito");
        let asuna = user(2, "Asuna");
        let id = arena
            .propose(CHAT, kirito, asuna.clone(), false)
            .await
            .unwrap();
        arena.accept(id, &asuna).await.unwrap();
        settle().await;

        for _ in 0..3 {
            round().await;
        }

        let texts = gateway.texts();
        // challenge, begin edit, then three identical stand-offs
        assert_eq!(texts.len(), 5);
        for (i, text) in texts[2..].iter().enumerate() {
            let expected = format!(
                "第{}回合：Kirito 掷出 50，Asuna 掷出 50。\n两人拳脚相撞，不分上下。\nKirito：100 HP | Asuna：100 HP",
                i + 1
            );
            assert_eq!(text, &expected);
        }
        assert!(texts.iter().all(|text| !text.contains("倒下")));
    }

    #[tokio::test(start_paused = true)]
    async fn one_sided_rolls_conclude_the_duel() {
        let (arena, gateway) = arena_with(Arc::new(ScriptedDice::new(&[100, 1, 100, 1], 50)));
        let kirito = user(1, "Kirito");
        let asuna = user(2, "Asuna");
        let id = arena
            .propose(CHAT, kirito, asuna.clone(), false)
            .await
            .unwrap();
        arena.accept(id, &asuna).await.unwrap();
        settle().await;

        round().await;
        round().await;

        let texts = gateway.texts();
        assert!(texts
            .iter()
            .any(|text| text.contains("Kirito触发了必杀一击，造成 99 点伤害！")));
        assert!(texts
            .iter()
            .any(|text| text.contains("Kirito：100 HP | Asuna：1 HP")));
        assert!(texts.iter().any(|text| text.contains("Asuna：-98 HP")));
        assert_eq!(texts.last().unwrap(), "Asuna 倒下了！决斗结束。");

        // a plain duel never restricts anyone
        assert!(gateway
            .calls()
            .iter()
            .all(|call| !matches!(call, GatewayCall::Restrict { .. })));

        // the session is gone and rounds stop
        let before = gateway.call_count();
        round().await;
        assert_eq!(gateway.call_count(), before);
        let err = arena.accept(id, &asuna).await.unwrap_err();
        assert!(matches!(err, BotError::NotFound(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn reserved_account_always_rolls_max() {
        let (arena, gateway) = arena_with(Arc::new(FixedDice(1)));
        let kirito = user(1, "Kirito");
        let anna = UserRef {
            id: MAX_ROLL_USER,
            first_name: "Anna".to_string(),
            last_name: None,
            username: None,
        };
        let id = arena
            .propose(CHAT, kirito, anna.clone(), false)
            .await
            .unwrap();
        arena.accept(id, &anna).await.unwrap();
        settle().await;
        round().await;

        let texts = gateway.texts();
        let report = texts.last().unwrap();
        assert!(report.contains("Kirito 掷出 1，Anna 掷出 100"));
        assert!(report.contains("Kirito：1 HP | Anna：100 HP"));
    }

    // ── challenge gate ────────────────────────────────────────────────────

    #[tokio::test(start_paused = true)]
    async fn only_the_target_may_accept() {
        let (arena, gateway) = arena_with(Arc::new(FixedDice(50)));
        let kirito = user(1, "Kirito");
        let asuna = user(2, "Asuna");
        let klein = user(3, "Klein");
        let id = arena
            .propose(CHAT, kirito.clone(), asuna, false)
            .await
            .unwrap();

        let by_challenger = arena.accept(id, &kirito).await.unwrap_err();
        assert!(matches!(
            by_challenger,
            BotError::Permission(refusal) if refusal.message == "只有被挑战的人才能接受决斗哦"
        ));
        let by_stranger = arena.accept(id, &klein).await.unwrap_err();
        assert!(matches!(
            by_stranger,
            BotError::Permission(refusal) if refusal.message == "你不是这场决斗的当事人哦"
        ));

        // the challenge message was never touched
        assert_eq!(gateway.call_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn either_party_may_decline_a_proposal() {
        let (arena, gateway) = arena_with(Arc::new(FixedDice(50)));
        let kirito = user(1, "Kirito");
        let asuna = user(2, "Asuna");
        let klein = user(3, "Klein");
        let id = arena
            .propose(CHAT, kirito.clone(), asuna.clone(), false)
            .await
            .unwrap();

        let by_stranger = arena.decline(id, &klein).await.unwrap_err();
        assert!(matches!(by_stranger, BotError::Permission(_)));

        arena.decline(id, &kirito).await.unwrap();
        assert_eq!(gateway.texts().last().unwrap(), "Kirito 拒绝了这场决斗。");

        let err = arena.accept(id, &asuna).await.unwrap_err();
        assert!(matches!(err, BotError::NotFound(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn double_accept_does_not_restart_the_duel() {
        let (arena, gateway) = arena_with(Arc::new(FixedDice(50)));
        let kirito = user(1, "Kirito");
        let asuna = user(2, "Asuna");
        let id = arena
            .propose(CHAT, kirito, asuna.clone(), false)
            .await
            .unwrap();
        arena.accept(id, &asuna).await.unwrap();
        settle().await;
        let after_first = gateway.call_count();

        arena.accept(id, &asuna).await.unwrap();
        settle().await;
        assert_eq!(gateway.call_count(), after_first);
    }

    #[tokio::test(start_paused = true)]
    async fn unaccepted_challenge_expires() {
        let (arena, gateway) = arena_with(Arc::new(FixedDice(50)));
        let kirito = user(1, "Kirito");
        let asuna = user(2, "Asuna");
        let id = arena
            .propose(CHAT, kirito, asuna.clone(), false)
            .await
            .unwrap();

        tokio::time::advance(Duration::from_secs(300)).await;
        settle().await;

        assert_eq!(gateway.texts().last().unwrap(), "决斗邀请已过期。");
        let err = arena.accept(id, &asuna).await.unwrap_err();
        assert!(matches!(err, BotError::NotFound(_)));
    }

    // ── lethal mode ───────────────────────────────────────────────────────

    #[tokio::test(start_paused = true)]
    async fn lethal_loss_restricts_the_loser_and_arms_a_cooldown() {
        let (arena, gateway) = arena_with(Arc::new(ScriptedDice::new(&[100, 1, 100, 1], 50)));
        let kirito = user(1, "Kirito");
        let asuna = user(2, "Asuna");
        let id = arena
            .propose(CHAT, kirito.clone(), asuna.clone(), true)
            .await
            .unwrap();
        arena.accept(id, &asuna).await.unwrap();
        settle().await;
        round().await;
        round().await;

        let restricts: Vec<_> = gateway
            .calls()
            .into_iter()
            .filter(|call| matches!(call, GatewayCall::Restrict { .. }))
            .collect();
        assert_eq!(
            restricts,
            vec![GatewayCall::Restrict {
                chat: CHAT,
                user: UserId(2),
                perms: MemberPermissions::none(),
                until: Some(Duration::from_secs(600)),
            }]
        );

        // the winner cannot start another lethal duel right away
        let second = arena
            .propose(CHAT, kirito.clone(), asuna.clone(), true)
            .await
            .unwrap();
        arena.accept(second, &asuna).await.unwrap();
        settle().await;
        assert_eq!(
            gateway.texts().last().unwrap(),
            "challenger on cooldown, this duel is void"
        );
        let err = arena.accept(second, &asuna).await.unwrap_err();
        assert!(matches!(err, BotError::NotFound(_)));

        // the token expires after twelve hours
        tokio::time::advance(Duration::from_secs(12 * 3600)).await;
        settle().await;
        let third = arena
            .propose(CHAT, kirito, asuna.clone(), true)
            .await
            .unwrap();
        arena.accept(third, &asuna).await.unwrap();
        settle().await;
        assert!(gateway.texts().last().unwrap().contains("应战了"));
    }

    // ── static tables ─────────────────────────────────────────────────────

    #[test]
    fn flavor_bands_pick_by_magnitude() {
        assert_eq!(flavor_for(1), flavor_for(2));
        assert_ne!(flavor_for(2), flavor_for(3));
        assert_eq!(flavor_for(3), flavor_for(6));
        assert_ne!(flavor_for(6), flavor_for(7));
        assert_eq!(flavor_for(7), flavor_for(13));
        assert_eq!(flavor_for(14), flavor_for(25));
        assert_eq!(flavor_for(26), flavor_for(45));
        assert_eq!(flavor_for(46), flavor_for(70));
        assert_eq!(flavor_for(71), flavor_for(98));
        assert_eq!(flavor_for(99), "触发了必杀一击");
    }

    #[test]
    fn callback_data_parses_verbs_and_ids() {
        assert_eq!(
            parse_callback("duel_ok:3"),
            Some((DuelAction::Accept, DuelId(3)))
        );
        assert_eq!(
            parse_callback("duel_no:12"),
            Some((DuelAction::Decline, DuelId(12)))
        );
        for junk in ["", "duel_ok", "duel_hm:3", "duel_ok:x"] {
            assert_eq!(parse_callback(junk), None);
        }
    }
}
