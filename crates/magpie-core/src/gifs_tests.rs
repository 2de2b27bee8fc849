#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use crate::error::BotError;
    use crate::gifs::GifCache;
    use crate::mocks::{GatewayCall, MockGateway, MockSearch};
    use crate::types::{ChatId, MessageId};

    const CHAT: ChatId = ChatId(-500);

    fn cache() -> (GifCache, MockGateway, MockSearch) {
        let gateway = MockGateway::new();
        let search = MockSearch::new();
        let cache = GifCache::new(Arc::new(gateway.clone()), Arc::new(search.clone()));
        (cache, gateway, search)
    }

    fn sent_urls(gateway: &MockGateway) -> Vec<String> {
        gateway
            .calls()
            .into_iter()
            .filter_map(|call| match call {
                GatewayCall::SendAnimation { url, .. } => Some(url),
                _ => None,
            })
            .collect()
    }

    // ── dedup ─────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn consecutive_sends_use_distinct_urls() {
        let (cache, gateway, search) = cache();
        search.push_results(&["https://g/a.gif", "https://g/b.gif"]);

        cache.fetch_and_send(CHAT, "cat", None).await.unwrap();
        cache.fetch_and_send(CHAT, "cat", None).await.unwrap();

        assert_eq!(sent_urls(&gateway), vec!["https://g/a.gif", "https://g/b.gif"]);
        assert_eq!(search.query_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn sent_urls_stay_blocked_in_later_queries() {
        let (cache, gateway, search) = cache();
        search.push_results(&["https://g/a.gif"]);
        cache.fetch_and_send(CHAT, "cat", None).await.unwrap();

        tokio::time::advance(Duration::from_secs(700)).await;
        search.push_results(&["https://g/a.gif", "https://g/b.gif"]);
        cache.fetch_and_send(CHAT, "cat", None).await.unwrap();

        assert_eq!(sent_urls(&gateway), vec!["https://g/a.gif", "https://g/b.gif"]);
    }

    #[tokio::test(start_paused = true)]
    async fn blocked_urls_free_up_after_expiry() {
        let (cache, gateway, search) = cache();
        search.push_results(&["https://g/a.gif"]);
        cache.fetch_and_send(CHAT, "cat", None).await.unwrap();

        tokio::time::advance(Duration::from_secs(1800)).await;
        search.push_results(&["https://g/a.gif"]);
        cache.fetch_and_send(CHAT, "cat", None).await.unwrap();

        assert_eq!(sent_urls(&gateway), vec!["https://g/a.gif", "https://g/a.gif"]);
    }

    #[tokio::test]
    async fn sent_sets_are_scoped_per_chat() {
        let (cache, gateway, search) = cache();
        search.push_results(&["https://g/a.gif"]);
        search.push_results(&["https://g/a.gif"]);

        cache.fetch_and_send(CHAT, "cat", None).await.unwrap();
        cache.fetch_and_send(ChatId(-501), "cat", None).await.unwrap();

        assert_eq!(sent_urls(&gateway), vec!["https://g/a.gif", "https://g/a.gif"]);
    }

    // ── result queues ─────────────────────────────────────────────────────

    #[tokio::test(start_paused = true)]
    async fn queue_survives_within_its_ttl() {
        let (cache, gateway, search) = cache();
        search.push_results(&["https://g/a.gif", "https://g/b.gif"]);

        cache.fetch_and_send(CHAT, "cat", None).await.unwrap();
        tokio::time::advance(Duration::from_secs(599)).await;
        cache.fetch_and_send(CHAT, "cat", None).await.unwrap();

        assert_eq!(sent_urls(&gateway), vec!["https://g/a.gif", "https://g/b.gif"]);
        assert_eq!(search.query_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn idle_queue_is_dropped_and_requeried() {
        let (cache, gateway, search) = cache();
        search.push_results(&["https://g/a.gif", "https://g/b.gif"]);
        cache.fetch_and_send(CHAT, "cat", None).await.unwrap();

        tokio::time::advance(Duration::from_secs(600)).await;
        search.push_results(&["https://g/c.gif"]);
        cache.fetch_and_send(CHAT, "cat", None).await.unwrap();

        assert_eq!(sent_urls(&gateway), vec!["https://g/a.gif", "https://g/c.gif"]);
        assert_eq!(search.query_count(), 2);
    }

    // ── bounded retry ─────────────────────────────────────────────────────

    #[tokio::test]
    async fn two_empty_queries_abort_with_no_results() {
        let (cache, gateway, search) = cache();

        let err = cache.fetch_and_send(CHAT, "cat", None).await.unwrap_err();

        assert!(matches!(err, BotError::NoResults(keyword) if keyword == "cat"));
        assert_eq!(search.query_count(), 2);
        assert_eq!(gateway.call_count(), 0);
    }

    #[tokio::test]
    async fn second_query_rescues_a_dry_first_one() {
        let (cache, gateway, search) = cache();
        search.push_results(&[]);
        search.push_results(&["https://g/b.gif"]);

        cache.fetch_and_send(CHAT, "cat", None).await.unwrap();

        assert_eq!(sent_urls(&gateway), vec!["https://g/b.gif"]);
        assert_eq!(search.query_count(), 2);
    }

    #[tokio::test]
    async fn provider_errors_propagate() {
        let (cache, _, search) = cache();
        search.push_error("tenor down");

        let err = cache.fetch_and_send(CHAT, "cat", None).await.unwrap_err();
        assert!(matches!(err, BotError::Search(_)));
    }

    // ── send shape ────────────────────────────────────────────────────────

    #[tokio::test]
    async fn upload_indicator_precedes_the_send() {
        let (cache, gateway, search) = cache();
        search.push_results(&["https://g/a.gif"]);

        cache
            .fetch_and_send(CHAT, "cat", Some(MessageId(7)))
            .await
            .unwrap();

        assert_eq!(
            gateway.calls(),
            vec![
                GatewayCall::NotifyUploading { chat: CHAT },
                GatewayCall::SendAnimation {
                    chat: CHAT,
                    url: "https://g/a.gif".into(),
                    reply_to: Some(MessageId(7)),
                },
            ]
        );
    }
}
