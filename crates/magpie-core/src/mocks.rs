//! In-memory mock collaborators for unit testing without a live chat
//! platform. Enabled with the `test-support` feature.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use crate::config::{BotConfig, WatchesConfig};
use crate::dispatch::Dispatcher;
use crate::error::{BotError, Result};
use crate::events::{IncomingMessage, MessageBody, RepliedMessage};
use crate::gateway::{
    Gateway, Keyboard, MemberPermissions, SearchProvider, StockProvider, StockQuote,
};
use crate::scheduler::Scheduler;
use crate::state::BotState;
use crate::store::MemoryStore;
use crate::types::{
    ChatId, ChatKind, ChatRef, MemberInfo, MemberStatus, MessageId, UserId, UserRef,
};

/// One captured outbound operation, in call order.
#[derive(Debug, Clone, PartialEq)]
pub enum GatewayCall {
    SendText {
        chat: ChatId,
        text: String,
    },
    SendMarkdown {
        chat: ChatId,
        text: String,
    },
    ReplyText {
        chat: ChatId,
        to: MessageId,
        text: String,
    },
    ReplyMarkdown {
        chat: ChatId,
        to: MessageId,
        text: String,
    },
    SendSticker {
        chat: ChatId,
        file_id: String,
    },
    ReplySticker {
        chat: ChatId,
        to: MessageId,
        file_id: String,
    },
    SendAnimation {
        chat: ChatId,
        url: String,
        reply_to: Option<MessageId>,
    },
    NotifyUploading {
        chat: ChatId,
    },
    SendButtons {
        chat: ChatId,
        text: String,
        keyboard: Keyboard,
    },
    EditText {
        chat: ChatId,
        message: MessageId,
        text: String,
    },
    EditButtons {
        chat: ChatId,
        message: MessageId,
        text: String,
        keyboard: Keyboard,
    },
    Forward {
        to: ChatId,
        from: ChatId,
        message: MessageId,
    },
    Pin {
        chat: ChatId,
        message: MessageId,
        notify: bool,
    },
    Unpin {
        chat: ChatId,
    },
    SetTitle {
        chat: ChatId,
        title: String,
    },
    SetPhoto {
        chat: ChatId,
        file_id: String,
    },
    Restrict {
        chat: ChatId,
        user: UserId,
        perms: MemberPermissions,
        until: Option<Duration>,
    },
    Kick {
        chat: ChatId,
        user: UserId,
    },
}

/// Recording [`Gateway`] that never touches the network.
///
/// Sends return incrementing message ids starting at 1000. Member
/// lookups answer from entries installed with [`set_member`], falling
/// back to an unprivileged plain member, so only the privileged side
/// of a test needs setup. Member counts must be scripted per chat.
///
/// [`set_member`]: MockGateway::set_member
#[derive(Clone)]
pub struct MockGateway {
    calls: Arc<Mutex<Vec<GatewayCall>>>,
    next_message_id: Arc<AtomicI32>,
    members: Arc<Mutex<HashMap<(ChatId, UserId), std::result::Result<MemberInfo, String>>>>,
    counts: Arc<Mutex<HashMap<ChatId, VecDeque<std::result::Result<u32, String>>>>>,
    titles: Arc<Mutex<HashMap<ChatId, String>>>,
    outbound_error: Arc<Mutex<Option<String>>>,
}

impl MockGateway {
    pub fn new() -> Self {
        Self {
            calls: Arc::new(Mutex::new(Vec::new())),
            next_message_id: Arc::new(AtomicI32::new(1000)),
            members: Arc::new(Mutex::new(HashMap::new())),
            counts: Arc::new(Mutex::new(HashMap::new())),
            titles: Arc::new(Mutex::new(HashMap::new())),
            outbound_error: Arc::new(Mutex::new(None)),
        }
    }

    /// Snapshot of every recorded outbound call, oldest first.
    pub fn calls(&self) -> Vec<GatewayCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// Just the text payloads of recorded sends and edits, in order.
    pub fn texts(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter_map(|call| match call {
                GatewayCall::SendText { text, .. }
                | GatewayCall::SendMarkdown { text, .. }
                | GatewayCall::ReplyText { text, .. }
                | GatewayCall::ReplyMarkdown { text, .. }
                | GatewayCall::SendButtons { text, .. }
                | GatewayCall::EditText { text, .. }
                | GatewayCall::EditButtons { text, .. } => Some(text.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn clear(&self) {
        self.calls.lock().unwrap().clear();
    }

    /// Installs a member record for `(chat, info.user.id)` lookups.
    pub fn set_member(&self, chat: ChatId, info: MemberInfo) {
        self.members
            .lock()
            .unwrap()
            .insert((chat, info.user.id), Ok(info));
    }

    /// Makes member lookups for this pair fail with a gateway error.
    pub fn fail_member(&self, chat: ChatId, user: UserId, message: &str) {
        self.members
            .lock()
            .unwrap()
            .insert((chat, user), Err(message.to_string()));
    }

    /// Queues one member count answer for `chat`. Counts pop in FIFO
    /// order, one per lookup.
    pub fn push_count(&self, chat: ChatId, count: u32) {
        self.counts
            .lock()
            .unwrap()
            .entry(chat)
            .or_default()
            .push_back(Ok(count));
    }

    pub fn push_count_error(&self, chat: ChatId, message: &str) {
        self.counts
            .lock()
            .unwrap()
            .entry(chat)
            .or_default()
            .push_back(Err(message.to_string()));
    }

    /// Installs the title reported for `chat`. Without one, lookups
    /// answer with a synthesized placeholder.
    pub fn install_title(&self, chat: ChatId, title: &str) {
        self.titles.lock().unwrap().insert(chat, title.to_string());
    }

    /// All subsequent outbound calls fail with this gateway error and
    /// are not recorded.
    pub fn fail_outbound(&self, message: &str) {
        *self.outbound_error.lock().unwrap() = Some(message.to_string());
    }

    pub fn restore_outbound(&self) {
        *self.outbound_error.lock().unwrap() = None;
    }

    fn record(&self, call: GatewayCall) -> Result<MessageId> {
        if let Some(message) = self.outbound_error.lock().unwrap().clone() {
            return Err(BotError::Gateway(message));
        }
        self.calls.lock().unwrap().push(call);
        Ok(MessageId(self.next_message_id.fetch_add(1, Ordering::SeqCst)))
    }
}

impl Default for MockGateway {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Gateway for MockGateway {
    async fn send_text(&self, chat: ChatId, text: &str) -> Result<MessageId> {
        self.record(GatewayCall::SendText {
            chat,
            text: text.to_string(),
        })
    }

    async fn send_markdown(&self, chat: ChatId, text: &str) -> Result<MessageId> {
        self.record(GatewayCall::SendMarkdown {
            chat,
            text: text.to_string(),
        })
    }

    async fn reply_text(&self, chat: ChatId, to: MessageId, text: &str) -> Result<MessageId> {
        self.record(GatewayCall::ReplyText {
            chat,
            to,
            text: text.to_string(),
        })
    }

    async fn reply_markdown(&self, chat: ChatId, to: MessageId, text: &str) -> Result<MessageId> {
        self.record(GatewayCall::ReplyMarkdown {
            chat,
            to,
            text: text.to_string(),
        })
    }

    async fn send_sticker(&self, chat: ChatId, file_id: &str) -> Result<MessageId> {
        self.record(GatewayCall::SendSticker {
            chat,
            file_id: file_id.to_string(),
        })
    }

    async fn reply_sticker(
        &self,
        chat: ChatId,
        to: MessageId,
        file_id: &str,
    ) -> Result<MessageId> {
        self.record(GatewayCall::ReplySticker {
            chat,
            to,
            file_id: file_id.to_string(),
        })
    }

    async fn send_animation(
        &self,
        chat: ChatId,
        url: &str,
        reply_to: Option<MessageId>,
    ) -> Result<MessageId> {
        self.record(GatewayCall::SendAnimation {
            chat,
            url: url.to_string(),
            reply_to,
        })
    }

    async fn notify_uploading(&self, chat: ChatId) -> Result<()> {
        self.record(GatewayCall::NotifyUploading { chat }).map(|_| ())
    }

    async fn send_buttons(
        &self,
        chat: ChatId,
        text: &str,
        keyboard: Keyboard,
    ) -> Result<MessageId> {
        self.record(GatewayCall::SendButtons {
            chat,
            text: text.to_string(),
            keyboard,
        })
    }

    async fn edit_text(&self, chat: ChatId, message: MessageId, text: &str) -> Result<()> {
        self.record(GatewayCall::EditText {
            chat,
            message,
            text: text.to_string(),
        })
        .map(|_| ())
    }

    async fn edit_buttons(
        &self,
        chat: ChatId,
        message: MessageId,
        text: &str,
        keyboard: Keyboard,
    ) -> Result<()> {
        self.record(GatewayCall::EditButtons {
            chat,
            message,
            text: text.to_string(),
            keyboard,
        })
        .map(|_| ())
    }

    async fn forward(&self, to: ChatId, from: ChatId, message: MessageId) -> Result<MessageId> {
        self.record(GatewayCall::Forward { to, from, message })
    }

    async fn pin(&self, chat: ChatId, message: MessageId, notify: bool) -> Result<()> {
        self.record(GatewayCall::Pin {
            chat,
            message,
            notify,
        })
        .map(|_| ())
    }

    async fn unpin(&self, chat: ChatId) -> Result<()> {
        self.record(GatewayCall::Unpin { chat }).map(|_| ())
    }

    async fn set_title(&self, chat: ChatId, title: &str) -> Result<()> {
        self.record(GatewayCall::SetTitle {
            chat,
            title: title.to_string(),
        })
        .map(|_| ())
    }

    async fn set_photo(&self, chat: ChatId, file_id: &str) -> Result<()> {
        self.record(GatewayCall::SetPhoto {
            chat,
            file_id: file_id.to_string(),
        })
        .map(|_| ())
    }

    async fn restrict(
        &self,
        chat: ChatId,
        user: UserId,
        perms: MemberPermissions,
        until: Option<Duration>,
    ) -> Result<()> {
        self.record(GatewayCall::Restrict {
            chat,
            user,
            perms,
            until,
        })
        .map(|_| ())
    }

    async fn kick(&self, chat: ChatId, user: UserId) -> Result<()> {
        self.record(GatewayCall::Kick { chat, user }).map(|_| ())
    }

    async fn member(&self, chat: ChatId, user: UserId) -> Result<MemberInfo> {
        match self.members.lock().unwrap().get(&(chat, user)) {
            Some(Ok(info)) => Ok(info.clone()),
            Some(Err(message)) => Err(BotError::Gateway(message.clone())),
            None => Ok(MemberInfo {
                user: UserRef {
                    id: user,
                    first_name: format!("user{user}"),
                    last_name: None,
                    username: None,
                },
                status: MemberStatus::Member,
                can_restrict: false,
            }),
        }
    }

    async fn member_count(&self, chat: ChatId) -> Result<u32> {
        let popped = self
            .counts
            .lock()
            .unwrap()
            .get_mut(&chat)
            .and_then(|queue| queue.pop_front());
        match popped {
            Some(Ok(count)) => Ok(count),
            Some(Err(message)) => Err(BotError::Gateway(message)),
            None => Err(BotError::Gateway(format!(
                "no member count scripted for chat {chat}"
            ))),
        }
    }

    async fn chat_title(&self, chat: ChatId) -> Result<String> {
        Ok(self
            .titles
            .lock()
            .unwrap()
            .get(&chat)
            .cloned()
            .unwrap_or_else(|| format!("chat {chat}")))
    }
}

/// Scripted [`SearchProvider`]. Results pop in FIFO order; an empty
/// script answers every query with no results.
#[derive(Clone, Default)]
pub struct MockSearch {
    results: Arc<Mutex<VecDeque<std::result::Result<Vec<String>, String>>>>,
    queries: Arc<Mutex<Vec<String>>>,
}

impl MockSearch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_results(&self, urls: &[&str]) {
        self.results
            .lock()
            .unwrap()
            .push_back(Ok(urls.iter().map(|u| u.to_string()).collect()));
    }

    pub fn push_error(&self, message: &str) {
        self.results
            .lock()
            .unwrap()
            .push_back(Err(message.to_string()));
    }

    /// Keywords queried so far, oldest first.
    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }

    pub fn query_count(&self) -> usize {
        self.queries.lock().unwrap().len()
    }
}

#[async_trait]
impl SearchProvider for MockSearch {
    async fn search_gifs(&self, keyword: &str) -> Result<Vec<String>> {
        self.queries.lock().unwrap().push(keyword.to_string());
        match self.results.lock().unwrap().pop_front() {
            Some(Ok(urls)) => Ok(urls),
            Some(Err(message)) => Err(BotError::Search(message)),
            None => Ok(Vec::new()),
        }
    }
}

/// [`ChanceSource`](crate::responses::ChanceSource) returning the same
/// draw every time.
pub struct FixedChance(pub f64);

impl crate::responses::ChanceSource for FixedChance {
    fn draw(&self) -> f64 {
        self.0
    }
}

/// [`DiceRoller`](crate::duel::DiceRoller) returning the same roll
/// every time.
pub struct FixedDice(pub u32);

impl crate::duel::DiceRoller for FixedDice {
    fn roll(&self) -> u32 {
        self.0
    }
}

/// [`DiceRoller`](crate::duel::DiceRoller) popping scripted rolls in
/// FIFO order, then falling back to a fixed value.
pub struct ScriptedDice {
    rolls: Mutex<VecDeque<u32>>,
    fallback: u32,
}

impl ScriptedDice {
    pub fn new(rolls: &[u32], fallback: u32) -> Self {
        Self {
            rolls: Mutex::new(rolls.iter().copied().collect()),
            fallback,
        }
    }
}

impl crate::duel::DiceRoller for ScriptedDice {
    fn roll(&self) -> u32 {
        self.rolls
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(self.fallback)
    }
}

/// Scripted [`StockProvider`]. Quotes pop in FIFO order; an empty
/// script fails the lookup.
#[derive(Clone, Default)]
pub struct MockStocks {
    quotes: Arc<Mutex<VecDeque<std::result::Result<StockQuote, String>>>>,
    tickers: Arc<Mutex<Vec<String>>>,
}

impl MockStocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_quote(&self, quote: StockQuote) {
        self.quotes.lock().unwrap().push_back(Ok(quote));
    }

    pub fn push_error(&self, message: &str) {
        self.quotes
            .lock()
            .unwrap()
            .push_back(Err(message.to_string()));
    }

    pub fn tickers(&self) -> Vec<String> {
        self.tickers.lock().unwrap().clone()
    }
}

#[async_trait]
impl StockProvider for MockStocks {
    async fn last_trade(&self, ticker: &str) -> Result<StockQuote> {
        self.tickers.lock().unwrap().push(ticker.to_string());
        match self.quotes.lock().unwrap().pop_front() {
            Some(Ok(quote)) => Ok(quote),
            Some(Err(message)) => Err(BotError::Stock(message)),
            None => Err(BotError::Stock(format!("no quote scripted for {ticker}"))),
        }
    }
}

/// Owner account id used by [`test_config`].
pub const TEST_OWNER: i64 = 500;
/// The bot's own account id inside a [`TestBot`].
pub const TEST_BOT_USER: UserId = UserId(999);
/// The bot's username inside a [`TestBot`].
pub const TEST_BOT_USERNAME: &str = "magpie_bot";

/// Minimal configuration: just the owner, everything else empty.
pub fn test_config() -> BotConfig {
    BotConfig {
        apikey: String::new(),
        tenor_key: String::new(),
        owner: TEST_OWNER,
        moderators: Vec::new(),
        groups: HashMap::new(),
        watches: WatchesConfig::default(),
        actions: BTreeMap::new(),
    }
}

/// A fully wired bot over mock collaborators.
///
/// The scheduler actor runs on a spawned task, so paused-clock tests
/// drive delayed jobs with `tokio::time::advance`. Chance is pinned to
/// always fire and dice to always roll 50.
pub struct TestBot {
    pub state: Arc<BotState>,
    pub dispatcher: Dispatcher,
    pub gateway: MockGateway,
    pub search: MockSearch,
    pub stocks: MockStocks,
    pub store: Arc<MemoryStore>,
}

impl TestBot {
    pub fn new() -> Self {
        Self::with_config(test_config())
    }

    pub fn with_config(config: BotConfig) -> Self {
        let gateway = MockGateway::new();
        let search = MockSearch::new();
        let stocks = MockStocks::new();
        let store = Arc::new(MemoryStore::new());
        let (jobs, actor) = Scheduler::new();
        tokio::spawn(actor.run());
        let state = Arc::new(BotState::new(
            config,
            Arc::new(gateway.clone()),
            store.clone(),
            Arc::new(search.clone()),
            Arc::new(stocks.clone()),
            Arc::new(FixedChance(0.0)),
            Arc::new(FixedDice(50)),
            jobs,
            TEST_BOT_USER,
            TEST_BOT_USERNAME,
        ));
        let dispatcher = Dispatcher::new(Arc::clone(&state));
        Self {
            state,
            dispatcher,
            gateway,
            search,
            stocks,
            store,
        }
    }
}

impl Default for TestBot {
    fn default() -> Self {
        Self::new()
    }
}

/// A supergroup chat with a title, as most handlers expect.
pub fn group_chat(id: i64) -> ChatRef {
    ChatRef {
        id: ChatId(id),
        kind: ChatKind::Supergroup,
        title: Some("Test Group".to_string()),
    }
}

pub fn private_chat(id: i64) -> ChatRef {
    ChatRef {
        id: ChatId(id),
        kind: ChatKind::Private,
        title: None,
    }
}

pub fn test_user(id: i64, first: &str) -> UserRef {
    UserRef {
        id: UserId(id),
        first_name: first.to_string(),
        last_name: None,
        username: None,
    }
}

/// A command message with `args` already split.
pub fn command_msg(
    chat: &ChatRef,
    sender: &UserRef,
    id: i32,
    name: &str,
    args: &[&str],
) -> IncomingMessage {
    IncomingMessage {
        chat: chat.clone(),
        sender: sender.clone(),
        id: MessageId(id),
        body: MessageBody::Command {
            name: name.to_string(),
            args: args.iter().map(|a| a.to_string()).collect(),
        },
        reply_to: None,
    }
}

pub fn text_msg(chat: &ChatRef, sender: &UserRef, id: i32, text: &str) -> IncomingMessage {
    IncomingMessage {
        chat: chat.clone(),
        sender: sender.clone(),
        id: MessageId(id),
        body: MessageBody::Text(text.to_string()),
        reply_to: None,
    }
}

pub fn sticker_msg(chat: &ChatRef, sender: &UserRef, id: i32, file_id: &str) -> IncomingMessage {
    IncomingMessage {
        chat: chat.clone(),
        sender: sender.clone(),
        id: MessageId(id),
        body: MessageBody::Sticker {
            file_id: file_id.to_string(),
        },
        reply_to: None,
    }
}

/// A bare replied-to message; set `text`, `sticker` or `photos` after.
pub fn replied(chat: ChatId, id: i32, sender: &UserRef) -> RepliedMessage {
    RepliedMessage {
        chat,
        id: MessageId(id),
        sender: sender.clone(),
        text: None,
        sticker: None,
        photos: Vec::new(),
    }
}
