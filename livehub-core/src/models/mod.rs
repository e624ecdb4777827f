pub mod analytics;
pub mod chat;
pub mod gift;
pub mod id;
pub mod identity;
pub mod poll;
pub mod stream;

pub use analytics::{
    analytics_day, ActivityEvent, AnalyticsCounters, LiveAnalytics, MetricPoint, HISTORY_CAP,
};
pub use chat::{
    group_reactions, is_allowed_reaction, ChatMessage, ChatReaction, ReactionAction,
    ReactionGroup, Reactor, ALLOWED_REACTIONS, CHAT_MESSAGE_MAX_CHARS,
};
pub use gift::{
    default_gift_catalog, is_valid_amount, GiftRarity, GiftTransaction, GiftType, GiftView,
    GIFT_MAX_AMOUNT, GIFT_MESSAGE_MAX_CHARS, GIFT_MIN_AMOUNT,
};
pub use id::{generate_id, ConnectionId, RoomId, UserId};
pub use identity::{Identity, UserRole, DEFAULT_GUEST_NAME, GUEST_NAME_MAX_CHARS};
pub use poll::{NewPoll, Poll, PollOption, PollView};
pub use stream::{
    GuestStreamRecord, LiveRoomRecord, StreamKind, StreamRecord, GUEST_STREAM_TTL_HOURS,
};
