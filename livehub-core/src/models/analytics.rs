use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Points kept per time series (24h at 5-minute resolution)
pub const HISTORY_CAP: usize = 288;

/// Room activity recorded into the daily counters
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ActivityEvent {
    ViewerJoined { current_viewers: u32 },
    ViewerLeft { current_viewers: u32, watched: Duration },
    MessagePosted,
    ReactionAdded,
    PollVote,
    GiftSent { value: u64 },
}

impl ActivityEvent {
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::ViewerJoined { .. } => "viewer_joined",
            Self::ViewerLeft { .. } => "viewer_left",
            Self::MessagePosted => "message_posted",
            Self::ReactionAdded => "reaction_added",
            Self::PollVote => "poll_vote",
            Self::GiftSent { .. } => "gift_sent",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricPoint {
    pub timestamp: DateTime<Utc>,
    pub value: u64,
}

/// Cumulative counters for one room on one UTC day
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsCounters {
    pub total_viewers: u64,
    pub peak_viewers: u32,
    pub total_messages: u64,
    pub total_reactions: u64,
    pub total_poll_votes: u64,
    pub total_gifts: u64,
    pub total_revenue: u64,
    pub total_gift_value: u64,
    /// Mean session length in seconds over viewers that left
    pub average_view_time: f64,
    #[serde(skip)]
    pub departures: u64,
    pub viewer_history: Vec<MetricPoint>,
    pub chat_activity: Vec<MetricPoint>,
    pub gift_activity: Vec<MetricPoint>,
}

fn push_capped(series: &mut Vec<MetricPoint>, point: MetricPoint) {
    series.push(point);
    if series.len() > HISTORY_CAP {
        let overflow = series.len() - HISTORY_CAP;
        series.drain(..overflow);
    }
}

impl AnalyticsCounters {
    pub fn apply(&mut self, event: ActivityEvent, now: DateTime<Utc>) {
        match event {
            ActivityEvent::ViewerJoined { current_viewers } => {
                self.total_viewers += 1;
                self.peak_viewers = self.peak_viewers.max(current_viewers);
                push_capped(
                    &mut self.viewer_history,
                    MetricPoint { timestamp: now, value: u64::from(current_viewers) },
                );
            }
            ActivityEvent::ViewerLeft { current_viewers, watched } => {
                let total = self.average_view_time * self.departures as f64 + watched.as_secs_f64();
                self.departures += 1;
                self.average_view_time = total / self.departures as f64;
                push_capped(
                    &mut self.viewer_history,
                    MetricPoint { timestamp: now, value: u64::from(current_viewers) },
                );
            }
            ActivityEvent::MessagePosted => {
                self.total_messages += 1;
                push_capped(&mut self.chat_activity, MetricPoint { timestamp: now, value: 1 });
            }
            ActivityEvent::ReactionAdded => self.total_reactions += 1,
            ActivityEvent::PollVote => self.total_poll_votes += 1,
            ActivityEvent::GiftSent { value } => {
                self.total_gifts += 1;
                self.total_gift_value += value;
                self.total_revenue += value;
                push_capped(&mut self.gift_activity, MetricPoint { timestamp: now, value });
            }
        }
    }
}

/// Bucket key for daily counters
#[must_use]
pub fn analytics_day(now: DateTime<Utc>) -> NaiveDate {
    now.date_naive()
}

/// Snapshot returned to a streamer: live viewers plus today's counters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveAnalytics {
    pub current_viewers: u32,
    #[serde(flatten)]
    pub counters: AnalyticsCounters,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_viewer_counters() {
        let mut counters = AnalyticsCounters::default();
        let now = Utc::now();
        counters.apply(ActivityEvent::ViewerJoined { current_viewers: 1 }, now);
        counters.apply(ActivityEvent::ViewerJoined { current_viewers: 2 }, now);
        counters.apply(
            ActivityEvent::ViewerLeft { current_viewers: 1, watched: Duration::from_secs(30) },
            now,
        );
        counters.apply(
            ActivityEvent::ViewerLeft { current_viewers: 0, watched: Duration::from_secs(90) },
            now,
        );

        assert_eq!(counters.total_viewers, 2);
        assert_eq!(counters.peak_viewers, 2);
        assert!((counters.average_view_time - 60.0).abs() < f64::EPSILON);
        assert_eq!(counters.viewer_history.len(), 4);
        assert_eq!(counters.viewer_history[3].value, 0);
    }

    #[test]
    fn test_gift_counters() {
        let mut counters = AnalyticsCounters::default();
        counters.apply(ActivityEvent::GiftSent { value: 150 }, Utc::now());
        counters.apply(ActivityEvent::GiftSent { value: 50 }, Utc::now());

        assert_eq!(counters.total_gifts, 2);
        assert_eq!(counters.total_gift_value, 200);
        assert_eq!(counters.total_revenue, 200);
        assert_eq!(counters.gift_activity.len(), 2);
    }

    #[test]
    fn test_history_is_capped() {
        let mut counters = AnalyticsCounters::default();
        for _ in 0..HISTORY_CAP + 12 {
            counters.apply(ActivityEvent::MessagePosted, Utc::now());
        }
        assert_eq!(counters.total_messages, (HISTORY_CAP + 12) as u64);
        assert_eq!(counters.chat_activity.len(), HISTORY_CAP);
    }

    #[test]
    fn test_live_analytics_is_flat() {
        let analytics = LiveAnalytics {
            current_viewers: 3,
            counters: AnalyticsCounters::default(),
        };
        let json = serde_json::to_value(&analytics).unwrap();
        assert_eq!(json["currentViewers"], 3);
        assert_eq!(json["totalViewers"], 0);
        assert!(json["viewerHistory"].is_array());
        assert!(json.get("departures").is_none());
    }
}
