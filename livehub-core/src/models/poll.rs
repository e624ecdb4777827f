use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::id::{generate_id, RoomId, UserId};
use crate::{Error, Result};

pub const POLL_MIN_OPTIONS: usize = 2;
pub const POLL_MAX_OPTIONS: usize = 6;
pub const POLL_QUESTION_MAX_CHARS: usize = 200;
pub const POLL_OPTION_MAX_CHARS: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollOption {
    pub id: String,
    pub text: String,
    pub votes: u32,
    pub voters: Vec<UserId>,
}

/// Voting state for one room's poll.
///
/// `version` increases on every mutation so that concurrent persistence
/// writes can discard snapshots older than the stored one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Poll {
    pub id: String,
    pub room_id: RoomId,
    pub creator_id: UserId,
    pub creator_username: String,
    pub question: String,
    pub options: Vec<PollOption>,
    pub allow_multiple_votes: bool,
    pub show_results: bool,
    pub total_votes: u32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    pub version: i64,
}

/// Unvalidated poll creation request
#[derive(Debug, Clone)]
pub struct NewPoll {
    pub room_id: RoomId,
    pub creator_id: UserId,
    pub creator_username: String,
    pub question: String,
    pub options: Vec<String>,
    pub allow_multiple_votes: bool,
    /// Seconds until the poll stops accepting votes
    pub duration_seconds: Option<u64>,
}

fn truncate_chars(text: &str, max: usize) -> String {
    text.trim().chars().take(max).collect()
}

impl NewPoll {
    /// Validate and normalize into an active poll.
    ///
    /// Options get positional ids `option_1..option_n`; question and option
    /// texts are trimmed and cut to their maximum lengths.
    pub fn into_poll(self) -> Result<Poll> {
        if !(POLL_MIN_OPTIONS..=POLL_MAX_OPTIONS).contains(&self.options.len()) {
            return Err(Error::InvalidInput(format!(
                "Poll needs between {POLL_MIN_OPTIONS} and {POLL_MAX_OPTIONS} options"
            )));
        }

        let question = truncate_chars(&self.question, POLL_QUESTION_MAX_CHARS);
        if question.is_empty() {
            return Err(Error::InvalidInput("Poll question cannot be empty".to_string()));
        }

        let mut options = Vec::with_capacity(self.options.len());
        for (index, text) in self.options.iter().enumerate() {
            let text = truncate_chars(text, POLL_OPTION_MAX_CHARS);
            if text.is_empty() {
                return Err(Error::InvalidInput("Poll options cannot be empty".to_string()));
            }
            options.push(PollOption {
                id: format!("option_{}", index + 1),
                text,
                votes: 0,
                voters: Vec::new(),
            });
        }

        let created_at = Utc::now();
        let expires_at = match self.duration_seconds {
            Some(0) | None => None,
            Some(seconds) => {
                let seconds = i64::try_from(seconds)
                    .map_err(|_| Error::InvalidInput("Poll duration too large".to_string()))?;
                Some(created_at + Duration::seconds(seconds))
            }
        };

        Ok(Poll {
            id: generate_id(),
            room_id: self.room_id,
            creator_id: self.creator_id,
            creator_username: self.creator_username,
            question,
            options,
            allow_multiple_votes: self.allow_multiple_votes,
            show_results: true,
            total_votes: 0,
            is_active: true,
            created_at,
            expires_at,
            version: 1,
        })
    }
}

impl Poll {
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|expires_at| expires_at < now)
    }

    pub fn deactivate(&mut self) {
        if self.is_active {
            self.is_active = false;
            self.version += 1;
        }
    }

    /// Apply one voter's selection and return the option ids newly counted.
    ///
    /// Single-choice polls first remove the voter from every option and then
    /// count only the first valid selection, so the voter ends up in exactly
    /// one voter set. Options the voter already holds are not counted twice.
    pub fn cast_vote(&mut self, voter: &UserId, option_ids: &[String]) -> Result<Vec<String>> {
        let mut selected: Vec<&String> = option_ids
            .iter()
            .filter(|id| self.options.iter().any(|option| &option.id == *id))
            .collect();
        if selected.is_empty() {
            return Err(Error::InvalidInput("Invalid poll option".to_string()));
        }

        if !self.allow_multiple_votes {
            selected.truncate(1);
            for option in &mut self.options {
                if let Some(pos) = option.voters.iter().position(|v| v == voter) {
                    option.voters.remove(pos);
                    option.votes = option.votes.saturating_sub(1);
                }
            }
        }

        let mut voted = Vec::new();
        for option_id in selected {
            if let Some(option) = self.options.iter_mut().find(|o| &o.id == option_id) {
                if !option.voters.contains(voter) {
                    option.voters.push(voter.clone());
                    option.votes += 1;
                    voted.push(option_id.clone());
                }
            }
        }

        self.recompute_total();
        self.version += 1;
        Ok(voted)
    }

    pub fn recompute_total(&mut self) {
        self.total_votes = self.options.iter().map(|option| option.votes).sum();
    }

    /// Wire view with voter lists shown only when results are revealed
    #[must_use]
    pub fn public_view(&self) -> PollView {
        PollView::from_poll(self, self.show_results, self.is_active, self.show_results)
    }

    /// Wire view for a poll that has just ended: results always revealed
    #[must_use]
    pub fn final_view(&self) -> PollView {
        PollView::from_poll(self, true, false, true)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PollView {
    pub id: String,
    pub question: String,
    pub options: Vec<PollOption>,
    pub allow_multiple_votes: bool,
    pub show_results: bool,
    pub total_votes: u32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl PollView {
    fn from_poll(poll: &Poll, show_results: bool, is_active: bool, include_voters: bool) -> Self {
        let options = poll
            .options
            .iter()
            .map(|option| PollOption {
                voters: if include_voters {
                    option.voters.clone()
                } else {
                    Vec::new()
                },
                ..option.clone()
            })
            .collect();

        Self {
            id: poll.id.clone(),
            question: poll.question.clone(),
            options,
            allow_multiple_votes: poll.allow_multiple_votes,
            show_results,
            total_votes: poll.total_votes,
            is_active,
            created_at: poll.created_at,
            expires_at: poll.expires_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_poll(options: &[&str], allow_multiple_votes: bool) -> NewPoll {
        NewPoll {
            room_id: RoomId::from("room1"),
            creator_id: UserId::from("streamer"),
            creator_username: "Streamer".to_string(),
            question: "  Best snack?  ".to_string(),
            options: options.iter().map(|s| (*s).to_string()).collect(),
            allow_multiple_votes,
            duration_seconds: None,
        }
    }

    fn ids(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn test_new_poll_normalizes_fields() {
        let long_option = "o".repeat(150);
        let poll = new_poll(&[" chips ", &long_option], false).into_poll().unwrap();

        assert_eq!(poll.question, "Best snack?");
        assert_eq!(poll.options[0].id, "option_1");
        assert_eq!(poll.options[0].text, "chips");
        assert_eq!(poll.options[1].id, "option_2");
        assert_eq!(poll.options[1].text.chars().count(), POLL_OPTION_MAX_CHARS);
        assert!(poll.is_active);
        assert!(poll.show_results);
        assert!(poll.expires_at.is_none());
    }

    #[test]
    fn test_new_poll_option_count_bounds() {
        assert!(new_poll(&["only"], false).into_poll().is_err());
        assert!(new_poll(&["1", "2", "3", "4", "5", "6", "7"], false)
            .into_poll()
            .is_err());
        assert!(new_poll(&["1", "2", "3", "4", "5", "6"], false)
            .into_poll()
            .is_ok());
    }

    #[test]
    fn test_new_poll_rejects_blank_texts() {
        assert!(new_poll(&["a", "   "], false).into_poll().is_err());

        let mut blank_question = new_poll(&["a", "b"], false);
        blank_question.question = "  ".to_string();
        assert!(blank_question.into_poll().is_err());
    }

    #[test]
    fn test_duration_sets_expiry() {
        let mut request = new_poll(&["a", "b"], false);
        request.duration_seconds = Some(60);
        let poll = request.into_poll().unwrap();

        let expires_at = poll.expires_at.unwrap();
        assert_eq!((expires_at - poll.created_at).num_seconds(), 60);
        assert!(!poll.is_expired(Utc::now()));
        assert!(poll.is_expired(Utc::now() + Duration::seconds(61)));
    }

    #[test]
    fn test_single_choice_revote_moves_vote() {
        let mut poll = new_poll(&["A", "B"], false).into_poll().unwrap();
        let voter = UserId::from("viewer");

        assert_eq!(poll.cast_vote(&voter, &ids(&["option_1"])).unwrap(), ids(&["option_1"]));
        assert_eq!(poll.cast_vote(&voter, &ids(&["option_2"])).unwrap(), ids(&["option_2"]));

        assert_eq!(poll.options[0].votes, 0);
        assert_eq!(poll.options[1].votes, 1);
        assert_eq!(poll.total_votes, 1);
    }

    #[test]
    fn test_single_choice_keeps_voter_in_one_option() {
        let mut poll = new_poll(&["A", "B", "C"], false).into_poll().unwrap();
        let voter = UserId::from("viewer");

        poll.cast_vote(&voter, &ids(&["option_1", "option_3"])).unwrap();
        poll.cast_vote(&voter, &ids(&["option_2"])).unwrap();
        poll.cast_vote(&voter, &ids(&["option_2"])).unwrap();

        let holding: Vec<_> = poll
            .options
            .iter()
            .filter(|o| o.voters.contains(&voter))
            .collect();
        assert_eq!(holding.len(), 1);
        assert_eq!(holding[0].id, "option_2");
        assert_eq!(poll.total_votes, 1);
    }

    #[test]
    fn test_multiple_votes_skip_duplicates() {
        let mut poll = new_poll(&["A", "B", "C"], true).into_poll().unwrap();
        let voter = UserId::from("viewer");

        let first = poll.cast_vote(&voter, &ids(&["option_1", "option_2"])).unwrap();
        let second = poll.cast_vote(&voter, &ids(&["option_2", "option_3"])).unwrap();

        assert_eq!(first, ids(&["option_1", "option_2"]));
        assert_eq!(second, ids(&["option_3"]));
        assert_eq!(poll.total_votes, 3);
        assert_eq!(
            poll.total_votes,
            poll.options.iter().map(|o| o.votes).sum::<u32>()
        );
    }

    #[test]
    fn test_vote_with_unknown_options_leaves_state() {
        let mut poll = new_poll(&["A", "B"], false).into_poll().unwrap();
        let voter = UserId::from("viewer");
        poll.cast_vote(&voter, &ids(&["option_1"])).unwrap();
        let version = poll.version;

        assert!(poll.cast_vote(&voter, &ids(&["option_9"])).is_err());
        assert!(poll.cast_vote(&voter, &[]).is_err());
        assert_eq!(poll.options[0].votes, 1);
        assert_eq!(poll.version, version);
    }

    #[test]
    fn test_views_redact_and_force_results() {
        let mut poll = new_poll(&["A", "B"], false).into_poll().unwrap();
        poll.cast_vote(&UserId::from("viewer"), &ids(&["option_1"])).unwrap();
        poll.show_results = false;

        let public = poll.public_view();
        assert!(public.options[0].voters.is_empty());
        assert_eq!(public.options[0].votes, 1);

        let final_view = poll.final_view();
        assert!(final_view.show_results);
        assert!(!final_view.is_active);
        assert_eq!(final_view.options[0].voters.len(), 1);

        let json = serde_json::to_value(&final_view).unwrap();
        assert_eq!(json["showResults"], true);
        assert_eq!(json["isActive"], false);
        assert_eq!(json["allowMultipleVotes"], false);
    }

    #[test]
    fn test_deactivate_bumps_version_once() {
        let mut poll = new_poll(&["A", "B"], false).into_poll().unwrap();
        poll.deactivate();
        let version = poll.version;
        poll.deactivate();
        assert!(!poll.is_active);
        assert_eq!(poll.version, version);
    }
}
