//! Polls: creation, voting and closing

use chrono::Utc;
use livehub_core::models::{ActivityEvent, ConnectionId, NewPoll, Poll};
use livehub_session::{ServerEvent, VoteOutcome};
use tracing::{debug, info, warn};

use crate::impls::error::{HubError, HubResult, Missing};
use crate::impls::hub::Member;
use crate::impls::LiveHub;

/// Poll fields as sent by the streamer
#[derive(Debug, Clone)]
pub(crate) struct PollRequest {
    pub question: String,
    pub options: Vec<String>,
    pub allow_multiple_votes: bool,
    pub duration_seconds: Option<u64>,
}

impl LiveHub {
    pub(crate) async fn create_poll(
        &self,
        connection_id: &ConnectionId,
        request: PollRequest,
    ) -> HubResult<()> {
        let member = self.streamer(connection_id, "create polls")?;

        let poll = NewPoll {
            room_id: member.room_id.clone(),
            creator_id: member.identity.user_id,
            creator_username: member.identity.username,
            question: request.question,
            options: request.options,
            allow_multiple_votes: request.allow_multiple_votes,
            duration_seconds: request.duration_seconds,
        }
        .into_poll()?;

        // Votes on the replaced poll stop here, before any storage write
        let mut advisory = None;
        if let Some(replaced) = self.polls.retire_room(&member.room_id) {
            advisory = self
                .persist_poll(&replaced, "Failed to create poll")
                .await
                .err();
        }
        if let Err(err) = self.store.deactivate_active_polls(&member.room_id).await {
            warn!(room_id = %member.room_id, error = %err, "Failed to close previous polls");
            advisory = Some(HubError::storage("Failed to create poll"));
        }
        if let Err(err) = self.store.create_poll(&poll).await {
            warn!(poll_id = %poll.id, error = %err, "Failed to persist poll");
            advisory = Some(HubError::storage("Failed to create poll"));
        }

        info!(
            room_id = %member.room_id,
            poll_id = %poll.id,
            options = poll.options.len(),
            "Poll created"
        );
        let view = poll.public_view();
        self.polls.install(poll);
        self.broadcast(&member.room_id, &ServerEvent::PollCreated { poll: view }, None);

        advisory.map_or(Ok(()), Err)
    }

    pub(crate) async fn vote_poll(
        &self,
        connection_id: &ConnectionId,
        poll_id: &str,
        option_ids: &[String],
    ) -> HubResult<()> {
        let member = self.member(connection_id)?;

        let outcome = match self.apply_vote(&member, poll_id, option_ids) {
            Some(outcome) => outcome,
            None => {
                self.reload_poll(&member, poll_id).await?;
                self.apply_vote(&member, poll_id, option_ids)
                    .ok_or(HubError::NotFound(Missing::Poll))?
            }
        };

        match outcome {
            VoteOutcome::Recorded { poll, voted } => {
                let persisted = self.persist_poll(&poll, "Failed to record vote").await;
                self.record_activity(&member.room_id, ActivityEvent::PollVote)
                    .await;

                self.broadcast(
                    &member.room_id,
                    &ServerEvent::PollUpdated {
                        poll: poll.public_view(),
                    },
                    None,
                );
                self.send_to(
                    connection_id,
                    &ServerEvent::VoteRecorded {
                        poll_id: poll.id,
                        voted_option_ids: voted.clone(),
                        voted_options: voted,
                    },
                );
                persisted
            }
            VoteOutcome::Expired(poll) => {
                info!(room_id = %member.room_id, poll_id = %poll.id, "Poll expired");
                // One reply per command: poll_expired outranks the storage advisory
                if let Err(err) = self.persist_poll(&poll, "Failed to record vote").await {
                    debug!(poll_id = %poll.id, error = %err, "Expiry not persisted");
                }
                Err(HubError::PollExpired)
            }
            VoteOutcome::Rejected(err) => Err(err.into()),
        }
    }

    pub(crate) async fn end_poll(
        &self,
        connection_id: &ConnectionId,
        poll_id: &str,
    ) -> HubResult<()> {
        let member = self.streamer(connection_id, "end polls")?;

        let ended = match self.polls.end(&member.room_id, poll_id) {
            Some(poll) => poll,
            None => {
                self.reload_poll(&member, poll_id).await?;
                self.polls
                    .end(&member.room_id, poll_id)
                    .ok_or(HubError::NotFound(Missing::Poll))?
            }
        };

        info!(
            room_id = %member.room_id,
            poll_id = %ended.id,
            total_votes = ended.total_votes,
            "Poll ended"
        );
        let persisted = self.persist_poll(&ended, "Failed to end poll").await;
        self.broadcast(
            &member.room_id,
            &ServerEvent::PollEnded {
                poll: ended.final_view(),
            },
            None,
        );
        persisted
    }

    fn apply_vote(
        &self,
        member: &Member,
        poll_id: &str,
        option_ids: &[String],
    ) -> Option<VoteOutcome> {
        self.polls.vote(
            &member.room_id,
            poll_id,
            &member.identity.user_id,
            option_ids,
            Utc::now(),
        )
    }

    /// Bring an active poll of the caller's room back from storage.
    ///
    /// The board forgets a room's poll once the room empties; members who
    /// return may still vote on it or end it.
    async fn reload_poll(&self, member: &Member, poll_id: &str) -> HubResult<()> {
        let stored = self.store.load_poll(poll_id).await.map_err(|err| {
            warn!(poll_id, error = %err, "Failed to load poll");
            HubError::NotFound(Missing::Poll)
        })?;

        match stored {
            Some(poll) if poll.is_active && poll.room_id == member.room_id => {
                self.polls.adopt(poll);
                Ok(())
            }
            _ => Err(HubError::NotFound(Missing::Poll)),
        }
    }

    async fn persist_poll(&self, poll: &Poll, failure: &str) -> HubResult<()> {
        self.store.save_poll(poll).await.map_err(|err| {
            warn!(poll_id = %poll.id, version = poll.version, error = %err, "Failed to save poll");
            HubError::storage(failure)
        })
    }
}
