use livehub_core::models::{ConnectionId, LiveAnalytics};
use livehub_session::ServerEvent;
use tracing::warn;

use crate::impls::error::{HubError, HubResult};
use crate::impls::LiveHub;

impl LiveHub {
    /// Today's counters for the streamer's room plus the live viewer count
    pub(crate) async fn send_analytics(&self, connection_id: &ConnectionId) -> HubResult<()> {
        let member = self.streamer(connection_id, "access analytics")?;

        let counters = self
            .store
            .cumulative_analytics(&member.room_id)
            .await
            .map_err(|err| {
                warn!(room_id = %member.room_id, error = %err, "Failed to load analytics");
                HubError::storage("Failed to get analytics")
            })?;

        let analytics = LiveAnalytics {
            current_viewers: u32::try_from(self.registry.member_count(&member.room_id))
                .unwrap_or(u32::MAX),
            counters,
        };
        self.send_to(connection_id, &ServerEvent::AnalyticsData { analytics });
        Ok(())
    }
}
