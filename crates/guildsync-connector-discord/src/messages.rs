//! One-way notification messages.
//!
//! A degenerate single call into the rate-limited client: never cached,
//! carries no sync semantics. Order/post notification collaborators are
//! the only callers.

use tracing::instrument;

use guildsync_core::{ChannelId, DirectoryResult, Message};

use crate::directory::DiscordDirectory;

impl DiscordDirectory {
    /// Posts a message to a channel.
    #[instrument(skip(self, message))]
    pub async fn send_message(
        &self,
        channel: ChannelId,
        message: &Message,
    ) -> DirectoryResult<()> {
        let path = format!("/channels/{channel}/messages");
        self.client().post_json(&path, message).await
    }
}
