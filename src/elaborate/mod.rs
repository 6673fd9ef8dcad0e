//! Per-status alt-text elaboration.
//!
//! For every image attachment without a description the elaborator downloads
//! the image, asks the vision model for a description, translates it when a
//! target language is configured, and uploads the image again with the
//! description attached. When at least one attachment was replaced the
//! status is edited once, keeping the original attachment order. Statuses
//! that need nothing are never touched.
//!
//! Any failure aborts the whole status: attachments already re-uploaded are
//! left orphaned and the status keeps its old media.

pub mod content;

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, info};

use crate::agent::AgentError;
use crate::channels::{
    ChannelError, MediaAttachment, MediaId, SocialClient, Status, StatusUpdate,
};
use crate::config::Language;
use crate::media::{DescriptionGenerator, FetchError, ImageSource, Translator};

pub use content::plain_text;

/// Errors raised while elaborating a status.
#[derive(Debug, Error)]
pub enum ElaborateError {
    #[error("failed to download media {media_id}: {source}")]
    Fetch {
        media_id: MediaId,
        #[source]
        source: FetchError,
    },

    #[error("inference failed: {0}")]
    Inference(#[from] AgentError),

    #[error("platform request failed: {0}")]
    Channel(#[from] ChannelError),
}

/// What happened to one attachment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaSlot {
    /// Passed through with its existing id.
    Kept(MediaId),
    /// Re-uploaded with a generated description under a new id.
    Replaced(MediaId),
}

impl MediaSlot {
    pub fn id(&self) -> &MediaId {
        match self {
            MediaSlot::Kept(id) | MediaSlot::Replaced(id) => id,
        }
    }

    pub fn is_replaced(&self) -> bool {
        matches!(self, MediaSlot::Replaced(_))
    }
}

/// Outcome of elaborating one status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Elaboration {
    /// Nothing needed a description; no request was made.
    Unchanged,
    /// The status was edited with this media list.
    Updated {
        media_ids: Vec<MediaId>,
        replaced: usize,
    },
}

/// Per-status processing step driven by the poller.
#[async_trait]
pub trait Elaborate: Send + Sync {
    async fn elaborate(&self, status: &Status) -> Result<Elaboration, ElaborateError>;
}

/// Drives description generation for statuses.
pub struct Elaborator {
    social: Arc<dyn SocialClient>,
    images: Arc<dyn ImageSource>,
    describer: DescriptionGenerator,
    translator: Translator,
    language: Language,
}

impl Elaborator {
    pub fn new(
        social: Arc<dyn SocialClient>,
        images: Arc<dyn ImageSource>,
        describer: DescriptionGenerator,
        translator: Translator,
        language: Language,
    ) -> Self {
        Self {
            social,
            images,
            describer,
            translator,
            language,
        }
    }

    /// Fill in missing image descriptions of `status` and edit it if needed.
    #[tracing::instrument(skip_all, fields(status_id = %status.id, uri = %status.uri))]
    pub async fn elaborate(&self, status: &Status) -> Result<Elaboration, ElaborateError> {
        let text = plain_text(&status.content);

        let mut slots = Vec::with_capacity(status.media_attachments.len());
        for media in &status.media_attachments {
            if media.needs_description() {
                info!(text = %text, "Elaborating media for status {}", status.uri);
                let new_id = self.describe_attachment(media).await?;
                slots.push(MediaSlot::Replaced(new_id));
            } else {
                slots.push(MediaSlot::Kept(media.id.clone()));
            }
        }

        let replaced = slots.iter().filter(|slot| slot.is_replaced()).count();
        if replaced == 0 {
            debug!("No media needs a description");
            return Ok(Elaboration::Unchanged);
        }

        let update = StatusUpdate {
            status: text,
            media_ids: slots.iter().map(|slot| slot.id().clone()).collect(),
        };
        self.social.update_status(&status.id, &update).await?;
        info!(replaced, "Updated status with generated descriptions");

        Ok(Elaboration::Updated {
            media_ids: update.media_ids,
            replaced,
        })
    }

    /// Download, describe, translate and re-upload one attachment.
    ///
    /// The downloaded file is removed when this returns, on success or error.
    async fn describe_attachment(&self, media: &MediaAttachment) -> Result<MediaId, ElaborateError> {
        let image = self
            .images
            .download(&media.url)
            .await
            .map_err(|source| ElaborateError::Fetch {
                media_id: media.id.clone(),
                source,
            })?;

        let mut description = self.describer.describe(&image).await?;
        if self.language.needs_translation() {
            description = self.translator.translate(&description, &self.language).await?;
        }

        let new_id = self.social.upload_media(&image, &description).await?;
        debug!(old = %media.id, new = %new_id, "Re-uploaded media with description");
        Ok(new_id)
    }
}

#[async_trait]
impl Elaborate for Elaborator {
    async fn elaborate(&self, status: &Status) -> Result<Elaboration, ElaborateError> {
        Elaborator::elaborate(self, status).await
    }
}
