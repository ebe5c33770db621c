// NotificationService - the recipient's read side. Events are appended by the repositories
// in the same transaction as the mutation that caused them

use std::sync::Arc;
use tracing::{debug, instrument};

use crate::{
    core::{NotificationId, UserId},
    error::{AppError, AppResult},
    infrastructure::traits::NotificationRepository,
    models::{Notification, NotificationQuery},
    privacy::{self, Action, Resource},
};

#[derive(Clone)]
pub struct NotificationService {
    notifications: Arc<dyn NotificationRepository>,
    max_page_size: u32,
}

impl NotificationService {
    pub fn new(notifications: Arc<dyn NotificationRepository>, max_page_size: u32) -> Self {
        Self {
            notifications,
            max_page_size,
        }
    }

    /// Newest first.
    #[instrument(skip(self))]
    pub async fn list_notifications(
        &self,
        recipient: UserId,
        query: NotificationQuery,
    ) -> AppResult<Vec<Notification>> {
        let query = NotificationQuery {
            page: query.page.clamped(self.max_page_size),
            ..query
        };
        self.notifications.list_notifications(recipient, query).await
    }

    #[instrument(skip(self))]
    pub async fn mark_read(&self, actor: UserId, id: NotificationId) -> AppResult<Notification> {
        let notification = self
            .notifications
            .get_notification(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Notification not found.".to_string()))?;

        privacy::ensure(Some(actor), Action::MarkRead, &Resource::from(&notification))?;

        if notification.is_read {
            return Ok(notification);
        }

        let notification = self
            .notifications
            .mark_read(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Notification not found.".to_string()))?;
        debug!(notification_id = %id, recipient = %actor, "Notification marked read");
        Ok(notification)
    }
}
