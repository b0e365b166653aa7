// db/chatdb.rs
use async_trait::async_trait;
use chrono::Utc;

use super::{db::DBClient, store::keys, userdb::UserExt};
use crate::{
    error::PortalError,
    models::{
        chatmodels::ChatMessage,
        usermodel::UserProfile,
    },
    utils::reference::new_record_id,
};

#[async_trait]
pub trait ChatExt {
    /// Messages exchanged between two accounts in either direction, oldest
    /// first.
    async fn conversation_between(
        &self,
        account_a: &str,
        account_b: &str,
    ) -> Result<Vec<ChatMessage>, PortalError>;

    async fn send_message(
        &self,
        sender_id: &str,
        receiver_id: &str,
        body: &str,
    ) -> Result<ChatMessage, PortalError>;
}

/// Chat only links a student with the supervisor they are assigned to.
fn check_pairing(sender: &UserProfile, receiver: &UserProfile) -> Result<(), PortalError> {
    let (student, supervisor_id) = match (sender, receiver) {
        (UserProfile::Student(student), UserProfile::Supervisor(supervisor))
        | (UserProfile::Supervisor(supervisor), UserProfile::Student(student)) => {
            (student, supervisor.account.id.as_str())
        }
        _ => {
            return Err(PortalError::Forbidden(format!(
                "Messages can only be exchanged between a student and a supervisor, not {} and {}",
                sender.role().to_str(),
                receiver.role().to_str()
            )))
        }
    };

    if student.supervisor_id.as_deref() != Some(supervisor_id) {
        return Err(PortalError::Forbidden(
            "This student is not assigned to this supervisor".to_string(),
        ));
    }
    Ok(())
}

#[async_trait]
impl ChatExt for DBClient {
    async fn conversation_between(
        &self,
        account_a: &str,
        account_b: &str,
    ) -> Result<Vec<ChatMessage>, PortalError> {
        let chats: Vec<ChatMessage> = self.store.get_collection(keys::CHATS).await?;
        let mut conversation: Vec<ChatMessage> = chats
            .into_iter()
            .filter(|m| m.is_between(account_a, account_b))
            .collect();
        conversation.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
        Ok(conversation)
    }

    async fn send_message(
        &self,
        sender_id: &str,
        receiver_id: &str,
        body: &str,
    ) -> Result<ChatMessage, PortalError> {
        let body = body.trim();
        if body.is_empty() {
            return Err(PortalError::Validation("Message cannot be empty".to_string()));
        }

        let sender = self
            .get_profile(sender_id)
            .await?
            .ok_or_else(|| PortalError::NotFound("Sender not found".to_string()))?;
        let receiver = self
            .get_profile(receiver_id)
            .await?
            .ok_or_else(|| PortalError::NotFound("Recipient not found".to_string()))?;
        check_pairing(&sender, &receiver)?;

        let message = ChatMessage {
            id: new_record_id(),
            sender_id: sender_id.to_string(),
            receiver_id: receiver_id.to_string(),
            message: body.to_string(),
            timestamp: Utc::now(),
            read: false,
        };

        let stored = message.clone();
        self.store
            .update_collection::<ChatMessage, _, PortalError, _>(keys::CHATS, move |chats| {
                chats.push(stored);
                Ok(())
            })
            .await?;

        tracing::debug!(
            "Message {} sent from {} ({}) to {}",
            message.id,
            sender_id,
            sender.role().to_str(),
            receiver_id
        );
        Ok(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::testutil::seeded_client;

    #[tokio::test]
    async fn conversation_is_unordered_pair_oldest_first() {
        let db = seeded_client().await;
        let forward = db.conversation_between("1", "sup-1").await.unwrap();
        let backward = db.conversation_between("sup-1", "1").await.unwrap();

        assert_eq!(forward, backward);
        let ids: Vec<&str> = forward.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["chat-1", "chat-2"]);
        assert!(db.conversation_between("2", "sup-1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn student_and_assigned_supervisor_can_chat() {
        let db = seeded_client().await;
        let sent = db
            .send_message("sup-1", "2", "  Please upload your logbook.  ")
            .await
            .unwrap();
        assert_eq!(sent.message, "Please upload your logbook.");
        assert!(!sent.read);

        let reply = db.send_message("2", "sup-1", "Done, sir.").await.unwrap();
        let conversation = db.conversation_between("2", "sup-1").await.unwrap();
        assert_eq!(conversation.last(), Some(&reply));
        assert_eq!(conversation.len(), 2);
    }

    #[tokio::test]
    async fn unrelated_pairs_are_refused() {
        let db = seeded_client().await;

        // Not assigned to sup-2.
        assert!(matches!(
            db.send_message("1", "sup-2", "Hello").await,
            Err(PortalError::Forbidden(_))
        ));
        // Same role on both ends.
        assert!(matches!(
            db.send_message("1", "2", "Hello").await,
            Err(PortalError::Forbidden(_))
        ));
        assert!(matches!(
            db.send_message("coord-1", "1", "Hello").await,
            Err(PortalError::Forbidden(_))
        ));
        assert!(matches!(
            db.send_message("1", "ghost", "Hello").await,
            Err(PortalError::NotFound(_))
        ));
        assert!(matches!(
            db.send_message("1", "sup-1", "   ").await,
            Err(PortalError::Validation(_))
        ));

        assert_eq!(db.conversation_between("1", "sup-1").await.unwrap().len(), 2);
    }
}
