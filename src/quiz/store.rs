//! Serialized access to the per-chat sessions kept in the dialogue storage.
//!
//! Handlers run one at a time per chat, but a question request finishes on
//! its own task. Writes that can overlap with such a task go through
//! [`SessionStore::transition`], which reads, transitions and writes back
//! under a per-chat lock.

use std::collections::HashMap;
use std::sync::Arc;

use teloxide::dispatching::dialogue::{ErasedStorage, Storage};
use teloxide::types::ChatId;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::error::{SessionError, StoreError};
use crate::quiz::session::{RequestToken, Session};

pub struct SessionStore {
    storage: Arc<ErasedStorage<Session>>,
    locks: Mutex<HashMap<ChatId, Arc<Mutex<()>>>>,
}

impl SessionStore {
    pub fn new(storage: Arc<ErasedStorage<Session>>) -> Self {
        Self {
            storage,
            locks: Mutex::new(HashMap::new()),
        }
    }

    async fn lock(&self, chat_id: ChatId) -> OwnedMutexGuard<()> {
        let chat_lock = self.locks.lock().await.entry(chat_id).or_default().clone();
        chat_lock.lock_owned().await
    }

    pub async fn load(&self, chat_id: ChatId) -> Result<Session, StoreError> {
        let session = Arc::clone(&self.storage)
            .get_dialogue(chat_id)
            .await
            .map_err(StoreError::Storage)?;
        Ok(session.unwrap_or_default())
    }

    /// Applies `f` to the stored session and stores the result. Nothing is
    /// written when `f` refuses the transition.
    pub async fn transition<T>(
        &self,
        chat_id: ChatId,
        f: impl FnOnce(&Session) -> Result<(Session, T), SessionError>,
    ) -> Result<(Session, T), StoreError> {
        let _guard = self.lock(chat_id).await;
        let current = self.load(chat_id).await?;
        let (next, value) = f(&current)?;
        Arc::clone(&self.storage)
            .update_dialogue(chat_id, next.clone())
            .await
            .map_err(StoreError::Storage)?;
        Ok((next, value))
    }

    /// Drops a pending request so difficulty selection works again. A no-op
    /// when the request was already resolved or abandoned.
    pub async fn abandon_request(
        &self,
        chat_id: ChatId,
        token: RequestToken,
    ) -> Result<(), StoreError> {
        match self
            .transition(chat_id, |s| s.abort_request(token).map(|next| (next, ())))
            .await
        {
            Ok(_) | Err(StoreError::Session(SessionError::Stale(_))) => Ok(()),
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use teloxide::dispatching::dialogue::InMemStorage;

    use super::*;
    use crate::quiz::tests::question;
    use crate::quiz::{Difficulty, Topic};

    const CHAT: ChatId = ChatId(42);

    fn store() -> Arc<SessionStore> {
        Arc::new(SessionStore::new(InMemStorage::<Session>::new().erase()))
    }

    async fn loading(store: &SessionStore) -> RequestToken {
        store
            .transition(CHAT, |s| Ok((s.select_topic(Topic::Python), ())))
            .await
            .unwrap();
        let (_, token) = store
            .transition(CHAT, |s| s.request_questions(Difficulty::Easy))
            .await
            .unwrap();
        token
    }

    #[tokio::test]
    async fn unknown_chat_starts_at_topic_selection() {
        assert!(store().load(CHAT).await.unwrap().is_selecting_topic());
    }

    #[tokio::test]
    async fn refused_transition_writes_nothing() {
        let store = store();
        let token = loading(&store).await;

        let err = store
            .transition(CHAT, |s| s.request_questions(Difficulty::Hard))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Session(SessionError::RequestPending)));
        assert_eq!(store.load(CHAT).await.unwrap().pending().unwrap().token, token);
    }

    #[tokio::test]
    async fn abandoned_request_reenables_difficulty_choice() {
        let store = store();
        let token = loading(&store).await;

        store.abandon_request(CHAT, token).await.unwrap();
        let session = store.load(CHAT).await.unwrap();
        assert!(session.is_selecting_difficulty());
        assert_eq!(session.pending(), None);

        assert!(store
            .transition(CHAT, |s| s.request_questions(Difficulty::Easy))
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn abandoning_a_resolved_request_is_a_no_op() {
        let store = store();
        let token = loading(&store).await;
        store
            .transition(CHAT, |s| {
                s.start_quiz(token, vec![question("alpha", "loops")])
                    .map(|next| (next, ()))
            })
            .await
            .unwrap();

        store.abandon_request(CHAT, token).await.unwrap();
        assert!(store.load(CHAT).await.unwrap().is_in_quiz());
    }

    #[tokio::test]
    async fn late_response_does_not_overwrite_navigation() {
        let store = store();
        let token = loading(&store).await;
        store
            .transition(CHAT, |s| Ok((s.back_to_topics(), ())))
            .await
            .unwrap();

        let err = store
            .transition(CHAT, |s| {
                s.start_quiz(token, vec![question("alpha", "loops")])
                    .map(|next| (next, ()))
            })
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Session(SessionError::Stale(_))));
        assert!(store.load(CHAT).await.unwrap().is_selecting_topic());
    }

    #[tokio::test]
    async fn transitions_on_one_chat_are_serialized() {
        let store = store();
        let token = loading(&store).await;

        // Someone else is mid-transition on this chat.
        let guard = store.lock(CHAT).await;
        let completion = tokio::spawn({
            let store = Arc::clone(&store);
            async move {
                store
                    .transition(CHAT, |s| {
                        s.start_quiz(token, vec![question("alpha", "loops")])
                            .map(|next| (next, ()))
                    })
                    .await
            }
        });
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
        assert!(!completion.is_finished());
        assert!(store.load(CHAT).await.unwrap().is_selecting_difficulty());

        // Other chats are not blocked.
        store
            .transition(ChatId(7), |s| Ok((s.select_topic(Topic::Sql), ())))
            .await
            .unwrap();

        drop(guard);
        completion.await.unwrap().unwrap();
        assert!(store.load(CHAT).await.unwrap().is_in_quiz());
    }
}
