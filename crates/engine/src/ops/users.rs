use chrono::Utc;

use super::Shop;
use crate::{Document, ResultEngine, UserRecord, documents::Users, store::Mutation};

impl Shop {
    /// Records a user on first `/start`. Returns `true` when the user is new;
    /// existing records are never touched.
    pub async fn register_user(&self, user_id: u64) -> ResultEngine<bool> {
        let _guard = self.write_lock.lock().await;
        let key = user_id.to_string();

        self.documents
            .update(Document::Users, |users: &mut Users| {
                if users.contains_key(&key) {
                    return Ok(Mutation::Keep(false));
                }
                users.insert(
                    key.clone(),
                    UserRecord {
                        joined: true,
                        joined_at: Some(Utc::now()),
                    },
                );
                Ok(Mutation::Write(true))
            })
            .await
    }

    pub async fn user_count(&self) -> ResultEngine<usize> {
        let users: Users = self.documents.load(Document::Users).await?;
        Ok(users.len())
    }
}
