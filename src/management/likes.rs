use std::collections::BTreeSet;

use crate::{
    Result,
    management::optimistic::{Optimistic, Outcome, PendingMutation},
    session::SessionStore,
};

/// Liked-song ids of the current user.
///
/// Toggles show up immediately and are reverted when the backend rejects
/// them. With nobody signed in the set is kept locally only.
#[derive(Clone)]
pub struct LikedSongs {
    session: SessionStore,
    ids: Optimistic<BTreeSet<String>>,
}

impl LikedSongs {
    pub fn new(session: SessionStore) -> Self {
        Self {
            session,
            ids: Optimistic::default(),
        }
    }

    /// Replaces the local set with the signed-in user's likes. Without a
    /// session the set is emptied.
    pub async fn load(&self) -> Result<()> {
        let ids = match self.session.session() {
            Some(session) => self
                .session
                .backend()
                .liked_song_ids(&session)
                .await?
                .into_iter()
                .collect(),
            None => BTreeSet::new(),
        };
        self.ids.replace(ids);
        Ok(())
    }

    pub fn contains(&self, song_id: &str) -> bool {
        self.ids.read(|ids| ids.contains(song_id))
    }

    pub fn ids(&self) -> Vec<String> {
        self.ids.read(|ids| ids.iter().cloned().collect())
    }

    pub fn len(&self) -> usize {
        self.ids.read(BTreeSet::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Flips membership locally and returns whether the song is now liked,
    /// together with the mutation that undoes the flip.
    pub fn begin_toggle(&self, song_id: &str) -> (bool, PendingMutation<BTreeSet<String>>) {
        let undo = flip(song_id);
        self.ids.begin_with(flip(song_id), move |ids: &mut BTreeSet<String>| {
            undo(ids);
        })
    }

    /// Toggles a like and writes it to the backend.
    ///
    /// Returns the new liked state. If the backend call fails the local flip
    /// is reverted and the error returned; a session the backend no longer
    /// accepts also signs the user out.
    pub async fn toggle(&self, song_id: &str) -> Result<bool> {
        let (liked, pending) = self.begin_toggle(song_id);

        let Some(session) = self.session.session() else {
            pending.commit();
            return Ok(liked);
        };

        let backend = self.session.backend();
        let outcome = pending
            .settle(async {
                if liked {
                    backend.insert_like(&session, song_id).await
                } else {
                    backend.delete_like(&session, song_id).await
                }
            })
            .await;

        match outcome {
            Outcome::Committed => Ok(liked),
            Outcome::RolledBack(e) => {
                tracing::warn!(song_id, "like toggle rolled back: {}", e);
                if e.requires_reauth() {
                    self.session.expire();
                }
                Err(e)
            }
        }
    }
}

/// Flips membership of `song_id` and returns whether it is now liked.
fn flip(song_id: &str) -> impl FnOnce(&mut BTreeSet<String>) -> bool + Send + 'static {
    let song_id = song_id.to_string();
    move |ids: &mut BTreeSet<String>| {
        if ids.remove(&song_id) {
            false
        } else {
            ids.insert(song_id);
            true
        }
    }
}
