//! API key list with a single active entry and forward-only rotation
//!
//! The ring is shared process-wide: clones hand out the same underlying
//! state, so a rotation triggered by one dispatch is visible to the next.
//! Rotation only ever moves forward; once the end of the list is reached the
//! ring stays exhausted and never wraps around.

use std::sync::{Arc, Mutex};

use crate::{Error, Result};

/// An opaque secret plus its position in the ring.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiKey {
    pub secret: String,
    pub index: usize,
}

#[derive(Debug)]
struct KeyRingState {
    secrets: Vec<String>,
    active: Option<usize>,
    exhausted: bool,
}

/// Ordered list of API keys with one active entry (or none).
#[derive(Debug, Clone)]
pub struct KeyRing {
    inner: Arc<Mutex<KeyRingState>>,
}

impl KeyRing {
    /// Build a ring from secrets. The first entry starts active.
    pub fn new(secrets: Vec<String>) -> Self {
        let active = if secrets.is_empty() { None } else { Some(0) };
        Self {
            inner: Arc::new(Mutex::new(KeyRingState {
                secrets,
                active,
                exhausted: false,
            })),
        }
    }

    pub fn list(&self) -> Vec<ApiKey> {
        let state = self.inner.lock().unwrap();
        state
            .secrets
            .iter()
            .enumerate()
            .map(|(index, secret)| ApiKey {
                secret: secret.clone(),
                index,
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().secrets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The credential at the active index, or none if unset or exhausted.
    pub fn get_active(&self) -> Option<ApiKey> {
        let state = self.inner.lock().unwrap();
        let index = state.active?;
        state.secrets.get(index).map(|secret| ApiKey {
            secret: secret.clone(),
            index,
        })
    }

    /// Select a specific entry, clearing any exhausted marker.
    pub fn set_active(&self, index: usize) -> Result<()> {
        let mut state = self.inner.lock().unwrap();
        if index >= state.secrets.len() {
            return Err(Error::Validation(format!(
                "key index {} out of range (have {})",
                index,
                state.secrets.len()
            )));
        }
        state.active = Some(index);
        state.exhausted = false;
        Ok(())
    }

    /// Append a secret. Becomes active if the ring had no selection yet.
    pub fn add(&self, secret: impl Into<String>) {
        let mut state = self.inner.lock().unwrap();
        state.secrets.push(secret.into());
        if state.active.is_none() && !state.exhausted {
            state.active = Some(state.secrets.len() - 1);
        }
    }

    /// Remove an entry, keeping the active selection stable where possible.
    pub fn remove(&self, index: usize) -> Result<()> {
        let mut state = self.inner.lock().unwrap();
        if index >= state.secrets.len() {
            return Err(Error::Validation(format!(
                "key index {} out of range (have {})",
                index,
                state.secrets.len()
            )));
        }
        state.secrets.remove(index);
        state.active = match state.active {
            Some(active) if active == index => {
                if state.secrets.is_empty() {
                    None
                } else {
                    Some(active.min(state.secrets.len() - 1))
                }
            }
            Some(active) if active > index => Some(active - 1),
            other => other,
        };
        Ok(())
    }

    /// Advance the active index to the next entry.
    ///
    /// Returns the newly active key, or `None` once the list is exhausted.
    /// Exhaustion is sticky: further calls keep returning `None` rather than
    /// wrapping back to the start.
    pub fn advance(&self) -> Option<ApiKey> {
        let mut state = self.inner.lock().unwrap();
        if state.exhausted {
            return None;
        }

        let next = match state.active {
            Some(index) => index + 1,
            None => 0,
        };

        if next < state.secrets.len() {
            state.active = Some(next);
            Some(ApiKey {
                secret: state.secrets[next].clone(),
                index: next,
            })
        } else {
            state.active = None;
            state.exhausted = true;
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ring_of(n: usize) -> KeyRing {
        KeyRing::new((0..n).map(|i| format!("key-{}", i)).collect())
    }

    #[test]
    fn test_first_key_starts_active() {
        let ring = ring_of(3);
        let active = ring.get_active().unwrap();
        assert_eq!(active.index, 0);
        assert_eq!(active.secret, "key-0");
    }

    #[test]
    fn test_empty_ring_has_no_active() {
        let ring = KeyRing::new(vec![]);
        assert!(ring.get_active().is_none());
        assert!(ring.is_empty());
    }

    #[test]
    fn test_advance_walks_list_then_sticks_at_none() {
        let n = 4;
        let ring = ring_of(n);

        let mut yielded = 0;
        while let Some(key) = ring.advance() {
            yielded += 1;
            assert_eq!(key.index, yielded);
        }
        assert_eq!(yielded, n - 1);

        // Exhaustion is sticky: no wrap-around.
        assert!(ring.advance().is_none());
        assert!(ring.advance().is_none());
        assert!(ring.get_active().is_none());
    }

    #[test]
    fn test_advance_on_empty_ring_exhausts_immediately() {
        let ring = KeyRing::new(vec![]);
        assert!(ring.advance().is_none());
        assert!(ring.advance().is_none());
    }

    #[test]
    fn test_set_active_clears_exhaustion() {
        let ring = ring_of(2);
        while ring.advance().is_some() {}
        assert!(ring.get_active().is_none());

        ring.set_active(0).unwrap();
        assert_eq!(ring.get_active().unwrap().index, 0);
        // Rotation works again from the fresh selection.
        assert_eq!(ring.advance().unwrap().index, 1);
    }

    #[test]
    fn test_set_active_out_of_range() {
        let ring = ring_of(2);
        assert!(ring.set_active(5).is_err());
    }

    #[test]
    fn test_add_activates_when_nothing_selected() {
        let ring = KeyRing::new(vec![]);
        ring.add("key-a");
        assert_eq!(ring.get_active().unwrap().secret, "key-a");

        ring.add("key-b");
        // Selection does not move just because a key was added.
        assert_eq!(ring.get_active().unwrap().secret, "key-a");
    }

    #[test]
    fn test_remove_shifts_active_index() {
        let ring = ring_of(3);
        ring.set_active(2).unwrap();
        ring.remove(0).unwrap();
        assert_eq!(ring.get_active().unwrap().secret, "key-2");
        assert_eq!(ring.get_active().unwrap().index, 1);
    }

    #[test]
    fn test_remove_active_falls_back_to_neighbor() {
        let ring = ring_of(2);
        ring.remove(0).unwrap();
        assert_eq!(ring.get_active().unwrap().secret, "key-1");

        ring.remove(0).unwrap();
        assert!(ring.get_active().is_none());
    }

    #[test]
    fn test_clones_share_state() {
        let ring = ring_of(3);
        let other = ring.clone();

        other.advance();
        assert_eq!(ring.get_active().unwrap().index, 1);
    }
}
