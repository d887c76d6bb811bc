use anyhow::Result;
use chrono::Utc;
use log::{debug, info, warn};
use std::sync::Arc;
use thiserror::Error;

use shared::{DerivedOrder, MoveDirection, RotationState, Session};

use crate::domain::rotation;
use crate::storage::traits::{KidStorage, RotationStateStorage, SessionStorage};

/// Invariant violations the rotation engine surfaces explicitly, as
/// opposed to precondition violations which are silent no-ops.
#[derive(Debug, Error)]
pub enum RotationError {
    /// A mutation was attempted before the singleton was initialized.
    /// The engine never fabricates the record on this path.
    #[error("rotation state has not been initialized")]
    StateNotInitialized,
}

/// Service wrapping the pure rotation core with the record store.
///
/// The engine is the sole writer of the rotation state singleton and of
/// session records; the roster is read-only here. Operations are invoked
/// from a single UI context at a time, so no two mutations ever overlap.
#[derive(Clone)]
pub struct RotationService {
    kid_storage: Arc<dyn KidStorage>,
    state_storage: Arc<dyn RotationStateStorage>,
    session_storage: Arc<dyn SessionStorage>,
}

impl RotationService {
    /// Create a new RotationService
    pub fn new(
        kid_storage: Arc<dyn KidStorage>,
        state_storage: Arc<dyn RotationStateStorage>,
        session_storage: Arc<dyn SessionStorage>,
    ) -> Self {
        Self {
            kid_storage,
            state_storage,
            session_storage,
        }
    }

    /// Create the rotation state singleton with defaults if it does not
    /// exist yet. Must run at startup, before any mutation is reachable.
    pub async fn ensure_initialized(&self) -> Result<RotationState> {
        self.state_storage.init_rotation_state().await
    }

    /// Read the singleton, surfacing its absence as an invariant violation
    async fn require_state(&self) -> Result<RotationState> {
        self.state_storage
            .get_rotation_state()
            .await?
            .ok_or_else(|| RotationError::StateNotInitialized.into())
    }

    /// Tonight's order, derived from the roster and the saved state.
    ///
    /// Read-only: resuming a saved in-progress order (or falling back to
    /// the round-robin default) persists nothing. Returns `None` when the
    /// roster is empty or the singleton is missing; the caller shows the
    /// needs-participants state and offers no rotation operations.
    pub async fn current_order(&self) -> Result<Option<DerivedOrder>> {
        let roster = self.kid_storage.list_kids().await?;
        let state = match self.state_storage.get_rotation_state().await? {
            Some(state) => state,
            None => return Ok(None),
        };

        Ok(rotation::derive_order(&roster, &state))
    }

    /// Manually move the kid at `index` one step earlier or later in
    /// tonight's order, persisting the result as the in-progress order.
    ///
    /// An out-of-bounds move is a silent no-op returning `None`; the UI
    /// disables the boundary buttons so this is unreachable normally.
    pub async fn move_kid(
        &self,
        index: usize,
        direction: MoveDirection,
    ) -> Result<Option<DerivedOrder>> {
        let state = self.require_state().await?;
        let roster = self.kid_storage.list_kids().await?;

        let derived = match rotation::derive_order(&roster, &state) {
            Some(derived) => derived,
            None => return Ok(None),
        };

        let new_order = match rotation::swap_move(&derived.kids, index, direction) {
            Some(order) => order,
            None => {
                debug!("Rejected out-of-bounds move at index {}", index);
                return Ok(None);
            }
        };

        let new_order_ids: Vec<String> = new_order.iter().map(|k| k.id.clone()).collect();
        let new_state = RotationState {
            rotation_index: state.rotation_index,
            current_order: Some(new_order_ids),
            current_lucky_used: derived.lucky_used,
            current_lucky_by_kid_id: derived.lucky_by_kid_id.clone(),
        };
        self.state_storage.update_rotation_state(&new_state).await?;

        info!("Moved kid at index {} {:?}", index, direction);

        Ok(Some(DerivedOrder {
            kids: new_order,
            lucky_used: derived.lucky_used,
            lucky_by_kid_id: derived.lucky_by_kid_id,
            resumed: true,
        }))
    }

    /// One-time lucky splash: uniformly shuffle tonight's order and
    /// persist it, recording the triggering kid for attribution.
    ///
    /// Consumed once per session; a second invocation before a commit is
    /// a silent no-op returning `None`.
    pub async fn lucky_splash(&self, kid_id: &str) -> Result<Option<DerivedOrder>> {
        let state = self.require_state().await?;
        let roster = self.kid_storage.list_kids().await?;

        let derived = match rotation::derive_order(&roster, &state) {
            Some(derived) => derived,
            None => return Ok(None),
        };

        if derived.lucky_used {
            warn!("Lucky splash already used this session, ignoring");
            return Ok(None);
        }

        let shuffled = rotation::shuffled_order(&derived.kids, &mut rand::thread_rng());

        let shuffled_ids: Vec<String> = shuffled.iter().map(|k| k.id.clone()).collect();
        let new_state = RotationState {
            rotation_index: state.rotation_index,
            current_order: Some(shuffled_ids),
            current_lucky_used: true,
            current_lucky_by_kid_id: Some(kid_id.to_string()),
        };
        self.state_storage.update_rotation_state(&new_state).await?;

        info!("Lucky splash triggered by kid {}", kid_id);

        Ok(Some(DerivedOrder {
            kids: shuffled,
            lucky_used: true,
            lucky_by_kid_id: Some(kid_id.to_string()),
            resumed: true,
        }))
    }

    /// Commit tonight's order as an immutable session, advance the
    /// round-robin pointer, and clear the in-progress fields so the next
    /// derivation computes a fresh default order.
    ///
    /// No-op returning `None` when the roster is empty. The session
    /// append and the state write happen back to back with no interleaved
    /// operation (single-writer model).
    pub async fn complete_session(&self) -> Result<Option<Session>> {
        let state = self.require_state().await?;
        let roster = self.kid_storage.list_kids().await?;

        let derived = match rotation::derive_order(&roster, &state) {
            Some(derived) => derived,
            None => {
                warn!("Cannot complete a session with an empty roster");
                return Ok(None);
            }
        };

        let session = Session {
            id: Session::generate_id(),
            timestamp: Utc::now().to_rfc3339(),
            kid_order: derived.kids.iter().map(|k| k.id.clone()).collect(),
            lucky_used: derived.lucky_used,
            lucky_by_kid_id: derived.lucky_by_kid_id.clone(),
        };
        self.session_storage.append_session(&session).await?;

        let new_state = RotationState {
            rotation_index: rotation::advance_rotation_index(state.rotation_index, roster.len()),
            current_order: None,
            current_lucky_used: false,
            current_lucky_by_kid_id: None,
        };
        self.state_storage.update_rotation_state(&new_state).await?;

        info!(
            "Completed session {} ({} kids, rotation index now {})",
            session.id,
            session.kid_order.len(),
            new_state.rotation_index
        );

        Ok(Some(session))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::csv::{
        CsvConnection, KidRepository, RotationStateRepository, SessionRepository,
    };
    use shared::Kid;
    use tempfile::TempDir;

    struct Fixture {
        _temp: TempDir,
        kid_repo: Arc<KidRepository>,
        session_repo: Arc<SessionRepository>,
        state_repo: Arc<RotationStateRepository>,
        service: RotationService,
    }

    fn setup() -> Fixture {
        let temp = TempDir::new().unwrap();
        let connection = CsvConnection::new(temp.path()).unwrap();

        let kid_repo = Arc::new(KidRepository::new(connection.clone()));
        let session_repo = Arc::new(SessionRepository::new(connection.clone()));
        let state_repo = Arc::new(RotationStateRepository::new(connection));

        let service = RotationService::new(
            kid_repo.clone(),
            state_repo.clone(),
            session_repo.clone(),
        );

        Fixture {
            _temp: temp,
            kid_repo,
            session_repo,
            state_repo,
            service,
        }
    }

    async fn add_roster(fixture: &Fixture, names: &[&str]) -> Vec<Kid> {
        let mut kids = Vec::new();
        for (i, name) in names.iter().enumerate() {
            let kid = Kid {
                id: format!("kid-{}", name),
                name: name.to_string(),
                avatar: None,
                created_at: format!("2025-01-0{}T10:00:00+00:00", i + 1),
            };
            fixture.kid_repo.store_kid(&kid).await.unwrap();
            kids.push(kid);
        }
        kids
    }

    fn names(derived: &DerivedOrder) -> Vec<&str> {
        derived.kids.iter().map(|k| k.name.as_str()).collect()
    }

    #[tokio::test]
    async fn current_order_without_state_or_kids() {
        let fixture = setup();

        // No singleton yet
        assert!(fixture.service.current_order().await.unwrap().is_none());

        // Singleton but empty roster
        fixture.service.ensure_initialized().await.unwrap();
        assert!(fixture.service.current_order().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn mutations_before_initialization_fail_explicitly() {
        let fixture = setup();
        add_roster(&fixture, &["a", "b"]).await;

        let err = fixture
            .service
            .move_kid(1, MoveDirection::Earlier)
            .await
            .unwrap_err();
        assert!(err.downcast_ref::<RotationError>().is_some());

        let err = fixture.service.lucky_splash("kid-a").await.unwrap_err();
        assert!(err.downcast_ref::<RotationError>().is_some());

        let err = fixture.service.complete_session().await.unwrap_err();
        assert!(err.downcast_ref::<RotationError>().is_some());
    }

    #[tokio::test]
    async fn default_order_follows_rotation_index() {
        let fixture = setup();
        add_roster(&fixture, &["a", "b", "c"]).await;
        fixture.service.ensure_initialized().await.unwrap();

        let derived = fixture.service.current_order().await.unwrap().unwrap();
        assert_eq!(names(&derived), vec!["a", "b", "c"]);
        assert!(!derived.resumed);
    }

    #[tokio::test]
    async fn move_persists_and_survives_reload() {
        let fixture = setup();
        add_roster(&fixture, &["a", "b", "c"]).await;
        fixture.service.ensure_initialized().await.unwrap();

        let moved = fixture
            .service
            .move_kid(1, MoveDirection::Earlier)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(names(&moved), vec!["b", "a", "c"]);

        // A fresh service over the same store resumes the saved order
        let reloaded = RotationService::new(
            fixture.kid_repo.clone(),
            fixture.state_repo.clone(),
            fixture.session_repo.clone(),
        );
        let derived = reloaded.current_order().await.unwrap().unwrap();
        assert_eq!(names(&derived), vec!["b", "a", "c"]);
        assert!(derived.resumed);
    }

    #[tokio::test]
    async fn boundary_moves_are_silent_noops() {
        let fixture = setup();
        add_roster(&fixture, &["a", "b", "c"]).await;
        fixture.service.ensure_initialized().await.unwrap();

        assert!(fixture
            .service
            .move_kid(0, MoveDirection::Earlier)
            .await
            .unwrap()
            .is_none());
        assert!(fixture
            .service
            .move_kid(2, MoveDirection::Later)
            .await
            .unwrap()
            .is_none());

        // State unchanged: derivation still yields the untouched default
        let derived = fixture.service.current_order().await.unwrap().unwrap();
        assert_eq!(names(&derived), vec!["a", "b", "c"]);
        assert!(!derived.resumed);
    }

    #[tokio::test]
    async fn lucky_splash_shuffles_once_then_blocks() {
        let fixture = setup();
        let kids = add_roster(&fixture, &["a", "b", "c", "d"]).await;
        fixture.service.ensure_initialized().await.unwrap();

        let shuffled = fixture
            .service
            .lucky_splash("kid-b")
            .await
            .unwrap()
            .unwrap();
        assert!(shuffled.lucky_used);
        assert_eq!(shuffled.lucky_by_kid_id.as_deref(), Some("kid-b"));

        // Permutation: same multiset of ids
        let mut expected: Vec<_> = kids.iter().map(|k| k.id.clone()).collect();
        let mut actual: Vec<_> = shuffled.kids.iter().map(|k| k.id.clone()).collect();
        expected.sort();
        actual.sort();
        assert_eq!(expected, actual);

        // Second invocation before a commit is rejected and changes nothing
        assert!(fixture.service.lucky_splash("kid-a").await.unwrap().is_none());
        let derived = fixture.service.current_order().await.unwrap().unwrap();
        assert_eq!(derived.kids, shuffled.kids);
        assert_eq!(derived.lucky_by_kid_id.as_deref(), Some("kid-b"));
    }

    #[tokio::test]
    async fn complete_session_is_a_noop_with_no_kids() {
        let fixture = setup();
        fixture.service.ensure_initialized().await.unwrap();

        assert!(fixture.service.complete_session().await.unwrap().is_none());
        assert_eq!(fixture.session_repo.session_count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn complete_session_records_history_and_resets_state() {
        let fixture = setup();
        add_roster(&fixture, &["a", "b", "c"]).await;
        fixture.service.ensure_initialized().await.unwrap();

        let session = fixture
            .service
            .complete_session()
            .await
            .unwrap()
            .unwrap();
        assert_eq!(session.kid_order, vec!["kid-a", "kid-b", "kid-c"]);
        assert!(!session.lucky_used);

        let state = fixture
            .state_repo
            .get_rotation_state()
            .await
            .unwrap()
            .unwrap();
        assert_eq!(state.rotation_index, 1);
        assert!(state.current_order.is_none());
        assert!(!state.current_lucky_used);
        assert!(state.current_lucky_by_kid_id.is_none());

        let sessions = fixture.session_repo.list_sessions().await.unwrap();
        assert_eq!(sessions, vec![session]);
    }

    #[tokio::test]
    async fn rotation_index_wraps_after_full_cycle() {
        let fixture = setup();
        add_roster(&fixture, &["a", "b", "c"]).await;
        fixture.service.ensure_initialized().await.unwrap();

        for expected_index in [1, 2, 0] {
            fixture.service.complete_session().await.unwrap().unwrap();
            let state = fixture
                .state_repo
                .get_rotation_state()
                .await
                .unwrap()
                .unwrap();
            assert_eq!(state.rotation_index, expected_index);
        }
    }

    #[tokio::test]
    async fn lucky_session_end_to_end() {
        // Spec walkthrough: roster [a, b, c], index 0, lucky by b, commit
        let fixture = setup();
        add_roster(&fixture, &["a", "b", "c"]).await;
        fixture.service.ensure_initialized().await.unwrap();

        let derived = fixture.service.current_order().await.unwrap().unwrap();
        assert_eq!(names(&derived), vec!["a", "b", "c"]);

        let shuffled = fixture
            .service
            .lucky_splash("kid-b")
            .await
            .unwrap()
            .unwrap();

        let session = fixture
            .service
            .complete_session()
            .await
            .unwrap()
            .unwrap();
        let shuffled_ids: Vec<_> = shuffled.kids.iter().map(|k| k.id.clone()).collect();
        assert_eq!(session.kid_order, shuffled_ids);
        assert!(session.lucky_used);
        assert_eq!(session.lucky_by_kid_id.as_deref(), Some("kid-b"));

        // Next derivation is the fresh default starting at index 1
        let derived = fixture.service.current_order().await.unwrap().unwrap();
        assert_eq!(names(&derived), vec!["b", "c", "a"]);
        assert!(!derived.lucky_used);
        assert!(!derived.resumed);
    }

    #[tokio::test]
    async fn saved_order_is_discarded_after_roster_change() {
        let fixture = setup();
        add_roster(&fixture, &["a", "b", "c"]).await;
        fixture.service.ensure_initialized().await.unwrap();

        fixture
            .service
            .move_kid(2, MoveDirection::Earlier)
            .await
            .unwrap()
            .unwrap();

        // Roster grows to 4; the saved 3-kid order is stale
        let newcomer = Kid {
            id: "kid-d".to_string(),
            name: "d".to_string(),
            avatar: None,
            created_at: "2025-01-09T10:00:00+00:00".to_string(),
        };
        fixture.kid_repo.store_kid(&newcomer).await.unwrap();

        let derived = fixture.service.current_order().await.unwrap().unwrap();
        assert_eq!(names(&derived), vec!["a", "b", "c", "d"]);
        assert!(!derived.resumed);
    }
}
