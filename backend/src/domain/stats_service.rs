use anyhow::Result;
use log::info;
use std::sync::Arc;

use shared::KidPositionStats;

use crate::storage::traits::{KidStorage, SessionStorage};

/// Statistics aggregator: per-kid position counts over the full session
/// history. Recomputed from scratch on every call; no caching, no
/// incremental maintenance.
#[derive(Clone)]
pub struct StatsService {
    kid_storage: Arc<dyn KidStorage>,
    session_storage: Arc<dyn SessionStorage>,
}

impl StatsService {
    /// Create a new StatsService
    pub fn new(kid_storage: Arc<dyn KidStorage>, session_storage: Arc<dyn SessionStorage>) -> Self {
        Self {
            kid_storage,
            session_storage,
        }
    }

    /// For each roster kid: how many sessions placed them at each ordinal
    /// position (up to the current roster size), plus a total. Kids with
    /// no sessions report all zeros. History entries whose kid ID no
    /// longer resolves are skipped. Sorted by total descending.
    pub async fn position_stats(&self) -> Result<Vec<KidPositionStats>> {
        let roster = self.kid_storage.list_kids().await?;
        let sessions = self.session_storage.list_sessions().await?;

        let positions = roster.len();
        let mut stats: Vec<KidPositionStats> = roster
            .iter()
            .map(|kid| KidPositionStats {
                kid_id: kid.id.clone(),
                name: kid.name.clone(),
                position_counts: vec![0; positions],
                total: 0,
            })
            .collect();

        for session in &sessions {
            for (position, kid_id) in session.kid_order.iter().enumerate() {
                let Some(entry) = stats.iter_mut().find(|s| &s.kid_id == kid_id) else {
                    // Kid was deleted after this session; history keeps
                    // the dangling id
                    continue;
                };

                entry.total += 1;
                // Sessions logged when the roster was larger may carry
                // positions past the current roster size
                if position < positions {
                    entry.position_counts[position] += 1;
                }
            }
        }

        stats.sort_by(|a, b| b.total.cmp(&a.total));

        info!(
            "Computed position stats for {} kids over {} sessions",
            positions,
            sessions.len()
        );

        Ok(stats)
    }
}
