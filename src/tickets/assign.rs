use rand::Rng;
use uuid::Uuid;

use crate::store::{Store, StoreError};

/// Open-ticket load per agent, in agent creation order.
pub async fn agent_open_counts(store: &dyn Store) -> Result<Vec<(Uuid, usize)>, StoreError> {
    let agents = store.list_agents().await?;
    let mut counts = Vec::with_capacity(agents.len());
    for agent in &agents {
        counts.push((agent.id, store.count_assigned_active(agent.id).await?));
    }
    Ok(counts)
}

/// Greedy load balancing: the least-loaded agent wins, ties broken uniformly
/// at random. Ties are the common case right after provisioning, so the
/// random draw is what keeps assignment fair rather than biased toward the
/// first-created agent. The rng is injected so tests can seed it.
///
/// The count-then-pick sequence is not isolated against concurrent ticket
/// creation; two simultaneous creations may land on the same agent. That
/// transient imbalance is tolerated.
pub fn pick_min_loaded<R: Rng + ?Sized>(counts: &[(Uuid, usize)], rng: &mut R) -> Option<Uuid> {
    if counts.is_empty() {
        return None;
    }
    let min = counts.iter().map(|(_, c)| *c).min()?;
    let tied: Vec<Uuid> = counts
        .iter()
        .filter(|(_, c)| *c == min)
        .map(|(id, _)| *id)
        .collect();
    Some(tied[rng.random_range(0..tied.len())])
}
