use crate::models::{AggregatedPresence, ClientPresence, PresenceStatus, UserId};
use std::collections::HashMap;

/// Fold one user's per-client reports into a single status at time `now`.
///
/// A report is fresh when it is younger than `offline_threshold_secs`. Any
/// fresh `active` report makes the user active; failing that, any fresh
/// `idle` report makes them idle; otherwise they are offline. The client
/// name is taken from the freshest report of the winning status, and the
/// timestamp is the newest across all reports.
pub fn aggregate(
    clients: &HashMap<String, ClientPresence>,
    offline_threshold_secs: u64,
    now: u64,
) -> AggregatedPresence {
    let timestamp = clients.values().map(|c| c.timestamp).max().unwrap_or(0);
    let is_fresh = |presence: &ClientPresence| now.saturating_sub(presence.timestamp) < offline_threshold_secs;

    let freshest_with = |status: PresenceStatus| {
        clients
            .iter()
            .filter(|(_, presence)| presence.status == status && is_fresh(*presence))
            .max_by(|(a_name, a), (b_name, b)| {
                // Ties broken by name so the result doesn't depend on map order.
                a.timestamp.cmp(&b.timestamp).then_with(|| b_name.cmp(a_name))
            })
            .map(|(name, _)| name.clone())
    };

    for status in [PresenceStatus::Active, PresenceStatus::Idle] {
        if let Some(client) = freshest_with(status) {
            return AggregatedPresence {
                client,
                status,
                timestamp,
            };
        }
    }

    AggregatedPresence {
        client: String::new(),
        status: PresenceStatus::Offline,
        timestamp,
    }
}

#[derive(Debug, Clone)]
pub struct UserPresence {
    pub clients: HashMap<String, ClientPresence>,
    pub aggregated: AggregatedPresence,
}

/// Sub-store for per-user presence reports.
pub struct PresenceStore {
    users: HashMap<UserId, UserPresence>,
    offline_threshold_secs: u64,
}

impl PresenceStore {
    pub fn new(offline_threshold_secs: u64) -> Self {
        Self {
            users: HashMap::new(),
            offline_threshold_secs,
        }
    }

    pub fn clear(&mut self) {
        self.users.clear();
    }

    // ===== Getters =====

    pub fn offline_threshold_secs(&self) -> u64 {
        self.offline_threshold_secs
    }

    pub fn get(&self, user_id: UserId) -> Option<&UserPresence> {
        self.users.get(&user_id)
    }

    pub fn user_ids(&self) -> impl Iterator<Item = UserId> + '_ {
        self.users.keys().copied()
    }

    /// Status recomputed from the raw reports at `now`, rather than the
    /// cached aggregate from the last update.
    pub fn status_for_user(&self, user_id: UserId, now: u64) -> PresenceStatus {
        self.users
            .get(&user_id)
            .map(|p| aggregate(&p.clients, self.offline_threshold_secs, now).status)
            .unwrap_or(PresenceStatus::Offline)
    }

    // ===== Event Handlers =====

    pub fn set_offline_threshold_secs(&mut self, secs: u64) {
        self.offline_threshold_secs = secs;
    }

    /// Bulk response: each listed user's reports are replaced.
    pub fn load(&mut self, presences: &HashMap<UserId, HashMap<String, ClientPresence>>, server_timestamp: u64) {
        for (user_id, clients) in presences {
            let aggregated = aggregate(clients, self.offline_threshold_secs, server_timestamp);
            self.users.insert(
                *user_id,
                UserPresence {
                    clients: clients.clone(),
                    aggregated,
                },
            );
        }
    }

    /// Live update: per-client upsert into the user's reports.
    pub fn update(&mut self, user_id: UserId, presence: &HashMap<String, ClientPresence>, server_timestamp: u64) {
        let threshold = self.offline_threshold_secs;
        let entry = self.users.entry(user_id).or_insert_with(|| UserPresence {
            clients: HashMap::new(),
            aggregated: AggregatedPresence::offline(),
        });
        for (client, report) in presence {
            entry.clients.insert(client.clone(), report.clone());
        }
        entry.aggregated = aggregate(&entry.clients, threshold, server_timestamp);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_test_clients(reports: &[(&str, PresenceStatus, u64)]) -> HashMap<String, ClientPresence> {
        reports
            .iter()
            .map(|(name, status, timestamp)| {
                (
                    name.to_string(),
                    ClientPresence {
                        status: *status,
                        timestamp: *timestamp,
                    },
                )
            })
            .collect()
    }

    #[test]
    fn test_stale_idle_loses_to_fresh_active() {
        let now = 10_000;
        let clients = make_test_clients(&[
            ("website", PresenceStatus::Active, now - 100),
            ("mobile", PresenceStatus::Idle, now - 220),
        ]);
        let result = aggregate(&clients, 140, now);
        assert_eq!(result.status, PresenceStatus::Active);
        assert_eq!(result.client, "website");
        assert_eq!(result.timestamp, now - 100);
    }

    #[test]
    fn test_fresh_idle_when_active_is_stale() {
        let now = 10_000;
        let clients = make_test_clients(&[
            ("website", PresenceStatus::Active, now - 500),
            ("mobile", PresenceStatus::Idle, now - 10),
        ]);
        let result = aggregate(&clients, 140, now);
        assert_eq!(result.status, PresenceStatus::Idle);
        assert_eq!(result.client, "mobile");
    }

    #[test]
    fn test_all_stale_is_offline_with_latest_timestamp() {
        let now = 10_000;
        let clients = make_test_clients(&[
            ("website", PresenceStatus::Active, now - 500),
            ("mobile", PresenceStatus::Idle, now - 300),
        ]);
        let result = aggregate(&clients, 140, now);
        assert_eq!(result.status, PresenceStatus::Offline);
        assert_eq!(result.client, "");
        assert_eq!(result.timestamp, now - 300);
    }

    #[test]
    fn test_freshest_active_client_wins() {
        let now = 10_000;
        let clients = make_test_clients(&[
            ("website", PresenceStatus::Active, now - 60),
            ("mobile", PresenceStatus::Active, now - 5),
        ]);
        assert_eq!(aggregate(&clients, 140, now).client, "mobile");
    }

    #[test]
    fn test_update_merges_clients_and_recomputes() {
        let mut store = PresenceStore::new(140);
        store.update(7, &make_test_clients(&[("website", PresenceStatus::Idle, 1000)]), 1000);
        assert_eq!(store.get(7).unwrap().aggregated.status, PresenceStatus::Idle);

        store.update(7, &make_test_clients(&[("mobile", PresenceStatus::Active, 1010)]), 1010);
        let presence = store.get(7).unwrap();
        assert_eq!(presence.clients.len(), 2);
        assert_eq!(presence.aggregated.status, PresenceStatus::Active);

        assert_eq!(store.status_for_user(7, 1100), PresenceStatus::Active);
        assert_eq!(store.status_for_user(7, 2000), PresenceStatus::Offline);
        assert_eq!(store.status_for_user(99, 1000), PresenceStatus::Offline);
    }
}
