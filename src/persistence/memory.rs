//! In-process store used when persistence is disabled and in tests.
//!
//! Mirrors the Postgres schema rules: serial ids, one active Game per
//! machine, and the same ordering for "latest" lookups.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use super::{
    GameRepository, GameStateRepository, MachineRepository, PlayRepository, StorageError,
    StorageResult,
};
use crate::domain::{
    Game, GameId, GameState, Machine, MachineId, NewGame, NewGameState, NewPlay, Play, PlayKey,
    ScoreRecord,
};

#[derive(Debug, Default)]
struct Inner {
    machines: BTreeMap<MachineId, Machine>,
    games: Vec<Game>,
    states: Vec<GameState>,
    plays: Vec<Play>,
    next_game_id: i64,
    next_state_id: i64,
    next_play_id: i64,
}

impl Inner {
    fn game(&self, id: GameId) -> Option<&Game> {
        self.games.iter().find(|g| g.id == id)
    }

    /// Newest-first ordering shared by every "latest" query: date, then id.
    fn newest_first<'a>(games: impl Iterator<Item = &'a Game>) -> Vec<&'a Game> {
        let mut games: Vec<&Game> = games.collect();
        games.sort_by(|a, b| b.date.cmp(&a.date).then(b.id.cmp(&a.id)));
        games
    }
}

/// Store that keeps every row in memory behind a single async lock.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MachineRepository for MemoryStore {
    async fn upsert_machine(&self, machine: &Machine) -> StorageResult<()> {
        let mut inner = self.inner.write().await;
        inner.machines.insert(machine.id.clone(), machine.clone());
        Ok(())
    }

    async fn get_machine(&self, id: &MachineId) -> StorageResult<Option<Machine>> {
        Ok(self.inner.read().await.machines.get(id).cloned())
    }

    async fn list_machines(&self) -> StorageResult<Vec<Machine>> {
        Ok(self.inner.read().await.machines.values().cloned().collect())
    }
}

#[async_trait]
impl GameRepository for MemoryStore {
    async fn create_game(&self, game: NewGame) -> StorageResult<Game> {
        let mut inner = self.inner.write().await;
        if game.active
            && inner
                .games
                .iter()
                .any(|g| g.active && g.machine_id == game.machine_id)
        {
            return Err(StorageError::Conflict(format!(
                "machine {} already has an active game",
                game.machine_id
            )));
        }
        inner.next_game_id += 1;
        let created = Game {
            id: GameId::new(inner.next_game_id),
            machine_id: game.machine_id,
            date: game.date,
            active: game.active,
        };
        inner.games.push(created.clone());
        Ok(created)
    }

    async fn set_game_active(&self, id: GameId, active: bool) -> StorageResult<()> {
        let mut inner = self.inner.write().await;
        let machine_id = inner
            .game(id)
            .map(|g| g.machine_id.clone())
            .ok_or_else(|| StorageError::NotFound(format!("game {id}")))?;
        if active
            && inner
                .games
                .iter()
                .any(|g| g.active && g.id != id && g.machine_id == machine_id)
        {
            return Err(StorageError::Conflict(format!(
                "machine {machine_id} already has an active game"
            )));
        }
        if let Some(game) = inner.games.iter_mut().find(|g| g.id == id) {
            game.active = active;
        }
        Ok(())
    }

    async fn latest_game(&self, machine: &MachineId) -> StorageResult<Option<Game>> {
        let inner = self.inner.read().await;
        let games = Inner::newest_first(inner.games.iter().filter(|g| &g.machine_id == machine));
        let current = games
            .iter()
            .find(|g| g.active)
            .or_else(|| games.first())
            .map(|g| (*g).clone());
        Ok(current)
    }

    async fn latest_inactive_game(&self, machine: &MachineId) -> StorageResult<Option<Game>> {
        let inner = self.inner.read().await;
        let games = Inner::newest_first(
            inner
                .games
                .iter()
                .filter(|g| &g.machine_id == machine && !g.active),
        );
        Ok(games.first().map(|g| (*g).clone()))
    }

    async fn games_for_machine(&self, machine: &MachineId) -> StorageResult<Vec<Game>> {
        let inner = self.inner.read().await;
        Ok(
            Inner::newest_first(inner.games.iter().filter(|g| &g.machine_id == machine))
                .into_iter()
                .cloned()
                .collect(),
        )
    }
}

#[async_trait]
impl GameStateRepository for MemoryStore {
    async fn append_state(&self, state: NewGameState) -> StorageResult<GameState> {
        let mut inner = self.inner.write().await;
        if inner.game(state.game_id).is_none() {
            return Err(StorageError::NotFound(format!("game {}", state.game_id)));
        }
        inner.next_state_id += 1;
        let stored = GameState {
            id: inner.next_state_id,
            game_id: state.game_id,
            state: state.state,
            timestamp: state.timestamp,
        };
        inner.states.push(stored.clone());
        Ok(stored)
    }

    async fn latest_state(&self, game: GameId) -> StorageResult<Option<GameState>> {
        let inner = self.inner.read().await;
        Ok(inner
            .states
            .iter()
            .filter(|s| s.game_id == game)
            .max_by(|a, b| a.timestamp.cmp(&b.timestamp).then(a.id.cmp(&b.id)))
            .cloned())
    }

    async fn states_for_game(&self, game: GameId) -> StorageResult<Vec<GameState>> {
        let inner = self.inner.read().await;
        Ok(inner
            .states
            .iter()
            .filter(|s| s.game_id == game)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl PlayRepository for MemoryStore {
    async fn insert_play(&self, play: NewPlay) -> StorageResult<Play> {
        let mut inner = self.inner.write().await;
        if inner.game(play.game_id).is_none() {
            return Err(StorageError::NotFound(format!("game {}", play.game_id)));
        }
        inner.next_play_id += 1;
        let stored = Play {
            id: inner.next_play_id,
            game_id: play.game_id,
            score: play.score,
            initials: play.initials,
            duration_seconds: play.duration_seconds,
        };
        inner.plays.push(stored.clone());
        Ok(stored)
    }

    async fn play_exists(&self, key: PlayKey<'_>) -> StorageResult<bool> {
        let inner = self.inner.read().await;
        Ok(inner.plays.iter().any(|play| {
            play.score == key.score
                && play.initials == key.initials
                && inner.game(play.game_id).is_some_and(|game| {
                    &game.machine_id == key.machine_id && calendar_day(game.date) == key.day
                })
        }))
    }

    async fn plays_for_game(&self, game: GameId) -> StorageResult<Vec<Play>> {
        let inner = self.inner.read().await;
        Ok(inner
            .plays
            .iter()
            .filter(|p| p.game_id == game)
            .cloned()
            .collect())
    }

    async fn top_scores(
        &self,
        machine: Option<&MachineId>,
        limit: u32,
    ) -> StorageResult<Vec<ScoreRecord>> {
        let inner = self.inner.read().await;
        let mut records: Vec<ScoreRecord> = inner
            .plays
            .iter()
            .filter_map(|play| {
                let game = inner.game(play.game_id)?;
                if machine.is_some_and(|m| m != &game.machine_id) {
                    return None;
                }
                Some(ScoreRecord {
                    play_id: play.id,
                    machine_id: game.machine_id.clone(),
                    date: game.date,
                    score: play.score,
                    initials: play.initials.clone(),
                    duration_seconds: play.duration_seconds,
                })
            })
            .collect();
        records.sort_by(|a, b| b.score.cmp(&a.score).then(a.play_id.cmp(&b.play_id)));
        records.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
        Ok(records)
    }
}

fn calendar_day(date: DateTime<Utc>) -> chrono::NaiveDate {
    date.date_naive()
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate, TimeZone};
    use serde_json::json;

    fn new_game(machine: &str, date: DateTime<Utc>, active: bool) -> NewGame {
        NewGame {
            machine_id: MachineId::new(machine),
            date,
            active,
        }
    }

    #[tokio::test]
    async fn upsert_replaces_machine() {
        let store = MemoryStore::new();
        let now = Utc::now();
        let mut machine = Machine {
            id: MachineId::new("10.0.0.5"),
            title: "Medieval Madness".to_string(),
            version: "1.2".to_string(),
            last_seen: now,
        };
        let Ok(()) = store.upsert_machine(&machine).await else {
            panic!("upsert failed");
        };
        machine.version = "1.3".to_string();
        let Ok(()) = store.upsert_machine(&machine).await else {
            panic!("upsert failed");
        };

        let Ok(machines) = store.list_machines().await else {
            panic!("list failed");
        };
        assert_eq!(machines.len(), 1);
        assert_eq!(machines.first().map(|m| m.version.as_str()), Some("1.3"));
    }

    #[tokio::test]
    async fn second_active_game_conflicts() {
        let store = MemoryStore::new();
        let now = Utc::now();
        assert!(store.create_game(new_game("10.0.0.5", now, true)).await.is_ok());
        let second = store.create_game(new_game("10.0.0.5", now, true)).await;
        assert!(matches!(second, Err(StorageError::Conflict(_))));

        // Another machine is unaffected.
        assert!(store.create_game(new_game("10.0.0.6", now, true)).await.is_ok());
    }

    #[tokio::test]
    async fn latest_game_prefers_active_over_newer_inactive() {
        let store = MemoryStore::new();
        let now = Utc::now();
        let Ok(live) = store
            .create_game(new_game("10.0.0.5", now - Duration::hours(2), true))
            .await
        else {
            panic!("create failed");
        };
        let Ok(_) = store.create_game(new_game("10.0.0.5", now, false)).await else {
            panic!("create failed");
        };

        let Ok(Some(latest)) = store.latest_game(&MachineId::new("10.0.0.5")).await else {
            panic!("expected a game");
        };
        assert_eq!(latest.id, live.id);
    }

    #[tokio::test]
    async fn latest_inactive_breaks_date_ties_by_id() {
        let store = MemoryStore::new();
        let date = Utc::now();
        let Ok(_) = store.create_game(new_game("10.0.0.5", date, false)).await else {
            panic!("create failed");
        };
        let Ok(second) = store.create_game(new_game("10.0.0.5", date, false)).await else {
            panic!("create failed");
        };
        let Ok(Some(latest)) = store
            .latest_inactive_game(&MachineId::new("10.0.0.5"))
            .await
        else {
            panic!("expected a game");
        };
        assert_eq!(latest.id, second.id);
    }

    #[tokio::test]
    async fn set_active_on_missing_game_is_not_found() {
        let store = MemoryStore::new();
        let result = store.set_game_active(GameId::new(99), false).await;
        assert!(matches!(result, Err(StorageError::NotFound(_))));
    }

    #[tokio::test]
    async fn latest_state_is_last_appended() {
        let store = MemoryStore::new();
        let now = Utc::now();
        let Ok(game) = store.create_game(new_game("10.0.0.5", now, true)).await else {
            panic!("create failed");
        };
        for ball in 1..=3 {
            let Ok(_) = store
                .append_state(NewGameState {
                    game_id: game.id,
                    state: json!({"GameActive": true, "Ball": ball}),
                    timestamp: now,
                })
                .await
            else {
                panic!("append failed");
            };
        }
        let Ok(Some(latest)) = store.latest_state(game.id).await else {
            panic!("expected a state");
        };
        assert_eq!(latest.state, json!({"GameActive": true, "Ball": 3}));
    }

    #[tokio::test]
    async fn play_exists_matches_calendar_day() {
        let store = MemoryStore::new();
        let evening = Utc.with_ymd_and_hms(2024, 1, 1, 21, 30, 0).single();
        let Some(evening) = evening else {
            panic!("valid timestamp");
        };
        let Ok(game) = store.create_game(new_game("10.0.0.5", evening, false)).await else {
            panic!("create failed");
        };
        let Ok(_) = store
            .insert_play(NewPlay {
                game_id: game.id,
                score: 100,
                initials: "AAA".to_string(),
                duration_seconds: None,
            })
            .await
        else {
            panic!("insert failed");
        };

        let machine = MachineId::new("10.0.0.5");
        let Some(day) = NaiveDate::from_ymd_opt(2024, 1, 1) else {
            panic!("valid date");
        };
        let key = PlayKey {
            machine_id: &machine,
            day,
            score: 100,
            initials: "AAA",
        };
        assert!(matches!(store.play_exists(key.clone()).await, Ok(true)));

        let other_day = PlayKey {
            day: day.succ_opt().unwrap_or(day),
            ..key.clone()
        };
        assert!(matches!(store.play_exists(other_day).await, Ok(false)));

        let other_initials = PlayKey {
            initials: "BBB",
            ..key
        };
        assert!(matches!(store.play_exists(other_initials).await, Ok(false)));
    }

    #[tokio::test]
    async fn top_scores_orders_and_filters() {
        let store = MemoryStore::new();
        let now = Utc::now();
        for (machine, score) in [("10.0.0.5", 10), ("10.0.0.5", 300), ("10.0.0.6", 200)] {
            let Ok(game) = store.create_game(new_game(machine, now, false)).await else {
                panic!("create failed");
            };
            let Ok(_) = store
                .insert_play(NewPlay {
                    game_id: game.id,
                    score,
                    initials: "AAA".to_string(),
                    duration_seconds: None,
                })
                .await
            else {
                panic!("insert failed");
            };
        }

        let Ok(all) = store.top_scores(None, 2).await else {
            panic!("query failed");
        };
        let scores: Vec<i64> = all.iter().map(|r| r.score).collect();
        assert_eq!(scores, vec![300, 200]);

        let machine = MachineId::new("10.0.0.6");
        let Ok(one) = store.top_scores(Some(&machine), 10).await else {
            panic!("query failed");
        };
        assert_eq!(one.len(), 1);
    }
}
