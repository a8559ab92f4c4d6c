//! PostgreSQL implementation of the repositories.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

use super::{
    GameRepository, GameStateRepository, MachineRepository, PlayRepository, StorageError,
    StorageResult,
};
use crate::config::BragboardConfig;
use crate::domain::{
    Game, GameId, GameState, Machine, MachineId, NewGame, NewGameState, NewPlay, Play, PlayKey,
    ScoreRecord,
};

/// Name of the partial unique index guarding one active game per machine.
const ONE_ACTIVE_GAME_INDEX: &str = "games_one_active_per_machine";

type GameRow = (i64, String, DateTime<Utc>, bool);
type GameStateRow = (i64, i64, serde_json::Value, DateTime<Utc>);
type PlayRow = (i64, i64, i64, String, Option<i32>);
type ScoreRow = (i64, String, DateTime<Utc>, i64, String, Option<i32>);

/// PostgreSQL-backed store using `sqlx::PgPool`.
#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Creates a store over an existing connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Opens a connection pool sized from the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Database`] if the database cannot be reached.
    pub async fn connect(config: &BragboardConfig) -> StorageResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.database_max_connections)
            .min_connections(config.database_min_connections)
            .acquire_timeout(Duration::from_secs(config.database_connect_timeout_secs))
            .connect(&config.database_url)
            .await?;
        Ok(Self::new(pool))
    }

    /// Applies the embedded schema migrations.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Migration`] if a migration fails.
    pub async fn migrate(&self) -> StorageResult<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

fn game_from_row((id, machine_id, date, active): GameRow) -> Game {
    Game {
        id: GameId::new(id),
        machine_id: MachineId::new(machine_id),
        date,
        active,
    }
}

fn state_from_row((id, game_id, state, timestamp): GameStateRow) -> GameState {
    GameState {
        id,
        game_id: GameId::new(game_id),
        state,
        timestamp,
    }
}

fn play_from_row((id, game_id, score, initials, duration_seconds): PlayRow) -> Play {
    Play {
        id,
        game_id: GameId::new(game_id),
        score,
        initials,
        duration_seconds,
    }
}

/// Maps a violation of the one-active-game index to [`StorageError::Conflict`].
fn map_active_conflict(err: sqlx::Error, machine: &MachineId) -> StorageError {
    if let sqlx::Error::Database(db) = &err
        && db.constraint() == Some(ONE_ACTIVE_GAME_INDEX)
    {
        return StorageError::Conflict(format!("machine {machine} already has an active game"));
    }
    StorageError::Database(err)
}

#[async_trait]
impl MachineRepository for PostgresStore {
    async fn upsert_machine(&self, machine: &Machine) -> StorageResult<()> {
        sqlx::query(
            "INSERT INTO machines (id, title, version, last_seen) VALUES ($1, $2, $3, $4) \
             ON CONFLICT (id) DO UPDATE SET title = EXCLUDED.title, \
             version = EXCLUDED.version, last_seen = EXCLUDED.last_seen",
        )
        .bind(machine.id.as_str())
        .bind(&machine.title)
        .bind(&machine.version)
        .bind(machine.last_seen)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_machine(&self, id: &MachineId) -> StorageResult<Option<Machine>> {
        let row = sqlx::query_as::<_, (String, String, String, DateTime<Utc>)>(
            "SELECT id, title, version, last_seen FROM machines WHERE id = $1",
        )
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|(id, title, version, last_seen)| Machine {
            id: MachineId::new(id),
            title,
            version,
            last_seen,
        }))
    }

    async fn list_machines(&self) -> StorageResult<Vec<Machine>> {
        let rows = sqlx::query_as::<_, (String, String, String, DateTime<Utc>)>(
            "SELECT id, title, version, last_seen FROM machines ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(id, title, version, last_seen)| Machine {
                id: MachineId::new(id),
                title,
                version,
                last_seen,
            })
            .collect())
    }
}

#[async_trait]
impl GameRepository for PostgresStore {
    async fn create_game(&self, game: NewGame) -> StorageResult<Game> {
        let row = sqlx::query_as::<_, GameRow>(
            "INSERT INTO games (machine_id, date, active) VALUES ($1, $2, $3) \
             RETURNING id, machine_id, date, active",
        )
        .bind(game.machine_id.as_str())
        .bind(game.date)
        .bind(game.active)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_active_conflict(e, &game.machine_id))?;

        Ok(game_from_row(row))
    }

    async fn set_game_active(&self, id: GameId, active: bool) -> StorageResult<()> {
        let result = sqlx::query("UPDATE games SET active = $2 WHERE id = $1")
            .bind(id.get())
            .bind(active)
            .execute(&self.pool)
            .await
            .map_err(|e| match e {
                sqlx::Error::Database(ref db)
                    if db.constraint() == Some(ONE_ACTIVE_GAME_INDEX) =>
                {
                    StorageError::Conflict(format!("cannot reactivate game {id}"))
                }
                other => StorageError::Database(other),
            })?;

        if result.rows_affected() == 0 {
            return Err(StorageError::NotFound(format!("game {id}")));
        }
        Ok(())
    }

    async fn latest_game(&self, machine: &MachineId) -> StorageResult<Option<Game>> {
        let row = sqlx::query_as::<_, GameRow>(
            "SELECT id, machine_id, date, active FROM games WHERE machine_id = $1 \
             ORDER BY active DESC, date DESC, id DESC LIMIT 1",
        )
        .bind(machine.as_str())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(game_from_row))
    }

    async fn latest_inactive_game(&self, machine: &MachineId) -> StorageResult<Option<Game>> {
        let row = sqlx::query_as::<_, GameRow>(
            "SELECT id, machine_id, date, active FROM games \
             WHERE machine_id = $1 AND active = false \
             ORDER BY date DESC, id DESC LIMIT 1",
        )
        .bind(machine.as_str())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(game_from_row))
    }

    async fn games_for_machine(&self, machine: &MachineId) -> StorageResult<Vec<Game>> {
        let rows = sqlx::query_as::<_, GameRow>(
            "SELECT id, machine_id, date, active FROM games WHERE machine_id = $1 \
             ORDER BY date DESC, id DESC",
        )
        .bind(machine.as_str())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(game_from_row).collect())
    }
}

#[async_trait]
impl GameStateRepository for PostgresStore {
    async fn append_state(&self, state: NewGameState) -> StorageResult<GameState> {
        let row = sqlx::query_as::<_, GameStateRow>(
            "INSERT INTO game_states (game_id, state, timestamp) VALUES ($1, $2, $3) \
             RETURNING id, game_id, state, timestamp",
        )
        .bind(state.game_id.get())
        .bind(&state.state)
        .bind(state.timestamp)
        .fetch_one(&self.pool)
        .await?;

        Ok(state_from_row(row))
    }

    async fn latest_state(&self, game: GameId) -> StorageResult<Option<GameState>> {
        let row = sqlx::query_as::<_, GameStateRow>(
            "SELECT id, game_id, state, timestamp FROM game_states WHERE game_id = $1 \
             ORDER BY timestamp DESC, id DESC LIMIT 1",
        )
        .bind(game.get())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(state_from_row))
    }

    async fn states_for_game(&self, game: GameId) -> StorageResult<Vec<GameState>> {
        let rows = sqlx::query_as::<_, GameStateRow>(
            "SELECT id, game_id, state, timestamp FROM game_states WHERE game_id = $1 \
             ORDER BY timestamp ASC, id ASC",
        )
        .bind(game.get())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(state_from_row).collect())
    }
}

#[async_trait]
impl PlayRepository for PostgresStore {
    async fn insert_play(&self, play: NewPlay) -> StorageResult<Play> {
        let row = sqlx::query_as::<_, PlayRow>(
            "INSERT INTO plays (game_id, score, initials, duration_seconds) \
             VALUES ($1, $2, $3, $4) \
             RETURNING id, game_id, score, initials, duration_seconds",
        )
        .bind(play.game_id.get())
        .bind(play.score)
        .bind(&play.initials)
        .bind(play.duration_seconds)
        .fetch_one(&self.pool)
        .await?;

        Ok(play_from_row(row))
    }

    async fn play_exists(&self, key: PlayKey<'_>) -> StorageResult<bool> {
        let day_start = key.day.and_time(chrono::NaiveTime::MIN).and_utc();
        let day_end = day_start + chrono::Duration::days(1);

        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (\
                SELECT 1 FROM plays \
                INNER JOIN games ON plays.game_id = games.id \
                WHERE games.machine_id = $1 \
                  AND games.date >= $2 AND games.date < $3 \
                  AND plays.score = $4 \
                  AND plays.initials = $5)",
        )
        .bind(key.machine_id.as_str())
        .bind(day_start)
        .bind(day_end)
        .bind(key.score)
        .bind(key.initials)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    async fn plays_for_game(&self, game: GameId) -> StorageResult<Vec<Play>> {
        let rows = sqlx::query_as::<_, PlayRow>(
            "SELECT id, game_id, score, initials, duration_seconds FROM plays \
             WHERE game_id = $1 ORDER BY id",
        )
        .bind(game.get())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(play_from_row).collect())
    }

    async fn top_scores(
        &self,
        machine: Option<&MachineId>,
        limit: u32,
    ) -> StorageResult<Vec<ScoreRecord>> {
        let rows = sqlx::query_as::<_, ScoreRow>(
            "SELECT plays.id, games.machine_id, games.date, plays.score, plays.initials, \
                    plays.duration_seconds \
             FROM plays INNER JOIN games ON plays.game_id = games.id \
             WHERE ($1::TEXT IS NULL OR games.machine_id = $1) \
             ORDER BY plays.score DESC, plays.id ASC LIMIT $2",
        )
        .bind(machine.map(MachineId::as_str))
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(
                |(play_id, machine_id, date, score, initials, duration_seconds)| ScoreRecord {
                    play_id,
                    machine_id: MachineId::new(machine_id),
                    date,
                    score,
                    initials,
                    duration_seconds,
                },
            )
            .collect())
    }
}
