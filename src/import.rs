// Import orchestration: runs every ingestion step in dependency order and
// assembles a per-step report.
//
// Step order is fixed so references exist before the rows that point at
// them: teams (from config), players (derived from the traditional
// boxscore file), then the fact tables. A missing source file skips its
// step and the run continues.

use std::collections::HashSet;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use csv::StringRecord;
use tracing::{info, warn};

use crate::coerce::coerce_int;
use crate::config::Config;
use crate::db::Warehouse;
use crate::loader::{BatchLoader, ErrorLog, StepCounters};
use crate::mapper::{map_row, normalize_header, ColumnPlan, Record, RowOutcome, Value};
use crate::schema::{
    TableSchema, GAME_BOXSCORE_ADVANCED, GAME_BOXSCORE_TRADITIONAL, GAME_PLAY_BY_PLAY,
    GAME_SUMMARY, PLAYERS, TEAMS, TEAM_BOXSCORE_TRADITIONAL,
};

// ---------------------------------------------------------------------------
// Reports
// ---------------------------------------------------------------------------

/// Terminal state of one import step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepStatus {
    Completed,
    CompletedWithErrors,
    /// Source file absent; nothing was read and the run continued.
    Skipped,
}

/// Outcome of one import step.
#[derive(Debug)]
pub struct StepReport {
    pub table: &'static str,
    pub status: StepStatus,
    pub counters: StepCounters,
    pub errors: ErrorLog,
}

impl StepReport {
    fn completed(table: &'static str, counters: StepCounters, errors: ErrorLog) -> Self {
        let status = if errors.is_empty() {
            StepStatus::Completed
        } else {
            StepStatus::CompletedWithErrors
        };
        Self {
            table,
            status,
            counters,
            errors,
        }
    }

    fn skipped(table: &'static str) -> Self {
        Self {
            table,
            status: StepStatus::Skipped,
            counters: StepCounters::default(),
            errors: ErrorLog::default(),
        }
    }
}

/// Outcome of a whole import run.
#[derive(Debug)]
pub struct RunReport {
    pub started: DateTime<Utc>,
    pub finished: DateTime<Utc>,
    pub steps: Vec<StepReport>,
}

impl RunReport {
    /// Human-readable run summary on stdout: one block per step with the
    /// counters, the first reported errors verbatim, and a count for the
    /// rest.
    pub fn print(&self) {
        println!(
            "import run {} .. {}",
            self.started.format("%Y-%m-%d %H:%M:%S UTC"),
            self.finished.format("%Y-%m-%d %H:%M:%S UTC")
        );
        for step in &self.steps {
            match step.status {
                StepStatus::Skipped => {
                    println!("{:<28} skipped (source file not found)", step.table);
                    continue;
                }
                StepStatus::Completed | StepStatus::CompletedWithErrors => {}
            }
            let c = &step.counters;
            println!(
                "{:<28} total {:>8}  created {:>8}  updated {:>8}  skipped {:>8}  errors {:>6}  unresolved {:>6}",
                step.table, c.total, c.created, c.updated, c.skipped, c.errored, c.unresolved
            );
            for line in step.errors.reported() {
                println!("    {line}");
            }
            if step.errors.suppressed() > 0 {
                println!("    ... and {} more errors", step.errors.suppressed());
            }
        }
    }

    /// True when no step recorded a row-level error.
    pub fn clean(&self) -> bool {
        self.steps
            .iter()
            .all(|s| s.status != StepStatus::CompletedWithErrors)
    }
}

// ---------------------------------------------------------------------------
// Importer
// ---------------------------------------------------------------------------

/// Drives a full import run against one warehouse.
pub struct Importer<'a> {
    db: &'a Warehouse,
    config: &'a Config,
}

impl<'a> Importer<'a> {
    pub fn new(db: &'a Warehouse, config: &'a Config) -> Self {
        Self { db, config }
    }

    /// Run every step in dependency order. Row-level problems are recorded
    /// in the report; only environmental failures (database errors,
    /// unreadable files) abort the run.
    pub fn run(&self) -> Result<RunReport> {
        let started = Utc::now();
        let mut steps = Vec::new();

        steps.push(self.step_teams()?);
        steps.push(self.step_players()?);
        for schema in [
            &GAME_BOXSCORE_TRADITIONAL,
            &GAME_BOXSCORE_ADVANCED,
            &GAME_PLAY_BY_PLAY,
            &GAME_SUMMARY,
            &TEAM_BOXSCORE_TRADITIONAL,
        ] {
            steps.push(self.run_csv_step(schema)?);
        }

        Ok(RunReport {
            started,
            finished: Utc::now(),
            steps,
        })
    }

    /// Seed the teams dimension from configuration. Existing rows are
    /// updated in place rather than ignored, so metadata edits in
    /// teams.toml take effect on re-import.
    fn step_teams(&self) -> Result<StepReport> {
        let existing = self.db.existing_keys(&TEAMS)?;
        let mut counters = StepCounters::default();

        for team in &self.config.teams {
            counters.total += 1;
            self.db.upsert_team(team)?;
            if existing.contains(&vec![team.team_id.to_string()]) {
                counters.updated += 1;
            } else {
                counters.created += 1;
            }
        }

        info!(
            created = counters.created,
            updated = counters.updated,
            "teams seeded"
        );
        Ok(StepReport::completed(TEAMS.table, counters, ErrorLog::default()))
    }

    /// Derive the players dimension from the traditional boxscore file:
    /// one row per (player, season, team) seen in any game line. The team
    /// reference resolves best-effort; an unknown team leaves the foreign
    /// key unset and counts as unresolved.
    fn step_players(&self) -> Result<StepReport> {
        let path = self.config.import.csv_dir.join(PLAYERS.csv_file);
        if !path.exists() {
            warn!(path = %path.display(), "source file not found, skipping players");
            return Ok(StepReport::skipped(PLAYERS.table));
        }

        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_path(&path)
            .with_context(|| format!("failed to open {}", path.display()))?;
        let headers = reader
            .headers()
            .with_context(|| format!("failed to read headers from {}", path.display()))?
            .clone();
        let columns = PlayerColumns::locate(&headers);

        let resolver = self.db.team_resolver()?;
        if resolver.is_empty() {
            warn!("teams table is empty; player team references will not resolve");
        }

        let mut existing = self.db.existing_keys(&PLAYERS)?;
        let mut counters = StepCounters::default();
        let mut errors = ErrorLog::default();
        let mut warned_teams: HashSet<String> = HashSet::new();
        let mut loader = BatchLoader::new(self.db, &PLAYERS, self.config.import.batch_size);

        for (i, row) in reader.records().enumerate() {
            let line = i + 2; // header is line 1
            counters.total += 1;
            let row = match row {
                Ok(r) => r,
                Err(e) => {
                    counters.errored += 1;
                    errors.record(line, &format!("unreadable row: {e}"));
                    continue;
                }
            };

            match columns.extract(&row) {
                Ok(player) => {
                    let key = vec![
                        player.player_id.to_string(),
                        player.season.clone(),
                        player.team_abb.clone(),
                    ];
                    if existing.contains(&key) {
                        counters.skipped += 1;
                        continue;
                    }

                    let team_id = match resolver.resolve(&player.team_abb) {
                        Some(id) => Value::Int(id),
                        None => {
                            counters.unresolved += 1;
                            if warned_teams.insert(player.team_abb.clone()) {
                                warn!(team = %player.team_abb, "unknown team reference");
                            }
                            Value::Null
                        }
                    };

                    loader.add(Record::new(vec![
                        Value::Int(player.player_id),
                        Value::Text(player.name),
                        Value::Text(player.abb),
                        Value::Text(player.season),
                        Value::Text(player.team_abb),
                        team_id,
                    ]))?;
                    existing.insert(key);
                }
                Err(msg) => {
                    counters.errored += 1;
                    errors.record(line, &msg);
                }
            }
        }

        counters.created = loader.finish()?;
        info!(
            created = counters.created,
            skipped = counters.skipped,
            errors = counters.errored,
            "players imported"
        );
        Ok(StepReport::completed(PLAYERS.table, counters, errors))
    }

    /// Generic CSV ingestion for one fact table: map each row through the
    /// schema's column plan, dedup against the existing-key index plus the
    /// keys seen in this file, and batch-insert the rest.
    fn run_csv_step(&self, schema: &'static TableSchema) -> Result<StepReport> {
        let path = self.config.import.csv_dir.join(schema.csv_file);
        if !path.exists() {
            warn!(
                path = %path.display(),
                table = schema.table,
                "source file not found, skipping step"
            );
            return Ok(StepReport::skipped(schema.table));
        }

        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_path(&path)
            .with_context(|| format!("failed to open {}", path.display()))?;
        let headers = reader
            .headers()
            .with_context(|| format!("failed to read headers from {}", path.display()))?
            .clone();
        let plan = ColumnPlan::for_schema(schema, &headers);

        let mut existing = self.db.existing_keys(schema)?;
        let mut counters = StepCounters::default();
        let mut errors = ErrorLog::default();
        let mut loader = BatchLoader::new(self.db, schema, self.config.import.batch_size);

        for (i, row) in reader.records().enumerate() {
            let line = i + 2;
            counters.total += 1;
            let row = match row {
                Ok(r) => r,
                Err(e) => {
                    counters.errored += 1;
                    errors.record(line, &format!("unreadable row: {e}"));
                    continue;
                }
            };

            match map_row(schema, &plan, &row) {
                RowOutcome::Record(record) => {
                    let key = record.key(schema);
                    if existing.contains(&key) {
                        counters.skipped += 1;
                        continue;
                    }
                    loader.add(record)?;
                    existing.insert(key);
                }
                RowOutcome::Skip(_) => {
                    counters.skipped += 1;
                }
                RowOutcome::Error(msg) => {
                    counters.errored += 1;
                    errors.record(line, &msg);
                }
            }
        }

        counters.created = loader.finish()?;
        info!(
            table = schema.table,
            created = counters.created,
            skipped = counters.skipped,
            errors = counters.errored,
            "step finished"
        );
        Ok(StepReport::completed(schema.table, counters, errors))
    }
}

// ---------------------------------------------------------------------------
// Wipe
// ---------------------------------------------------------------------------

/// Delete all imported data, fact tables first. Without `confirm` this is
/// a no-op that explains how to proceed; destructive by design otherwise.
pub fn wipe(db: &Warehouse, confirm: bool) -> Result<()> {
    if !confirm {
        println!("wipe aborted: this deletes every imported row");
        println!("re-run with --confirm to proceed");
        return Ok(());
    }
    let deleted = db.wipe_all()?;
    for (table, count) in &deleted {
        println!("{table:<28} deleted {count:>8}");
    }
    let total: usize = deleted.iter().map(|(_, n)| n).sum();
    info!(total, "warehouse wiped");
    Ok(())
}

// ---------------------------------------------------------------------------
// Player column location
// ---------------------------------------------------------------------------

/// Extracted player fields from one traditional boxscore line.
#[derive(Debug)]
struct PlayerRow {
    player_id: i64,
    name: String,
    abb: String,
    season: String,
    team_abb: String,
}

/// Column positions of the player fields inside the traditional boxscore
/// file, located by normalized header name.
struct PlayerColumns {
    player_id: Option<usize>,
    name: Option<usize>,
    abb: Option<usize>,
    season: Option<usize>,
    team_abb: Option<usize>,
}

impl PlayerColumns {
    fn locate(headers: &StringRecord) -> Self {
        let mut columns = Self {
            player_id: None,
            name: None,
            abb: None,
            season: None,
            team_abb: None,
        };
        for (col, raw) in headers.iter().enumerate() {
            let slot = match normalize_header(raw).as_str() {
                "player_id" => &mut columns.player_id,
                "player_name" => &mut columns.name,
                "player_name_abb" => &mut columns.abb,
                "season" => &mut columns.season,
                "player_team_abb" => &mut columns.team_abb,
                _ => continue,
            };
            if slot.is_none() {
                *slot = Some(col);
            }
        }
        columns
    }

    fn cell<'r>(col: Option<usize>, row: &'r StringRecord) -> &'r str {
        col.and_then(|c| row.get(c)).unwrap_or("").trim()
    }

    fn extract(&self, row: &StringRecord) -> std::result::Result<PlayerRow, String> {
        let raw_id = Self::cell(self.player_id, row);
        let season = Self::cell(self.season, row);
        let team_abb = Self::cell(self.team_abb, row);

        if raw_id.is_empty() {
            return Err("missing required key component `player_id`".into());
        }
        if season.is_empty() {
            return Err("missing required key component `season`".into());
        }
        if team_abb.is_empty() {
            return Err("missing required key component `team_abb`".into());
        }

        Ok(PlayerRow {
            player_id: coerce_int(raw_id, 0),
            name: Self::cell(self.name, row).to_string(),
            abb: Self::cell(self.abb, row).to_string(),
            season: season.to_string(),
            team_abb: team_abb.to_string(),
        })
    }
}
