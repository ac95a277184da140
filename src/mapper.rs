// Row-to-record mapping: one CSV row in, one typed record (or an explicit
// skip/error) out.
//
// Header-keyed files go through normalization (trim, lowercase, spaces to
// underscores), an ignore-list, and the schema's alias table before columns
// are matched to fields. Positional files match fields to columns by index.

use std::collections::HashMap;

use csv::StringRecord;

use crate::coerce::{coerce_float, coerce_int, parse_bool};
use crate::schema::{FieldType, RowAccess, TableSchema};

// ---------------------------------------------------------------------------
// Typed values
// ---------------------------------------------------------------------------

/// A single mapped cell. Booleans are carried as 0/1 integers, matching
/// their storage affinity.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i64),
    Float(f64),
    Text(String),
    Null,
}

impl Value {
    /// Canonical string form used for natural-key tuples. Must agree with
    /// `Warehouse::existing_keys`, which canonicalizes persisted rows the
    /// same way, so that a re-run recognizes its own output.
    pub fn canonical(&self) -> String {
        match self {
            Value::Int(n) => n.to_string(),
            Value::Float(f) => f.to_string(),
            Value::Text(s) => s.clone(),
            Value::Null => String::new(),
        }
    }
}

/// One mapped row, values in schema field order.
#[derive(Debug, Clone)]
pub struct Record {
    values: Vec<Value>,
}

impl Record {
    pub fn new(values: Vec<Value>) -> Self {
        Self { values }
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn set(&mut self, index: usize, value: Value) {
        self.values[index] = value;
    }

    /// Canonicalized natural-key tuple for this record.
    pub fn key(&self, schema: &TableSchema) -> Vec<String> {
        schema
            .key_indices()
            .into_iter()
            .map(|i| self.values[i].canonical())
            .collect()
    }
}

/// Per-row mapping result. One bad row never aborts a batch: errors are
/// collected by the caller and processing continues.
#[derive(Debug)]
pub enum RowOutcome {
    Record(Record),
    Skip(String),
    Error(String),
}

// ---------------------------------------------------------------------------
// Header handling
// ---------------------------------------------------------------------------

/// Normalize a source header for matching: trim, lowercase, spaces to
/// underscores.
pub fn normalize_header(raw: &str) -> String {
    raw.trim().to_lowercase().replace(' ', "_")
}

/// Resolved mapping from schema field index to CSV column index, built once
/// per file and reused for every row.
#[derive(Debug)]
pub struct ColumnPlan {
    columns: Vec<Option<usize>>,
}

impl ColumnPlan {
    /// Plan for a positional file: field order is column order.
    pub fn positional(schema: &TableSchema) -> Self {
        Self {
            columns: (0..schema.fields.len()).map(Some).collect(),
        }
    }

    /// Plan for a header-keyed file. Ignored headers are dropped, aliases
    /// translated, unknown columns silently left unmatched. Fields with no
    /// matching column map to their type default.
    pub fn from_headers(schema: &TableSchema, headers: &StringRecord) -> Self {
        let aliases: HashMap<&str, &str> = schema.aliases.iter().copied().collect();
        let mut columns = vec![None; schema.fields.len()];

        for (col, raw) in headers.iter().enumerate() {
            let mut name = normalize_header(raw);
            if schema.ignored_headers.contains(&name.as_str()) {
                continue;
            }
            if let Some(target) = aliases.get(name.as_str()) {
                name = (*target).to_string();
            }
            if let Some(field_idx) = schema.field_index(&name) {
                // First match wins if a header repeats.
                if columns[field_idx].is_none() {
                    columns[field_idx] = Some(col);
                }
            }
        }

        Self { columns }
    }

    /// Build the plan appropriate for the schema's access mode.
    pub fn for_schema(schema: &TableSchema, headers: &StringRecord) -> Self {
        match schema.access {
            RowAccess::Positional { .. } => Self::positional(schema),
            RowAccess::Header => Self::from_headers(schema, headers),
        }
    }

    fn cell<'r>(&self, field_idx: usize, row: &'r StringRecord) -> &'r str {
        self.columns[field_idx]
            .and_then(|col| row.get(col))
            .unwrap_or("")
    }
}

// ---------------------------------------------------------------------------
// Row mapping
// ---------------------------------------------------------------------------

/// Map one CSV row to a typed record. Structural problems (too few columns,
/// empty required key component) are row-level errors; malformed scalar
/// cells silently coerce to defaults per field type.
pub fn map_row(schema: &TableSchema, plan: &ColumnPlan, row: &StringRecord) -> RowOutcome {
    if let RowAccess::Positional { min_columns } = schema.access {
        if row.len() < min_columns {
            return RowOutcome::Error(format!(
                "expected at least {min_columns} columns, got {}",
                row.len()
            ));
        }
    }

    let mut values = Vec::with_capacity(schema.fields.len());
    for (i, spec) in schema.fields.iter().enumerate() {
        let raw = plan.cell(i, row);
        let trimmed = raw.trim();

        if trimmed.is_empty() && schema.required.contains(&spec.name) {
            return RowOutcome::Error(format!("missing required key component `{}`", spec.name));
        }

        let value = if trimmed.is_empty() && spec.nullable {
            Value::Null
        } else {
            match spec.ty {
                FieldType::Int => Value::Int(coerce_int(trimmed, 0)),
                FieldType::Float => Value::Float(coerce_float(trimmed, 0.0)),
                FieldType::Bool => Value::Int(i64::from(parse_bool(trimmed))),
                FieldType::Text => Value::Text(trimmed.to_string()),
            }
        };
        values.push(value);
    }

    RowOutcome::Record(Record::new(values))
}

// ---------------------------------------------------------------------------
// Relation resolution
// ---------------------------------------------------------------------------

/// Lookup table for resolving a raw team reference to a persisted team id.
/// Numeric values resolve as primary keys; text falls back to abbreviation,
/// then full name. Built once per import step from the teams table.
#[derive(Debug, Default)]
pub struct TeamResolver {
    ids: std::collections::HashSet<i64>,
    by_abb: HashMap<String, i64>,
    by_name: HashMap<String, i64>,
}

impl TeamResolver {
    pub fn new(teams: impl IntoIterator<Item = (i64, String, String)>) -> Self {
        let mut resolver = Self::default();
        for (id, abb, name) in teams {
            resolver.ids.insert(id);
            resolver.by_abb.insert(abb.trim().to_uppercase(), id);
            resolver.by_name.insert(name.trim().to_uppercase(), id);
        }
        resolver
    }

    /// Resolve a raw reference, or `None` if nothing matches. Callers treat
    /// `None` as a degrade (field left unset), not a failure.
    pub fn resolve(&self, raw: &str) -> Option<i64> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }
        if let Ok(id) = trimmed.parse::<i64>() {
            if self.ids.contains(&id) {
                return Some(id);
            }
        }
        let upper = trimmed.to_uppercase();
        self.by_abb
            .get(&upper)
            .or_else(|| self.by_name.get(&upper))
            .copied()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{
        GAME_BOXSCORE_ADVANCED, GAME_BOXSCORE_TRADITIONAL, GAME_PLAY_BY_PLAY, GAME_SUMMARY,
    };

    fn record_of(cells: &[&str]) -> StringRecord {
        StringRecord::from(cells.to_vec())
    }

    /// A full 32-column traditional boxscore header in scraper order.
    fn trad_headers() -> StringRecord {
        record_of(&[
            "GAME_ID",
            "SEASON",
            "SEASON_TYPE",
            "HOME_TEAM_ABB",
            "AWAY_TEAM_ABB",
            "PLAYER_ID",
            "PLAYER_NAME",
            "PLAYER_NAME_ABB",
            "PLAYER_TEAM_ABB",
            "PLAYER_POS",
            "PLAYER_DNP",
            "PERIOD",
            "MIN",
            "FGM",
            "FGA",
            "FG_PERC",
            "3PM",
            "3PA",
            "3P_PERC",
            "FTM",
            "FTA",
            "FT_PERC",
            "OREB",
            "DREB",
            "REB",
            "AST",
            "STL",
            "BLK",
            "TO",
            "PF",
            "PTS",
            "PLUS_MINUS",
        ])
    }

    fn trad_row() -> StringRecord {
        record_of(&[
            "0022300001",
            "2023-24",
            "regular-season",
            "BOS",
            "NYK",
            "1628369",
            "Jayson Tatum",
            "J. Tatum",
            "BOS",
            "F",
            "false",
            "All",
            "36:42",
            "12",
            "22",
            "0.545",
            "4",
            "9",
            "0.444",
            "6",
            "7",
            "0.857",
            "1",
            "10",
            "11",
            "4",
            "1",
            "0",
            "2",
            "3",
            "34",
            "12",
        ])
    }

    // -- Header normalization and aliasing --

    #[test]
    fn headers_normalized_and_aliased() {
        let plan = ColumnPlan::from_headers(&GAME_BOXSCORE_TRADITIONAL, &trad_headers());
        let outcome = map_row(&GAME_BOXSCORE_TRADITIONAL, &plan, &trad_row());
        let record = match outcome {
            RowOutcome::Record(r) => r,
            other => panic!("expected record, got {other:?}"),
        };

        // 3PM lands in fg3m, TO in tov.
        let fg3m = GAME_BOXSCORE_TRADITIONAL.field_index("fg3m").unwrap();
        let tov = GAME_BOXSCORE_TRADITIONAL.field_index("tov").unwrap();
        assert_eq!(record.values()[fg3m], Value::Int(4));
        assert_eq!(record.values()[tov], Value::Int(2));
    }

    #[test]
    fn ignored_headers_dropped() {
        // A leading RANK column must not shadow or shift anything.
        let mut headers = vec!["RANK"];
        let base = trad_headers();
        headers.extend(base.iter());
        let mut cells = vec!["1"];
        let row = trad_row();
        cells.extend(row.iter());

        let plan =
            ColumnPlan::from_headers(&GAME_BOXSCORE_TRADITIONAL, &record_of(&headers));
        let outcome = map_row(&GAME_BOXSCORE_TRADITIONAL, &plan, &record_of(&cells));
        let record = match outcome {
            RowOutcome::Record(r) => r,
            other => panic!("expected record, got {other:?}"),
        };
        assert_eq!(record.values()[0], Value::Text("0022300001".into()));
    }

    #[test]
    fn mixed_case_and_spaced_headers_match() {
        assert_eq!(normalize_header("  Game ID "), "game_id");
        assert_eq!(normalize_header("OFFRTG"), "offrtg");
    }

    #[test]
    fn advanced_headers_translate_through_aliases() {
        // Rating headers arrive in scraper form and a bare TEAM column is
        // present; both must land correctly (aliased and ignored).
        let headers = record_of(&[
            "GAME_ID",
            "PLAYER_ID",
            "TEAM",
            "PERIOD",
            "OFFRTG",
            "TS_PERC",
        ]);
        let row = record_of(&["0022300001", "1628369", "BOS", "All", "118.5", "0.645"]);
        let plan = ColumnPlan::from_headers(&GAME_BOXSCORE_ADVANCED, &headers);
        let record = match map_row(&GAME_BOXSCORE_ADVANCED, &plan, &row) {
            RowOutcome::Record(r) => r,
            other => panic!("expected record, got {other:?}"),
        };

        let off_rtg = GAME_BOXSCORE_ADVANCED.field_index("off_rtg").unwrap();
        let ts_pct = GAME_BOXSCORE_ADVANCED.field_index("ts_pct").unwrap();
        assert_eq!(record.values()[off_rtg], Value::Float(118.5));
        assert_eq!(record.values()[ts_pct], Value::Float(0.645));
        assert_eq!(
            record.key(&GAME_BOXSCORE_ADVANCED),
            vec!["0022300001".to_string(), "1628369".into(), "All".into()]
        );
    }

    // -- Positional mapping --

    #[test]
    fn positional_row_maps_in_order() {
        let plan = ColumnPlan::positional(&GAME_PLAY_BY_PLAY);
        let row = record_of(&[
            "2023-24",
            "regular-season",
            "0022300001",
            "BOS",
            "Q1",
            "11:32",
            "2-0",
            "Jayson Tatum",
            "Tatum 2' driving layup",
        ]);
        let outcome = map_row(&GAME_PLAY_BY_PLAY, &plan, &row);
        let record = match outcome {
            RowOutcome::Record(r) => r,
            other => panic!("expected record, got {other:?}"),
        };
        assert_eq!(record.values()[3], Value::Text("BOS".into()));
        assert_eq!(record.values()[8], Value::Text("Tatum 2' driving layup".into()));
    }

    #[test]
    fn positional_short_row_is_error() {
        let plan = ColumnPlan::positional(&GAME_PLAY_BY_PLAY);
        let row = record_of(&["2023-24", "regular-season", "0022300001"]);
        assert!(matches!(
            map_row(&GAME_PLAY_BY_PLAY, &plan, &row),
            RowOutcome::Error(_)
        ));
    }

    // -- Required key components --

    #[test]
    fn missing_required_key_component_is_error() {
        let plan = ColumnPlan::positional(&GAME_SUMMARY);
        let mut cells = vec!["2023-24", "regular-season", "", "BOS"];
        cells.extend(std::iter::repeat("0").take(19));
        match map_row(&GAME_SUMMARY, &plan, &record_of(&cells)) {
            RowOutcome::Error(msg) => assert!(msg.contains("game_id")),
            other => panic!("expected error, got {other:?}"),
        }
    }

    #[test]
    fn blank_player_id_is_error_not_a_shared_key() {
        // Two players with blank ids must not collapse onto the key
        // (game_id, 0, period); the row is rejected instead.
        let plan = ColumnPlan::from_headers(&GAME_BOXSCORE_TRADITIONAL, &trad_headers());
        let mut cells: Vec<String> = trad_row().iter().map(String::from).collect();
        cells[5] = String::new(); // PLAYER_ID column
        let row = StringRecord::from(cells);
        match map_row(&GAME_BOXSCORE_TRADITIONAL, &plan, &row) {
            RowOutcome::Error(msg) => assert!(msg.contains("player_id")),
            other => panic!("expected error, got {other:?}"),
        }
    }

    // -- Scalar coercion through the mapper --

    #[test]
    fn malformed_numeric_cells_default_to_zero() {
        let plan = ColumnPlan::positional(&GAME_SUMMARY);
        let mut cells = vec!["2023-24", "regular-season", "0022300001", "BOS"];
        cells.extend(["-", "abc", "28.0", "31"]);
        cells.extend(std::iter::repeat("").take(15));
        let record = match map_row(&GAME_SUMMARY, &plan, &record_of(&cells)) {
            RowOutcome::Record(r) => r,
            other => panic!("expected record, got {other:?}"),
        };
        assert_eq!(record.values()[4], Value::Int(0)); // "-"
        assert_eq!(record.values()[5], Value::Int(0)); // "abc"
        assert_eq!(record.values()[6], Value::Int(28)); // "28.0"
        assert_eq!(record.values()[7], Value::Int(31));
        assert_eq!(record.values()[22], Value::Int(0)); // trailing blank
    }

    #[test]
    fn boolean_field_uses_truthy_tokens() {
        let plan = ColumnPlan::from_headers(&GAME_BOXSCORE_TRADITIONAL, &trad_headers());
        let dnp = GAME_BOXSCORE_TRADITIONAL.field_index("player_dnp").unwrap();

        let mut cells: Vec<String> = trad_row().iter().map(String::from).collect();
        cells[dnp] = "Sí".into();
        let row = StringRecord::from(cells);
        let record = match map_row(&GAME_BOXSCORE_TRADITIONAL, &plan, &row) {
            RowOutcome::Record(r) => r,
            other => panic!("expected record, got {other:?}"),
        };
        assert_eq!(record.values()[dnp], Value::Int(1));
    }

    // -- Natural keys --

    #[test]
    fn record_key_in_declared_order() {
        let plan = ColumnPlan::from_headers(&GAME_BOXSCORE_TRADITIONAL, &trad_headers());
        let record = match map_row(&GAME_BOXSCORE_TRADITIONAL, &plan, &trad_row()) {
            RowOutcome::Record(r) => r,
            other => panic!("expected record, got {other:?}"),
        };
        assert_eq!(
            record.key(&GAME_BOXSCORE_TRADITIONAL),
            vec!["0022300001".to_string(), "1628369".into(), "All".into()]
        );
    }

    // -- Team resolution --

    #[test]
    fn team_resolver_lookup_ladder() {
        let resolver = TeamResolver::new([
            (1610612738, "BOS".to_string(), "Boston Celtics".to_string()),
            (1610612752, "NYK".to_string(), "New York Knicks".to_string()),
        ]);

        assert_eq!(resolver.resolve("1610612738"), Some(1610612738));
        assert_eq!(resolver.resolve("BOS"), Some(1610612738));
        assert_eq!(resolver.resolve("bos"), Some(1610612738));
        assert_eq!(resolver.resolve("New York Knicks"), Some(1610612752));
        assert_eq!(resolver.resolve("SEA"), None);
        assert_eq!(resolver.resolve(""), None);
        // A numeric value that is not a known id does not fall through to
        // a bogus match.
        assert_eq!(resolver.resolve("42"), None);
    }
}
