// Static schema descriptors for the warehouse tables.
//
// Each table the importer writes is described by a `TableSchema`: field
// names in CSV column order, a type tag per field, the natural-key field
// list, and (for header-keyed files) an alias table and ignore-list. The
// descriptors are declared once here and drive DDL generation, row mapping,
// and the existing-key index, so there is no runtime reflection anywhere.

/// How the importer locates values in a CSV row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowAccess {
    /// Columns are documented by index; the schema's field order is the
    /// column order. Rows shorter than `min_columns` are structural errors.
    Positional { min_columns: usize },
    /// Columns are located by normalized header name, translated through
    /// the schema's alias table.
    Header,
}

/// Type tag used to pick the coercion function for a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    Int,
    Float,
    Bool,
    Text,
}

impl FieldType {
    /// SQLite column affinity for DDL generation. Booleans are stored as
    /// 0/1 integers.
    pub fn sql_type(self) -> &'static str {
        match self {
            FieldType::Int | FieldType::Bool => "INTEGER",
            FieldType::Float => "REAL",
            FieldType::Text => "TEXT",
        }
    }
}

/// One field of a target table.
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub name: &'static str,
    pub ty: FieldType,
    /// Nullable columns (resolved foreign keys) may be left unset.
    pub nullable: bool,
}

const fn field(name: &'static str, ty: FieldType) -> FieldSpec {
    FieldSpec {
        name,
        ty,
        nullable: false,
    }
}

const fn nullable(name: &'static str, ty: FieldType) -> FieldSpec {
    FieldSpec {
        name,
        ty,
        nullable: true,
    }
}

/// Complete description of one warehouse table and its source CSV.
#[derive(Debug, Clone, Copy)]
pub struct TableSchema {
    /// SQL table name.
    pub table: &'static str,
    /// Source file name inside the configured CSV directory. Empty for
    /// tables not fed directly from a file of their own (teams, players).
    pub csv_file: &'static str,
    pub access: RowAccess,
    /// Fields in CSV column order (for positional files this IS the order).
    pub fields: &'static [FieldSpec],
    /// Natural-key field names, in declared order. A UNIQUE constraint is
    /// generated over these and the existing-key index projects them.
    pub natural_key: &'static [&'static str],
    /// Key components that must be non-empty in the source row; a row
    /// missing one is a row-level error, not a silent default.
    pub required: &'static [&'static str],
    /// Normalized source header → field name (header-keyed files only).
    pub aliases: &'static [(&'static str, &'static str)],
    /// Normalized headers dropped before mapping (rank columns and other
    /// redundant source columns).
    pub ignored_headers: &'static [&'static str],
}

impl TableSchema {
    /// Index of a field by name. Schemas are small; linear scan is fine.
    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }

    /// Indices of the natural-key fields, in key order.
    pub fn key_indices(&self) -> Vec<usize> {
        self.natural_key
            .iter()
            .map(|k| {
                self.field_index(k)
                    .unwrap_or_else(|| panic!("schema {}: unknown key field {k}", self.table))
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Reference entities
// ---------------------------------------------------------------------------

/// Teams dimension. Seeded from config/teams.toml, not from a CSV.
pub static TEAMS: TableSchema = TableSchema {
    table: "teams",
    csv_file: "",
    access: RowAccess::Positional { min_columns: 0 },
    fields: &[
        field("team_id", FieldType::Int),
        field("team_name", FieldType::Text),
        field("team_abb", FieldType::Text),
        field("team_conference", FieldType::Text),
        field("team_division", FieldType::Text),
    ],
    natural_key: &["team_id"],
    required: &["team_id"],
    aliases: &[],
    ignored_headers: &[],
};

/// Players dimension, derived from the traditional boxscore file. The
/// dedup key uses the team abbreviation text rather than the resolved FK:
/// SQLite treats NULLs as distinct in UNIQUE constraints, so an unresolved
/// team must not be allowed to create duplicate player rows.
pub static PLAYERS: TableSchema = TableSchema {
    table: "players",
    csv_file: "game_boxscore_traditional.csv",
    access: RowAccess::Header,
    fields: &[
        field("player_id", FieldType::Int),
        field("player_name", FieldType::Text),
        field("player_abb", FieldType::Text),
        field("season", FieldType::Text),
        field("team_abb", FieldType::Text),
        nullable("team_id", FieldType::Int),
    ],
    natural_key: &["player_id", "season", "team_abb"],
    required: &["player_id", "season", "team_abb"],
    aliases: &[],
    ignored_headers: &[],
};

// ---------------------------------------------------------------------------
// Fact tables
// ---------------------------------------------------------------------------

/// Per-player traditional boxscore lines, one row per (game, player, period).
/// The scraper writes source-style headers (GAME_ID, ..., FGM, FGA, FG_PERC,
/// 3PM, 3PA, 3P_PERC, FTM, FTA, FT_PERC, ...), so this table is header-keyed
/// with an alias table translating the shooting columns.
pub static GAME_BOXSCORE_TRADITIONAL: TableSchema = TableSchema {
    table: "game_boxscore_traditional",
    csv_file: "game_boxscore_traditional.csv",
    access: RowAccess::Header,
    fields: &[
        field("game_id", FieldType::Text),
        field("season", FieldType::Text),
        field("season_type", FieldType::Text),
        field("home_team_abb", FieldType::Text),
        field("away_team_abb", FieldType::Text),
        field("player_id", FieldType::Int),
        field("player_name", FieldType::Text),
        field("player_name_abb", FieldType::Text),
        field("player_team_abb", FieldType::Text),
        field("player_pos", FieldType::Text),
        field("player_dnp", FieldType::Bool),
        field("period", FieldType::Text),
        field("min", FieldType::Text),
        field("fgm", FieldType::Int),
        field("fga", FieldType::Int),
        field("fg_pct", FieldType::Float),
        field("fg3m", FieldType::Int),
        field("fg3a", FieldType::Int),
        field("fg3_pct", FieldType::Float),
        field("ftm", FieldType::Int),
        field("fta", FieldType::Int),
        field("ft_pct", FieldType::Float),
        field("oreb", FieldType::Int),
        field("dreb", FieldType::Int),
        field("reb", FieldType::Int),
        field("ast", FieldType::Int),
        field("stl", FieldType::Int),
        field("blk", FieldType::Int),
        field("tov", FieldType::Int),
        field("pf", FieldType::Int),
        field("pts", FieldType::Int),
        field("plus_minus", FieldType::Int),
    ],
    natural_key: &["game_id", "player_id", "period"],
    required: &["game_id", "player_id", "period"],
    aliases: &[
        ("3pm", "fg3m"),
        ("3pa", "fg3a"),
        ("3p_perc", "fg3_pct"),
        ("fg_perc", "fg_pct"),
        ("ft_perc", "ft_pct"),
        ("to", "tov"),
    ],
    ignored_headers: &["rank", "rk"],
};

/// Per-player advanced boxscore lines. Header-keyed like the traditional
/// file, with the rating/percentage headers translated by alias.
pub static GAME_BOXSCORE_ADVANCED: TableSchema = TableSchema {
    table: "game_boxscore_advanced",
    csv_file: "game_boxscore_advanced.csv",
    access: RowAccess::Header,
    fields: &[
        field("game_id", FieldType::Text),
        field("season", FieldType::Text),
        field("season_type", FieldType::Text),
        field("home_team_abb", FieldType::Text),
        field("away_team_abb", FieldType::Text),
        field("player_id", FieldType::Int),
        field("player_name", FieldType::Text),
        field("player_name_abb", FieldType::Text),
        field("player_team_abb", FieldType::Text),
        field("player_pos", FieldType::Text),
        field("player_dnp", FieldType::Bool),
        field("period", FieldType::Text),
        field("min", FieldType::Text),
        field("off_rtg", FieldType::Float),
        field("def_rtg", FieldType::Float),
        field("net_rtg", FieldType::Float),
        field("ast_pct", FieldType::Float),
        field("ast_to", FieldType::Float),
        field("ast_ratio", FieldType::Float),
        field("oreb_pct", FieldType::Float),
        field("dreb_pct", FieldType::Float),
        field("reb_pct", FieldType::Float),
        field("to_ratio", FieldType::Float),
        field("efg_pct", FieldType::Float),
        field("ts_pct", FieldType::Float),
        field("usg_pct", FieldType::Float),
        field("pace", FieldType::Float),
        field("pie", FieldType::Float),
    ],
    natural_key: &["game_id", "player_id", "period"],
    required: &["game_id", "player_id", "period"],
    aliases: &[
        ("offrtg", "off_rtg"),
        ("defrtg", "def_rtg"),
        ("netrtg", "net_rtg"),
        ("ast_perc", "ast_pct"),
        ("oreb_perc", "oreb_pct"),
        ("dreb_perc", "dreb_pct"),
        ("reb_perc", "reb_pct"),
        ("efg_perc", "efg_pct"),
        ("ts_perc", "ts_pct"),
        ("usg_perc", "usg_pct"),
    ],
    // Rank columns and the bare TEAM column (redundant with
    // PLAYER_TEAM_ABB) appear in some exports.
    ignored_headers: &["rank", "rk", "team"],
};

/// Play-by-play event stream. The natural key is the full tuple: narrower
/// keys would merge distinct events sharing (game, period, clock).
pub static GAME_PLAY_BY_PLAY: TableSchema = TableSchema {
    table: "game_play_by_play",
    csv_file: "game_play_by_play.csv",
    access: RowAccess::Positional { min_columns: 9 },
    fields: &[
        field("season", FieldType::Text),
        field("season_type", FieldType::Text),
        field("game_id", FieldType::Text),
        field("team_abb", FieldType::Text),
        field("period", FieldType::Text),
        field("min", FieldType::Text),
        field("score", FieldType::Text),
        field("player", FieldType::Text),
        field("action", FieldType::Text),
    ],
    natural_key: &[
        "season",
        "season_type",
        "game_id",
        "team_abb",
        "period",
        "min",
        "score",
        "player",
        "action",
    ],
    required: &["game_id", "team_abb", "period"],
    aliases: &[],
    ignored_headers: &[],
};

/// Per-team line score and game-flow summary, one row per (game, team).
pub static GAME_SUMMARY: TableSchema = TableSchema {
    table: "game_summary",
    csv_file: "game_summary.csv",
    access: RowAccess::Positional { min_columns: 23 },
    fields: &[
        field("season", FieldType::Text),
        field("season_type", FieldType::Text),
        field("game_id", FieldType::Text),
        field("team_abb", FieldType::Text),
        field("q1", FieldType::Int),
        field("q2", FieldType::Int),
        field("q3", FieldType::Int),
        field("q4", FieldType::Int),
        field("ot1", FieldType::Int),
        field("ot2", FieldType::Int),
        field("ot3", FieldType::Int),
        field("ot4", FieldType::Int),
        field("final", FieldType::Int),
        field("pitp", FieldType::Int),
        field("fb_pts", FieldType::Int),
        field("big_ld", FieldType::Int),
        field("bpts", FieldType::Int),
        field("treb", FieldType::Int),
        field("tov", FieldType::Int),
        field("ttov", FieldType::Int),
        field("pot", FieldType::Int),
        field("lead_changes", FieldType::Int),
        field("times_tied", FieldType::Int),
    ],
    natural_key: &["season", "season_type", "game_id", "team_abb"],
    required: &["game_id", "team_abb"],
    aliases: &[],
    ignored_headers: &[],
};

/// Per-team traditional boxscore, one row per (game, team).
pub static TEAM_BOXSCORE_TRADITIONAL: TableSchema = TableSchema {
    table: "team_boxscore_traditional",
    csv_file: "teams_box_scores.csv",
    access: RowAccess::Positional { min_columns: 28 },
    fields: &[
        field("season", FieldType::Text),
        field("season_type", FieldType::Text),
        field("team_id", FieldType::Int),
        field("team_abb", FieldType::Text),
        field("game_id", FieldType::Text),
        field("matchup", FieldType::Text),
        field("home_away", FieldType::Text),
        field("gdate", FieldType::Text),
        field("wl", FieldType::Text),
        field("min", FieldType::Int),
        field("pts", FieldType::Int),
        field("fgm", FieldType::Int),
        field("fga", FieldType::Int),
        field("fg_pct", FieldType::Float),
        field("fg3m", FieldType::Int),
        field("fg3a", FieldType::Int),
        field("fg3_pct", FieldType::Float),
        field("ftm", FieldType::Int),
        field("fta", FieldType::Int),
        field("ft_pct", FieldType::Float),
        field("oreb", FieldType::Int),
        field("dreb", FieldType::Int),
        field("reb", FieldType::Int),
        field("ast", FieldType::Int),
        field("stl", FieldType::Int),
        field("blk", FieldType::Int),
        field("tov", FieldType::Int),
        field("pf", FieldType::Int),
        field("plus_minus", FieldType::Int),
    ],
    natural_key: &["season", "season_type", "game_id", "team_abb"],
    required: &["game_id", "team_abb"],
    aliases: &[],
    ignored_headers: &[],
};

/// Every table the importer owns, in creation (dependency) order.
pub static ALL_TABLES: &[&TableSchema] = &[
    &TEAMS,
    &PLAYERS,
    &GAME_BOXSCORE_TRADITIONAL,
    &GAME_BOXSCORE_ADVANCED,
    &GAME_PLAY_BY_PLAY,
    &GAME_SUMMARY,
    &TEAM_BOXSCORE_TRADITIONAL,
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_fields_exist_in_every_schema() {
        for schema in ALL_TABLES {
            for key in schema.natural_key {
                assert!(
                    schema.field_index(key).is_some(),
                    "{}: key field {key} missing",
                    schema.table
                );
            }
            for req in schema.required {
                assert!(
                    schema.natural_key.contains(req),
                    "{}: required field {req} not part of the natural key",
                    schema.table
                );
            }
        }
    }

    #[test]
    fn key_indices_in_declared_order() {
        let idx = GAME_BOXSCORE_TRADITIONAL.key_indices();
        assert_eq!(idx, vec![0, 5, 11]);
    }

    #[test]
    fn positional_schemas_have_sane_min_columns() {
        for schema in ALL_TABLES {
            if let RowAccess::Positional { min_columns } = schema.access {
                assert!(
                    min_columns <= schema.fields.len(),
                    "{}: min_columns exceeds field count",
                    schema.table
                );
            }
        }
    }

    #[test]
    fn advanced_aliases_cover_rating_headers() {
        let map = GAME_BOXSCORE_ADVANCED.aliases;
        assert!(map.contains(&("offrtg", "off_rtg")));
        assert!(map.contains(&("ts_perc", "ts_pct")));
    }
}
