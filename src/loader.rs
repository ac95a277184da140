// Batched persistence: buffer mapped records and flush them to the
// warehouse in fixed-size `INSERT OR IGNORE` transactions.

use anyhow::Result;

use crate::db::Warehouse;
use crate::mapper::Record;
use crate::schema::TableSchema;

/// Row errors reported in full before the report switches to a summary
/// count.
pub const MAX_REPORTED_ERRORS: usize = 10;

// ---------------------------------------------------------------------------
// Batch loader
// ---------------------------------------------------------------------------

/// Accumulates records for one table and writes them in batches. Callers
/// must finish with [`BatchLoader::finish`] to flush the tail batch; the
/// return value is the number of rows the database actually created.
pub struct BatchLoader<'a> {
    db: &'a Warehouse,
    schema: &'static TableSchema,
    batch_size: usize,
    buffer: Vec<Record>,
    created: usize,
}

impl<'a> BatchLoader<'a> {
    pub fn new(db: &'a Warehouse, schema: &'static TableSchema, batch_size: usize) -> Self {
        Self {
            db,
            schema,
            batch_size: batch_size.max(1),
            buffer: Vec::with_capacity(batch_size.max(1)),
            created: 0,
        }
    }

    /// Buffer one record, flushing when the buffer reaches the batch size.
    pub fn add(&mut self, record: Record) -> Result<()> {
        self.buffer.push(record);
        if self.buffer.len() >= self.batch_size {
            self.flush()?;
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        if self.buffer.is_empty() {
            return Ok(());
        }
        self.created += self.db.insert_batch(self.schema, &self.buffer)?;
        self.buffer.clear();
        Ok(())
    }

    /// Flush any remaining records and return the total created count.
    pub fn finish(mut self) -> Result<usize> {
        self.flush()?;
        Ok(self.created)
    }
}

// ---------------------------------------------------------------------------
// Per-step accounting
// ---------------------------------------------------------------------------

/// Counters for one import step. `total` is source rows read; the other
/// counters partition what happened to them (`unresolved` overlaps
/// `created`: those rows persisted but with a relation left unset).
/// `updated` is only produced by the teams step, which upserts in place
/// instead of ignoring existing rows.
#[derive(Debug, Default, Clone, Copy)]
pub struct StepCounters {
    pub total: usize,
    pub created: usize,
    pub updated: usize,
    pub skipped: usize,
    pub errored: usize,
    pub unresolved: usize,
}

/// Collects row-level error messages, keeping the first
/// [`MAX_REPORTED_ERRORS`] verbatim and counting the rest.
#[derive(Debug, Default)]
pub struct ErrorLog {
    reported: Vec<String>,
    total: usize,
}

impl ErrorLog {
    pub fn record(&mut self, line: usize, message: &str) {
        self.total += 1;
        if self.reported.len() < MAX_REPORTED_ERRORS {
            self.reported.push(format!("row {line}: {message}"));
        }
    }

    pub fn reported(&self) -> &[String] {
        &self.reported
    }

    pub fn total(&self) -> usize {
        self.total
    }

    /// Errors beyond the reported window.
    pub fn suppressed(&self) -> usize {
        self.total - self.reported.len()
    }

    pub fn is_empty(&self) -> bool {
        self.total == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapper::Value;
    use crate::schema::GAME_SUMMARY;

    fn test_db() -> Warehouse {
        Warehouse::open(":memory:").expect("in-memory warehouse should open")
    }

    fn summary_record(game_id: &str, team_abb: &str) -> Record {
        let mut values = vec![
            Value::Text("2023-24".into()),
            Value::Text("regular-season".into()),
            Value::Text(game_id.into()),
            Value::Text(team_abb.into()),
        ];
        values.extend(std::iter::repeat(Value::Int(0)).take(19));
        Record::new(values)
    }

    #[test]
    fn tail_batch_flushed_on_finish() {
        let db = test_db();
        let mut loader = BatchLoader::new(&db, &GAME_SUMMARY, 100);
        for i in 0..7 {
            loader.add(summary_record(&format!("{i:03}"), "BOS")).unwrap();
        }
        assert_eq!(loader.finish().unwrap(), 7);
        assert_eq!(db.count("game_summary").unwrap(), 7);
    }

    #[test]
    fn flushes_at_batch_boundary() {
        let db = test_db();
        let mut loader = BatchLoader::new(&db, &GAME_SUMMARY, 3);
        for i in 0..3 {
            loader.add(summary_record(&format!("{i:03}"), "BOS")).unwrap();
        }
        // Batch boundary hit inside add(); rows visible before finish().
        assert_eq!(db.count("game_summary").unwrap(), 3);
        assert_eq!(loader.finish().unwrap(), 3);
    }

    #[test]
    fn duplicate_keys_do_not_count_as_created() {
        let db = test_db();
        let mut loader = BatchLoader::new(&db, &GAME_SUMMARY, 10);
        loader.add(summary_record("001", "BOS")).unwrap();
        loader.add(summary_record("001", "BOS")).unwrap();
        loader.add(summary_record("001", "NYK")).unwrap();
        assert_eq!(loader.finish().unwrap(), 2);
        assert_eq!(db.count("game_summary").unwrap(), 2);
    }

    #[test]
    fn empty_loader_finishes_cleanly() {
        let db = test_db();
        let loader = BatchLoader::new(&db, &GAME_SUMMARY, 10);
        assert_eq!(loader.finish().unwrap(), 0);
    }

    #[test]
    fn error_log_caps_reported_messages() {
        let mut log = ErrorLog::default();
        for i in 0..25 {
            log.record(i + 2, "missing required key component `game_id`");
        }
        assert_eq!(log.total(), 25);
        assert_eq!(log.reported().len(), MAX_REPORTED_ERRORS);
        assert_eq!(log.suppressed(), 15);
        assert!(log.reported()[0].starts_with("row 2:"));
    }

    #[test]
    fn error_log_empty() {
        let log = ErrorLog::default();
        assert!(log.is_empty());
        assert_eq!(log.suppressed(), 0);
    }
}
