//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the campaign and
//! run storage traits.

use crate::crawler::CampaignRecord;
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{CampaignStore, RunStore, StorageError, StorageResult};
use crate::storage::{CampaignCount, RunCounts, RunRecord, RunStatus, SlugRow, StoredCampaign};
use crate::SieveError;
use chrono::Utc;
use rusqlite::{params, Connection, ErrorCode, OptionalExtension};
use std::path::Path;

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Creates a new SqliteStorage instance
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStorage)` - Successfully opened/created database
    /// * `Err(SieveError)` - Failed to open database
    pub fn new(path: &Path) -> Result<Self, SieveError> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
            PRAGMA busy_timeout = 5000;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database (for testing)
    #[cfg(test)]
    pub fn new_in_memory() -> Result<Self, SieveError> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }

    #[cfg(test)]
    pub(crate) fn connection(&self) -> &Connection {
        &self.conn
    }
}

/// Turns UNIQUE/NOT NULL failures into [`StorageError::ConstraintViolation`]
fn classify(err: rusqlite::Error, context: &str) -> StorageError {
    match err {
        rusqlite::Error::SqliteFailure(failure, message)
            if failure.code == ErrorCode::ConstraintViolation =>
        {
            let detail = message.unwrap_or_else(|| failure.to_string());
            StorageError::ConstraintViolation(format!("{}: {}", context, detail))
        }
        other => StorageError::Sqlite(other),
    }
}

fn run_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RunRecord> {
    Ok(RunRecord {
        id: row.get(0)?,
        site: row.get(1)?,
        started_at: row.get(2)?,
        finished_at: row.get(3)?,
        config_hash: row.get(4)?,
        status: RunStatus::from_db_string(&row.get::<_, String>(5)?).unwrap_or(RunStatus::Running),
        counts: RunCounts {
            links_found: row.get::<_, i64>(6)? as usize,
            processed: row.get::<_, i64>(7)? as usize,
            succeeded: row.get::<_, i64>(8)? as usize,
            failed: row.get::<_, i64>(9)? as usize,
        },
    })
}

impl CampaignStore for SqliteStorage {
    // ===== Campaign Rows =====

    fn lookup_by_reference_url(&self, url: &str) -> StorageResult<Option<i64>> {
        let id = self
            .conn
            .query_row(
                "SELECT id FROM campaigns WHERE reference_url = ?1",
                params![url],
                |row| row.get(0),
            )
            .optional()?;
        Ok(id)
    }

    fn insert(&mut self, record: &CampaignRecord) -> StorageResult<i64> {
        let now = Utc::now().to_rfc3339();
        self.conn
            .execute(
                "INSERT INTO campaigns
                    (reference_url, title, description, detail_html, image, bank, card, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)",
                params![
                    record.url,
                    record.title,
                    record.description,
                    record.detail_html,
                    record.image,
                    record.bank,
                    record.card,
                    now,
                ],
            )
            .map_err(|e| classify(e, &record.url))?;
        Ok(self.conn.last_insert_rowid())
    }

    fn update(&mut self, id: i64, record: &CampaignRecord, slug: &str) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        let changed = self
            .conn
            .execute(
                "UPDATE campaigns
                 SET slug = ?1, title = ?2, description = ?3, detail_html = ?4,
                     image = ?5, bank = ?6, card = ?7, updated_at = ?8
                 WHERE id = ?9",
                params![
                    slug,
                    record.title,
                    record.description,
                    record.detail_html,
                    record.image,
                    record.bank,
                    record.card,
                    now,
                    id,
                ],
            )
            .map_err(|e| classify(e, slug))?;

        if changed == 0 {
            return Err(StorageError::NotFound(format!("campaign {}", id)));
        }
        Ok(())
    }

    fn set_slug(&mut self, id: i64, slug: &str) -> StorageResult<()> {
        let changed = self
            .conn
            .execute(
                "UPDATE campaigns SET slug = ?1 WHERE id = ?2",
                params![slug, id],
            )
            .map_err(|e| classify(e, slug))?;

        if changed == 0 {
            return Err(StorageError::NotFound(format!("campaign {}", id)));
        }
        Ok(())
    }

    fn get_campaign(&self, id: i64) -> StorageResult<StoredCampaign> {
        self.conn
            .query_row(
                "SELECT id, reference_url, slug, title, description, image, bank, card,
                        created_at, updated_at
                 FROM campaigns WHERE id = ?1",
                params![id],
                |row| {
                    Ok(StoredCampaign {
                        id: row.get(0)?,
                        reference_url: row.get(1)?,
                        slug: row.get(2)?,
                        title: row.get(3)?,
                        description: row.get(4)?,
                        image: row.get(5)?,
                        bank: row.get(6)?,
                        card: row.get(7)?,
                        created_at: row.get(8)?,
                        updated_at: row.get(9)?,
                    })
                },
            )
            .optional()?
            .ok_or_else(|| StorageError::NotFound(format!("campaign {}", id)))
    }

    fn slug_repair_candidates(&self) -> StorageResult<Vec<SlugRow>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, title, slug FROM campaigns
             WHERE slug IS NULL OR slug = '' OR slug NOT LIKE '%-' || id
             ORDER BY id",
        )?;

        let rows = stmt
            .query_map([], |row| {
                Ok(SlugRow {
                    id: row.get(0)?,
                    title: row.get(1)?,
                    slug: row.get(2)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(rows)
    }

    // ===== Transactions =====

    fn is_transactional(&self) -> bool {
        true
    }

    fn begin(&mut self) -> StorageResult<()> {
        self.conn.execute_batch("BEGIN IMMEDIATE")?;
        Ok(())
    }

    fn commit(&mut self) -> StorageResult<()> {
        self.conn.execute_batch("COMMIT")?;
        Ok(())
    }

    fn rollback(&mut self) -> StorageResult<()> {
        self.conn.execute_batch("ROLLBACK")?;
        Ok(())
    }
}

impl RunStore for SqliteStorage {
    // ===== Run Management =====

    fn create_run(&mut self, site: &str, config_hash: &str) -> StorageResult<i64> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO runs (site, started_at, config_hash, status) VALUES (?1, ?2, ?3, ?4)",
            params![site, now, config_hash, RunStatus::Running.to_db_string()],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn complete_run(
        &mut self,
        run_id: i64,
        status: RunStatus,
        counts: &RunCounts,
    ) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        let changed = self.conn.execute(
            "UPDATE runs
             SET status = ?1, finished_at = ?2, links_found = ?3, processed = ?4,
                 succeeded = ?5, failed = ?6
             WHERE id = ?7",
            params![
                status.to_db_string(),
                now,
                counts.links_found as i64,
                counts.processed as i64,
                counts.succeeded as i64,
                counts.failed as i64,
                run_id,
            ],
        )?;

        if changed == 0 {
            return Err(StorageError::NotFound(format!("run {}", run_id)));
        }
        Ok(())
    }

    fn recent_runs(&self, limit: usize) -> StorageResult<Vec<RunRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, site, started_at, finished_at, config_hash, status,
                    links_found, processed, succeeded, failed
             FROM runs ORDER BY id DESC LIMIT ?1",
        )?;

        let runs = stmt
            .query_map(params![limit as i64], run_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(runs)
    }

    // ===== Statistics =====

    fn count_campaigns(&self) -> StorageResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM campaigns", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    fn count_missing_slugs(&self) -> StorageResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM campaigns WHERE slug IS NULL OR slug = ''",
            [],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    fn count_by_card(&self) -> StorageResult<Vec<CampaignCount>> {
        let mut stmt = self.conn.prepare(
            "SELECT bank, card, COUNT(*) FROM campaigns
             GROUP BY bank, card
             ORDER BY COUNT(*) DESC, bank, card",
        )?;

        let counts = stmt
            .query_map([], |row| {
                Ok(CampaignCount {
                    bank: row.get(0)?,
                    card: row.get(1)?,
                    count: row.get::<_, i64>(2)? as u64,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(counts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawler::testing::campaign_record;

    #[test]
    fn test_insert_and_lookup() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        let record = campaign_record(
            "https://www.paraf.com.tr/kampanya/market",
            "Market Kampanyası",
        );

        let id = storage.insert(&record).unwrap();

        assert_eq!(storage.lookup_by_reference_url(&record.url).unwrap(), Some(id));
        assert_eq!(storage.lookup_by_reference_url("https://www.paraf.com.tr/yok").unwrap(), None);

        let stored = storage.get_campaign(id).unwrap();
        assert_eq!(stored.title, "Market Kampanyası");
        assert_eq!(stored.slug, None);
        assert_eq!(stored.card, "Paraf");
    }

    #[test]
    fn test_duplicate_reference_url_is_constraint_violation() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        let record = campaign_record("https://www.paraf.com.tr/kampanya/a", "A");

        storage.insert(&record).unwrap();
        let result = storage.insert(&record);

        assert!(matches!(result, Err(StorageError::ConstraintViolation(_))));
    }

    #[test]
    fn test_update_overwrites_fields_and_slug() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        let record = campaign_record("https://www.paraf.com.tr/kampanya/a", "Eski Başlık");
        let id = storage.insert(&record).unwrap();

        let mut changed = record.clone();
        changed.title = "Yeni Başlık".to_string();
        changed.image = None;
        storage.update(id, &changed, &format!("yeni-baslik-{}", id)).unwrap();

        let stored = storage.get_campaign(id).unwrap();
        assert_eq!(stored.title, "Yeni Başlık");
        assert_eq!(stored.image, None);
        assert_eq!(stored.slug, Some(format!("yeni-baslik-{}", id)));
    }

    #[test]
    fn test_update_missing_row_is_not_found() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        let record = campaign_record("https://www.paraf.com.tr/kampanya/a", "A");

        assert!(matches!(
            storage.update(42, &record, "a-42"),
            Err(StorageError::NotFound(_))
        ));
        assert!(matches!(storage.set_slug(42, "a-42"), Err(StorageError::NotFound(_))));
    }

    #[test]
    fn test_duplicate_slug_is_constraint_violation() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        let a = storage.insert(&campaign_record("https://x/a", "A")).unwrap();
        let b = storage.insert(&campaign_record("https://x/b", "B")).unwrap();

        storage.set_slug(a, "ayni").unwrap();
        let result = storage.set_slug(b, "ayni");

        assert!(matches!(result, Err(StorageError::ConstraintViolation(_))));
    }

    #[test]
    fn test_slug_repair_candidates() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        let good = storage.insert(&campaign_record("https://x/1", "Bir")).unwrap();
        let missing = storage.insert(&campaign_record("https://x/2", "İki")).unwrap();
        let empty = storage.insert(&campaign_record("https://x/3", "Üç")).unwrap();
        let wrong = storage.insert(&campaign_record("https://x/4", "Dört")).unwrap();

        storage.set_slug(good, &format!("bir-{}", good)).unwrap();
        storage.set_slug(empty, "").unwrap();
        storage.set_slug(wrong, &format!("dort-1{}", wrong)).unwrap();

        let ids: Vec<i64> = storage
            .slug_repair_candidates()
            .unwrap()
            .iter()
            .map(|row| row.id)
            .collect();

        assert_eq!(ids, vec![missing, empty, wrong]);
    }

    #[test]
    fn test_rollback_discards_insert() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();

        storage.begin().unwrap();
        storage.insert(&campaign_record("https://x/a", "A")).unwrap();
        storage.rollback().unwrap();

        assert_eq!(storage.count_campaigns().unwrap(), 0);
    }

    #[test]
    fn test_run_lifecycle() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();

        let run_id = storage.create_run("Paraf", "abc123").unwrap();
        let runs = storage.recent_runs(5).unwrap();
        assert_eq!(runs[0].status, RunStatus::Running);
        assert!(runs[0].finished_at.is_none());

        let counts = RunCounts {
            links_found: 12,
            processed: 12,
            succeeded: 10,
            failed: 2,
        };
        storage.complete_run(run_id, RunStatus::Completed, &counts).unwrap();

        let runs = storage.recent_runs(5).unwrap();
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].site, "Paraf");
        assert_eq!(runs[0].status, RunStatus::Completed);
        assert_eq!(runs[0].counts, counts);
        assert!(runs[0].finished_at.is_some());
    }

    #[test]
    fn test_recent_runs_newest_first() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        let first = storage.create_run("Paraf", "h").unwrap();
        let second = storage.create_run("Paraf", "h").unwrap();

        let runs = storage.recent_runs(1).unwrap();

        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].id, second);
        assert_ne!(runs[0].id, first);
    }

    #[test]
    fn test_statistics() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        let a = storage.insert(&campaign_record("https://x/a", "A")).unwrap();
        storage.insert(&campaign_record("https://x/b", "B")).unwrap();
        let mut other = campaign_record("https://x/c", "C");
        other.bank = "Vakıfbank".to_string();
        other.card = "World".to_string();
        storage.insert(&other).unwrap();
        storage.set_slug(a, &format!("a-{}", a)).unwrap();

        assert_eq!(storage.count_campaigns().unwrap(), 3);
        assert_eq!(storage.count_missing_slugs().unwrap(), 2);

        let by_card = storage.count_by_card().unwrap();
        assert_eq!(by_card.len(), 2);
        assert_eq!(by_card[0].card, "Paraf");
        assert_eq!(by_card[0].count, 2);
        assert_eq!(by_card[1].bank, "Vakıfbank");
    }
}
