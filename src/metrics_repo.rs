// SQLite aggregate store: cpu/memory load tables plus the fixed two-row
// network table (id 1 = lifetime total, id 2 = last observed baseline).

use crate::models::{LoadRecord, NETWORK_ROW_BASELINE, NETWORK_ROW_TOTAL, NetworkRecord};
use sqlx::Row;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::str::FromStr;
use tracing::instrument;

/// Persisted load table. An enum rather than a raw table-name string so SQL
/// is always built from a fixed set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadTable {
    Cpu,
    Memory,
}

impl LoadTable {
    fn name(self) -> &'static str {
        match self {
            LoadTable::Cpu => "cpu",
            LoadTable::Memory => "memory",
        }
    }
}

pub struct MetricsRepo {
    pool: SqlitePool,
    retention_ms: i64,
}

impl MetricsRepo {
    pub async fn connect(path: &str, retention_days: u32) -> anyhow::Result<Self> {
        if let Some(parent) = Path::new(path).parent() {
            std::fs::create_dir_all(parent)?;
        }
        let opts = SqliteConnectOptions::from_str(&format!("sqlite:{}", path))?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .busy_timeout(std::time::Duration::from_secs(5))
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal);
        let pool = SqlitePoolOptions::new().connect_with(opts).await?;
        let retention_ms = (retention_days as i64) * 24 * 60 * 60 * 1000;
        Ok(Self { pool, retention_ms })
    }

    pub async fn init(&self) -> anyhow::Result<()> {
        for table in ["cpu", "memory"] {
            sqlx::query(&format!(
                "CREATE TABLE IF NOT EXISTS {} (time INTEGER NOT NULL, load REAL NOT NULL)",
                table
            ))
            .execute(&self.pool)
            .await?;
            sqlx::query(&format!(
                "CREATE INDEX IF NOT EXISTS idx_{}_time ON {}(time)",
                table, table
            ))
            .execute(&self.pool)
            .await?;
        }

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS network (
                id INTEGER PRIMARY KEY,
                time INTEGER NOT NULL,
                rx_bytes INTEGER NOT NULL,
                tx_bytes INTEGER NOT NULL,
                interface TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        // Seed the two fixed rows so reconciliation has a baseline on first run.
        for id in [NETWORK_ROW_TOTAL, NETWORK_ROW_BASELINE] {
            sqlx::query(
                "INSERT OR IGNORE INTO network (id, time, rx_bytes, tx_bytes, interface)
                 VALUES ($1, $2, 0, 0, '')",
            )
            .bind(id)
            .bind(now_ms())
            .execute(&self.pool)
            .await?;
        }

        Ok(())
    }

    #[instrument(skip(self), fields(repo = "metrics", operation = "add_load"))]
    pub async fn add_load(&self, table: LoadTable, time: i64, load: f64) -> anyhow::Result<()> {
        sqlx::query(&format!(
            "INSERT INTO {} (time, load) VALUES ($1, $2)",
            table.name()
        ))
        .bind(time)
        .bind(load)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Load rows with time in [time_start, time_end], ascending.
    #[instrument(skip(self), fields(repo = "metrics", operation = "get_loads"))]
    pub async fn get_loads(
        &self,
        table: LoadTable,
        time_start: i64,
        time_end: i64,
    ) -> anyhow::Result<Vec<LoadRecord>> {
        let rows = sqlx::query(&format!(
            "SELECT time, load FROM {} WHERE time BETWEEN $1 AND $2 ORDER BY time ASC",
            table.name()
        ))
        .bind(time_start)
        .bind(time_end)
        .fetch_all(&self.pool)
        .await?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(LoadRecord {
                time: row.try_get("time")?,
                load: row.try_get("load")?,
            });
        }
        Ok(out)
    }

    /// Delete load rows strictly older than `cutoff`.
    #[instrument(skip(self), fields(repo = "metrics", operation = "delete_loads_older_than"))]
    pub async fn delete_loads_older_than(
        &self,
        table: LoadTable,
        cutoff: i64,
    ) -> anyhow::Result<u64> {
        let r = sqlx::query(&format!("DELETE FROM {} WHERE time < $1", table.name()))
            .bind(cutoff)
            .execute(&self.pool)
            .await?;
        Ok(r.rows_affected())
    }

    /// Retention sweep over both load tables; called after every flush.
    #[instrument(skip(self), fields(repo = "metrics", operation = "sweep_expired_loads"))]
    pub async fn sweep_expired_loads(&self) -> anyhow::Result<u64> {
        let cutoff = now_ms() - self.retention_ms;
        let mut deleted = 0;
        for table in [LoadTable::Cpu, LoadTable::Memory] {
            deleted += self.delete_loads_older_than(table, cutoff).await?;
        }
        Ok(deleted)
    }

    #[instrument(skip(self), fields(repo = "metrics", operation = "get_network_row"))]
    pub async fn get_network_row(&self, id: i64) -> anyhow::Result<Option<NetworkRecord>> {
        let row = sqlx::query(
            "SELECT id, time, rx_bytes, tx_bytes, interface FROM network WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        let Some(row) = row else {
            return Ok(None);
        };
        Ok(Some(NetworkRecord {
            id: row.try_get("id")?,
            time: row.try_get("time")?,
            rx_bytes: row.try_get::<i64, _>("rx_bytes")? as u64,
            tx_bytes: row.try_get::<i64, _>("tx_bytes")? as u64,
            interface: row.try_get("interface")?,
        }))
    }

    #[instrument(skip(self), fields(repo = "metrics", operation = "update_network_row"))]
    pub async fn update_network_row(
        &self,
        id: i64,
        rx_bytes: u64,
        tx_bytes: u64,
        interface: &str,
        time: i64,
    ) -> anyhow::Result<()> {
        sqlx::query(
            "UPDATE network SET rx_bytes = $1, tx_bytes = $2, interface = $3, time = $4
             WHERE id = $5",
        )
        .bind(rx_bytes as i64)
        .bind(tx_bytes as i64)
        .bind(interface)
        .bind(time)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

/// Milliseconds since the Unix epoch.
pub fn now_ms() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}
