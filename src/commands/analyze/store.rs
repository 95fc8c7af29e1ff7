use super::*;

pub(super) struct RunRecord<'a> {
    pub(super) run_id: &'a str,
    pub(super) started_at: &'a str,
    pub(super) report_sha256: &'a str,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(super) struct PersistCounts {
    pub(super) clusters: usize,
    pub(super) observations: usize,
    pub(super) gap_items: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StoredRun {
    pub run_id: String,
    pub started_at: String,
    pub fact_count: i64,
    pub cluster_count: i64,
    pub conflicting_clusters: i64,
    pub unit_mixing_clusters: i64,
    pub overall_coverage: Option<f64>,
}

pub fn open_store(db_path: &Path) -> Result<Connection> {
    if let Some(parent) = db_path.parent() {
        ensure_directory(parent)?;
    }
    let connection = Connection::open(db_path)
        .with_context(|| format!("failed to open {}", db_path.display()))?;
    configure_connection(&connection)?;
    ensure_schema(&connection)?;
    Ok(connection)
}

fn configure_connection(connection: &Connection) -> Result<()> {
    connection
        .pragma_update(None, "journal_mode", "WAL")
        .context("failed to set journal_mode=WAL")?;
    connection
        .pragma_update(None, "synchronous", "NORMAL")
        .context("failed to set synchronous=NORMAL")?;
    connection
        .pragma_update(None, "foreign_keys", "ON")
        .context("failed to enable foreign keys")?;
    Ok(())
}

pub(super) fn ensure_schema(connection: &Connection) -> Result<()> {
    connection
        .execute_batch(
            "
            CREATE TABLE IF NOT EXISTS metadata (
              key TEXT PRIMARY KEY,
              value TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS runs (
              run_id TEXT PRIMARY KEY,
              started_at TEXT NOT NULL,
              report_sha256 TEXT NOT NULL,
              fact_count INTEGER NOT NULL,
              chunk_count INTEGER NOT NULL,
              cluster_count INTEGER NOT NULL,
              conflicting_clusters INTEGER NOT NULL,
              unit_mixing_clusters INTEGER NOT NULL,
              normalization_failures INTEGER NOT NULL,
              conflict_tolerance REAL NOT NULL,
              overall_coverage REAL
            );

            CREATE TABLE IF NOT EXISTS clusters (
              run_id TEXT NOT NULL,
              signature TEXT NOT NULL,
              context TEXT NOT NULL,
              name TEXT NOT NULL,
              fact_type TEXT NOT NULL,
              occurrence_count INTEGER NOT NULL,
              has_conflict INTEGER NOT NULL,
              conflict_description TEXT,
              recommended_unit TEXT,
              unit_mixing_json TEXT,
              PRIMARY KEY(run_id, signature),
              FOREIGN KEY(run_id) REFERENCES runs(run_id) ON DELETE CASCADE
            );

            CREATE TABLE IF NOT EXISTS observations (
              run_id TEXT NOT NULL,
              signature TEXT NOT NULL,
              seq INTEGER NOT NULL,
              name TEXT NOT NULL,
              fact_type TEXT NOT NULL,
              value_raw TEXT NOT NULL,
              value_num REAL,
              unit_raw TEXT,
              value_normalized REAL,
              unit_normalized TEXT,
              normalization_failed INTEGER NOT NULL,
              evidence TEXT NOT NULL,
              page INTEGER NOT NULL,
              issues_json TEXT,
              PRIMARY KEY(run_id, signature, seq),
              FOREIGN KEY(run_id, signature) REFERENCES clusters(run_id, signature) ON DELETE CASCADE
            );

            CREATE TABLE IF NOT EXISTS gap_items (
              run_id TEXT NOT NULL,
              item_id TEXT NOT NULL,
              section TEXT NOT NULL,
              label TEXT NOT NULL,
              found INTEGER NOT NULL,
              snippet TEXT,
              page INTEGER,
              PRIMARY KEY(run_id, item_id),
              FOREIGN KEY(run_id) REFERENCES runs(run_id) ON DELETE CASCADE
            );

            CREATE INDEX IF NOT EXISTS idx_clusters_conflict ON clusters(run_id, has_conflict);
            CREATE INDEX IF NOT EXISTS idx_gap_items_found ON gap_items(run_id, found);
            ",
        )
        .context("failed to create result schema")?;

    connection
        .execute(
            "INSERT OR REPLACE INTO metadata(key, value) VALUES ('db_schema_version', ?1)",
            params![DB_SCHEMA_VERSION],
        )
        .context("failed to record schema version")?;

    Ok(())
}

/// Stores one run. A run id that already exists is replaced.
pub(super) fn persist_run(
    connection: &mut Connection,
    record: &RunRecord<'_>,
    report: &AnalysisReport,
) -> Result<PersistCounts> {
    let tx = connection.transaction()?;
    let mut counts = PersistCounts::default();

    tx.execute("DELETE FROM runs WHERE run_id = ?1", params![record.run_id])?;

    let summary = &report.summary;
    tx.execute(
        "
        INSERT INTO runs(
          run_id, started_at, report_sha256, fact_count, chunk_count, cluster_count,
          conflicting_clusters, unit_mixing_clusters, normalization_failures,
          conflict_tolerance, overall_coverage
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
        ",
        params![
            record.run_id,
            record.started_at,
            record.report_sha256,
            summary.fact_count as i64,
            summary.chunk_count as i64,
            summary.cluster_count as i64,
            summary.conflicting_clusters as i64,
            summary.unit_mixing_clusters as i64,
            summary.normalization_failures as i64,
            summary.conflict_tolerance,
            report.gap_report.overall_coverage,
        ],
    )?;

    {
        let mut cluster_stmt = tx.prepare(
            "
            INSERT INTO clusters(
              run_id, signature, context, name, fact_type, occurrence_count,
              has_conflict, conflict_description, recommended_unit, unit_mixing_json
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            ",
        )?;
        let mut observation_stmt = tx.prepare(
            "
            INSERT INTO observations(
              run_id, signature, seq, name, fact_type, value_raw, value_num, unit_raw,
              value_normalized, unit_normalized, normalization_failed, evidence, page, issues_json
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
            ",
        )?;

        for cluster in &report.clusters {
            let unit_mixing_json = cluster
                .unit_mixing
                .as_ref()
                .map(serde_json::to_string)
                .transpose()
                .context("failed to serialize unit mixing")?;

            cluster_stmt.execute(params![
                record.run_id,
                cluster.signature,
                cluster.context.as_str(),
                cluster.name,
                fact_type_label(cluster.fact_type),
                cluster.occurrence_count as i64,
                cluster.has_conflict as i64,
                cluster.conflict_description,
                cluster
                    .unit_mixing
                    .as_ref()
                    .map(|mixing| mixing.recommended_unit.as_str()),
                unit_mixing_json,
            ])?;
            counts.clusters += 1;

            for (seq, fact) in cluster.observations.iter().enumerate() {
                let issues_json = if fact.issues.is_empty() {
                    None
                } else {
                    Some(
                        serde_json::to_string(&fact.issues)
                            .context("failed to serialize fact issues")?,
                    )
                };

                observation_stmt.execute(params![
                    record.run_id,
                    cluster.signature,
                    seq as i64,
                    fact.name,
                    fact_type_label(fact.fact_type),
                    fact.value_raw,
                    fact.value_num,
                    fact.unit_raw,
                    fact.value_normalized,
                    fact.unit_normalized,
                    fact.normalization_failed as i64,
                    fact.evidence,
                    i64::from(fact.page),
                    issues_json,
                ])?;
                counts.observations += 1;
            }
        }

        let mut gap_stmt = tx.prepare(
            "
            INSERT INTO gap_items(run_id, item_id, section, label, found, snippet, page)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ",
        )?;
        for section in &report.gap_report.sections {
            for item in &section.items {
                gap_stmt.execute(params![
                    record.run_id,
                    item.id,
                    section.title,
                    item.label,
                    item.found as i64,
                    item.snippet,
                    item.page.map(i64::from),
                ])?;
                counts.gap_items += 1;
            }
        }
    }

    tx.commit()?;
    Ok(counts)
}

fn fact_type_label(fact_type: FactType) -> &'static str {
    match fact_type {
        FactType::Quantity => "quantity",
        FactType::Categorical => "categorical",
    }
}

/// Stored runs, newest first.
pub fn load_stored_runs(connection: &Connection, limit: usize) -> Result<Vec<StoredRun>> {
    let mut stmt = connection.prepare(
        "
        SELECT run_id, started_at, fact_count, cluster_count, conflicting_clusters,
               unit_mixing_clusters, overall_coverage
        FROM runs
        ORDER BY started_at DESC, run_id DESC
        LIMIT ?1
        ",
    )?;

    let rows = stmt.query_map(params![limit as i64], |row| {
        Ok(StoredRun {
            run_id: row.get(0)?,
            started_at: row.get(1)?,
            fact_count: row.get(2)?,
            cluster_count: row.get(3)?,
            conflicting_clusters: row.get(4)?,
            unit_mixing_clusters: row.get(5)?,
            overall_coverage: row.get(6)?,
        })
    })?;

    let mut runs = Vec::new();
    for row in rows {
        runs.push(row?);
    }
    Ok(runs)
}

pub fn stored_schema_version(connection: &Connection) -> Result<Option<String>> {
    let version = connection
        .query_row(
            "SELECT value FROM metadata WHERE key = 'db_schema_version' LIMIT 1",
            [],
            |row| row.get::<_, String>(0),
        )
        .optional()?;
    Ok(version)
}
