//! Versioned, idempotent schema migrations
//!
//! Each migration is an ordered list of single SQL statements applied in one
//! transaction. The schema version lives in `PRAGMA user_version`; re-running
//! against an up-to-date database is a no-op.

use sqlx::SqlitePool;

use crate::error::AppResult;

struct Migration {
    version: i64,
    name: &'static str,
    statements: &'static [&'static str],
}

const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "base schema",
        statements: &[
            r#"
            CREATE TABLE IF NOT EXISTS items (
                item_id TEXT PRIMARY KEY,
                item_name TEXT NOT NULL,
                item_type TEXT NOT NULL,
                unit_of_measure TEXT NOT NULL,
                material_type TEXT,
                denier INTEGER,
                ps_ratio REAL,
                braid_structure TEXT,
                has_core INTEGER,
                color TEXT,
                length_m REAL,
                twist_type TEXT,
                knit_type TEXT,
                additional_attributes TEXT,
                source_system TEXT,
                created_at TEXT NOT NULL
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS bom_components (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                parent_item_id TEXT NOT NULL REFERENCES items(item_id),
                component_item_id TEXT NOT NULL REFERENCES items(item_id),
                quantity REAL NOT NULL CHECK (quantity > 0),
                usage_type TEXT NOT NULL,
                created_at TEXT NOT NULL,
                UNIQUE (parent_item_id, component_item_id, usage_type),
                CHECK (parent_item_id <> component_item_id)
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS process_steps (
                process_code TEXT PRIMARY KEY,
                process_name TEXT NOT NULL,
                process_level INTEGER NOT NULL,
                accuracy_type TEXT NOT NULL
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS quality_grades (
                grade_code TEXT PRIMARY KEY,
                grade_name TEXT NOT NULL,
                processing_rule TEXT NOT NULL
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS lots (
                lot_id TEXT PRIMARY KEY,
                item_id TEXT NOT NULL REFERENCES items(item_id),
                process_code TEXT NOT NULL REFERENCES process_steps(process_code),
                production_date TEXT NOT NULL,
                planned_quantity REAL NOT NULL CHECK (planned_quantity > 0),
                actual_quantity REAL,
                current_quantity REAL NOT NULL CHECK (current_quantity >= 0),
                quality_grade TEXT NOT NULL REFERENCES quality_grades(grade_code),
                lot_status TEXT NOT NULL DEFAULT 'active',
                equipment_id TEXT,
                operator_id TEXT,
                location TEXT,
                measured_length REAL,
                measured_weight REAL,
                measurement_notes TEXT,
                created_at TEXT NOT NULL
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS lot_genealogy (
                id TEXT PRIMARY KEY,
                parent_lot_id TEXT NOT NULL REFERENCES lots(lot_id),
                child_lot_id TEXT NOT NULL REFERENCES lots(lot_id),
                consumed_quantity REAL NOT NULL CHECK (consumed_quantity > 0),
                consumption_rate REAL NOT NULL,
                process_code TEXT NOT NULL,
                consumption_date TEXT NOT NULL,
                usage_type TEXT NOT NULL,
                notes TEXT,
                created_at TEXT NOT NULL
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS inventory_transactions (
                id TEXT PRIMARY KEY,
                lot_id TEXT NOT NULL REFERENCES lots(lot_id),
                transaction_type TEXT NOT NULL,
                quantity_before REAL NOT NULL,
                quantity_change REAL NOT NULL,
                quantity_after REAL NOT NULL,
                location TEXT,
                operator_id TEXT,
                equipment_id TEXT,
                transaction_date TEXT NOT NULL,
                notes TEXT,
                created_at TEXT NOT NULL
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS product_master (
                product_code TEXT PRIMARY KEY,
                product_name TEXT NOT NULL,
                product_type TEXT NOT NULL,
                unit_of_measure TEXT NOT NULL,
                series_name TEXT,
                yarn_composition TEXT,
                color TEXT,
                length_m REAL,
                updated_at TEXT NOT NULL
            )
            "#,
            "CREATE INDEX IF NOT EXISTS idx_bom_parent ON bom_components (parent_item_id)",
            "CREATE INDEX IF NOT EXISTS idx_lots_item ON lots (item_id)",
            "CREATE INDEX IF NOT EXISTS idx_genealogy_parent ON lot_genealogy (parent_lot_id)",
            "CREATE INDEX IF NOT EXISTS idx_genealogy_child ON lot_genealogy (child_lot_id)",
            "CREATE INDEX IF NOT EXISTS idx_transactions_lot ON inventory_transactions (lot_id)",
        ],
    },
    Migration {
        version: 2,
        name: "process and grade reference data",
        statements: &[
            "INSERT OR IGNORE INTO process_steps (process_code, process_name, process_level, accuracy_type) VALUES ('P', 'Pre-Stretch', 1, 'weight')",
            "INSERT OR IGNORE INTO process_steps (process_code, process_name, process_level, accuracy_type) VALUES ('W', 'Winding', 2, 'length')",
            "INSERT OR IGNORE INTO process_steps (process_code, process_name, process_level, accuracy_type) VALUES ('B', 'Post-Stretch', 3, 'length')",
            "INSERT OR IGNORE INTO process_steps (process_code, process_name, process_level, accuracy_type) VALUES ('S', 'Braiding', 4, 'length')",
            "INSERT OR IGNORE INTO process_steps (process_code, process_name, process_level, accuracy_type) VALUES ('C', 'Coating', 5, 'length')",
            "INSERT OR IGNORE INTO process_steps (process_code, process_name, process_level, accuracy_type) VALUES ('F', 'Spooling', 6, 'count')",
            "INSERT OR IGNORE INTO process_steps (process_code, process_name, process_level, accuracy_type) VALUES ('E', 'Packaging', 7, 'count')",
            "INSERT OR IGNORE INTO quality_grades (grade_code, grade_name, processing_rule) VALUES ('A', 'Grade A', 'ship as-is')",
            "INSERT OR IGNORE INTO quality_grades (grade_code, grade_name, processing_rule) VALUES ('B', 'Grade B', 'inspection required')",
            "INSERT OR IGNORE INTO quality_grades (grade_code, grade_name, processing_rule) VALUES ('C', 'Grade C', 'rework or disposal')",
        ],
    },
];

/// Apply all migrations newer than the database's current version
pub async fn run(pool: &SqlitePool) -> AppResult<()> {
    let current: i64 = sqlx::query_scalar("PRAGMA user_version")
        .fetch_one(pool)
        .await?;

    for migration in MIGRATIONS {
        if migration.version <= current {
            continue;
        }

        tracing::info!(
            version = migration.version,
            name = migration.name,
            "Applying migration"
        );

        let mut tx = pool.begin().await?;
        for statement in migration.statements {
            sqlx::query(statement).execute(&mut *tx).await?;
        }
        sqlx::query(&format!("PRAGMA user_version = {}", migration.version))
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
    }

    Ok(())
}
