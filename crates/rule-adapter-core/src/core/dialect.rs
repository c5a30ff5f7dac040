// crates/rule-adapter-core/src/core/dialect.rs
// ============================================================================
// Module: SQL Dialects
// Description: Product identification and per-dialect rule table DDL.
// Purpose: Provision the rule table idempotently on every supported product.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Each [`Dialect`] owns a [`DialectSchema`]: an ordered list of
//! [`SchemaStep`]s to create the rule table and another to drop it. A step is
//! a statement template plus an optional existence guard, so products without
//! `IF NOT EXISTS` (or without native auto-increment) are handled by data
//! rather than by branching code.
//!
//! Templates use `{table}` for the configured table name and `{TABLE}` for
//! its upper-case form (catalog lookups on products that fold identifiers).

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

use crate::interfaces::AdapterError;

// ============================================================================
// SECTION: Column Layout
// ============================================================================

/// Shared column list following each dialect's surrogate key definition.
macro_rules! rule_columns {
    () => {
        "ptype VARCHAR(100) NOT NULL, v0 VARCHAR(100), v1 VARCHAR(100), v2 VARCHAR(100), \
         v3 VARCHAR(100), v4 VARCHAR(100), v5 VARCHAR(100)"
    };
}

// ============================================================================
// SECTION: Dialect
// ============================================================================

/// Supported SQL products.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dialect {
    /// `MySQL` and `MariaDB`.
    MySql,
    /// `PostgreSQL`.
    Postgres,
    /// Microsoft SQL Server.
    SqlServer,
    /// Oracle Database.
    Oracle,
    /// H2 embedded database.
    H2,
    /// `SQLite` embedded database.
    Sqlite,
}

impl Dialect {
    /// Every supported dialect.
    pub const ALL: [Self; 6] =
        [Self::MySql, Self::Postgres, Self::SqlServer, Self::Oracle, Self::H2, Self::Sqlite];

    /// Identifies a dialect from a driver-reported product name.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError::Dialect`] for unsupported products.
    pub fn from_product_name(name: &str) -> Result<Self, AdapterError> {
        let name = name.trim();
        let dialect = if name.eq_ignore_ascii_case("mysql") || name.eq_ignore_ascii_case("mariadb")
        {
            Self::MySql
        } else if name.eq_ignore_ascii_case("postgresql") {
            Self::Postgres
        } else if name.eq_ignore_ascii_case("microsoft sql server") {
            Self::SqlServer
        } else if name.eq_ignore_ascii_case("oracle") {
            Self::Oracle
        } else if name.eq_ignore_ascii_case("h2") {
            Self::H2
        } else if name.eq_ignore_ascii_case("sqlite") {
            Self::Sqlite
        } else {
            return Err(AdapterError::Dialect(format!("unsupported database product: {name}")));
        };
        Ok(dialect)
    }

    /// Returns the canonical product name for this dialect.
    #[must_use]
    pub const fn product_name(self) -> &'static str {
        match self {
            Self::MySql => "MySQL",
            Self::Postgres => "PostgreSQL",
            Self::SqlServer => "Microsoft SQL Server",
            Self::Oracle => "Oracle",
            Self::H2 => "H2",
            Self::Sqlite => "SQLite",
        }
    }

    /// Returns the bind placeholder for the 1-based parameter `index`.
    #[must_use]
    pub fn placeholder(self, index: usize) -> String {
        match self {
            Self::MySql | Self::H2 | Self::Sqlite => "?".to_string(),
            Self::Postgres => format!("${index}"),
            Self::SqlServer => format!("@P{index}"),
            Self::Oracle => format!(":{index}"),
        }
    }

    /// Returns the provisioning plan for this dialect.
    #[must_use]
    pub const fn schema(self) -> &'static DialectSchema {
        match self {
            Self::MySql => &MYSQL_SCHEMA,
            Self::Postgres => &POSTGRES_SCHEMA,
            Self::SqlServer => &SQL_SERVER_SCHEMA,
            Self::Oracle => &ORACLE_SCHEMA,
            Self::H2 => &H2_SCHEMA,
            Self::Sqlite => &SQLITE_SCHEMA,
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.product_name())
    }
}

// ============================================================================
// SECTION: Schema Plans
// ============================================================================

/// Condition under which a schema step runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepGuard {
    /// Always run the statement.
    Always,
    /// Run only when the existence query returns no rows.
    IfAbsent(&'static str),
    /// Run only when the existence query returns a row.
    IfPresent(&'static str),
}

/// One DDL statement in a provisioning plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchemaStep {
    /// Short label used in logs.
    pub label: &'static str,
    /// Existence guard.
    pub guard: StepGuard,
    /// Statement template.
    pub statement: &'static str,
}

/// Create and drop plans for one dialect.
///
/// # Invariants
/// - Running `create` on an existing table is a no-op.
/// - `drop` removes the table and every auxiliary object `create` made.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DialectSchema {
    /// Steps provisioning the table, in order.
    pub create: &'static [SchemaStep],
    /// Steps removing the table, in order.
    pub drop: &'static [SchemaStep],
}

/// Renders a statement template against a table name.
#[must_use]
pub fn render_template(template: &str, table: &str) -> String {
    template.replace("{TABLE}", &table.to_ascii_uppercase()).replace("{table}", table)
}

/// `MySQL` plan: catalog check first, then a guarded create.
const MYSQL_SCHEMA: DialectSchema = DialectSchema {
    create: &[SchemaStep {
        label: "table",
        guard: StepGuard::IfAbsent("SHOW TABLES LIKE '{table}'"),
        statement: concat!(
            "CREATE TABLE IF NOT EXISTS {table} (id INT NOT NULL PRIMARY KEY AUTO_INCREMENT, ",
            rule_columns!(),
            ")"
        ),
    }],
    drop: &[SchemaStep {
        label: "table",
        guard: StepGuard::Always,
        statement: "DROP TABLE IF EXISTS {table}",
    }],
};

/// `PostgreSQL` plan: a sequence backs the surrogate key.
const POSTGRES_SCHEMA: DialectSchema = DialectSchema {
    create: &[
        SchemaStep {
            label: "sequence",
            guard: StepGuard::IfAbsent(
                "SELECT 1 FROM information_schema.tables WHERE table_name = '{table}'",
            ),
            statement: "CREATE SEQUENCE IF NOT EXISTS {table}_seq START 1",
        },
        SchemaStep {
            label: "table",
            guard: StepGuard::Always,
            statement: concat!(
                "CREATE TABLE IF NOT EXISTS {table} (id INT NOT NULL PRIMARY KEY DEFAULT \
                 nextval('{table}_seq'::regclass), ",
                rule_columns!(),
                ")"
            ),
        },
    ],
    drop: &[
        SchemaStep {
            label: "table",
            guard: StepGuard::Always,
            statement: "DROP TABLE IF EXISTS {table}",
        },
        SchemaStep {
            label: "sequence",
            guard: StepGuard::Always,
            statement: "DROP SEQUENCE IF EXISTS {table}_seq",
        },
    ],
};

/// SQL Server catalog lookup for the rule table.
const SQL_SERVER_TABLE_EXISTS: &str =
    "SELECT 1 FROM sysobjects WHERE name = '{table}' AND xtype = 'U'";

/// SQL Server plan: native identity column behind a catalog guard.
///
/// The create repeats the guard inline so a concurrent create between the
/// check and the statement is not an error.
const SQL_SERVER_SCHEMA: DialectSchema = DialectSchema {
    create: &[SchemaStep {
        label: "table",
        guard: StepGuard::IfAbsent(SQL_SERVER_TABLE_EXISTS),
        statement: concat!(
            "IF NOT EXISTS (SELECT 1 FROM sysobjects WHERE name = '{table}' AND xtype = 'U') ",
            "CREATE TABLE {table} (id INT NOT NULL PRIMARY KEY IDENTITY(1, 1), ",
            rule_columns!(),
            ")"
        ),
    }],
    drop: &[SchemaStep {
        label: "table",
        guard: StepGuard::IfPresent(SQL_SERVER_TABLE_EXISTS),
        statement: "DROP TABLE {table}",
    }],
};

/// Oracle catalog lookup for the rule table.
const ORACLE_TABLE_EXISTS: &str = "SELECT 1 FROM user_tables WHERE table_name = '{TABLE}'";
/// Oracle catalog lookup for the key sequence.
const ORACLE_SEQUENCE_EXISTS: &str =
    "SELECT 1 FROM user_sequences WHERE sequence_name = '{TABLE}_SEQ'";
/// Oracle catalog lookup for the key trigger.
const ORACLE_TRIGGER_EXISTS: &str =
    "SELECT 1 FROM user_triggers WHERE trigger_name = '{TABLE}_ID_AUTOINCREMENT'";

/// Oracle plan: table, sequence, and insert trigger emulate auto-increment.
///
/// Table and sequence DDL runs inside PL/SQL blocks that swallow ORA-00955
/// (name already used); the trigger is created with `OR REPLACE`.
const ORACLE_SCHEMA: DialectSchema = DialectSchema {
    create: &[
        SchemaStep {
            label: "table",
            guard: StepGuard::IfAbsent(ORACLE_TABLE_EXISTS),
            statement: concat!(
                "BEGIN EXECUTE IMMEDIATE 'CREATE TABLE {table} (id NUMBER(10, 0) NOT NULL PRIMARY \
                 KEY, ",
                rule_columns!(),
                ")'; EXCEPTION WHEN OTHERS THEN IF SQLCODE != -955 THEN RAISE; END IF; END;"
            ),
        },
        SchemaStep {
            label: "sequence",
            guard: StepGuard::IfAbsent(ORACLE_SEQUENCE_EXISTS),
            statement: "BEGIN EXECUTE IMMEDIATE 'CREATE SEQUENCE {table}_seq INCREMENT BY 1 \
                        START WITH 1 NOMAXVALUE NOCYCLE NOCACHE'; EXCEPTION WHEN OTHERS THEN IF \
                        SQLCODE != -955 THEN RAISE; END IF; END;",
        },
        SchemaStep {
            label: "trigger",
            guard: StepGuard::IfAbsent(ORACLE_TRIGGER_EXISTS),
            statement: "CREATE OR REPLACE TRIGGER {table}_id_autoincrement BEFORE INSERT ON \
                        {table} FOR EACH ROW WHEN (new.id IS NULL) BEGIN SELECT \
                        {table}_seq.nextval INTO :new.id FROM dual; END;",
        },
    ],
    drop: &[
        SchemaStep {
            label: "trigger",
            guard: StepGuard::IfPresent(ORACLE_TRIGGER_EXISTS),
            statement: "DROP TRIGGER {table}_id_autoincrement",
        },
        SchemaStep {
            label: "sequence",
            guard: StepGuard::IfPresent(ORACLE_SEQUENCE_EXISTS),
            statement: "DROP SEQUENCE {table}_seq",
        },
        SchemaStep {
            label: "table",
            guard: StepGuard::IfPresent(ORACLE_TABLE_EXISTS),
            statement: "DROP TABLE {table}",
        },
    ],
};

/// H2 plan: native identity column.
const H2_SCHEMA: DialectSchema = DialectSchema {
    create: &[SchemaStep {
        label: "table",
        guard: StepGuard::Always,
        statement: concat!(
            "CREATE TABLE IF NOT EXISTS {table} (id INT GENERATED ALWAYS AS IDENTITY PRIMARY KEY, ",
            rule_columns!(),
            ")"
        ),
    }],
    drop: &[SchemaStep {
        label: "table",
        guard: StepGuard::Always,
        statement: "DROP TABLE IF EXISTS {table}",
    }],
};

/// `SQLite` plan: rowid alias as the surrogate key.
const SQLITE_SCHEMA: DialectSchema = DialectSchema {
    create: &[SchemaStep {
        label: "table",
        guard: StepGuard::Always,
        statement: concat!(
            "CREATE TABLE IF NOT EXISTS {table} (id INTEGER PRIMARY KEY AUTOINCREMENT, ",
            rule_columns!(),
            ")"
        ),
    }],
    drop: &[SchemaStep {
        label: "table",
        guard: StepGuard::Always,
        statement: "DROP TABLE IF EXISTS {table}",
    }],
};

// ============================================================================
// SECTION: Tests
// ============================================================================
