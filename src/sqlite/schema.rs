use rusqlite::Connection;

use crate::record::{SqlField, SqlIndex, SqlRecord};
use crate::types::{RowValues, TableType};

struct ColumnInfo {
    name: String,
    decl_type: String,
    not_null: bool,
    default_value: Option<String>,
    pk: i64,
}

fn quote(identifier: &str) -> String {
    format!("\"{}\"", identifier.replace('"', "\"\""))
}

fn table_info(conn: &Connection, table: &str) -> rusqlite::Result<Vec<ColumnInfo>> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({})", quote(table)))?;
    let rows = stmt.query_map([], |row| {
        Ok(ColumnInfo {
            name: row.get(1)?,
            decl_type: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
            not_null: row.get::<_, i64>(3)? != 0,
            default_value: row.get(4)?,
            pk: row.get(5)?,
        })
    })?;
    rows.collect()
}

fn names(conn: &Connection, sql: &str) -> rusqlite::Result<Vec<String>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
    rows.collect()
}

pub(crate) fn tables(conn: &Connection, table_type: TableType) -> rusqlite::Result<Vec<String>> {
    const USER_TABLES: &str = "SELECT name FROM sqlite_master \
         WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name";
    const VIEWS: &str = "SELECT name FROM sqlite_master WHERE type = 'view' ORDER BY name";
    const SYSTEM_TABLES: &str = "SELECT name FROM sqlite_master \
         WHERE type = 'table' AND name LIKE 'sqlite_%' ORDER BY name";

    let system = |conn: &Connection| -> rusqlite::Result<Vec<String>> {
        let mut out = vec!["sqlite_master".to_owned()];
        out.extend(names(conn, SYSTEM_TABLES)?);
        Ok(out)
    };

    match table_type {
        TableType::Tables => names(conn, USER_TABLES),
        TableType::Views => names(conn, VIEWS),
        TableType::SystemTables => system(conn),
        TableType::AllTables => {
            let mut out = names(conn, USER_TABLES)?;
            out.extend(names(conn, VIEWS)?);
            out.extend(system(conn)?);
            Ok(out)
        }
    }
}

pub(crate) fn record(conn: &Connection, table: &str) -> rusqlite::Result<SqlRecord> {
    let columns = table_info(conn, table)?;
    let single_pk = columns.iter().filter(|c| c.pk > 0).count() == 1;
    let fields = columns
        .into_iter()
        .map(|c| {
            // INTEGER PRIMARY KEY aliases the rowid and is filled in by the engine.
            let auto = single_pk && c.pk == 1 && c.decl_type.eq_ignore_ascii_case("integer");
            SqlField::new(c.name)
                .with_table_name(table)
                .with_type_name(c.decl_type)
                .with_required(c.not_null)
                .with_default_value(c.default_value.map_or(RowValues::Null, RowValues::Text))
                .with_auto_value(auto)
        })
        .collect();
    Ok(SqlRecord::from_fields(fields))
}

pub(crate) fn primary_index(conn: &Connection, table: &str) -> rusqlite::Result<SqlIndex> {
    let mut columns: Vec<ColumnInfo> = table_info(conn, table)?
        .into_iter()
        .filter(|c| c.pk > 0)
        .collect();
    columns.sort_by_key(|c| c.pk);

    let mut index = SqlIndex::new(table, table);
    for c in columns {
        index.append(
            SqlField::new(c.name)
                .with_table_name(table)
                .with_type_name(c.decl_type),
            false,
        );
    }
    Ok(index)
}
