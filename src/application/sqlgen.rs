// Copyright 2026 Google LLC
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! SQL text builders.
//!
//! Pure string functions; the decision logic that chooses *what* to run
//! lives in the strategies, this module only renders it.

use std::collections::BTreeMap;

/// CREATE DATABASE with optional LOCATION / MANAGEDLOCATION / DBPROPERTIES.
pub fn create_database(
    name: &str,
    location: Option<&str>,
    managed_location: Option<&str>,
    properties: &BTreeMap<String, String>,
) -> String {
    let mut sql = format!("CREATE DATABASE IF NOT EXISTS `{}`", name);
    if let Some(loc) = location {
        sql.push_str(&format!("\nLOCATION '{}'", loc));
    }
    if let Some(managed) = managed_location {
        sql.push_str(&format!("\nMANAGEDLOCATION '{}'", managed));
    }
    if !properties.is_empty() {
        let props: Vec<String> = properties
            .iter()
            .map(|(k, v)| format!("'{}'='{}'", k, v))
            .collect();
        sql.push_str(&format!("\nWITH DBPROPERTIES ({})", props.join(", ")));
    }
    sql
}

pub fn use_database(name: &str) -> String {
    format!("USE `{}`", name)
}

pub fn drop_table(database: &str, table: &str) -> String {
    format!("DROP TABLE IF EXISTS `{}`.`{}`", database, table)
}

pub fn rename_table(database: &str, from: &str, to: &str) -> String {
    format!("ALTER TABLE `{}`.`{}` RENAME TO `{}`.`{}`", database, from, database, to)
}

pub fn alter_table_location(database: &str, table: &str, location: &str) -> String {
    format!(
        "ALTER TABLE `{}`.`{}` SET LOCATION '{}'",
        database, table, location
    )
}

pub fn alter_partition_location(
    database: &str,
    table: &str,
    partition_spec: &str,
    location: &str,
) -> String {
    format!(
        "ALTER TABLE `{}`.`{}` PARTITION ({}) SET LOCATION '{}'",
        database,
        table,
        partition_spec_to_sql(partition_spec),
        location
    )
}

pub fn add_partition(database: &str, table: &str, partition_spec: &str, location: &str) -> String {
    format!(
        "ALTER TABLE `{}`.`{}` ADD IF NOT EXISTS PARTITION ({}) LOCATION '{}'",
        database,
        table,
        partition_spec_to_sql(partition_spec),
        location
    )
}

pub fn set_table_property(database: &str, table: &str, key: &str, value: &str) -> String {
    format!(
        "ALTER TABLE `{}`.`{}` SET TBLPROPERTIES ('{}'='{}')",
        database, table, key, value
    )
}

pub fn export_table(database: &str, table: &str, path: &str) -> String {
    format!("EXPORT TABLE `{}`.`{}` TO '{}'", database, table, path)
}

pub fn import_table(database: &str, table: &str, path: &str, external: bool) -> String {
    if external {
        format!(
            "IMPORT EXTERNAL TABLE `{}`.`{}` FROM '{}'",
            database, table, path
        )
    } else {
        format!("IMPORT TABLE `{}`.`{}` FROM '{}'", database, table, path)
    }
}

/// INSERT OVERWRITE from one table into another. Partitioned targets get a
/// dynamic-partition clause and a DISTRIBUTE BY on the partition keys so
/// each writer lands whole partitions.
pub fn insert_overwrite(
    source_db: &str,
    source_table: &str,
    target_db: &str,
    target_table: &str,
    partition_cols: &[String],
) -> String {
    if partition_cols.is_empty() {
        format!(
            "INSERT OVERWRITE TABLE `{}`.`{}` SELECT * FROM `{}`.`{}`",
            target_db, target_table, source_db, source_table
        )
    } else {
        let cols: Vec<String> = partition_cols.iter().map(|c| format!("`{}`", c)).collect();
        let cols = cols.join(", ");
        format!(
            "INSERT OVERWRITE TABLE `{}`.`{}` PARTITION ({}) SELECT * FROM `{}`.`{}` DISTRIBUTE BY {}",
            target_db, target_table, cols, source_db, source_table, cols
        )
    }
}

/// "year=2026/month=01" -> "`year`='2026', `month`='01'"
pub fn partition_spec_to_sql(spec: &str) -> String {
    spec.split('/')
        .filter_map(|part| {
            let (key, value) = part.split_once('=')?;
            Some(format!("`{}`='{}'", key, value))
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// Pulls the base location out of DDL lines.
pub fn extract_location(ddl: &[String]) -> Option<String> {
    let mut lines = ddl.iter();
    while let Some(line) = lines.next() {
        if line.trim().eq_ignore_ascii_case("location") || line.trim_start().to_lowercase().starts_with("location '") {
            // Either "LOCATION" followed by the quoted path on the next
            // line (beeline style) or inline "LOCATION '<path>'".
            let candidate = if line.trim().eq_ignore_ascii_case("location") {
                lines.next()?.as_str()
            } else {
                line.as_str()
            };
            return candidate.split('\'').nth(1).map(|s| s.to_string());
        }
    }
    None
}

/// Rewrites the LOCATION clause in DDL lines, inline or split form.
pub fn replace_location(ddl: &[String], new_location: &str) -> Vec<String> {
    let mut out = Vec::with_capacity(ddl.len());
    let mut replace_next = false;
    for line in ddl {
        if replace_next {
            let indent: String = line.chars().take_while(|c| c.is_whitespace()).collect();
            out.push(format!("{}'{}'", indent, new_location));
            replace_next = false;
            continue;
        }
        let trimmed = line.trim();
        if trimmed.eq_ignore_ascii_case("location") {
            out.push(line.clone());
            replace_next = true;
        } else if trimmed.to_lowercase().starts_with("location '") {
            let indent: String = line.chars().take_while(|c| c.is_whitespace()).collect();
            out.push(format!("{}LOCATION '{}'", indent, new_location));
        } else {
            out.push(line.clone());
        }
    }
    out
}

/// Drops the LOCATION clause entirely so the table lands at its default
/// warehouse spot.
pub fn strip_location(ddl: &[String]) -> Vec<String> {
    let mut out = Vec::with_capacity(ddl.len());
    let mut skip_next = false;
    for line in ddl {
        if skip_next {
            skip_next = false;
            continue;
        }
        let trimmed = line.trim();
        if trimmed.eq_ignore_ascii_case("location") {
            skip_next = true;
            continue;
        }
        if trimmed.to_lowercase().starts_with("location '") {
            continue;
        }
        out.push(line.clone());
    }
    out
}

/// Renames the table in a CREATE TABLE header line.
pub fn rename_in_ddl(ddl: &[String], database: &str, old_name: &str, new_name: &str) -> Vec<String> {
    let old = format!("`{}`.`{}`", database, old_name);
    let new = format!("`{}`.`{}`", database, new_name);
    ddl.iter()
        .map(|line| {
            if line.to_uppercase().contains("CREATE") && line.contains(&old) {
                line.replacen(&old, &new, 1)
            } else {
                line.clone()
            }
        })
        .collect()
}

pub fn is_external_ddl(ddl: &[String]) -> bool {
    ddl.iter()
        .any(|line| line.to_uppercase().contains("CREATE EXTERNAL TABLE"))
}

/// Downgrades a transactional table definition: external table, no ACID
/// properties, purge on drop.
pub fn downgrade_ddl(ddl: &[String]) -> Vec<String> {
    let mut out: Vec<String> = ddl
        .iter()
        .filter(|line| {
            let l = line.replace(' ', "").to_lowercase();
            !l.contains("'transactional'") && !l.contains("'transactional_properties'")
        })
        .map(|line| {
            let upper = line.to_uppercase();
            if upper.contains("CREATE TABLE") && !upper.contains("EXTERNAL") {
                line.replacen("CREATE TABLE", "CREATE EXTERNAL TABLE", 1)
            } else {
                line.clone()
            }
        })
        .collect();
    out.push("TBLPROPERTIES ('external.table.purge'='true')".to_string());
    out
}

/// Partition column names from the PARTITIONED BY clause.
pub fn partition_columns(ddl: &[String]) -> Vec<String> {
    let mut cols = Vec::new();
    let mut in_clause = false;
    for line in ddl {
        let upper = line.to_uppercase();
        if upper.contains("PARTITIONED BY") {
            in_clause = true;
        }
        if in_clause {
            for piece in line.split('`').skip(1).step_by(2) {
                cols.push(piece.to_string());
            }
            if line.contains(')') {
                break;
            }
        }
    }
    cols
}
