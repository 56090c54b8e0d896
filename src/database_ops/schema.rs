//! Fixed table layouts for the three pantry datasets and the SQL built from them.

use anyhow::{bail, Result};

use crate::normalization::WholeFloats;

/// SQL flavour, chosen from the connection URL scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    MySql,
    Sqlite,
}

impl Dialect {
    pub fn from_url(url: &str) -> Result<Self> {
        let scheme = url
            .split_once(':')
            .map(|(s, _)| s.to_ascii_lowercase())
            .unwrap_or_default();
        match scheme.as_str() {
            "mysql" | "mariadb" => Ok(Self::MySql),
            "sqlite" => Ok(Self::Sqlite),
            other => bail!("unsupported database URL scheme {other:?} (expected mysql:// or sqlite:)"),
        }
    }

    fn insert_ignore(self) -> &'static str {
        match self {
            Self::MySql => "INSERT IGNORE INTO",
            Self::Sqlite => "INSERT OR IGNORE INTO",
        }
    }

    fn table_options(self) -> &'static str {
        match self {
            Self::MySql => " ENGINE=InnoDB DEFAULT CHARSET=utf8mb4 COLLATE=utf8mb4_unicode_ci",
            Self::Sqlite => "",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Column {
    pub name: &'static str,
    pub sql_type: &'static str,
    pub nullable: bool,
}

const fn col(name: &'static str, sql_type: &'static str) -> Column {
    Column {
        name,
        sql_type,
        nullable: true,
    }
}

const fn req(name: &'static str, sql_type: &'static str) -> Column {
    Column {
        name,
        sql_type,
        nullable: false,
    }
}

#[derive(Debug, Clone, Copy)]
pub struct TableSchema {
    pub name: &'static str,
    pub columns: &'static [Column],
    pub primary_key: &'static str,
    pub whole_floats: WholeFloats,
}

impl TableSchema {
    pub fn column_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.columns.iter().map(|c| c.name)
    }

    pub fn create_table_sql(&self, dialect: Dialect) -> String {
        let mut lines: Vec<String> = self
            .columns
            .iter()
            .map(|c| {
                let null = if c.nullable { "NULL" } else { "NOT NULL" };
                format!("  `{}` {} {}", c.name, c.sql_type, null)
            })
            .collect();
        lines.push(format!("  PRIMARY KEY (`{}`)", self.primary_key));
        format!(
            "CREATE TABLE IF NOT EXISTS `{}` (\n{}\n){}",
            self.name,
            lines.join(",\n"),
            dialect.table_options()
        )
    }

    /// Single-row insert with one positional placeholder per column.
    pub fn insert_sql(&self, dialect: Dialect) -> String {
        let cols: Vec<String> = self.column_names().map(|c| format!("`{c}`")).collect();
        let params = vec!["?"; self.columns.len()].join(", ");
        format!(
            "{} `{}` ({}) VALUES ({})",
            dialect.insert_ignore(),
            self.name,
            cols.join(", "),
            params
        )
    }
}

const ITEM_COLUMNS: &[Column] = &[
    req("ID", "INT"),
    col("Category_ID", "INT"),
    req("Name", "VARCHAR(255)"),
    col("Name_subtitle", "VARCHAR(255)"),
    col("Keywords", "VARCHAR(255)"),
    col("Pantry_Min", "INT"),
    col("Pantry_Max", "INT"),
    col("Pantry_Metric", "VARCHAR(64)"),
    col("Pantry_tips", "TEXT"),
    col("DOP_Pantry_Min", "INT"),
    col("DOP_Pantry_Max", "INT"),
    col("DOP_Pantry_Metric", "VARCHAR(64)"),
    col("DOP_Pantry_tips", "TEXT"),
    col("Pantry_After_Opening_Min", "INT"),
    col("Pantry_After_Opening_Max", "INT"),
    col("Pantry_After_Opening_Metric", "VARCHAR(64)"),
    col("Refrigerate_Min", "INT"),
    col("Refrigerate_Max", "INT"),
    col("Refrigerate_Metric", "VARCHAR(64)"),
    col("Refrigerate_tips", "TEXT"),
    col("DOP_Refrigerate_Min", "INT"),
    col("DOP_Refrigerate_Max", "INT"),
    col("DOP_Refrigerate_Metric", "VARCHAR(64)"),
    col("DOP_Refrigerate_tips", "TEXT"),
    col("Refrigerate_After_Opening_Min", "INT"),
    col("Refrigerate_After_Opening_Max", "INT"),
    col("Refrigerate_After_Opening_Metric", "VARCHAR(64)"),
    col("Refrigerate_After_Thawing_Min", "INT"),
    col("Refrigerate_After_Thawing_Max", "INT"),
    col("Refrigerate_After_Thawing_Metric", "VARCHAR(64)"),
    col("Freeze_Min", "INT"),
    col("Freeze_Max", "INT"),
    col("Freeze_Metric", "VARCHAR(64)"),
    col("Freeze_Tips", "TEXT"),
    col("DOP_Freeze_Min", "INT"),
    col("DOP_Freeze_Max", "INT"),
    col("DOP_Freeze_Metric", "VARCHAR(64)"),
    col("DOP_Freeze_Tips", "TEXT"),
];

pub const ITEMS: TableSchema = TableSchema {
    name: "items",
    columns: ITEM_COLUMNS,
    primary_key: "ID",
    whole_floats: WholeFloats::Coerce,
};

pub const CATEGORIES: TableSchema = TableSchema {
    name: "categories",
    columns: &[
        req("ID", "INT"),
        req("Category_Name", "VARCHAR(255)"),
        col("Subcategory_Name", "VARCHAR(255)"),
    ],
    primary_key: "ID",
    whole_floats: WholeFloats::Coerce,
};

// Version numbers are decimal by nature (e.g. 128.0 vs 128.1), so no coercion.
pub const VERSIONS: TableSchema = TableSchema {
    name: "versions",
    columns: &[
        req("Data_Version_Number", "DECIMAL(10,1)"),
        col("Current_Version", "VARCHAR(10)"),
        col("Modified_Date", "VARCHAR(20)"),
        col("FSIS_Approved_Flag", "VARCHAR(10)"),
        col("Approved_Date", "VARCHAR(20)"),
        col("Notes", "TEXT"),
    ],
    primary_key: "Data_Version_Number",
    whole_floats: WholeFloats::Keep,
};

/// The three seedable exports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dataset {
    Items,
    Categories,
    Versions,
}

impl Dataset {
    /// Seeding order for `all`: categories before the items that reference them.
    pub const ALL: [Dataset; 3] = [Dataset::Categories, Dataset::Items, Dataset::Versions];

    pub fn schema(self) -> &'static TableSchema {
        match self {
            Self::Items => &ITEMS,
            Self::Categories => &CATEGORIES,
            Self::Versions => &VERSIONS,
        }
    }

    pub fn default_file(self) -> &'static str {
        match self {
            Self::Items => "product.json",
            Self::Categories => "category.json",
            Self::Versions => "version.json",
        }
    }

    /// One-line run summary printed to stdout.
    pub fn summary(self, processed: usize) -> String {
        match self {
            Self::Items => format!("Processed {processed} items (existing IDs ignored)."),
            Self::Categories => {
                format!("Processed {processed} categories (existing IDs ignored).")
            }
            Self::Versions => {
                format!("Processed {processed} versions (existing version numbers ignored).")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn items_schema_matches_export_columns() {
        assert_eq!(ITEMS.columns.len(), 38);
        assert_eq!(ITEMS.columns[0], req("ID", "INT"));
        let required: Vec<_> = ITEMS
            .columns
            .iter()
            .filter(|c| !c.nullable)
            .map(|c| c.name)
            .collect();
        assert_eq!(required, vec!["ID", "Name"]);
    }

    #[test]
    fn primary_keys_are_declared_columns() {
        for ds in Dataset::ALL {
            let schema = ds.schema();
            assert!(schema.column_names().any(|c| c == schema.primary_key));
        }
    }

    #[test]
    fn mysql_ddl_is_create_if_absent_with_innodb() {
        let ddl = CATEGORIES.create_table_sql(Dialect::MySql);
        assert!(ddl.starts_with("CREATE TABLE IF NOT EXISTS `categories`"));
        assert!(ddl.contains("`ID` INT NOT NULL"));
        assert!(ddl.contains("`Subcategory_Name` VARCHAR(255) NULL"));
        assert!(ddl.contains("PRIMARY KEY (`ID`)"));
        assert!(ddl.ends_with("COLLATE=utf8mb4_unicode_ci"));
    }

    #[test]
    fn insert_uses_dialect_ignore_form() {
        let mysql = VERSIONS.insert_sql(Dialect::MySql);
        assert!(mysql.starts_with("INSERT IGNORE INTO `versions`"));
        assert_eq!(mysql.matches('?').count(), 6);

        let sqlite = VERSIONS.insert_sql(Dialect::Sqlite);
        assert!(sqlite.starts_with("INSERT OR IGNORE INTO `versions`"));
        assert!(!CATEGORIES.create_table_sql(Dialect::Sqlite).contains("ENGINE"));
    }

    #[test]
    fn dialect_from_url_scheme() {
        assert_eq!(Dialect::from_url("mysql://root@localhost/x").unwrap(), Dialect::MySql);
        assert_eq!(Dialect::from_url("mariadb://db/x").unwrap(), Dialect::MySql);
        assert_eq!(Dialect::from_url("sqlite::memory:").unwrap(), Dialect::Sqlite);
        assert!(Dialect::from_url("postgres://db/x").is_err());
        assert!(Dialect::from_url("no-scheme").is_err());
    }

    #[test]
    fn only_versions_keep_whole_floats() {
        assert_eq!(ITEMS.whole_floats, WholeFloats::Coerce);
        assert_eq!(CATEGORIES.whole_floats, WholeFloats::Coerce);
        assert_eq!(VERSIONS.whole_floats, WholeFloats::Keep);
    }

    #[test]
    fn summaries_match_seed_output() {
        assert_eq!(
            Dataset::Items.summary(3),
            "Processed 3 items (existing IDs ignored)."
        );
        assert_eq!(
            Dataset::Versions.summary(1),
            "Processed 1 versions (existing version numbers ignored)."
        );
    }
}
