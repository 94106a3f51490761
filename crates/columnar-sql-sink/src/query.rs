//! Row shape and statement generation.

/// One row, positionally matching a [`RecordMapping`],
/// e.g. `[15928292, "user1", "GOLD_MEMBER", ["male", "over 40"]]`.
pub type Record = Vec<serde_json::Value>;

/// Column names in row order, e.g. `["timestamp", "id", "type", "tags"]`.
pub type RecordMapping = Vec<String>;

/// `count` comma-separated `?` placeholders.
pub fn gen_placeholders(count: usize) -> String {
    vec!["?"; count].join(",")
}

pub fn gen_insert_query(table: &str, mapping: &[String]) -> String {
    format!(
        "INSERT INTO {} ({}) VALUES ({})",
        table,
        mapping.join(","),
        gen_placeholders(mapping.len())
    )
}
