mod result_set;
mod row;

pub use result_set::ResultSet;
pub use row::CustomDbRow;

/// A result row rendered as a JSON object keyed by column name.
pub type Document = serde_json::Map<String, serde_json::Value>;
