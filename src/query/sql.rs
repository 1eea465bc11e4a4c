use crate::types::RowValues;

/// SQL text plus the parameters its `$n` placeholders refer to, in placeholder order.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryAndParams {
    pub query: String,
    pub params: Vec<RowValues>,
}

/// Parameter accumulator used while assembling a statement.
///
/// Every placeholder is handed out by [`Bindings::bind`], so the number of `$n`
/// markers in the text always equals `params.len()`.
#[derive(Debug, Default)]
pub(crate) struct Bindings {
    params: Vec<RowValues>,
}

impl Bindings {
    pub(crate) fn bind(&mut self, value: RowValues) -> String {
        self.params.push(value);
        format!("${}", self.params.len())
    }

    pub(crate) fn len(&self) -> usize {
        self.params.len()
    }

    /// Append a caller fragment's own parameters, returning the offset its `$1` starts after.
    pub(crate) fn extend(&mut self, values: &[RowValues]) -> usize {
        let offset = self.params.len();
        self.params.extend_from_slice(values);
        offset
    }

    pub(crate) fn finish(self, query: String) -> QueryAndParams {
        QueryAndParams {
            query,
            params: self.params,
        }
    }
}

/// Double-quote an identifier, doubling embedded quotes.
pub(crate) fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Quote a possibly schema-qualified table name part by part.
pub(crate) fn quote_table(name: &str) -> String {
    name.split('.').map(quote_ident).collect::<Vec<_>>().join(".")
}

/// `"table"."column"`
pub(crate) fn qualified(table: &str, column: &str) -> String {
    format!("{}.{}", quote_table(table), quote_ident(column))
}

/// Split a comma-separated field list, trimming blanks.
pub(crate) fn split_fields(fields: &str) -> Vec<String> {
    fields
        .split(',')
        .map(str::trim)
        .filter(|f| !f.is_empty())
        .map(str::to_string)
        .collect()
}
