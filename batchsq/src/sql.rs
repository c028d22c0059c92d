use sqlparser::{ast, dialect, parser};
use tracing::warn;

use super::SqError;

#[derive(Debug, Default)]
struct WarehouseDialect(dialect::GenericDialect);

impl dialect::Dialect for WarehouseDialect {
    fn is_identifier_start(&self, ch: char) -> bool {
        self.0.is_identifier_start(ch)
    }

    fn is_identifier_part(&self, ch: char) -> bool {
        self.0.is_identifier_part(ch)
    }

    fn is_delimited_identifier_start(&self, ch: char) -> bool {
        self.0.is_delimited_identifier_start(ch) || ch == '`'
    }
}

/// Rejects an empty query. Anything else is sent as is; statements the
/// generic parser does not understand only produce a warning.
pub fn validate<S: AsRef<str>>(sql: S) -> Result<(), SqError> {
    let sql = sql.as_ref();
    if sql.trim().is_empty() {
        return Err(SqError::Config("empty query".to_owned()));
    }

    match parser::Parser::parse_sql(&WarehouseDialect::default(), sql) {
        Ok(stmts) => match stmts.as_slice() {
            [ast::Statement::Query(_)] => {}
            [stmt] => warn!(statement = %stmt, "statement is not a query, it may return no rows"),
            _ => warn!(statements = stmts.len(), "expected a single statement"),
        },
        Err(e) => warn!(error = %e, "query not understood locally, sending it unchanged"),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_query() {
        validate("SELECT * FROM samples.nyctaxi.trips").unwrap();
        validate("select `trip distance`, fare_amount from `samples`.nyctaxi.trips limit 10").unwrap();
    }

    #[test]
    fn test_validate_passes_warehouse_sql() {
        let queries = [
            "SELECT * EXCEPT (fare_amount) FROM samples.nyctaxi.trips",
            "SELECT raw:zip FROM t",
            "SELECT * FROM samples.nyctaxi.trips VERSION AS OF 1",
            "DESCRIBE TABLE samples.nyctaxi.trips",
            "SHOW TABLES IN samples.nyctaxi",
            "SELECT transform(array(1,2), x -> x + 1)",
            "CREATE TABLE t (id INT)",
            "select 1; select 2",
            "select * from",
        ];
        for sql in queries {
            assert!(validate(sql).is_ok(), "{}", sql);
        }
    }

    #[test]
    fn test_validate_rejects_empty() {
        assert!(matches!(validate(""), Err(SqError::Config(_))));
        assert!(matches!(validate("  \n\t"), Err(SqError::Config(_))));
    }
}
