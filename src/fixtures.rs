#[cfg(test)]
pub mod test {
    use crate::context::Context;
    use crate::types::RawTable;

    /// Build a context from inline TOML. Panics on malformed input, which in
    /// a test means the fixture itself is wrong.
    pub fn ctx(toml_str: &str) -> Context {
        let table: RawTable = toml::from_str(toml_str).expect("fixture TOML must parse");
        Context::from_table(table)
    }

    /// A small layered document exercised by the context tests.
    pub const SERVER_DOC: &str = r#"
host = "localhost"
port = 8080

[database]
url = "postgres://localhost/app"
pool-size = 5
"#;

    #[test]
    fn ctx_parses_nested_tables() {
        let ctx = ctx(SERVER_DOC);
        assert!(ctx.get_raw("host").is_some());
        assert!(ctx.get_raw("database.pool-size").is_some());
        assert!(ctx.get_raw("database.missing").is_none());
    }
}
