/// Options that control which tables introspection reports.
#[derive(Debug, Clone, Default)]
pub struct IntrospectOptions {
    /// Include `pg_*` and `information_schema` namespaces.
    pub include_system_schemas: bool,
    /// Restrict introspection to these schemas when set.
    pub schemas: Option<Vec<String>>,
}
