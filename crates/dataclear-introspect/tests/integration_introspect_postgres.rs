use anyhow::{Context, Result};
use dataclear_core::{DeleteAction, validate_snapshot};
use dataclear_introspect::{IntrospectOptions, introspect_postgres_with_options};
use sqlx::{PgPool, postgres::PgPoolOptions};
use std::env;

const FIXTURE: &str = r#"
drop schema if exists dataclear_it_introspect_audit cascade;
drop schema if exists dataclear_it_introspect cascade;
create schema dataclear_it_introspect;
create table dataclear_it_introspect.users (id serial primary key, email text not null);
create table dataclear_it_introspect.orders (
  id serial primary key,
  user_id int not null references dataclear_it_introspect.users(id)
);
create table dataclear_it_introspect.order_items (
  id serial primary key,
  order_id int not null references dataclear_it_introspect.orders(id)
);
create table dataclear_it_introspect.categories (
  id serial primary key,
  parent_id int references dataclear_it_introspect.categories(id)
);
create table dataclear_it_introspect.events (id int, at date, user_id int) partition by range (at);
create table dataclear_it_introspect.events_2024 partition of dataclear_it_introspect.events
  for values from ('2024-01-01') to ('2025-01-01');
alter table dataclear_it_introspect.events_2024
  add constraint events_2024_user_fk foreign key (user_id)
  references dataclear_it_introspect.users(id);
create schema dataclear_it_introspect_audit;
create table dataclear_it_introspect_audit.log (
  id serial primary key,
  user_id int references dataclear_it_introspect.users(id) on delete cascade
)
"#;

fn database_url() -> Option<String> {
    env::var("TEST_DATABASE_URL")
        .or_else(|_| env::var("DATABASE_URL"))
        .ok()
}

async fn reset_fixture(pool: &PgPool) -> Result<()> {
    for statement in FIXTURE.split(';') {
        let sql = statement.trim();
        if sql.is_empty() {
            continue;
        }
        sqlx::query(sql)
            .execute(pool)
            .await
            .with_context(|| format!("executing fixture statement: {sql}"))?;
    }
    Ok(())
}

#[tokio::test]
async fn introspects_tables_and_foreign_keys() -> Result<()> {
    let Some(db_url) = database_url() else {
        eprintln!("skipping: set TEST_DATABASE_URL or DATABASE_URL for integration tests");
        return Ok(());
    };
    let pool = PgPoolOptions::new()
        .max_connections(2)
        .acquire_timeout(std::time::Duration::from_secs(10))
        .connect(&db_url)
        .await
        .context("connecting to Postgres")?;

    reset_fixture(&pool).await?;

    let snapshot = introspect_postgres_with_options(
        &pool,
        IntrospectOptions {
            include_system_schemas: false,
            schemas: Some(vec!["dataclear_it_introspect".to_string()]),
        },
    )
    .await?;

    assert_eq!(
        snapshot.tables,
        vec![
            "dataclear_it_introspect.categories",
            "dataclear_it_introspect.events",
            "dataclear_it_introspect.order_items",
            "dataclear_it_introspect.orders",
            "dataclear_it_introspect.users",
        ]
    );

    let pairs: Vec<(&str, &str)> = snapshot
        .foreign_keys
        .iter()
        .map(|fk| (fk.from.as_str(), fk.to.as_str()))
        .collect();
    assert_eq!(
        pairs,
        vec![
            (
                "dataclear_it_introspect.categories",
                "dataclear_it_introspect.categories"
            ),
            // declared on the partition, reported on its root
            (
                "dataclear_it_introspect.events",
                "dataclear_it_introspect.users"
            ),
            (
                "dataclear_it_introspect.order_items",
                "dataclear_it_introspect.orders"
            ),
            (
                "dataclear_it_introspect.orders",
                "dataclear_it_introspect.users"
            ),
            // outside the selected schema but pointing into it
            (
                "dataclear_it_introspect_audit.log",
                "dataclear_it_introspect.users"
            ),
        ]
    );
    validate_snapshot(&snapshot)?;

    let audit = &snapshot.foreign_keys[4];
    assert_eq!(audit.on_delete, DeleteAction::Cascade);
    assert_eq!(snapshot.foreign_keys[3].on_delete, DeleteAction::NoAction);
    assert_eq!(
        snapshot.foreign_keys[1].name.as_deref(),
        Some("events_2024_user_fk")
    );

    for schema in ["dataclear_it_introspect_audit", "dataclear_it_introspect"] {
        sqlx::query(&format!("drop schema {schema} cascade"))
            .execute(&pool)
            .await
            .context("dropping fixture schema")?;
    }

    Ok(())
}
