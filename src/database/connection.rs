// Database Connection Management
//
// PostgreSQL-backed document store. Each collection is a table holding one
// JSONB document per row; connections are pooled with deadpool.
use anyhow::{Context, Result};
use async_trait::async_trait;
use deadpool_postgres::{Manager, ManagerConfig, Pool, RecyclingMethod};
use native_tls::TlsConnector;
use postgres_native_tls::MakeTlsConnector;
use serde_json::Value;
use std::env;
use std::time::Duration;
use tokio_postgres::types::ToSql;
use uuid::Uuid;

use crate::database::migrations;
use crate::database::store::{
    with_id, Collection, Document, DocumentId, DocumentStore, Filter, FindOptions, InsertOutcome,
    SortDirection, StoreError, UpdateOutcome, ID_FIELD,
};

/// Database configuration
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub dbname: String,
    pub max_size: usize,
    pub timeouts: deadpool_postgres::Timeouts,
}

fn default_timeouts() -> deadpool_postgres::Timeouts {
    deadpool_postgres::Timeouts {
        wait: Some(Duration::from_secs(30)),
        create: Some(Duration::from_secs(30)),
        recycle: Some(Duration::from_secs(30)),
    }
}

impl DatabaseConfig {
    /// Create configuration from database URL
    pub fn from_url(url: &str) -> Result<Self> {
        let parsed = url::Url::parse(url).context("Failed to parse database URL")?;

        if parsed.scheme() != "postgresql" && parsed.scheme() != "postgres" {
            anyhow::bail!("Invalid database URL scheme, expected postgresql or postgres");
        }

        Ok(Self {
            host: parsed.host_str().unwrap_or("localhost").to_string(),
            port: parsed.port().unwrap_or(5432),
            user: parsed.username().to_string(),
            password: parsed.password().unwrap_or("").to_string(),
            dbname: parsed.path().trim_start_matches('/').to_string(),
            max_size: 16,
            timeouts: default_timeouts(),
        })
    }

    /// Create configuration from environment variables.
    ///
    /// `DATABASE_URL` wins; otherwise the URL is assembled from `DB_USER`,
    /// `DB_PASS`, `DB_HOST` and `DB_NAME`.
    pub fn from_env() -> Result<Self> {
        let mut config = match env::var("DATABASE_URL") {
            Ok(url) => Self::from_url(&url)?,
            Err(_) => {
                let user = env::var("DB_USER")
                    .context("DATABASE_URL or DB_USER must be set in the environment")?;
                let password = env::var("DB_PASS")
                    .context("DB_PASS must be set when DATABASE_URL is not")?;
                let host = env::var("DB_HOST").unwrap_or_else(|_| "localhost:5432".to_string());
                let dbname = env::var("DB_NAME").unwrap_or_else(|_| "dine_in".to_string());

                let mut url = url::Url::parse(&format!("postgres://{host}/{dbname}"))
                    .context("DB_HOST/DB_NAME do not form a valid URL")?;
                url.set_username(&user)
                    .map_err(|_| anyhow::anyhow!("DB_USER cannot be used in a URL"))?;
                url.set_password(Some(&password))
                    .map_err(|_| anyhow::anyhow!("DB_PASS cannot be used in a URL"))?;
                Self::from_url(url.as_str())?
            }
        };

        if let Ok(raw) = env::var("DATABASE_MAX_CONNECTIONS") {
            match raw.parse() {
                Ok(n) => config.max_size = n,
                Err(e) => tracing::warn!("Invalid DATABASE_MAX_CONNECTIONS value {raw:?}: {e}"),
            }
        }

        Ok(config)
    }
}

type BoxedParam = Box<dyn ToSql + Sync + Send>;

/// A statement plus its positional parameters
pub(crate) struct SqlQuery {
    pub sql: String,
    params: Vec<BoxedParam>,
}

impl SqlQuery {
    fn params(&self) -> Vec<&(dyn ToSql + Sync)> {
        self.params.iter().map(|p| p.as_ref() as &(dyn ToSql + Sync)).collect()
    }
}

fn push(params: &mut Vec<BoxedParam>, value: BoxedParam) -> String {
    params.push(value);
    format!("${}", params.len())
}

fn field_path(field: &str) -> Vec<String> {
    field.split('.').map(str::to_string).collect()
}

/// `{"a": {"b": value}}` for field `a.b`, used with JSONB containment.
fn containment(field: &str, value: &Value) -> Value {
    field.rsplit('.').fold(value.clone(), |inner, key| {
        let mut obj = serde_json::Map::new();
        obj.insert(key.to_string(), inner);
        Value::Object(obj)
    })
}

/// ILIKE pattern matching `needle` literally anywhere in the string.
fn like_pattern(needle: &str) -> String {
    let mut pattern = String::with_capacity(needle.len() + 2);
    pattern.push('%');
    for c in needle.chars() {
        if matches!(c, '\\' | '%' | '_') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

fn where_clause(filter: &Filter, params: &mut Vec<BoxedParam>) -> String {
    match filter {
        Filter::All => "TRUE".to_string(),
        Filter::ById(id) => format!("id = {}", push(params, Box::new(id.0))),
        Filter::Eq { field, value } => {
            format!("doc @> {}", push(params, Box::new(containment(field, value))))
        }
        Filter::Contains { field, needle } => {
            let path = push(params, Box::new(field_path(field)));
            let pattern = push(params, Box::new(like_pattern(needle)));
            format!("doc #>> {path} ILIKE {pattern}")
        }
    }
}

pub(crate) fn select_query(collection: Collection, filter: &Filter, options: &FindOptions) -> SqlQuery {
    let mut params = Vec::new();
    let condition = where_clause(filter, &mut params);

    let mut sql = format!("SELECT id, doc FROM {collection} WHERE {condition} ORDER BY ");
    if let Some(sort) = &options.sort {
        let path = push(&mut params, Box::new(field_path(&sort.field)));
        // missing fields sort lowest, as in the memory store
        let direction = match sort.direction {
            SortDirection::Ascending => "ASC NULLS FIRST",
            SortDirection::Descending => "DESC NULLS LAST",
        };
        sql.push_str(&format!("doc #> {path} {direction}, "));
    }
    sql.push_str("seq");

    if let Some(skip) = options.skip {
        let p = push(&mut params, Box::new(i64::try_from(skip).unwrap_or(i64::MAX)));
        sql.push_str(&format!(" OFFSET {p}"));
    }
    if let Some(limit) = options.limit {
        let p = push(&mut params, Box::new(i64::try_from(limit).unwrap_or(i64::MAX)));
        sql.push_str(&format!(" LIMIT {p}"));
    }

    SqlQuery { sql, params }
}

pub(crate) fn update_query(collection: Collection, filter: &Filter, set: Document) -> SqlQuery {
    let mut params = Vec::new();
    let condition = where_clause(filter, &mut params);
    let patch = push(&mut params, Box::new(Value::Object(set)));

    let sql = format!(
        "WITH target AS (SELECT id, doc FROM {collection} WHERE {condition} ORDER BY seq LIMIT 1), \
         updated AS (UPDATE {collection} SET doc = {collection}.doc || {patch} FROM target \
         WHERE {collection}.id = target.id AND NOT (target.doc @> {patch}) RETURNING {collection}.id) \
         SELECT (SELECT count(*) FROM target) AS matched, (SELECT count(*) FROM updated) AS modified"
    );

    SqlQuery { sql, params }
}

/// Exact row count. Planner statistics lag behind small tables.
pub(crate) fn count_query(collection: Collection) -> SqlQuery {
    SqlQuery { sql: format!("SELECT count(*) AS total FROM {collection}"), params: Vec::new() }
}

/// Postgres document store
#[derive(Debug, Clone)]
pub struct PgDocumentStore {
    pool: Pool,
}

impl PgDocumentStore {
    /// Connect, verify the connection, and apply pending migrations
    pub async fn connect(config: DatabaseConfig) -> Result<Self> {
        let masked_host = format!("{}:{}/{}", config.host, config.port, config.dbname);
        tracing::info!("🔌 Connecting to database: {}", masked_host);

        let mut pg_config = tokio_postgres::Config::new();
        pg_config.host(&config.host);
        pg_config.port(config.port);
        pg_config.user(&config.user);
        pg_config.password(&config.password);
        pg_config.dbname(&config.dbname);

        let tls_connector = TlsConnector::builder().build().context("Failed to build TLS connector")?;
        let tls = MakeTlsConnector::new(tls_connector);

        let mgr_config = ManagerConfig {
            recycling_method: RecyclingMethod::Fast,
        };
        let mgr = Manager::from_config(pg_config, tls, mgr_config);

        let pool = Pool::builder(mgr)
            .max_size(config.max_size)
            .wait_timeout(config.timeouts.wait)
            .create_timeout(config.timeouts.create)
            .recycle_timeout(config.timeouts.recycle)
            .runtime(deadpool_postgres::Runtime::Tokio1)
            .build()
            .context("Failed to create database pool")?;

        let store = Self { pool };
        store.ping().await.context("Failed to test database connection")?;
        tracing::info!("✅ Database connection established successfully");

        migrations::run_migrations(&store.pool).await.context("Failed to run migrations")?;

        Ok(store)
    }
}

fn document_from_row(row: &tokio_postgres::Row) -> Result<Document, StoreError> {
    let id: Uuid = row.try_get("id")?;
    match row.try_get::<_, Value>("doc")? {
        Value::Object(doc) => Ok(with_id(doc, DocumentId(id))),
        _ => Err(StoreError::NotAnObject),
    }
}

#[async_trait]
impl DocumentStore for PgDocumentStore {
    async fn insert_one(&self, collection: Collection, mut doc: Document) -> Result<InsertOutcome, StoreError> {
        doc.remove(ID_FIELD);
        let id = DocumentId::generate();
        let client = self.pool.get().await?;
        client
            .execute(
                &format!("INSERT INTO {collection} (id, doc) VALUES ($1, $2)"),
                &[&id.0, &Value::Object(doc)],
            )
            .await?;
        Ok(InsertOutcome { inserted_id: id })
    }

    async fn find(
        &self,
        collection: Collection,
        filter: &Filter,
        options: &FindOptions,
    ) -> Result<Vec<Document>, StoreError> {
        let query = select_query(collection, filter, options);
        let client = self.pool.get().await?;
        let rows = client.query(&query.sql, &query.params()).await?;
        rows.iter().map(document_from_row).collect()
    }

    async fn update_one(
        &self,
        collection: Collection,
        filter: &Filter,
        mut set: Document,
    ) -> Result<UpdateOutcome, StoreError> {
        set.remove(ID_FIELD);
        let query = update_query(collection, filter, set);
        let client = self.pool.get().await?;
        let row = client.query_one(&query.sql, &query.params()).await?;
        let matched: i64 = row.try_get("matched")?;
        let modified: i64 = row.try_get("modified")?;
        Ok(UpdateOutcome {
            matched_count: matched.max(0) as u64,
            modified_count: modified.max(0) as u64,
        })
    }

    async fn estimated_count(&self, collection: Collection) -> Result<u64, StoreError> {
        let query = count_query(collection);
        let client = self.pool.get().await?;
        let row = client.query_one(&query.sql, &query.params()).await?;
        let total: i64 = row.try_get("total")?;
        Ok(total.max(0) as u64)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        let client = self.pool.get().await?;
        client.query("SELECT 1", &[]).await?;
        Ok(())
    }
}
