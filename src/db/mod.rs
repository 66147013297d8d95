use anyhow::{Context, Result};
use std::collections::HashMap;
use tokio_postgres::{Client, Config, NoTls};

const LIST_TABLES_QUERY: &str = "SELECT table_name::text FROM information_schema.tables \
     WHERE table_schema = 'public' ORDER BY table_name";

/// Connection parameters exactly as typed into the form. Nothing here is
/// parsed or validated; `tokio_postgres` rejects what it cannot use.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectionParameters {
    pub host: String,
    pub port: String,
    pub user: String,
    pub password: String,
    pub database: String,
}

impl ConnectionParameters {
    /// Builds a libpq style key/value connection string. Every value is
    /// quoted so empty fields and embedded spaces survive parsing.
    pub fn connection_string(&self) -> String {
        format!(
            "user={} password={} host={} port={} dbname={} sslmode=disable",
            quote_value(&self.user),
            quote_value(&self.password),
            quote_value(&self.host),
            quote_value(&self.port),
            quote_value(&self.database),
        )
    }
}

fn quote_value(value: &str) -> String {
    format!("'{}'", value.replace('\\', "\\\\").replace('\'', "\\'"))
}

fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Tables of the public schema with their row counts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Introspection {
    pub tables: Vec<String>,
    pub row_counts: HashMap<String, i64>,
}

/// Outcome of one probe. The error side is the human readable reason shown
/// on the error screen.
pub type ProbeResult = Result<Introspection, String>;

/// Something that can run a probe. The event loop only talks to the database
/// through this trait.
pub trait Prober: Send + Sync + 'static {
    fn probe(&self, params: ConnectionParameters) -> impl Future<Output = ProbeResult> + Send;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PostgresProbe;

impl Prober for PostgresProbe {
    async fn probe(&self, params: ConnectionParameters) -> ProbeResult {
        introspect(&params).await.map_err(|e| format!("{:#}", e))
    }
}

/// Connects, pings, lists tables and counts every one of them. Any failure
/// discards whatever was collected so far.
pub async fn introspect(params: &ConnectionParameters) -> Result<Introspection> {
    let connection = DatabaseConnection::connect(params).await?;
    connection.ping().await?;

    let tables = connection.list_tables().await?;
    let mut row_counts = HashMap::with_capacity(tables.len());
    for table in &tables {
        let count = connection.get_table_count(table).await?;
        row_counts.insert(table.clone(), count);
    }

    Ok(Introspection { tables, row_counts })
}

#[derive(Debug)]
pub struct DatabaseConnection {
    pub client: Client,
}

impl DatabaseConnection {
    pub async fn connect(params: &ConnectionParameters) -> Result<DatabaseConnection> {
        let config: Config = params
            .connection_string()
            .parse()
            .context("failed to connect to the database")?;

        let (client, connection) = config
            .connect(NoTls)
            .await
            .context("failed to connect to the database")?;

        // The connection object performs the actual communication with the database,
        // so spawn it off to run on its own.
        tokio::spawn(async move {
            if let Err(e) = connection.await {
                tracing::warn!(error = %e, "database connection error");
            }
        });

        Ok(DatabaseConnection { client })
    }

    pub async fn ping(&self) -> Result<()> {
        self.client
            .simple_query("SELECT 1")
            .await
            .context("could not ping the database")?;
        Ok(())
    }

    pub async fn list_tables(&self) -> Result<Vec<String>> {
        let rows = self
            .client
            .query(LIST_TABLES_QUERY, &[])
            .await
            .context("failed to fetch tables")?;

        let mut tables = Vec::with_capacity(rows.len());
        for row in rows {
            tables.push(row.try_get(0).context("failed to fetch tables")?);
        }

        Ok(tables)
    }

    pub async fn get_table_count(&self, table_name: &str) -> Result<i64> {
        let count_query = format!("SELECT COUNT(*) FROM {}", quote_identifier(table_name));
        let row = self
            .client
            .query_one(&count_query, &[])
            .await
            .with_context(|| format!("failed to fetch row count for table {}", table_name))?;

        row.try_get(0)
            .with_context(|| format!("failed to fetch row count for table {}", table_name))
    }
}
