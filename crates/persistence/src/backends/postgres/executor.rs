//! [`Executor`] on tokio-postgres.

use std::error::Error;

use async_trait::async_trait;
use bytes::BytesMut;
use chrono::{DateTime, NaiveDateTime, Utc};
use postgres_types::{IsNull, ToSql, Type, to_sql_checked};
use tokio_postgres::GenericClient;
use tokio_postgres::error::SqlState;
use uuid::Uuid;

use crate::db::{DriverError, Executor};
use crate::query::{Row, SqlValue};

/// Runs statements on a tokio-postgres client or transaction.
///
/// ```no_run
/// use tenant_persistence::backends::postgres::{PgExecutor, PostgresBackend, PostgresConfig};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let backend = PostgresBackend::new(PostgresConfig::default()).await?;
/// let mut client = backend.get_client().await?;
///
/// let tx = client.transaction().await?;
/// let db = PgExecutor::new(&*tx);
/// // ... repository calls on &db ...
/// tx.commit().await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct PgExecutor<'a, C> {
    client: &'a C,
}

impl<'a, C> PgExecutor<'a, C>
where
    C: GenericClient + Sync,
{
    /// Wraps a client or transaction.
    pub fn new(client: &'a C) -> Self {
        Self { client }
    }
}

#[async_trait]
impl<'a, C> Executor for PgExecutor<'a, C>
where
    C: GenericClient + Sync,
{
    async fn query(&self, statement: &str, args: &[SqlValue]) -> Result<Vec<Row>, DriverError> {
        let params: Vec<SqlParam<'_>> = args.iter().map(SqlParam).collect();
        let refs: Vec<&(dyn ToSql + Sync)> =
            params.iter().map(|p| p as &(dyn ToSql + Sync)).collect();

        let rows = self
            .client
            .query(statement, &refs)
            .await
            .map_err(driver_error)?;
        rows.iter().map(convert_row).collect()
    }

    async fn execute(&self, statement: &str, args: &[SqlValue]) -> Result<u64, DriverError> {
        let params: Vec<SqlParam<'_>> = args.iter().map(SqlParam).collect();
        let refs: Vec<&(dyn ToSql + Sync)> =
            params.iter().map(|p| p as &(dyn ToSql + Sync)).collect();

        self.client
            .execute(statement, &refs)
            .await
            .map_err(driver_error)
    }
}

/// Binds a [`SqlValue`] to whatever type the server inferred for its
/// placeholder, so NULLs are typed and integers narrow to the column width.
#[derive(Debug)]
struct SqlParam<'a>(&'a SqlValue);

impl ToSql for SqlParam<'_> {
    fn to_sql(
        &self,
        ty: &Type,
        out: &mut BytesMut,
    ) -> Result<IsNull, Box<dyn Error + Sync + Send>> {
        match self.0 {
            SqlValue::Null => Ok(IsNull::Yes),
            SqlValue::Text(s) => match *ty {
                Type::UUID => Uuid::parse_str(s)?.to_sql(ty, out),
                Type::JSON | Type::JSONB => serde_json::from_str::<serde_json::Value>(s)?.to_sql(ty, out),
                _ => s.as_str().to_sql(ty, out),
            },
            SqlValue::Integer(i) => match *ty {
                Type::INT2 => i16::try_from(*i)?.to_sql(ty, out),
                Type::INT4 => i32::try_from(*i)?.to_sql(ty, out),
                Type::FLOAT8 => (*i as f64).to_sql(ty, out),
                Type::TEXT | Type::VARCHAR => i.to_string().to_sql(ty, out),
                _ => i.to_sql(ty, out),
            },
            SqlValue::Float(f) => match *ty {
                Type::FLOAT4 => (*f as f32).to_sql(ty, out),
                _ => f.to_sql(ty, out),
            },
            SqlValue::Bool(b) => b.to_sql(ty, out),
            SqlValue::Timestamp(ts) => match *ty {
                Type::TIMESTAMP => ts.naive_utc().to_sql(ty, out),
                _ => ts.to_sql(ty, out),
            },
            SqlValue::Json(v) => match *ty {
                Type::TEXT | Type::VARCHAR => v.to_string().to_sql(ty, out),
                _ => v.to_sql(ty, out),
            },
        }
    }

    fn accepts(_ty: &Type) -> bool {
        true
    }

    to_sql_checked!();
}

fn convert_row(row: &tokio_postgres::Row) -> Result<Row, DriverError> {
    let columns: Vec<String> = row
        .columns()
        .iter()
        .map(|c| c.name().to_string())
        .collect();
    let values = row
        .columns()
        .iter()
        .enumerate()
        .map(|(idx, column)| convert_value(row, idx, column.type_()))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Row::new(columns.into(), values))
}

fn convert_value(row: &tokio_postgres::Row, idx: usize, ty: &Type) -> Result<SqlValue, DriverError> {
    let value = match *ty {
        Type::BOOL => row.try_get::<_, Option<bool>>(idx).map(SqlValue::from),
        Type::INT2 => row
            .try_get::<_, Option<i16>>(idx)
            .map(|v| SqlValue::from(v.map(i64::from))),
        Type::INT4 => row
            .try_get::<_, Option<i32>>(idx)
            .map(|v| SqlValue::from(v.map(i64::from))),
        Type::INT8 => row.try_get::<_, Option<i64>>(idx).map(SqlValue::from),
        Type::FLOAT4 => row
            .try_get::<_, Option<f32>>(idx)
            .map(|v| SqlValue::from(v.map(f64::from))),
        Type::FLOAT8 => row.try_get::<_, Option<f64>>(idx).map(SqlValue::from),
        Type::UUID => row.try_get::<_, Option<Uuid>>(idx).map(SqlValue::from),
        Type::TIMESTAMPTZ => row
            .try_get::<_, Option<DateTime<Utc>>>(idx)
            .map(SqlValue::from),
        Type::TIMESTAMP => row
            .try_get::<_, Option<NaiveDateTime>>(idx)
            .map(|v| SqlValue::from(v.map(|ts| ts.and_utc()))),
        Type::JSON | Type::JSONB => row
            .try_get::<_, Option<serde_json::Value>>(idx)
            .map(SqlValue::from),
        _ => row.try_get::<_, Option<String>>(idx).map(SqlValue::from),
    };
    value.map_err(|e| {
        DriverError::other(format!(
            "cannot convert column {} of type {}: {}",
            idx, ty, e
        ))
    })
}

fn driver_error(err: tokio_postgres::Error) -> DriverError {
    let Some(db_error) = err.as_db_error() else {
        return DriverError::other(err.to_string());
    };
    if *db_error.code() == SqlState::QUERY_CANCELED {
        return DriverError::cancelled(db_error.message());
    }

    let mut mapped = DriverError::with_code(db_error.code().code(), db_error.message());
    if let Some(constraint) = db_error.constraint() {
        mapped = mapped.with_constraint(constraint);
    }
    if let Some(column) = db_error.column() {
        mapped = mapped.with_column(column);
    }
    mapped
}
