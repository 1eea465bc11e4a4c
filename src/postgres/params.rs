use std::error::Error;

use rust_decimal::Decimal;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use tokio_postgres::types::{IsNull, Kind, ToSql, Type, to_sql_checked};
use tokio_util::bytes;
use uuid::Uuid;

use crate::error::PgCrudError;
use crate::types::RowValues;

/// Container for Postgres parameters with lifetime tracking
pub struct Params<'a> {
    references: Vec<&'a (dyn ToSql + Sync)>,
}

impl<'a> Params<'a> {
    /// Convert from a slice of `RowValues` to Postgres parameters
    ///
    /// # Errors
    /// Currently infallible; kept fallible so encoders can reject values up front.
    pub fn convert(params: &'a [RowValues]) -> Result<Params<'a>, PgCrudError> {
        let mut references = Vec::with_capacity(params.len());
        for p in params {
            references.push(p as &(dyn ToSql + Sync));
        }
        Ok(Params { references })
    }

    /// Get a reference to the underlying parameter array
    #[must_use]
    pub fn as_refs(&self) -> &[&(dyn ToSql + Sync)] {
        &self.references
    }
}

fn narrowing_error(value: impl std::fmt::Display, ty: &Type) -> Box<dyn Error + Sync + Send> {
    Box::new(PgCrudError::ParameterError(format!(
        "value {value} does not fit column type {ty}"
    )))
}

fn mismatch(value: &RowValues, ty: &Type) -> Box<dyn Error + Sync + Send> {
    let variant = match value {
        RowValues::Int(_) => "integer",
        RowValues::Float(_) => "float",
        RowValues::Decimal(_) => "decimal",
        RowValues::Text(_) => "text",
        RowValues::Bool(_) => "boolean",
        RowValues::Timestamp(_) => "timestamp",
        RowValues::Uuid(_) => "uuid",
        RowValues::Null => "null",
        RowValues::JSON(_) => "json",
        RowValues::Blob(_) => "binary",
    };
    Box::new(PgCrudError::ParameterError(format!(
        "cannot bind a {variant} value to a column of type {ty}"
    )))
}

fn is_text(ty: &Type) -> bool {
    matches!(*ty, Type::TEXT | Type::VARCHAR | Type::BPCHAR | Type::NAME)
}

fn is_enum(ty: &Type) -> bool {
    matches!(ty.kind(), Kind::Enum(_))
}

// Each variant encodes only into the column types it can represent; anything else is
// refused instead of sending another type's wire format.
impl ToSql for RowValues {
    fn to_sql(
        &self,
        ty: &Type,
        out: &mut bytes::BytesMut,
    ) -> Result<IsNull, Box<dyn Error + Sync + Send>> {
        match self {
            RowValues::Null => Ok(IsNull::Yes),
            RowValues::Int(i) => match *ty {
                Type::INT2 => i16::try_from(*i)
                    .map_err(|_| narrowing_error(i, ty))?
                    .to_sql(ty, out),
                Type::INT4 => i32::try_from(*i)
                    .map_err(|_| narrowing_error(i, ty))?
                    .to_sql(ty, out),
                Type::INT8 => (*i).to_sql(ty, out),
                #[allow(clippy::cast_precision_loss)]
                Type::FLOAT4 | Type::FLOAT8 => (*i as f64).to_sql(ty, out),
                Type::NUMERIC => Decimal::from(*i).to_sql(ty, out),
                _ => Err(mismatch(self, ty)),
            },
            RowValues::Float(f) => match *ty {
                #[allow(clippy::cast_possible_truncation)]
                Type::FLOAT4 => (*f as f32).to_sql(ty, out),
                Type::FLOAT8 => (*f).to_sql(ty, out),
                Type::NUMERIC => Decimal::from_f64(*f)
                    .ok_or_else(|| narrowing_error(f, ty))?
                    .to_sql(ty, out),
                _ => Err(mismatch(self, ty)),
            },
            RowValues::Decimal(d) => match *ty {
                Type::NUMERIC => d.to_sql(ty, out),
                Type::FLOAT8 => d
                    .to_f64()
                    .ok_or_else(|| narrowing_error(d, ty))?
                    .to_sql(ty, out),
                _ => Err(mismatch(self, ty)),
            },
            RowValues::Text(s) => match *ty {
                Type::UUID => Uuid::parse_str(s)?.to_sql(ty, out),
                Type::NUMERIC => s.trim().parse::<Decimal>()?.to_sql(ty, out),
                _ if is_text(ty) => s.to_sql(ty, out),
                _ if is_enum(ty) => {
                    // enum labels travel as their UTF-8 text
                    out.extend_from_slice(s.as_bytes());
                    Ok(IsNull::No)
                }
                _ => Err(mismatch(self, ty)),
            },
            RowValues::Bool(b) if *ty == Type::BOOL => (*b).to_sql(ty, out),
            RowValues::Timestamp(dt) => match *ty {
                Type::TIMESTAMP => dt.to_sql(ty, out),
                Type::TIMESTAMPTZ => dt.and_utc().to_sql(ty, out),
                Type::DATE => dt.date().to_sql(ty, out),
                _ => Err(mismatch(self, ty)),
            },
            RowValues::Uuid(id) if *ty == Type::UUID => id.to_sql(ty, out),
            RowValues::JSON(jsval) if matches!(*ty, Type::JSON | Type::JSONB) => {
                jsval.to_sql(ty, out)
            }
            RowValues::Blob(bytes) if *ty == Type::BYTEA => bytes.to_sql(ty, out),
            RowValues::Bool(_) | RowValues::Uuid(_) | RowValues::JSON(_) | RowValues::Blob(_) => {
                Err(mismatch(self, ty))
            }
        }
    }

    fn accepts(ty: &Type) -> bool {
        is_enum(ty)
            || matches!(
                *ty,
                Type::INT2
                    | Type::INT4
                    | Type::INT8
                    | Type::FLOAT4
                    | Type::FLOAT8
                    | Type::NUMERIC
                    | Type::TEXT
                    | Type::VARCHAR
                    | Type::BPCHAR
                    | Type::NAME
                    | Type::BOOL
                    | Type::TIMESTAMP
                    | Type::TIMESTAMPTZ
                    | Type::DATE
                    | Type::UUID
                    | Type::JSON
                    | Type::JSONB
                    | Type::BYTEA
            )
    }

    to_sql_checked!();
}
