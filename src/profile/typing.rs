//! Type families and SQL Server data-type precedence

use serde::Serialize;

/// Coarse type family used to detect implicit conversions.
///
/// Variants are declared in ascending SQL Server data-type precedence, so
/// the derived ordering tells which side of a comparison gets converted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeFamily {
    Binary,
    String,
    UnicodeString,
    UniqueIdentifier,
    Numeric,
    DateTime,
}

impl TypeFamily {
    pub fn name(&self) -> &'static str {
        match self {
            TypeFamily::Binary => "binary",
            TypeFamily::String => "varchar",
            TypeFamily::UnicodeString => "nvarchar",
            TypeFamily::UniqueIdentifier => "uniqueidentifier",
            TypeFamily::Numeric => "numeric",
            TypeFamily::DateTime => "datetime",
        }
    }
}

impl std::fmt::Display for TypeFamily {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Family of a declared type such as `NVARCHAR(50)` or `decimal(10, 2)`
pub fn family_of_type(data_type: &str) -> Option<TypeFamily> {
    let base = data_type
        .split('(')
        .next()
        .unwrap_or_default()
        .trim()
        .trim_matches(|c| c == '[' || c == ']')
        .to_ascii_uppercase();

    let family = match base.as_str() {
        "CHAR" | "VARCHAR" | "TEXT" => TypeFamily::String,
        "NCHAR" | "NVARCHAR" | "NTEXT" | "SYSNAME" => TypeFamily::UnicodeString,
        "UNIQUEIDENTIFIER" => TypeFamily::UniqueIdentifier,
        "BIT" | "TINYINT" | "SMALLINT" | "INT" | "INTEGER" | "BIGINT" | "DECIMAL" | "DEC"
        | "NUMERIC" | "MONEY" | "SMALLMONEY" | "FLOAT" | "REAL" => TypeFamily::Numeric,
        "DATE" | "TIME" | "DATETIME" | "DATETIME2" | "SMALLDATETIME" | "DATETIMEOFFSET" => {
            TypeFamily::DateTime
        }
        "BINARY" | "VARBINARY" | "IMAGE" | "ROWVERSION" | "TIMESTAMP" => TypeFamily::Binary,
        _ => return None,
    };
    Some(family)
}

/// How a built-in function's result type is derived
pub(super) enum ReturnType {
    Fixed(TypeFamily),
    /// Same family as the first argument
    FirstArgument,
    /// Same family as the last argument (`DATEADD` returns its date argument's type)
    LastArgument,
}

pub(super) fn builtin_return_type(function: &str) -> Option<ReturnType> {
    let upper = function.to_ascii_uppercase();
    let ty = match upper.as_str() {
        "GETDATE" | "GETUTCDATE" | "SYSDATETIME" | "SYSUTCDATETIME" | "SYSDATETIMEOFFSET"
        | "CURRENT_TIMESTAMP" | "EOMONTH" | "DATEFROMPARTS" | "DATETIMEFROMPARTS"
        | "DATETIME2FROMPARTS" | "SMALLDATETIMEFROMPARTS" | "TODATETIMEOFFSET" | "DATETRUNC" => {
            ReturnType::Fixed(TypeFamily::DateTime)
        }
        "DATEADD" => ReturnType::LastArgument,
        "DATEDIFF" | "DATEDIFF_BIG" | "DATEPART" | "YEAR" | "MONTH" | "DAY" | "LEN"
        | "DATALENGTH" | "CHARINDEX" | "PATINDEX" | "COUNT" | "COUNT_BIG" | "ROW_NUMBER"
        | "RANK" | "DENSE_RANK" | "NTILE" | "ISNUMERIC" | "SIGN" | "ROUND" | "FLOOR"
        | "CEILING" | "ABS" | "POWER" | "SQRT" | "@@ROWCOUNT" | "SCOPE_IDENTITY"
        | "OBJECT_ID" | "ERROR_NUMBER" | "ERROR_SEVERITY" | "ERROR_STATE" | "ERROR_LINE" => {
            ReturnType::Fixed(TypeFamily::Numeric)
        }
        "NEWID" | "NEWSEQUENTIALID" => ReturnType::Fixed(TypeFamily::UniqueIdentifier),
        "DATENAME" | "ERROR_MESSAGE" | "ERROR_PROCEDURE" | "SUSER_SNAME" | "USER_NAME"
        | "OBJECT_NAME" | "DB_NAME" | "NCHAR" => ReturnType::Fixed(TypeFamily::UnicodeString),
        "CHAR" | "SPACE" | "STR" => ReturnType::Fixed(TypeFamily::String),
        "UPPER" | "LOWER" | "LTRIM" | "RTRIM" | "TRIM" | "LEFT" | "RIGHT" | "SUBSTRING"
        | "REPLACE" | "REVERSE" | "STUFF" | "REPLICATE" | "ISNULL" | "COALESCE" | "NULLIF"
        | "MIN" | "MAX" | "SUM" | "AVG" => ReturnType::FirstArgument,
        _ => return None,
    };
    Some(ty)
}

pub(super) fn is_aggregate(function: &str) -> bool {
    matches!(
        function.to_ascii_uppercase().as_str(),
        "AVG"
            | "SUM"
            | "COUNT"
            | "COUNT_BIG"
            | "MIN"
            | "MAX"
            | "STDEV"
            | "STDEVP"
            | "VAR"
            | "VARP"
            | "STRING_AGG"
            | "CHECKSUM_AGG"
            | "GROUPING"
            | "GROUPING_ID"
            | "APPROX_COUNT_DISTINCT"
    )
}

/// Where a comparison between `column` and `operand` forces a conversion
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Conversion {
    None,
    /// The operand converts to the column's type; the column stays seekable
    Operand,
    /// The column converts to the operand's type
    Column,
}

pub(super) fn conversion_between(column: TypeFamily, operand: TypeFamily) -> Conversion {
    if column == operand {
        Conversion::None
    } else if column < operand {
        Conversion::Column
    } else {
        Conversion::Operand
    }
}
