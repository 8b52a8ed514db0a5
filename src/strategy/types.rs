//! Type-mapping strategy: vendor column types to target type names.

use crate::metadata::type_codes;
use crate::schema::Column;

/// Maps a column's vendor type to the type name the renderer targets.
pub trait TypeMapper {
    fn target_type(&self, column: &Column) -> String;
}

/// Maps vendor type codes to Rust type names.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqlTypeMapper;

impl TypeMapper for SqlTypeMapper {
    fn target_type(&self, column: &Column) -> String {
        let ty = &column.data_type;
        let name = match ty.type_code {
            type_codes::BIT | type_codes::BOOLEAN => "bool",
            type_codes::TINYINT | type_codes::SMALLINT | type_codes::INTEGER => "i32",
            type_codes::BIGINT => "i64",
            type_codes::REAL => "f32",
            type_codes::FLOAT | type_codes::DOUBLE => "f64",
            type_codes::NUMERIC | type_codes::DECIMAL => match (ty.precision, ty.scale) {
                (Some(p), None | Some(0)) if p <= 9 => "i32",
                (Some(p), None | Some(0)) if p <= 18 => "i64",
                _ => "Decimal",
            },
            type_codes::DATE => "NaiveDate",
            type_codes::TIME => "NaiveTime",
            type_codes::TIMESTAMP => "NaiveDateTime",
            type_codes::BLOB => "Vec<u8>",
            _ => "String",
        };
        name.to_string()
    }
}

/// Whether a target type name denotes a plain number.
pub fn is_numeric_target(target_type: &str) -> bool {
    matches!(target_type, "i32" | "i64" | "f32" | "f64" | "Decimal")
}
