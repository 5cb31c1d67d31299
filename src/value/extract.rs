//! Conversions between statically typed Rust values and [`Value`].

use std::any::type_name;

use crate::ConversionError;

use super::Value;

macro_rules! impl_conversion {
    ($typ:ty, $variant:ident) => {
        // ============================
        // Rust -> Value
        // ============================
        impl From<$typ> for Value {
            fn from(value: $typ) -> Self {
                Self::$variant(value)
            }
        }

        // ============================
        // Value -> Rust
        // ============================
        impl TryFrom<Value> for $typ {
            type Error = ConversionError;

            fn try_from(value: Value) -> Result<Self, Self::Error> {
                match value {
                    Value::$variant(value) => Ok(value),
                    _ => Err(ConversionError {
                        from: value.type_name(),
                        into: type_name::<$typ>(),
                    }),
                }
            }
        }
    };
}

impl_conversion!(i64, Int);
impl_conversion!(f64, Float);
impl_conversion!(String, Str);
impl_conversion!(Vec<[f64; 2]>, Vec2List);

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}
