//! # Described Enumerations
//!
//! Identifiers that carry both a wire value and a human-readable description, used for
//! configuration values (see [`crate::config::RunMode`]) and domain enumerations.
//!
//! Declare one with [`described_enum!`](crate::described_enum):
//!
//! ```rust
//! use brrtbind::described_enum;
//! use brrtbind::descriptor::DescribedEnum;
//!
//! described_enum! {
//!     /// Account state
//!     pub enum AccountState: i32 {
//!         Active = (1, "active account"),
//!         Frozen = (2, "frozen by an operator"),
//!         Unknown = (0),
//!     }
//! }
//!
//! assert_eq!(AccountState::Frozen.value(), 2);
//! assert_eq!(AccountState::Frozen.desc(), "frozen by an operator");
//! assert_eq!(AccountState::Unknown.desc(), "");
//! assert_eq!(AccountState::from_value(1), Some(AccountState::Active));
//! assert_eq!(AccountState::from_value(9), None);
//! ```
//!
//! The macro also derives serde support by wire value and a [`Schema`](crate::schema::Schema)
//! impl, so a described enum can be used as a field of a payload schema.

use serde::Serialize;
use serde_json::{json, Map, Value};
use std::fmt;

/// A variant's wire value together with its description.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnumField<V> {
    pub value: V,
    pub desc: &'static str,
}

impl<V> EnumField<V> {
    pub const fn new(value: V, desc: &'static str) -> Self {
        Self { value, desc }
    }
}

/// Implemented by enums declared with [`described_enum!`](crate::described_enum).
pub trait DescribedEnum: Sized + Copy + 'static {
    /// Wire value type (`&'static str`, integers, ...)
    type Value: Copy + PartialEq + Serialize + fmt::Display + 'static;

    /// All variants in declaration order.
    fn variants() -> &'static [Self];

    fn field(&self) -> EnumField<Self::Value>;

    fn value(&self) -> Self::Value {
        self.field().value
    }

    /// Description, empty when the variant was declared without one.
    fn desc(&self) -> &'static str {
        self.field().desc
    }

    /// Wire values of all variants.
    fn list() -> Vec<Self::Value> {
        Self::variants().iter().map(|v| v.value()).collect()
    }

    /// Look a variant up by wire value. Unknown values yield `None`.
    fn from_value(value: Self::Value) -> Option<Self> {
        Self::variants().iter().copied().find(|v| v.value() == value)
    }

    /// JSON object text mapping each wire value to its description.
    fn to_desc() -> String {
        let map: Map<String, Value> = Self::variants()
            .iter()
            .map(|v| (v.value().to_string(), Value::String(v.desc().to_string())))
            .collect();
        Value::Object(map).to_string()
    }
}

/// Find the variant whose serialized wire value equals `raw`.
///
/// String input also matches numeric wire values by their text, since YAML and query
/// strings tend to hand numbers over as strings.
pub fn from_json_value<E: DescribedEnum>(raw: &Value) -> Option<E> {
    E::variants().iter().copied().find(|v| {
        let value = v.value();
        match serde_json::to_value(value) {
            Ok(wire) if &wire == raw => true,
            _ => raw.as_str() == Some(value.to_string().as_str()),
        }
    })
}

/// `{"enum": [...]}` schema listing every wire value.
pub fn enum_schema<E: DescribedEnum>() -> Value {
    let values: Vec<Value> = E::variants()
        .iter()
        .filter_map(|v| serde_json::to_value(v.value()).ok())
        .collect();
    json!({ "enum": values, "description": E::to_desc() })
}

/// Declare a [`DescribedEnum`].
///
/// Each variant is written `Name = (value)` or `Name = (value, "description")`.
#[macro_export]
macro_rules! described_enum {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident : $vty:ty {
            $(
                $(#[$vmeta:meta])*
                $variant:ident = ($value:expr $(, $desc:expr)?)
            ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        $vis enum $name {
            $( $(#[$vmeta])* $variant ),+
        }

        impl $crate::descriptor::DescribedEnum for $name {
            type Value = $vty;

            fn variants() -> &'static [Self] {
                &[$($name::$variant),+]
            }

            fn field(&self) -> $crate::descriptor::EnumField<$vty> {
                match self {
                    $(
                        $name::$variant => $crate::descriptor::EnumField::new(
                            $value,
                            $crate::described_enum!(@desc $($desc)?),
                        )
                    ),+
                }
            }
        }

        impl ::std::fmt::Display for $name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                ::std::fmt::Display::fmt(&$crate::descriptor::DescribedEnum::value(self), f)
            }
        }

        impl $crate::__private::serde::Serialize for $name {
            fn serialize<S>(&self, serializer: S) -> ::std::result::Result<S::Ok, S::Error>
            where
                S: $crate::__private::serde::Serializer,
            {
                $crate::__private::serde::Serialize::serialize(
                    &$crate::descriptor::DescribedEnum::value(self),
                    serializer,
                )
            }
        }

        impl<'de> $crate::__private::serde::Deserialize<'de> for $name {
            fn deserialize<D>(deserializer: D) -> ::std::result::Result<Self, D::Error>
            where
                D: $crate::__private::serde::Deserializer<'de>,
            {
                let raw = <$crate::__private::serde_json::Value as $crate::__private::serde::Deserialize>::deserialize(deserializer)?;
                $crate::descriptor::from_json_value::<Self>(&raw).ok_or_else(|| {
                    <D::Error as $crate::__private::serde::de::Error>::custom(format!(
                        "unknown {} value {}",
                        stringify!($name),
                        raw
                    ))
                })
            }
        }

        impl $crate::schema::Schema for $name {
            fn schema_name() -> &'static str {
                stringify!($name)
            }

            fn json_schema() -> $crate::__private::serde_json::Value {
                $crate::descriptor::enum_schema::<Self>()
            }
        }
    };
    (@desc $desc:expr) => {
        $desc
    };
    (@desc) => {
        ""
    };
}
