//! Domain models shared by the core, the repository and the wire layer.
//!
//! Enumerated fields travel as their exact string literals, so every enum here carries an
//! `as_str`/`FromStr` pair generated by `wire_enum!`.

/// Declares a fieldless enum whose variants map one-to-one onto wire literals.
macro_rules! wire_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident => $lit:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $( $(#[$vmeta])* $variant, )+
        }

        impl $name {
            /// Every variant in declaration order.
            pub const ALL: &'static [Self] = &[$(Self::$variant),+];

            /// The wire literal of this variant.
            #[must_use]
            pub const fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $lit,)+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($lit => Ok(Self::$variant),)+
                    _ => Err(format!("Invalid {}: {s}", stringify!($name))),
                }
            }
        }
    };
}

/// CFP rows, units and data quality ratings
pub mod cfp;
/// Parts and parts structures
pub mod parts;
/// Trades and request statuses
pub mod trade;

pub use cfp::{
    AmountRequiredUnit, CfpModel, CfpSet, CfpType, DqrType, DqrValue, GhgDeclaredUnit, Processing,
};
pub use parts::{PartsDraft, PartsModel, PartsStructureDraft, PartsStructureModel, StructureHeader};
pub use trade::{
    CfpResponseStatus, RequestStatus, RequestType, StatusModel, StatusPage, StatusQuery,
    StatusTarget, TradeModel, TradeRequestInput, TradeTreeStatus,
};

use crate::errors::{Error, Result};

/// Parses a wire literal, naming `field` in the error when the literal is unknown.
///
/// # Errors
/// Returns [`Error::UnexpectedEnum`] for literals outside the enum's value set.
pub fn parse_enum<T: std::str::FromStr>(field: &'static str, value: &str) -> Result<T> {
    value.parse().map_err(|_| Error::UnexpectedEnum {
        field,
        value: value.to_string(),
    })
}
