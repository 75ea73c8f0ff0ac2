//! Static types of the Decaf language.

mod data_type;
mod primitive_kind;
mod visibility;

pub use data_type::DataType;
pub use primitive_kind::PrimitiveKind;
pub use visibility::Visibility;
