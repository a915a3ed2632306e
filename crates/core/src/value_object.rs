//! Value object trait: equality by value, not identity.

/// Marker trait for value objects.
///
/// Value objects are **immutable** and **compared by value** — two instances
/// with the same attribute values are the same thing. A bucket key or a
/// requested-item line is a value object; an appeal (which has identity and a
/// lifecycle) is not. To "modify" a value object, build a new one.
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
