//! Shared item-type vocabulary for donations, inventory buckets and appeals.

use core::str::FromStr;
use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// Category of a donated resource.
///
/// `Money` is the one monetary category; all others are physical goods.
/// Unknown categories are rejected when parsing at the boundary — inside the
/// engine the enum is exhaustive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemType {
    Money,
    Clothes,
    Books,
    Toys,
    Food,
    Stationary,
    MedicalSupplies,
}

impl ItemType {
    pub fn is_money(self) -> bool {
        matches!(self, ItemType::Money)
    }

    /// Stable lowercase name, matching the serde representation.
    pub fn as_str(self) -> &'static str {
        match self {
            ItemType::Money => "money",
            ItemType::Clothes => "clothes",
            ItemType::Books => "books",
            ItemType::Toys => "toys",
            ItemType::Food => "food",
            ItemType::Stationary => "stationary",
            ItemType::MedicalSupplies => "medical_supplies",
        }
    }
}

impl core::fmt::Display for ItemType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ItemType {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "money" => Ok(ItemType::Money),
            "clothes" => Ok(ItemType::Clothes),
            "books" => Ok(ItemType::Books),
            "toys" => Ok(ItemType::Toys),
            "food" => Ok(ItemType::Food),
            "stationary" => Ok(ItemType::Stationary),
            "medical_supplies" | "medical supplies" => Ok(ItemType::MedicalSupplies),
            other => Err(EngineError::validation(format!(
                "unknown item type: {other}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_item_types() {
        assert_eq!("money".parse::<ItemType>().unwrap(), ItemType::Money);
        assert_eq!(
            " Medical_Supplies ".parse::<ItemType>().unwrap(),
            ItemType::MedicalSupplies
        );
    }

    #[test]
    fn rejects_unknown_item_type() {
        let err = "gadgets".parse::<ItemType>().unwrap_err();
        match err {
            EngineError::Validation(msg) if msg.contains("unknown item type") => {}
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn display_matches_serde_representation() {
        let json = serde_json::to_string(&ItemType::MedicalSupplies).unwrap();
        assert_eq!(json, "\"medical_supplies\"");
        assert_eq!(ItemType::MedicalSupplies.to_string(), "medical_supplies");
    }
}
