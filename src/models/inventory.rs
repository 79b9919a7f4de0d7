use mongodb::bson::{oid::ObjectId, DateTime as BsonDateTime};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
pub enum Category {
    #[serde(rename = "Engine Parts")]
    EngineParts,
    Transmission,
    Electrical,
    Brakes,
    Suspension,
    #[serde(rename = "Body Parts")]
    BodyParts,
    Accessories,
    Fluids,
    Tires,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
pub enum Condition {
    New,
    Refurbished,
    Used,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
pub enum StockStatus {
    #[serde(rename = "In Stock")]
    InStock,
    #[serde(rename = "Low Stock")]
    LowStock,
    #[serde(rename = "Out of Stock")]
    OutOfStock,
    Discontinued,
}

impl StockStatus {
    /// Derives the stock status from quantity against the minimum level.
    /// `Discontinued` is never produced here; it is only set administratively.
    pub fn derive(stock_quantity: i64, minimum_stock_level: i64) -> StockStatus {
        if stock_quantity == 0 {
            StockStatus::OutOfStock
        } else if stock_quantity <= minimum_stock_level {
            StockStatus::LowStock
        } else {
            StockStatus::InStock
        }
    }

    /// Status to persist on an update. A `Discontinued` item keeps its status
    /// unless the update actually changes the stock quantity.
    pub fn next(
        current: StockStatus,
        stock_quantity: i64,
        minimum_stock_level: i64,
        quantity_changed: bool,
    ) -> StockStatus {
        if current == StockStatus::Discontinued && !quantity_changed {
            StockStatus::Discontinued
        } else {
            StockStatus::derive(stock_quantity, minimum_stock_level)
        }
    }
}

/// Spare-part inventory item (stored in the `inventory` collection). The
/// `status` field is recomputed with `StockStatus` before every
/// quantity-affecting write, so reads never see a stale value.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryItem {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub product_code: String,
    pub name: String,
    pub category: Category,
    pub stock_quantity: i64,
    pub minimum_stock_level: i64,
    pub purchase_price: f64,
    pub selling_price: f64,
    pub brand: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manufacturer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    pub condition: Condition,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supplier: Option<ObjectId>,
    pub status: StockStatus,
    pub created_at: BsonDateTime,
    pub updated_at: BsonDateTime,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateInventoryRequest {
    pub product_code: Option<String>,
    pub name: Option<String>,
    pub category: Option<Category>,
    pub stock_quantity: Option<i64>,
    pub minimum_stock_level: Option<i64>,
    pub purchase_price: Option<f64>,
    pub selling_price: Option<f64>,
    pub brand: Option<String>,
    pub description: Option<String>,
    pub manufacturer: Option<String>,
    pub location: Option<String>,
    pub condition: Option<Condition>,
    pub supplier: Option<String>,
    /// Only honored when set to `Discontinued` by an administrative update;
    /// every other value is overwritten by the derivation.
    pub status: Option<StockStatus>,
}

impl CreateInventoryRequest {
    pub fn missing_fields(&self) -> Vec<String> {
        let mut missing = Vec::new();
        if self.product_code.is_none() {
            missing.push("productCode".to_string());
        }
        if self.name.is_none() {
            missing.push("name".to_string());
        }
        if self.category.is_none() {
            missing.push("category".to_string());
        }
        if self.stock_quantity.is_none() {
            missing.push("stockQuantity".to_string());
        }
        if self.minimum_stock_level.is_none() {
            missing.push("minimumStockLevel".to_string());
        }
        if self.purchase_price.is_none() {
            missing.push("purchasePrice".to_string());
        }
        if self.selling_price.is_none() {
            missing.push("sellingPrice".to_string());
        }
        if self.brand.is_none() {
            missing.push("brand".to_string());
        }
        missing
    }
}

pub type UpdateInventoryRequest = CreateInventoryRequest;

#[derive(Debug, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InventoryResponse {
    pub id: String,
    pub product_code: String,
    pub name: String,
    pub category: Category,
    pub stock_quantity: i64,
    pub minimum_stock_level: i64,
    pub purchase_price: f64,
    pub selling_price: f64,
    pub brand: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manufacturer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    pub condition: Condition,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub supplier: Option<String>,
    pub status: StockStatus,
    pub created_at: String,
    pub updated_at: String,
}

impl From<InventoryItem> for InventoryResponse {
    fn from(item: InventoryItem) -> Self {
        InventoryResponse {
            id: item.id.map(|id| id.to_hex()).unwrap_or_default(),
            product_code: item.product_code,
            name: item.name,
            category: item.category,
            stock_quantity: item.stock_quantity,
            minimum_stock_level: item.minimum_stock_level,
            purchase_price: item.purchase_price,
            selling_price: item.selling_price,
            brand: item.brand,
            description: item.description,
            manufacturer: item.manufacturer,
            location: item.location,
            condition: item.condition,
            supplier: item.supplier.map(|id| id.to_hex()),
            status: item.status,
            created_at: item.created_at.try_to_rfc3339_string().unwrap_or_default(),
            updated_at: item.updated_at.try_to_rfc3339_string().unwrap_or_default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_quantity_is_out_of_stock_regardless_of_minimum() {
        for minimum in [0, 1, 10, 10_000] {
            assert_eq!(StockStatus::derive(0, minimum), StockStatus::OutOfStock);
        }
    }

    #[test]
    fn quantity_at_or_below_minimum_is_low_stock() {
        assert_eq!(StockStatus::derive(1, 10), StockStatus::LowStock);
        assert_eq!(StockStatus::derive(5, 10), StockStatus::LowStock);
        assert_eq!(StockStatus::derive(10, 10), StockStatus::LowStock);
    }

    #[test]
    fn quantity_above_minimum_is_in_stock() {
        assert_eq!(StockStatus::derive(11, 10), StockStatus::InStock);
        assert_eq!(StockStatus::derive(1, 0), StockStatus::InStock);
    }

    #[test]
    fn discontinued_survives_updates_that_leave_quantity_alone() {
        let next = StockStatus::next(StockStatus::Discontinued, 50, 5, false);
        assert_eq!(next, StockStatus::Discontinued);
    }

    #[test]
    fn discontinued_is_recomputed_when_quantity_changes() {
        let next = StockStatus::next(StockStatus::Discontinued, 50, 5, true);
        assert_eq!(next, StockStatus::InStock);
    }

    #[test]
    fn non_discontinued_status_always_recomputed() {
        let next = StockStatus::next(StockStatus::InStock, 0, 5, false);
        assert_eq!(next, StockStatus::OutOfStock);
    }

    #[test]
    fn status_serializes_with_spaces() {
        assert_eq!(
            serde_json::to_string(&StockStatus::LowStock).unwrap(),
            "\"Low Stock\""
        );
        let parsed: StockStatus = serde_json::from_str("\"Out of Stock\"").unwrap();
        assert_eq!(parsed, StockStatus::OutOfStock);
    }
}
