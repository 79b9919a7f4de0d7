use crate::database::MongoDB;
use crate::models::{
    Category, Condition, CreateInventoryRequest, InventoryItem, InventoryResponse, StockStatus,
    UpdateInventoryRequest,
};
use crate::utils::{map_write_error, parse_object_id, AppError};
use actix_web::{delete, get, post, put, web, HttpResponse};
use futures::TryStreamExt;
use mongodb::bson::{doc, DateTime as BsonDateTime};
use serde::Deserialize;
use std::collections::BTreeMap;

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub query: Option<String>,
}

/// POST /inventory/add-item - Add a spare part. Status is derived from the
/// supplied quantities, never taken from the request.
#[utoipa::path(
    post,
    path = "/inventory/add-item",
    request_body = CreateInventoryRequest,
    responses(
        (status = 201, description = "Item created"),
        (status = 400, description = "Missing fields"),
        (status = 409, description = "Duplicate product code")
    ),
    tag = "inventory"
)]
#[post("/add-item")]
pub async fn add_item(
    db: web::Data<MongoDB>,
    body: web::Json<CreateInventoryRequest>,
) -> Result<HttpResponse, AppError> {
    let missing = body.missing_fields();
    if !missing.is_empty() {
        return Err(AppError::missing_fields(missing));
    }

    let stock_quantity = body.stock_quantity.unwrap_or_default();
    let minimum_stock_level = body.minimum_stock_level.unwrap_or_default();
    if stock_quantity < 0 || minimum_stock_level < 0 {
        return Err(AppError::validation("Stock quantities cannot be negative"));
    }

    let collection = db.collection::<InventoryItem>("inventory");
    let product_code = body.product_code.clone().unwrap_or_default();

    if collection
        .find_one(doc! { "productCode": &product_code })
        .await
        .map_err(|e| AppError::Database(e.to_string()))?
        .is_some()
    {
        return Err(AppError::conflict(
            "productCode",
            "An inventory item with this product code already exists",
        ));
    }

    let supplier = body
        .supplier
        .as_deref()
        .map(|raw| parse_object_id(raw, "supplier"))
        .transpose()?;

    let now = BsonDateTime::now();
    let item = InventoryItem {
        id: None,
        product_code,
        name: body.name.clone().unwrap_or_default(),
        category: body.category.unwrap_or(Category::Other),
        stock_quantity,
        minimum_stock_level,
        purchase_price: body.purchase_price.unwrap_or_default(),
        selling_price: body.selling_price.unwrap_or_default(),
        brand: body.brand.clone().unwrap_or_default(),
        description: body.description.clone(),
        manufacturer: body.manufacturer.clone(),
        location: body.location.clone(),
        condition: body.condition.unwrap_or(Condition::New),
        supplier,
        status: StockStatus::derive(stock_quantity, minimum_stock_level),
        created_at: now,
        updated_at: now,
    };

    collection.insert_one(&item).await.map_err(map_write_error)?;

    Ok(HttpResponse::Created().json(serde_json::json!({
        "message": "New inventory item added successfully!",
        "status": item.status,
    })))
}

/// DELETE /inventory/delete-item/{id}
#[delete("/delete-item/{id}")]
pub async fn delete_item(
    db: web::Data<MongoDB>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let object_id = parse_object_id(&path.into_inner(), "inventory item")?;
    let result = db
        .collection::<InventoryItem>("inventory")
        .delete_one(doc! { "_id": object_id })
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

    if result.deleted_count == 0 {
        return Err(AppError::not_found("Inventory item not found"));
    }
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Inventory item deleted successfully"
    })))
}

/// GET /inventory/get-items - List all inventory items
#[get("/get-items")]
pub async fn get_items(db: web::Data<MongoDB>) -> Result<HttpResponse, AppError> {
    let items: Vec<InventoryItem> = db
        .collection::<InventoryItem>("inventory")
        .find(doc! {})
        .await
        .map_err(|e| AppError::Database(e.to_string()))?
        .try_collect()
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

    let items: Vec<InventoryResponse> = items.into_iter().map(InventoryResponse::from).collect();
    Ok(HttpResponse::Ok().json(items))
}

/// GET /inventory/get-item/{id}
#[get("/get-item/{id}")]
pub async fn get_item(
    db: web::Data<MongoDB>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let object_id = parse_object_id(&path.into_inner(), "inventory item")?;
    let item = db
        .collection::<InventoryItem>("inventory")
        .find_one(doc! { "_id": object_id })
        .await
        .map_err(|e| AppError::Database(e.to_string()))?
        .ok_or_else(|| AppError::not_found("Inventory item not found!"))?;

    Ok(HttpResponse::Ok().json(InventoryResponse::from(item)))
}

/// GET /inventory/get-item-by-code/{productCode} - Lookup by natural key
#[get("/get-item-by-code/{productCode}")]
pub async fn get_item_by_code(
    db: web::Data<MongoDB>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let item = db
        .collection::<InventoryItem>("inventory")
        .find_one(doc! { "productCode": path.into_inner() })
        .await
        .map_err(|e| AppError::Database(e.to_string()))?
        .ok_or_else(|| AppError::not_found("Inventory item not found!"))?;

    Ok(HttpResponse::Ok().json(InventoryResponse::from(item)))
}

/// PUT /inventory/update-item/{id} - Update an item. The stock status is
/// recomputed from the effective quantities; Discontinued survives updates
/// that leave the quantity untouched.
#[put("/update-item/{id}")]
pub async fn update_item(
    db: web::Data<MongoDB>,
    path: web::Path<String>,
    body: web::Json<UpdateInventoryRequest>,
) -> Result<HttpResponse, AppError> {
    let object_id = parse_object_id(&path.into_inner(), "inventory item")?;
    let collection = db.collection::<InventoryItem>("inventory");

    let existing = collection
        .find_one(doc! { "_id": object_id })
        .await
        .map_err(|e| AppError::Database(e.to_string()))?
        .ok_or_else(|| AppError::not_found("Inventory item not found!"))?;

    let mut updates = doc! { "updatedAt": BsonDateTime::now() };

    if let Some(product_code) = &body.product_code {
        if collection
            .find_one(doc! { "productCode": product_code, "_id": { "$ne": object_id } })
            .await
            .map_err(|e| AppError::Database(e.to_string()))?
            .is_some()
        {
            return Err(AppError::conflict(
                "productCode",
                "An inventory item with this product code already exists",
            ));
        }
        updates.insert("productCode", product_code);
    }
    if let Some(name) = &body.name {
        updates.insert("name", name);
    }
    if let Some(category) = &body.category {
        updates.insert(
            "category",
            mongodb::bson::to_bson(category).map_err(|e| AppError::Database(e.to_string()))?,
        );
    }
    if let Some(purchase_price) = body.purchase_price {
        updates.insert("purchasePrice", purchase_price);
    }
    if let Some(selling_price) = body.selling_price {
        updates.insert("sellingPrice", selling_price);
    }
    if let Some(brand) = &body.brand {
        updates.insert("brand", brand);
    }
    if let Some(description) = &body.description {
        updates.insert("description", description);
    }
    if let Some(manufacturer) = &body.manufacturer {
        updates.insert("manufacturer", manufacturer);
    }
    if let Some(location) = &body.location {
        updates.insert("location", location);
    }
    if let Some(condition) = &body.condition {
        updates.insert(
            "condition",
            mongodb::bson::to_bson(condition).map_err(|e| AppError::Database(e.to_string()))?,
        );
    }
    if let Some(supplier) = &body.supplier {
        updates.insert("supplier", parse_object_id(supplier, "supplier")?);
    }

    let stock_quantity = body.stock_quantity.unwrap_or(existing.stock_quantity);
    let minimum_stock_level = body
        .minimum_stock_level
        .unwrap_or(existing.minimum_stock_level);
    if stock_quantity < 0 || minimum_stock_level < 0 {
        return Err(AppError::validation("Stock quantities cannot be negative"));
    }
    if body.stock_quantity.is_some() {
        updates.insert("stockQuantity", stock_quantity);
    }
    if body.minimum_stock_level.is_some() {
        updates.insert("minimumStockLevel", minimum_stock_level);
    }

    let quantity_changed = body
        .stock_quantity
        .map(|q| q != existing.stock_quantity)
        .unwrap_or(false);
    // An explicit Discontinued in the request is the administrative override.
    let status = match body.status {
        Some(StockStatus::Discontinued) => StockStatus::Discontinued,
        _ => StockStatus::next(
            existing.status,
            stock_quantity,
            minimum_stock_level,
            quantity_changed,
        ),
    };
    updates.insert(
        "status",
        mongodb::bson::to_bson(&status).map_err(|e| AppError::Database(e.to_string()))?,
    );

    collection
        .update_one(doc! { "_id": object_id }, doc! { "$set": updates })
        .await
        .map_err(map_write_error)?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Inventory item updated successfully!",
        "status": status,
    })))
}

/// GET /inventory/category/{category} - Items in one category
#[get("/category/{category}")]
pub async fn items_by_category(
    db: web::Data<MongoDB>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let items: Vec<InventoryItem> = db
        .collection::<InventoryItem>("inventory")
        .find(doc! { "category": path.into_inner() })
        .await
        .map_err(|e| AppError::Database(e.to_string()))?
        .try_collect()
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

    if items.is_empty() {
        return Ok(HttpResponse::Ok().json(serde_json::json!({
            "message": "No inventory items found in this category"
        })));
    }
    let items: Vec<InventoryResponse> = items.into_iter().map(InventoryResponse::from).collect();
    Ok(HttpResponse::Ok().json(items))
}

/// GET /inventory/search?query= - Case-insensitive search by item name
#[get("/search")]
pub async fn search_items(
    db: web::Data<MongoDB>,
    query: web::Query<SearchQuery>,
) -> Result<HttpResponse, AppError> {
    let term = query
        .query
        .as_deref()
        .filter(|q| !q.is_empty())
        .ok_or_else(|| AppError::validation("Search query is required"))?;

    let items: Vec<InventoryItem> = db
        .collection::<InventoryItem>("inventory")
        .find(doc! { "name": { "$regex": term, "$options": "i" } })
        .await
        .map_err(|e| AppError::Database(e.to_string()))?
        .try_collect()
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

    if items.is_empty() {
        return Ok(HttpResponse::Ok().json(serde_json::json!({
            "message": "No inventory items found matching the search criteria"
        })));
    }
    let items: Vec<InventoryResponse> = items.into_iter().map(InventoryResponse::from).collect();
    Ok(HttpResponse::Ok().json(items))
}

/// GET /inventory/low-stock - Items at or below their minimum stock level
#[get("/low-stock")]
pub async fn low_stock_items(db: web::Data<MongoDB>) -> Result<HttpResponse, AppError> {
    let items: Vec<InventoryItem> = db
        .collection::<InventoryItem>("inventory")
        .find(doc! { "$expr": { "$lte": ["$stockQuantity", "$minimumStockLevel"] } })
        .await
        .map_err(|e| AppError::Database(e.to_string()))?
        .try_collect()
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

    let count = items.len();
    let items: Vec<InventoryResponse> = items.into_iter().map(InventoryResponse::from).collect();
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "lowStockItems": items,
        "count": count,
    })))
}

/// GET /inventory/category-counts - Item count grouped by category
#[get("/category-counts")]
pub async fn category_counts(db: web::Data<MongoDB>) -> Result<HttpResponse, AppError> {
    let counts = db.count_by_field("inventory", "category").await?;
    Ok(HttpResponse::Ok().json(counts))
}

/// GET /inventory/stock-status - Item count grouped by derived stock status.
/// Uses the same deriver as the writes, so a stale stored status cannot skew
/// the summary.
#[get("/stock-status")]
pub async fn stock_status_summary(db: web::Data<MongoDB>) -> Result<HttpResponse, AppError> {
    let items: Vec<InventoryItem> = db
        .collection::<InventoryItem>("inventory")
        .find(doc! {})
        .await
        .map_err(|e| AppError::Database(e.to_string()))?
        .try_collect()
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

    let mut counts: BTreeMap<&'static str, i64> = BTreeMap::new();
    for item in &items {
        let status = if item.status == StockStatus::Discontinued {
            StockStatus::Discontinued
        } else {
            StockStatus::derive(item.stock_quantity, item.minimum_stock_level)
        };
        let label = match status {
            StockStatus::InStock => "In Stock",
            StockStatus::LowStock => "Low Stock",
            StockStatus::OutOfStock => "Out of Stock",
            StockStatus::Discontinued => "Discontinued",
        };
        *counts.entry(label).or_insert(0) += 1;
    }

    let summary: Vec<serde_json::Value> = counts
        .into_iter()
        .map(|(status, count)| serde_json::json!({ "status": status, "count": count }))
        .collect();
    Ok(HttpResponse::Ok().json(summary))
}
