use futures::stream::TryStreamExt;
use mongodb::bson::{doc, Document};
use mongodb::options::IndexOptions;
use mongodb::{Client, Collection, Database, IndexModel};
use serde::{Deserialize, Serialize};
use std::error::Error;

/// One `{label, count}` row from an aggregate-count endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct LabelCount {
    pub label: String,
    pub count: i64,
}

#[derive(Clone)]
pub struct MongoDB {
    db: Database,
}

impl MongoDB {
    pub async fn new(uri: &str) -> Result<Self, Box<dyn Error>> {
        let mut client_options = mongodb::options::ClientOptions::parse(uri).await?;

        client_options.max_pool_size = Some(20);
        client_options.min_pool_size = Some(5);
        client_options.max_idle_time = Some(std::time::Duration::from_secs(300));

        client_options.connect_timeout = Some(std::time::Duration::from_secs(5));
        client_options.server_selection_timeout = Some(std::time::Duration::from_secs(5));

        let client = Client::with_options(client_options)?;

        // Extract database name from URI or use default
        let db_name = uri
            .split('/')
            .last()
            .and_then(|s| s.split('?').next())
            .unwrap_or("VehicleService");

        let db = client.database(db_name);

        // Test connection
        db.list_collection_names().await?;

        let mongodb = Self { db };

        mongodb.ensure_indexes().await?;

        Ok(mongodb)
    }

    /// Creates the unique indexes backing every natural key. These are the
    /// authoritative uniqueness enforcement; the pre-write existence checks in
    /// the handlers only produce friendlier error messages.
    async fn ensure_indexes(&self) -> Result<(), Box<dyn Error>> {
        log::info!("🔧 Creating database indexes...");

        self.unique_index("users", "user_id").await;
        self.unique_index("users", "email").await;
        self.unique_index("users", "contact").await;

        self.unique_index("owners", "owner_id").await;
        self.unique_index("owners", "email").await;
        self.unique_index("owners", "contact").await;
        self.unique_index("owners", "license_number").await;

        self.unique_index("vehicles", "registrationNumber").await;

        self.unique_index("inventory", "productCode").await;

        // Non-unique lookup indexes
        self.index("vehicles", doc! { "owner": 1 }).await;
        self.index("service_reminders", doc! { "vehicle": 1, "serviceType": 1, "status": 1 })
            .await;

        log::info!("✅ Database indexes ready");

        Ok(())
    }

    async fn unique_index(&self, collection: &str, field: &str) {
        let coll = self.db.collection::<Document>(collection);
        let index = IndexModel::builder()
            .keys(doc! { field: 1 })
            .options(IndexOptions::builder().unique(true).build())
            .build();

        match coll.create_index(index).await {
            Ok(_) => log::info!("   ✅ Unique index: {}({})", collection, field),
            Err(e) => log::debug!("   ℹ️  Index already exists: {}", e),
        }
    }

    async fn index(&self, collection: &str, keys: Document) {
        let coll = self.db.collection::<Document>(collection);
        let index = IndexModel::builder().keys(keys.clone()).build();

        match coll.create_index(index).await {
            Ok(_) => log::info!("   ✅ Index: {}{}", collection, keys),
            Err(e) => log::debug!("   ℹ️  Index already exists: {}", e),
        }
    }

    /// Groups a collection by one field and returns `[{label, count}]`, the
    /// shape shared by all the aggregate-count endpoints.
    pub async fn count_by_field(
        &self,
        collection: &str,
        field: &str,
    ) -> Result<Vec<LabelCount>, mongodb::error::Error> {
        let coll = self.db.collection::<Document>(collection);
        let pipeline = vec![
            doc! { "$group": { "_id": format!("${}", field), "count": { "$sum": 1 } } },
            doc! { "$project": { "_id": 0, "label": "$_id", "count": 1 } },
            doc! { "$sort": { "label": 1 } },
        ];

        let mut cursor = coll.aggregate(pipeline).await?;
        let mut counts = Vec::new();
        while let Some(document) = cursor.try_next().await? {
            if let Ok(row) = mongodb::bson::from_document::<LabelCount>(document) {
                counts.push(row);
            }
        }
        Ok(counts)
    }

    pub fn collection<T: Send + Sync>(&self, name: &str) -> Collection<T> {
        self.db.collection(name)
    }
}
