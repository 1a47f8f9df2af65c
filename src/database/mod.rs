use mongodb::bson::{doc, Document};
use mongodb::options::{ClientOptions, IndexOptions};
use mongodb::{Client, Collection, Database, IndexModel};
use std::error::Error;
use std::time::Duration;

pub const USERS: &str = "USER";
pub const MAINTENANCE: &str = "MAINTENANCE";

const DEFAULT_DATABASE: &str = "CAR";

#[derive(Clone)]
pub struct MongoDB {
    client: Client,
    db: Database,
}

impl MongoDB {
    /// Builds the client. The driver connects lazily, so an unreachable
    /// server is only noticed by `connect`.
    pub async fn new(uri: &str, database: Option<&str>) -> Result<Self, Box<dyn Error>> {
        let mut client_options = ClientOptions::parse(uri).await?;

        client_options.app_name = Some("carcare-service".to_string());
        client_options.max_pool_size = Some(20);
        client_options.min_pool_size = Some(5);
        client_options.max_idle_time = Some(Duration::from_secs(300));

        client_options.connect_timeout = Some(Duration::from_secs(5));
        client_options.server_selection_timeout = Some(Duration::from_secs(5));

        let db_name = database
            .map(str::to_string)
            .or_else(|| client_options.default_database.clone())
            .unwrap_or_else(|| DEFAULT_DATABASE.to_string());

        let client = Client::with_options(client_options)?;
        let db = client.database(&db_name);

        log::info!("📦 Using database: {}", db_name);

        Ok(Self { client, db })
    }

    /// Pings the server and creates the indexes.
    pub async fn connect(&self) -> Result<(), Box<dyn Error>> {
        self.ping().await?;
        self.ensure_indexes().await
    }

    /// Creates the indexes the service relies on
    async fn ensure_indexes(&self) -> Result<(), Box<dyn Error>> {
        log::info!("🔧 Creating database indexes...");

        // Email is the identity of a user; uniqueness is enforced here and nowhere else.
        let users = self.collection::<Document>(USERS);
        let unique_email = IndexModel::builder()
            .keys(doc! { "email": 1 })
            .options(IndexOptions::builder().unique(true).build())
            .build();

        match users.create_index(unique_email).await {
            Ok(_) => log::info!("   ✅ Index created: {}(email, unique)", USERS),
            Err(e) => log::debug!("   ℹ️  Index already exists: {}", e),
        }

        let maintenance = self.collection::<Document>(MAINTENANCE);
        let owner_index = IndexModel::builder()
            .keys(doc! { "email": 1 })
            .options(IndexOptions::builder().unique(true).build())
            .build();

        match maintenance.create_index(owner_index).await {
            Ok(_) => log::info!("   ✅ Index created: {}(email, unique)", MAINTENANCE),
            Err(e) => log::debug!("   ℹ️  Index already exists: {}", e),
        }

        log::info!("✅ Database indexes ready");

        Ok(())
    }

    pub async fn ping(&self) -> Result<(), mongodb::error::Error> {
        self.db.run_command(doc! { "ping": 1 }).await?;
        Ok(())
    }

    pub fn collection<T: Send + Sync>(&self, name: &str) -> Collection<T> {
        self.db.collection(name)
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn client(&self) -> &Client {
        &self.client
    }
}

/// True when a write failed because of a unique email index.
pub fn is_duplicate_key(error: &mongodb::error::Error) -> bool {
    use mongodb::error::{ErrorKind, WriteFailure};

    match error.kind.as_ref() {
        ErrorKind::Write(WriteFailure::WriteError(write_error)) => write_error.code == 11000,
        _ => false,
    }
}

/// Connected handle for the tests that need a live server.
#[cfg(test)]
pub async fn test_db() -> MongoDB {
    dotenv::dotenv().ok();
    let uri = std::env::var("MONGODB_TEST_URI")
        .unwrap_or_else(|_| "mongodb://localhost:27017/CAR_TEST".to_string());

    let db = MongoDB::new(&uri, None).await.expect("client");
    db.connect().await.expect("connect");
    db
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    #[ignore] // Requires MongoDB to be running
    async fn connects_and_pings() {
        dotenv::dotenv().ok();
        let uri = std::env::var("MONGODB_URI")
            .unwrap_or_else(|_| "mongodb://localhost:27017/CAR_TEST".to_string());

        let db = MongoDB::new(&uri, None).await.expect("client");
        db.connect().await.expect("connect");
        assert!(db.ping().await.is_ok());
        assert_eq!(db.database().name(), "CAR_TEST");
    }

    #[tokio::test]
    async fn unreachable_server_does_not_fail_construction() {
        let db = MongoDB::new("mongodb://127.0.0.1:1/CAR_TEST", None)
            .await
            .expect("client is built without a server");

        assert_eq!(db.database().name(), "CAR_TEST");
        assert!(db.connect().await.is_err());
    }

    #[tokio::test]
    async fn database_name_falls_back_to_default() {
        let db = MongoDB::new("mongodb://127.0.0.1:1", None).await.unwrap();
        assert_eq!(db.database().name(), DEFAULT_DATABASE);

        let named = MongoDB::new("mongodb://127.0.0.1:1", Some("GARAGE")).await.unwrap();
        assert_eq!(named.database().name(), "GARAGE");
    }
}
