use log::*;
use sqlx::{migrate::MigrateDatabase, Sqlite};
use waggle_engine::{MarketplaceDatabase, SqliteDatabase};

pub async fn prepare_test_env(url: &str) -> SqliteDatabase {
    dotenvy::from_filename(".env.test").ok();
    let _ = env_logger::try_init();
    create_database(url).await;
    let db = SqliteDatabase::new_with_url(url, 5).await.expect("Error creating connection to database");
    db.run_migrations().await.expect("Error running DB migrations");
    db
}

pub fn random_db_path() -> String {
    format!("sqlite://{}/waggle_test_{}.sqlite", std::env::temp_dir().display(), rand::random::<u64>())
}

pub async fn create_database(url: &str) {
    if let Err(e) = Sqlite::drop_database(url).await {
        warn!("Error dropping database {url}: {e:?}");
    }
    Sqlite::create_database(url).await.expect("Error creating database");
    info!("Created Sqlite database {url}");
}

pub async fn destroy_test_env(mut db: SqliteDatabase) {
    let url = db.url().to_string();
    if let Err(e) = db.close().await {
        error!("Failed to close database: {e}");
    }
    Sqlite::drop_database(&url).await.expect("Error dropping test database");
}
