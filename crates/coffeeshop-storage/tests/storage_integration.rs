//! Storage Integration Tests.
//!
//! These tests verify that the in-memory and SQLite implementations behave
//! consistently and can be swapped at runtime. PostgreSQL parity lives in
//! `postgres_integration.rs`.

use std::sync::Arc;

use coffeeshop_domain::{Ingredient, NewDrink, Recipe};
use coffeeshop_storage::{
    DrinkStore, MemoryDrinkStore, SqliteConfig, SqliteDrinkStore, StorageError,
};

fn new_drink(title: &str, parts: u32) -> NewDrink {
    NewDrink {
        title: title.to_string(),
        recipe: Recipe::new(vec![
            Ingredient::new("espresso", "brown", parts),
            Ingredient::new("milk", "white", 2),
        ])
        .unwrap(),
    }
}

async fn create_sqlite_store(dir: &tempfile::TempDir) -> SqliteDrinkStore {
    let path = dir.path().join("drinks.db");
    let config = SqliteConfig {
        database_url: format!("sqlite://{}", path.display()),
        max_connections: 4,
        ..Default::default()
    };
    let store = SqliteDrinkStore::from_config(&config)
        .await
        .expect("Failed to open SQLite store");
    store
        .run_migrations()
        .await
        .expect("Failed to run migrations");
    store
}

/// Runs the same CRUD scenario against any DrinkStore implementation.
async fn run_basic_crud_test<S: DrinkStore>(store: &S) {
    let latte = store.create_drink(new_drink("Latte", 1)).await.unwrap();
    let mocha = store.create_drink(new_drink("Mocha", 2)).await.unwrap();
    assert!(mocha.id > latte.id);

    let listed = store.list_drinks().await.unwrap();
    assert_eq!(listed, vec![latte.clone(), mocha.clone()]);

    let updated = store
        .update_drink(latte.id, new_drink("Iced Latte", 3))
        .await
        .unwrap();
    assert_eq!(updated.id, latte.id);
    assert_eq!(store.get_drink(latte.id).await.unwrap(), updated);

    assert_eq!(store.delete_drink(mocha.id).await.unwrap(), mocha.id);
    assert!(matches!(
        store.get_drink(mocha.id).await,
        Err(StorageError::DrinkNotFound { .. })
    ));
    assert_eq!(store.list_drinks().await.unwrap(), vec![updated]);
}

async fn run_duplicate_title_test<S: DrinkStore>(store: &S) {
    let latte = store.create_drink(new_drink("Latte", 1)).await.unwrap();
    let mocha = store.create_drink(new_drink("Mocha", 1)).await.unwrap();

    assert!(matches!(
        store.create_drink(new_drink("Latte", 5)).await,
        Err(StorageError::DuplicateTitle { .. })
    ));
    assert!(matches!(
        store.update_drink(mocha.id, new_drink("Latte", 5)).await,
        Err(StorageError::DuplicateTitle { .. })
    ));

    // Nothing changed.
    assert_eq!(store.list_drinks().await.unwrap(), vec![latte, mocha]);
}

#[tokio::test]
async fn test_memory_basic_crud() {
    run_basic_crud_test(&MemoryDrinkStore::new()).await;
}

#[tokio::test]
async fn test_sqlite_basic_crud() {
    let dir = tempfile::tempdir().unwrap();
    run_basic_crud_test(&create_sqlite_store(&dir).await).await;
}

#[tokio::test]
async fn test_memory_duplicate_titles() {
    run_duplicate_title_test(&MemoryDrinkStore::new()).await;
}

#[tokio::test]
async fn test_sqlite_duplicate_titles() {
    let dir = tempfile::tempdir().unwrap();
    run_duplicate_title_test(&create_sqlite_store(&dir).await).await;
}

#[tokio::test]
async fn test_sqlite_data_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let created = {
        let store = create_sqlite_store(&dir).await;
        store.create_drink(new_drink("Latte", 1)).await.unwrap()
    };

    let reopened = create_sqlite_store(&dir).await;
    assert_eq!(reopened.get_drink(created.id).await.unwrap(), created);
}

#[tokio::test]
async fn test_stores_are_interchangeable_behind_arc() {
    let dir = tempfile::tempdir().unwrap();
    let stores: Vec<Arc<dyn DrinkStore>> = vec![
        Arc::new(MemoryDrinkStore::new()),
        Arc::new(create_sqlite_store(&dir).await),
    ];

    for store in stores {
        let seed = store.reset().await.unwrap();
        assert_eq!(seed.id, 1);
        assert_eq!(seed.title, "water");
        assert_eq!(store.list_drinks().await.unwrap(), vec![seed]);
        assert!(store.health_check().await.unwrap().healthy);
    }
}

#[tokio::test]
async fn test_concurrent_creates_with_same_title_admit_one() {
    let dir = tempfile::tempdir().unwrap();
    let stores: Vec<Arc<dyn DrinkStore>> = vec![
        Arc::new(MemoryDrinkStore::new()),
        Arc::new(create_sqlite_store(&dir).await),
    ];

    for store in stores {
        let mut handles = Vec::new();
        for i in 0..8 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                store.create_drink(new_drink("Americano", i)).await
            }));
        }

        let mut successes = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => successes += 1,
                Err(StorageError::DuplicateTitle { .. }) => {}
                Err(other) => panic!("unexpected error: {other}"),
            }
        }
        assert_eq!(successes, 1);
        assert_eq!(store.list_drinks().await.unwrap().len(), 1);
    }
}
