use person_store::config::DatabaseConfig;
use person_store::db::ConnectionManager;
use person_store::models::{AttrValue, Person};
use person_store::repository;
use person_store::service::DatabaseService;

/// Integration tests against a live PostgreSQL instance.
/// Marked ignored to avoid running against a real database by accident;
/// point TEST_DB_HOST (and friends) at a scratch database to run them:
///
///   TEST_DB_HOST=localhost cargo test -- --ignored
fn test_config() -> DatabaseConfig {
    let var = |name: &str, default: &str| {
        std::env::var(name).unwrap_or_else(|_| default.to_string())
    };

    DatabaseConfig::builder()
        .db_type("postgres")
        .host(var("TEST_DB_HOST", "localhost"))
        .db_name(var("TEST_DB_NAME", "person_store_test"))
        .username(var("TEST_DB_USERNAME", "postgres"))
        .password(var("TEST_DB_PASSWORD", "postgres"))
        .pool_size(4)
        .build()
        .expect("test config should build")
}

async fn service() -> DatabaseService {
    DatabaseService::new(&test_config())
        .await
        .expect("database service should initialize")
}

fn person(id: i64, first: &str, last: &str) -> Person {
    Person::new(id, first, last, 40, format!("{}@example.com", first.to_lowercase())).unwrap()
}

// Distinct id ranges per test: these share one table and may run in
// parallel within this binary.

#[tokio::test]
#[ignore = "requires database"]
async fn save_then_fetch_round_trips_fields_and_attrs() {
    let service = service().await;
    let original = person(1_001, "Round", "Trip")
        .with_attr("net_worth", AttrValue::Float(120_000.5))
        .with_attr("birth_year", AttrValue::Int(1985))
        .with_attr("nickname", AttrValue::Text("RT".into()));

    service.save_person(&original).await.unwrap();
    let fetched = service.get_person(1_001).await.unwrap().unwrap();

    assert_eq!(fetched.first_name, original.first_name);
    assert_eq!(fetched.last_name, original.last_name);
    assert_eq!(fetched.age, original.age);
    assert_eq!(fetched.email, original.email);
    assert_eq!(fetched.additional_data, original.additional_data);

    service.delete_person(1_001).await.unwrap();
    service.close().await;
}

#[tokio::test]
#[ignore = "requires database"]
async fn saving_same_id_twice_updates_in_place() {
    let service = service().await;

    service.save_person(&person(1_101, "First", "Pass")).await.unwrap();
    let mut updated = person(1_101, "Second", "Pass");
    updated.age = 55;
    service.save_person(&updated).await.unwrap();

    let matches: Vec<_> = service
        .get_all_people()
        .await
        .unwrap()
        .into_iter()
        .filter(|p| p.id == 1_101)
        .collect();

    assert_eq!(matches.len(), 1, "update path must not duplicate the row");
    assert_eq!(matches[0].first_name, "Second");
    assert_eq!(matches[0].age, 55);

    service.delete_person(1_101).await.unwrap();
    service.close().await;
}

#[tokio::test]
#[ignore = "requires database"]
async fn delete_reports_presence() {
    let service = service().await;

    service.save_person(&person(1_201, "Dele", "Ted")).await.unwrap();
    assert!(service.delete_person(1_201).await.unwrap());
    assert!(service.get_person(1_201).await.unwrap().is_none());
    // Absent id deletes as false
    assert!(!service.delete_person(1_201).await.unwrap());

    service.close().await;
}

#[tokio::test]
#[ignore = "requires database"]
async fn name_search_matches_substring_in_either_name() {
    let service = service().await;

    service.save_person(&person(1_301, "John", "Doe")).await.unwrap();
    service.save_person(&person(1_302, "Joe", "Smith")).await.unwrap();
    service.save_person(&person(1_303, "Anna", "Lee")).await.unwrap();

    let ids: Vec<i64> = service
        .find_people_by_name("oe")
        .await
        .unwrap()
        .into_iter()
        .map(|p| p.id)
        .collect();

    assert!(ids.contains(&1_301), "'oe' should match last name Doe");
    assert!(ids.contains(&1_302), "'oe' should match first name Joe");
    assert!(!ids.contains(&1_303), "'oe' should not match Anna Lee");

    for id in [1_301, 1_302, 1_303] {
        service.delete_person(id).await.unwrap();
    }
    service.close().await;
}

#[tokio::test]
#[ignore = "requires database"]
async fn batch_save_mixes_inserts_and_updates() {
    let service = service().await;

    // Pre-existing row that the batch must update, not duplicate.
    service.save_person(&person(1_401, "Old", "Name")).await.unwrap();

    let batch = vec![
        person(1_401, "New", "Name"),
        person(1_402, "Fresh", "One"),
        person(1_403, "Fresh", "Two"),
    ];
    service.save_people(batch).await.unwrap();

    let people: Vec<_> = service
        .get_all_people()
        .await
        .unwrap()
        .into_iter()
        .filter(|p| (1_401..=1_403).contains(&p.id))
        .collect();

    assert_eq!(people.len(), 3, "three distinct ids, three rows");
    let updated = people.iter().find(|p| p.id == 1_401).unwrap();
    assert_eq!(updated.first_name, "New");

    for id in [1_401, 1_402, 1_403] {
        service.delete_person(id).await.unwrap();
    }
    service.close().await;
}

#[tokio::test]
#[ignore = "requires database"]
async fn failed_batch_commits_nothing() {
    let service = service().await;

    let batch = vec![person(1_501, "Valid", "Row"), person(1_502, "Also", "Valid")];
    service.save_people(batch).await.unwrap();

    // Second statement violates NOT NULL on first_name; the first must
    // not survive the rollback.
    let manager = ConnectionManager::new(&test_config()).await.unwrap();
    let result = repository::execute_in_transaction(&manager, |tx| {
        Box::pin(async move {
            sqlx::query("UPDATE people SET first_name = 'Changed' WHERE person_id = $1")
                .bind(1_501i64)
                .execute(&mut **tx)
                .await
                .map_err(|e| person_store::errors::DbError::query("update failed", e))?;
            sqlx::query("UPDATE people SET first_name = NULL WHERE person_id = $1")
                .bind(1_502i64)
                .execute(&mut **tx)
                .await
                .map_err(|e| person_store::errors::DbError::query("update failed", e))?;
            Ok(())
        })
    })
    .await;

    assert!(result.is_err(), "NOT NULL violation must fail the transaction");
    let untouched = service.get_person(1_501).await.unwrap().unwrap();
    assert_eq!(untouched.first_name, "Valid", "rollback must undo the first statement");

    for id in [1_501, 1_502] {
        service.delete_person(id).await.unwrap();
    }
    manager.close().await;
    service.close().await;
}

#[tokio::test]
#[ignore = "requires database"]
async fn batch_execution_reports_per_statement_counts() {
    let service = service().await;
    service.save_person(&person(1_601, "Batch", "Count")).await.unwrap();

    let manager = ConnectionManager::new(&test_config()).await.unwrap();
    let counts = repository::execute_batch(
        &manager,
        vec![
            sqlx::query("DELETE FROM people WHERE person_id = $1").bind(1_601i64),
            sqlx::query("DELETE FROM people WHERE person_id = $1").bind(1_699i64),
        ],
    )
    .await
    .unwrap();

    assert_eq!(counts, vec![1, 0]);
    manager.close().await;
    service.close().await;
}

#[tokio::test]
#[ignore = "requires database"]
async fn delete_all_empties_the_table() {
    let service = service().await;

    service.save_person(&person(1_701, "Wipe", "Me")).await.unwrap();
    service.save_person(&person(1_702, "Me", "Too")).await.unwrap();

    let removed = service.delete_all_people().await.unwrap();
    assert!(removed >= 2);
    assert!(service.get_person(1_701).await.unwrap().is_none());
    assert!(service.get_person(1_702).await.unwrap().is_none());

    service.close().await;
}
