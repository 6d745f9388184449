use crate::config::DatabaseConfig;
use crate::db::ConnectionManager;
use crate::errors::DbError;
use crate::models::Person;
use crate::person_storage::PersonStorage;

/// High-level façade over the connection pool and person storage.
///
/// The single entry point callers use: it owns the [`ConnectionManager`],
/// initializes the schema once at construction, and delegates every
/// person operation to [`PersonStorage`].
pub struct DatabaseService {
    connection_manager: ConnectionManager,
    people: PersonStorage,
}

impl DatabaseService {
    pub async fn new(config: &DatabaseConfig) -> Result<Self, DbError> {
        tracing::info!("Initializing database service");
        let connection_manager = ConnectionManager::new(config).await?;
        let people = PersonStorage::new(connection_manager.clone());
        people.initialize().await?;

        Ok(Self {
            connection_manager,
            people,
        })
    }

    pub async fn get_person(&self, id: i64) -> Result<Option<Person>, DbError> {
        self.people.find_by_id(id).await
    }

    pub async fn get_all_people(&self) -> Result<Vec<Person>, DbError> {
        self.people.find_all().await
    }

    pub async fn save_person(&self, person: &Person) -> Result<Person, DbError> {
        self.people.save(person).await
    }

    pub async fn save_people(&self, people: Vec<Person>) -> Result<(), DbError> {
        self.people.save_all(people).await
    }

    pub async fn delete_person(&self, id: i64) -> Result<bool, DbError> {
        self.people.delete_by_id(id).await
    }

    pub async fn delete_all_people(&self) -> Result<u64, DbError> {
        self.people.delete_all().await
    }

    pub async fn find_people_by_name(&self, name_pattern: &str) -> Result<Vec<Person>, DbError> {
        self.people.find_by_name(name_pattern).await
    }

    /// Releases the connection pool. Safe to call more than once.
    pub async fn close(&self) {
        tracing::info!("Shutting down database service");
        self.connection_manager.close().await;
    }
}
