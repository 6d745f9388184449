use sqlx::postgres::PgRow;
use sqlx::Row;

use crate::db::ConnectionManager;
use crate::errors::DbError;
use crate::models::{AttrMap, Person};
use crate::repository;

const CREATE_TABLE_SQL: &str = "CREATE TABLE IF NOT EXISTS people (
    id BIGSERIAL PRIMARY KEY,
    person_id BIGINT NOT NULL,
    first_name VARCHAR(255) NOT NULL,
    last_name VARCHAR(255),
    age INT,
    email VARCHAR(255),
    additional_data TEXT
)";

const FIND_BY_ID_SQL: &str = "SELECT * FROM people WHERE person_id = $1";

const FIND_ALL_SQL: &str = "SELECT * FROM people";

const INSERT_SQL: &str = "INSERT INTO people \
    (person_id, first_name, last_name, age, email, additional_data) \
    VALUES ($1, $2, $3, $4, $5, $6) RETURNING id";

const UPDATE_SQL: &str = "UPDATE people SET first_name = $1, last_name = $2, \
    age = $3, email = $4, additional_data = $5 WHERE person_id = $6";

const DELETE_SQL: &str = "DELETE FROM people WHERE person_id = $1";

const DELETE_ALL_SQL: &str = "DELETE FROM people";

const COUNT_BY_ID_SQL: &str = "SELECT COUNT(*) AS count FROM people WHERE person_id = $1";

const FIND_BY_NAME_SQL: &str =
    "SELECT * FROM people WHERE first_name LIKE $1 OR last_name LIKE $2";

/// Storage for [`Person`] records: entity SQL and row mapping over the
/// generic execution helpers.
///
/// The `person_id` column is the caller-assigned business id used for
/// every lookup; the `id` surrogate key stays internal to the table.
#[derive(Clone)]
pub struct PersonStorage {
    db: ConnectionManager,
}

impl PersonStorage {
    pub fn new(db: ConnectionManager) -> Self {
        Self { db }
    }

    /// Creates the people table if it does not exist yet.
    pub async fn initialize(&self) -> Result<(), DbError> {
        repository::execute_update(&self.db, sqlx::query(CREATE_TABLE_SQL)).await?;
        tracing::info!("People table initialized");
        Ok(())
    }

    /// Looks up a person by business id; maps at most one row.
    pub async fn find_by_id(&self, id: i64) -> Result<Option<Person>, DbError> {
        let results = repository::fetch_mapped(
            &self.db,
            sqlx::query(FIND_BY_ID_SQL).bind(id),
            map_person_row,
        )
        .await?;

        Ok(results.into_iter().next())
    }

    pub async fn find_all(&self) -> Result<Vec<Person>, DbError> {
        repository::fetch_mapped(&self.db, sqlx::query(FIND_ALL_SQL), map_person_row).await
    }

    pub async fn exists_by_id(&self, id: i64) -> Result<bool, DbError> {
        let counts = repository::fetch_mapped(
            &self.db,
            sqlx::query(COUNT_BY_ID_SQL).bind(id),
            |row| repository::read_i64(row, "count"),
        )
        .await?;

        Ok(counts.first().copied().unwrap_or(0) > 0)
    }

    /// Saves one person idempotently: update when the id is present,
    /// insert otherwise. The stored value is returned unchanged.
    pub async fn save(&self, person: &Person) -> Result<Person, DbError> {
        let attrs = serialize_attrs(&person.additional_data)?;

        if self.exists_by_id(person.id).await? {
            repository::execute_update(
                &self.db,
                sqlx::query(UPDATE_SQL)
                    .bind(&person.first_name)
                    .bind(&person.last_name)
                    .bind(person.age)
                    .bind(&person.email)
                    .bind(&attrs)
                    .bind(person.id),
            )
            .await?;
        } else {
            let row_key = repository::execute_insert_returning(
                &self.db,
                sqlx::query(INSERT_SQL)
                    .bind(person.id)
                    .bind(&person.first_name)
                    .bind(&person.last_name)
                    .bind(person.age)
                    .bind(&person.email)
                    .bind(&attrs),
                |row| repository::read_i64(row, "id"),
            )
            .await?;
            tracing::debug!("Inserted person {} as row {}", person.id, row_key);
        }

        Ok(person.clone())
    }

    /// Deletes by business id; true iff a row was removed.
    pub async fn delete_by_id(&self, id: i64) -> Result<bool, DbError> {
        let affected =
            repository::execute_update(&self.db, sqlx::query(DELETE_SQL).bind(id)).await?;
        Ok(affected > 0)
    }

    /// Deletes every person, returning the removed-row count.
    pub async fn delete_all(&self) -> Result<u64, DbError> {
        repository::execute_update(&self.db, sqlx::query(DELETE_ALL_SQL)).await
    }

    /// Case-sensitive substring search against first or last name.
    pub async fn find_by_name(&self, name_pattern: &str) -> Result<Vec<Person>, DbError> {
        let pattern = format!("%{}%", name_pattern);

        repository::fetch_mapped(
            &self.db,
            sqlx::query(FIND_BY_NAME_SQL).bind(pattern.clone()).bind(pattern),
            map_person_row,
        )
        .await
    }

    /// Saves many people in one transaction.
    ///
    /// Each person is existence-checked and queued as an update or an
    /// insert; both groups run at the end. A failure anywhere rolls the
    /// whole batch back, so no partial roster is ever committed.
    pub async fn save_all(&self, people: Vec<Person>) -> Result<(), DbError> {
        repository::execute_in_transaction(&self.db, move |tx| {
            Box::pin(async move {
                let mut to_insert = Vec::new();
                let mut to_update = Vec::new();

                for person in people {
                    let attrs = serialize_attrs(&person.additional_data)?;
                    let (count,): (i64,) = sqlx::query_as(COUNT_BY_ID_SQL)
                        .bind(person.id)
                        .fetch_one(&mut **tx)
                        .await
                        .map_err(|e| DbError::query("failed to check if person exists", e))?;

                    if count > 0 {
                        to_update.push((person, attrs));
                    } else {
                        to_insert.push((person, attrs));
                    }
                }

                for (person, attrs) in &to_update {
                    sqlx::query(UPDATE_SQL)
                        .bind(&person.first_name)
                        .bind(&person.last_name)
                        .bind(person.age)
                        .bind(&person.email)
                        .bind(attrs)
                        .bind(person.id)
                        .execute(&mut **tx)
                        .await
                        .map_err(|e| DbError::query("failed to update person in batch", e))?;
                }

                for (person, attrs) in &to_insert {
                    sqlx::query(INSERT_SQL)
                        .bind(person.id)
                        .bind(&person.first_name)
                        .bind(&person.last_name)
                        .bind(person.age)
                        .bind(&person.email)
                        .bind(attrs)
                        .fetch_one(&mut **tx)
                        .await
                        .map_err(|e| DbError::query("failed to insert person in batch", e))?;
                }

                Ok(())
            })
        })
        .await
    }
}

fn serialize_attrs(attrs: &AttrMap) -> Result<String, DbError> {
    serde_json::to_string(attrs)
        .map_err(|e| DbError::data_access(format!("failed to serialize attributes: {}", e)))
}

/// Maps one `people` row onto a [`Person`]. A NULL attribute column
/// yields an empty map; malformed attribute JSON is a data-access error.
fn map_person_row(row: &PgRow) -> Result<Person, DbError> {
    let read_err = |e: sqlx::Error| DbError::data_access(format!("failed to map person row: {}", e));

    let attrs_json: Option<String> = row.try_get("additional_data").map_err(read_err)?;
    let additional_data = match attrs_json {
        Some(json) if !json.is_empty() => serde_json::from_str(&json).map_err(|e| {
            DbError::data_access(format!("invalid attribute data for person row: {}", e))
        })?,
        _ => AttrMap::new(),
    };

    Ok(Person {
        id: row.try_get("person_id").map_err(read_err)?,
        first_name: row.try_get("first_name").map_err(read_err)?,
        last_name: row
            .try_get::<Option<String>, _>("last_name")
            .map_err(read_err)?
            .unwrap_or_default(),
        age: row
            .try_get::<Option<i32>, _>("age")
            .map_err(read_err)?
            .unwrap_or_default(),
        email: row
            .try_get::<Option<String>, _>("email")
            .map_err(read_err)?
            .unwrap_or_default(),
        additional_data,
    })
}
