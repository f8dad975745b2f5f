//! Vaglio test utilities.
//!
//! Fixture builders for schema registries and materialized rows used in
//! engine tests.

use serde_json::{Value as JsonValue, json};
use uuid::Uuid;
use vaglio_engine::{ModelSchema, RelationDef, SchemaRegistry};

/// The registry used throughout the test suite:
/// person —pets→ pet (table `animal`) —toy→ toy, plus a singular
/// person —movie→ movie relation.
pub fn person_registry() -> SchemaRegistry {
    SchemaRegistry::new()
        .with(
            ModelSchema::new("person", "person")
                .with_unique("id")
                .with_relation("pets", RelationDef::new("pet", "id", "owner_id"))
                .with_relation("movie", RelationDef::new("movie", "movie_id", "id").singular()),
        )
        .with(
            ModelSchema::new("pet", "animal")
                .with_unique("id")
                .with_relation("toy", RelationDef::new("toy", "id", "animal_id").singular()),
        )
        .with(ModelSchema::new("toy", "toy"))
        .with(ModelSchema::new("movie", "movie"))
}

/// Create a test person row builder with default values.
pub fn test_person(name: &str) -> TestPerson {
    TestPerson {
        id: Uuid::now_v7(),
        name: name.to_string(),
        age: 30,
        gender: "f".to_string(),
    }
}

/// Builder for materialized person rows.
#[derive(Debug, Clone)]
pub struct TestPerson {
    pub id: Uuid,
    pub name: String,
    pub age: i64,
    pub gender: String,
}

impl TestPerson {
    /// Set a custom ID.
    pub fn with_id(mut self, id: Uuid) -> Self {
        self.id = id;
        self
    }

    /// Set the age.
    pub fn aged(mut self, age: i64) -> Self {
        self.age = age;
        self
    }

    /// Set the gender.
    pub fn gender(mut self, gender: &str) -> Self {
        self.gender = gender.to_string();
        self
    }

    /// Render as a materialized row.
    pub fn row(&self) -> JsonValue {
        json!({
            "id": self.id.to_string(),
            "name": self.name,
            "age": self.age,
            "gender": self.gender,
        })
    }
}
