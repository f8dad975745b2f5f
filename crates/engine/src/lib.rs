//! Vaglio query engine.
//!
//! Compiles JSON:API-style request parameters — filters, sorts, field
//! projections, grouping, relation includes, pagination — into SeaQuery
//! statements executed over PostgreSQL via sqlx. Schema metadata (table
//! names, relations, attribute-name transformation) is supplied by the
//! caller; the engine never validates that referenced attributes exist.

pub mod builder;
pub mod compile;
pub mod config;
pub mod error;
pub mod params;
pub mod schema;
pub mod service;

pub use builder::{QueryBuilder, QueryRefiner};
pub use compile::fields::{AggregateFunction, ProjectionField};
pub use compile::filter::{FilterClause, FilterOperator, ScalarValue};
pub use compile::include::{IncludeNode, IncludeRefine, IncludeSpec};
pub use compile::page::PageSlice;
pub use compile::sort::{SortDirection, SortKey};
pub use config::{EngineConfig, PageDefaults};
pub use error::{EngineError, EngineResult, ParamError};
pub use params::path::FieldPath;
pub use params::{IncludeParam, PageParams, RequestParams};
pub use schema::{
    IdentityMapper, JoinKind, ModelSchema, NameMapper, RelationDef, SchemaRegistry,
    SnakeCaseMapper,
};
pub use service::{
    PageInfo, QueryMode, QueryOptions, QueryOutcome, QueryResult, QueryService, RowTransform,
};
