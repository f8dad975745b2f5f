//! SeaQuery statement construction.
//!
//! Applies compiled clauses to a `SelectStatement` in pipeline order and
//! resolves dotted relation paths into join chains. Generates both the
//! main SELECT and the COUNT query used for page-count metadata.

use crate::compile::fields::ProjectionField;
use crate::compile::filter::{FilterClause, FilterOperator, ScalarValue};
use crate::compile::page::PageSlice;
use crate::compile::sort::{SortDirection, SortKey};
use crate::error::{EngineResult, EngineError, ParamError};
use crate::params::path::FieldPath;
use crate::schema::{JoinKind, ModelSchema, NameMapper, SchemaRegistry};
use sea_query::{
    Alias, Asterisk, Cond, Expr, NullOrdering, Order, PostgresQueryBuilder, Query,
    SelectStatement, SimpleExpr, Value,
};

/// Raw query refinement capability, applied after every compiled stage.
pub trait QueryRefiner: Send + Sync {
    fn refine(&self, query: &mut SelectStatement);
}

impl<F> QueryRefiner for F
where
    F: Fn(&mut SelectStatement) + Send + Sync,
{
    fn refine(&self, query: &mut SelectStatement) {
        self(query);
    }
}

/// Query builder for one compiled parameter set.
pub struct QueryBuilder<'a> {
    model: &'a ModelSchema,
    schemas: &'a SchemaRegistry,
    mapper: &'a dyn NameMapper,
    filters: &'a [FilterClause],
    group: &'a [ProjectionField],
    sorts: &'a [SortKey],
    projection: &'a [ProjectionField],
    page: Option<PageSlice>,
    refiner: Option<&'a dyn QueryRefiner>,
}

impl<'a> QueryBuilder<'a> {
    pub fn new(
        model: &'a ModelSchema,
        schemas: &'a SchemaRegistry,
        mapper: &'a dyn NameMapper,
    ) -> Self {
        Self {
            model,
            schemas,
            mapper,
            filters: &[],
            group: &[],
            sorts: &[],
            projection: &[],
            page: None,
            refiner: None,
        }
    }

    pub fn with_filters(mut self, filters: &'a [FilterClause]) -> Self {
        self.filters = filters;
        self
    }

    pub fn with_group(mut self, group: &'a [ProjectionField]) -> Self {
        self.group = group;
        self
    }

    pub fn with_sorts(mut self, sorts: &'a [SortKey]) -> Self {
        self.sorts = sorts;
        self
    }

    pub fn with_projection(mut self, projection: &'a [ProjectionField]) -> Self {
        self.projection = projection;
        self
    }

    pub fn with_page(mut self, page: PageSlice) -> Self {
        self.page = Some(page);
        self
    }

    pub fn with_refiner(mut self, refiner: &'a dyn QueryRefiner) -> Self {
        self.refiner = Some(refiner);
        self
    }

    /// Build the main SELECT.
    pub fn build(&self) -> EngineResult<String> {
        let mut query = Query::select();
        query.from(Alias::new(&self.model.table));

        self.add_joins(&mut query)?;
        self.add_filters(&mut query)?;
        self.add_group(&mut query);
        self.add_sorts(&mut query);
        self.add_projection(&mut query);

        if let Some(page) = self.page {
            query.limit(page.limit);
            query.offset(page.offset);
        }
        if let Some(refiner) = self.refiner {
            refiner.refine(&mut query);
        }

        Ok(query.to_string(PostgresQueryBuilder))
    }

    /// Build the COUNT query for page-count metadata.
    ///
    /// Counts over the fully-constrained query as a subquery, ignoring
    /// limit/offset, so grouped queries count groups rather than source
    /// rows.
    pub fn build_count(&self) -> EngineResult<String> {
        let mut inner = Query::select();
        if self.group.is_empty() {
            inner.expr(Expr::val(1));
        } else {
            for field in self.group {
                match field {
                    ProjectionField::Attribute(name) => {
                        inner.column((
                            Alias::new(&self.model.table),
                            Alias::new(self.mapper.to_storage(name)),
                        ));
                    }
                    ProjectionField::Aggregate { function, argument } => {
                        inner.expr(aggregate_expr(function.as_str(), argument));
                    }
                }
            }
        }
        inner.from(Alias::new(&self.model.table));

        self.add_joins(&mut inner)?;
        self.add_filters(&mut inner)?;
        self.add_group(&mut inner);
        if let Some(refiner) = self.refiner {
            refiner.refine(&mut inner);
        }

        let mut query = Query::select();
        query.expr(Expr::col(Asterisk).count());
        query.from_subquery(inner, Alias::new("t"));

        Ok(query.to_string(PostgresQueryBuilder))
    }

    /// Add JOIN chains for every relation path referenced by a filter or
    /// sort. Paths sharing a prefix share the joins for that prefix.
    fn add_joins(&self, query: &mut SelectStatement) -> EngineResult<()> {
        let mut joined: Vec<Vec<String>> = Vec::new();
        let paths = self
            .filters
            .iter()
            .map(|clause| &clause.path)
            .chain(self.sorts.iter().map(|key| &key.path));

        for path in paths {
            if path.is_local() {
                continue;
            }
            self.join_chain(query, &path.relations, &mut joined)?;
        }
        Ok(())
    }

    fn join_chain(
        &self,
        query: &mut SelectStatement,
        relations: &[String],
        joined: &mut Vec<Vec<String>>,
    ) -> EngineResult<()> {
        let mut parent_alias = self.model.table.clone();
        let mut parent_model = self.model;

        for depth in 0..relations.len() {
            let prefix = &relations[..=depth];
            let relation = parent_model.relations.get(&relations[depth]).ok_or_else(|| {
                EngineError::UnknownRelation {
                    model: parent_model.resource.clone(),
                    relation: relations[depth].clone(),
                }
            })?;
            let target = self
                .schemas
                .get(&relation.target)
                .ok_or_else(|| EngineError::UnknownResource(relation.target.clone()))?;
            let alias = join_alias(prefix);

            if !joined.iter().any(|path| path == prefix) {
                let on_condition = Expr::col((
                    Alias::new(&parent_alias),
                    Alias::new(&relation.local_field),
                ))
                .equals((Alias::new(&alias), Alias::new(&relation.foreign_field)));

                query.join_as(
                    join_type(relation.join),
                    Alias::new(&target.table),
                    Alias::new(&alias),
                    on_condition,
                );
                joined.push(prefix.to_vec());
            }

            parent_alias = alias;
            parent_model = target;
        }
        Ok(())
    }

    /// Add WHERE conditions. Clauses AND together.
    fn add_filters(&self, query: &mut SelectStatement) -> EngineResult<()> {
        for clause in self.filters {
            let condition = self.clause_condition(clause)?;
            query.and_where(condition);
        }
        Ok(())
    }

    /// Build the condition for a single clause.
    fn clause_condition(&self, clause: &FilterClause) -> EngineResult<SimpleExpr> {
        let column = self.column(&clause.path);

        match clause.operator {
            FilterOperator::Eq => {
                let mut cond = Cond::any();
                for value in &clause.values {
                    cond = cond.add(match value {
                        ScalarValue::Null => Expr::col(column.clone()).is_null(),
                        other => Expr::col(column.clone()).eq(bind_value(other)),
                    });
                }
                Ok(cond.into())
            }
            FilterOperator::Not => {
                let mut cond = Cond::all();
                for value in &clause.values {
                    cond = cond.add(match value {
                        ScalarValue::Null => Expr::col(column.clone()).is_not_null(),
                        other => Expr::col(column.clone()).ne(bind_value(other)),
                    });
                }
                Ok(cond.into())
            }
            FilterOperator::Like => {
                let mut cond = Cond::any();
                for value in &clause.values {
                    cond = cond.add(match value {
                        ScalarValue::Null => Expr::col(column.clone()).is_null(),
                        other => Expr::col(column.clone())
                            .cast_as(Alias::new("text"))
                            .like(format!("%{}%", escape_like_wildcards(&other.as_text()))),
                    });
                }
                Ok(cond.into())
            }
            FilterOperator::Lt => self.comparison(clause, &column, |expr, value| expr.lt(value)),
            FilterOperator::Lte => self.comparison(clause, &column, |expr, value| expr.lte(value)),
            FilterOperator::Gt => self.comparison(clause, &column, |expr, value| expr.gt(value)),
            FilterOperator::Gte => self.comparison(clause, &column, |expr, value| expr.gte(value)),
        }
    }

    /// Ordering comparisons take exactly one non-null value.
    fn comparison<F>(
        &self,
        clause: &FilterClause,
        column: &(Alias, Alias),
        apply: F,
    ) -> EngineResult<SimpleExpr>
    where
        F: FnOnce(Expr, Value) -> SimpleExpr,
    {
        match clause.values.as_slice() {
            [ScalarValue::Null] => Err(ParamError::NullComparison {
                operator: clause.operator.as_str().to_string(),
                field: clause.path.to_string(),
            }
            .into()),
            [value] => Ok(apply(Expr::col(column.clone()), comparison_value(value))),
            values => Err(ParamError::MultiValueComparison {
                operator: clause.operator.as_str().to_string(),
                field: clause.path.to_string(),
                count: values.len(),
            }
            .into()),
        }
    }

    /// Add GROUP BY entries.
    fn add_group(&self, query: &mut SelectStatement) {
        for field in self.group {
            let expr: SimpleExpr = match field {
                ProjectionField::Attribute(name) => Expr::col((
                    Alias::new(&self.model.table),
                    Alias::new(self.mapper.to_storage(name)),
                ))
                .into(),
                ProjectionField::Aggregate { function, argument } => {
                    aggregate_expr(function.as_str(), argument)
                }
            };
            query.add_group_by([expr]);
        }
    }

    /// Add ORDER BY keys. Ascending places NULLs first, descending last,
    /// so flipping direction exactly reverses the order.
    fn add_sorts(&self, query: &mut SelectStatement) {
        for key in self.sorts {
            let (order, nulls) = match key.direction {
                SortDirection::Asc => (Order::Asc, NullOrdering::First),
                SortDirection::Desc => (Order::Desc, NullOrdering::Last),
            };
            query.order_by_with_nulls(self.column(&key.path), order, nulls);
        }
    }

    /// Add SELECT columns.
    fn add_projection(&self, query: &mut SelectStatement) {
        if self.projection.is_empty() {
            query.column((Alias::new(&self.model.table), Asterisk));
            return;
        }
        for field in self.projection {
            match field {
                ProjectionField::Attribute(name) => {
                    query.column((
                        Alias::new(&self.model.table),
                        Alias::new(self.mapper.to_storage(name)),
                    ));
                }
                ProjectionField::Aggregate { function, argument } => {
                    query.expr_as(
                        aggregate_expr(function.as_str(), argument),
                        Alias::new(function.as_str()),
                    );
                }
            }
        }
    }

    /// Column reference for a field path: base table for local fields,
    /// join alias for relation-qualified ones. The attribute name goes
    /// through the mapper; relation names are used as-is.
    fn column(&self, path: &FieldPath) -> (Alias, Alias) {
        let table = if path.is_local() {
            self.model.table.clone()
        } else {
            join_alias(&path.relations)
        };
        (
            Alias::new(table),
            Alias::new(self.mapper.to_storage(&path.attribute)),
        )
    }
}

/// Alias for a joined relation path.
pub(crate) fn join_alias(prefix: &[String]) -> String {
    prefix.join("__")
}

fn join_type(kind: JoinKind) -> sea_query::JoinType {
    match kind {
        JoinKind::Inner => sea_query::JoinType::InnerJoin,
        JoinKind::Left => sea_query::JoinType::LeftJoin,
        JoinKind::Right => sea_query::JoinType::RightJoin,
    }
}

/// Aggregate references pass through verbatim.
pub(crate) fn aggregate_expr(function: &str, argument: &str) -> SimpleExpr {
    Expr::cust(format!("{function}({argument})"))
}

fn bind_value(value: &ScalarValue) -> Value {
    match value {
        ScalarValue::Null => Value::String(None),
        ScalarValue::Text(s) => s.clone().into(),
        ScalarValue::Int(i) => (*i).into(),
        ScalarValue::Float(f) => (*f).into(),
    }
}

/// Comparison values bind numerically when the token parses as a number.
fn comparison_value(value: &ScalarValue) -> Value {
    match value {
        ScalarValue::Int(i) => (*i).into(),
        ScalarValue::Float(f) => (*f).into(),
        ScalarValue::Text(s) => {
            if let Ok(i) = s.parse::<i64>() {
                i.into()
            } else if let Ok(f) = s.parse::<f64>() {
                f.into()
            } else {
                s.clone().into()
            }
        }
        ScalarValue::Null => Value::String(None),
    }
}

/// Escape SQL LIKE wildcard characters (`%`, `_`, `\`) in a value.
fn escape_like_wildcards(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compile::{fields, filter, sort};
    use crate::schema::{IdentityMapper, RelationDef};
    use serde_json::json;

    // Fixture mirrors `vaglio-test-utils`; defined locally because that crate
    // depends on this one, and importing it into the in-crate unit tests would
    // link a second copy of `vaglio-engine` whose types do not unify with the
    // crate under test.
    fn person_registry() -> SchemaRegistry {
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

    fn filter_clauses(value: serde_json::Value) -> Vec<FilterClause> {
        let map = match value {
            serde_json::Value::Object(map) => map,
            _ => serde_json::Map::new(),
        };
        filter::compile(&map).unwrap()
    }

    fn build_sql(
        clauses: &[FilterClause],
        sorts: &[SortKey],
        projection: &[ProjectionField],
        group: &[ProjectionField],
    ) -> String {
        let registry = person_registry();
        let model = registry.get("person").unwrap();
        QueryBuilder::new(model, &registry, &IdentityMapper)
            .with_filters(clauses)
            .with_sorts(sorts)
            .with_projection(projection)
            .with_group(group)
            .build()
            .unwrap()
    }

    #[test]
    fn multi_value_eq_ors_and_clauses_and() {
        let clauses = filter_clauses(json!({"name": "Rex,Fido", "gender": "m"}));
        let sql = build_sql(&clauses, &[], &[], &[]);

        assert!(
            sql.contains(r#""person"."name" = 'Rex' OR "person"."name" = 'Fido'"#),
            "same-field values should OR: {sql}"
        );
        assert!(
            sql.contains("AND"),
            "cross-field clauses should AND: {sql}"
        );
    }

    #[test]
    fn eq_null_sentinel_is_null_predicate() {
        let clauses = filter_clauses(json!({"name": "null"}));
        let sql = build_sql(&clauses, &[], &[], &[]);

        assert!(sql.contains(r#""person"."name" IS NULL"#), "{sql}");
    }

    #[test]
    fn not_ands_per_value_negations() {
        let clauses = filter_clauses(json!({"not": {"name": "Rex,null"}}));
        let sql = build_sql(&clauses, &[], &[], &[]);

        assert!(
            sql.contains(r#""person"."name" <> 'Rex' AND "person"."name" IS NOT NULL"#),
            "negations should AND so a row matches none of the values: {sql}"
        );
    }

    #[test]
    fn like_casts_to_text_and_wraps_wildcards() {
        let clauses = filter_clauses(json!({"like": {"age": "2"}}));
        let sql = build_sql(&clauses, &[], &[], &[]);

        assert!(sql.contains("CAST("), "like should cast to text: {sql}");
        assert!(sql.contains("%2%"), "like should wrap both sides: {sql}");
    }

    #[test]
    fn like_escapes_wildcard_characters() {
        let clauses = filter_clauses(json!({"like": {"name": "100%_done"}}));
        let sql = build_sql(&clauses, &[], &[], &[]);

        assert!(
            !sql.contains("%100%_done%"),
            "raw wildcard chars should not appear unescaped: {sql}"
        );
    }

    #[test]
    fn comparison_binds_numeric_tokens_as_numbers() {
        let clauses = filter_clauses(json!({"gt": {"age": "21"}}));
        let sql = build_sql(&clauses, &[], &[], &[]);

        assert!(
            sql.contains(r#""person"."age" > 21"#),
            "numeric token should bind unquoted: {sql}"
        );
    }

    #[test]
    fn comparison_keeps_text_tokens_as_text() {
        let clauses = filter_clauses(json!({"lte": {"name": "m"}}));
        let sql = build_sql(&clauses, &[], &[], &[]);

        assert!(sql.contains(r#""person"."name" <= 'm'"#), "{sql}");
    }

    #[test]
    fn relation_path_adds_join_once() {
        let clauses = filter_clauses(json!({"pets.name": "Rex", "gt": {"pets.age": 2}}));
        let sql = build_sql(&clauses, &[], &[], &[]);

        assert_eq!(
            sql.matches("INNER JOIN \"animal\"").count(),
            1,
            "clauses on the same relation path should share one join: {sql}"
        );
        assert!(sql.contains(r#""pets"."name" = 'Rex'"#), "{sql}");
    }

    #[test]
    fn nested_relation_path_chains_joins() {
        let clauses = filter_clauses(json!({"pets.toy.type": "ball"}));
        let sql = build_sql(&clauses, &[], &[], &[]);

        assert!(sql.contains("INNER JOIN \"animal\" AS \"pets\""), "{sql}");
        assert!(sql.contains("INNER JOIN \"toy\" AS \"pets__toy\""), "{sql}");
        assert!(sql.contains(r#""pets__toy"."type" = 'ball'"#), "{sql}");
    }

    #[test]
    fn unknown_relation_reported() {
        let clauses = filter_clauses(json!({"movies.name": "Jaws"}));
        let registry = person_registry();
        let model = registry.get("person").unwrap();
        let err = QueryBuilder::new(model, &registry, &IdentityMapper)
            .with_filters(&clauses)
            .build()
            .unwrap_err();

        assert!(matches!(err, EngineError::UnknownRelation { .. }));
    }

    #[test]
    fn sort_direction_and_null_placement() {
        let sorts = sort::compile(&["type".to_string()]);
        let sql = build_sql(&[], &sorts, &[], &[]);
        assert!(sql.contains("ASC NULLS FIRST"), "{sql}");

        let sorts = sort::compile(&["-type".to_string()]);
        let sql = build_sql(&[], &sorts, &[], &[]);
        assert!(sql.contains("DESC NULLS LAST"), "{sql}");
    }

    #[test]
    fn sort_keys_keep_input_precedence() {
        let sorts = sort::compile(&["gender".to_string(), "-age".to_string()]);
        let sql = build_sql(&[], &sorts, &[], &[]);

        let gender_pos = sql.find(r#""person"."gender" ASC"#).unwrap();
        let age_pos = sql.find(r#""person"."age" DESC"#).unwrap();
        assert!(gender_pos < age_pos, "input order is precedence order: {sql}");
    }

    #[test]
    fn relation_sort_joins_and_orders() {
        let sorts = sort::compile(&["-pets.name".to_string()]);
        let sql = build_sql(&[], &sorts, &[], &[]);

        assert!(sql.contains("INNER JOIN \"animal\" AS \"pets\""), "{sql}");
        assert!(sql.contains(r#""pets"."name" DESC"#), "{sql}");
    }

    #[test]
    fn aggregate_projection_with_group() {
        let projection = vec![
            fields::parse_field("avg(age)"),
            fields::parse_field("gender"),
        ];
        let group = fields::compile_group(&["gender".to_string()]);
        let sql = build_sql(&[], &[], &projection, &group);

        assert!(sql.contains(r#"avg(age) AS "avg""#), "{sql}");
        assert!(sql.contains(r#""person"."gender""#), "{sql}");
        assert!(sql.contains(r#"GROUP BY "person"."gender""#), "{sql}");
    }

    #[test]
    fn empty_projection_selects_all() {
        let sql = build_sql(&[], &[], &[], &[]);
        assert!(sql.contains(r#""person".*"#), "{sql}");
    }

    #[test]
    fn page_applies_limit_offset() {
        let registry = person_registry();
        let model = registry.get("person").unwrap();
        let sql = QueryBuilder::new(model, &registry, &IdentityMapper)
            .with_page(PageSlice {
                limit: 10,
                offset: 20,
            })
            .build()
            .unwrap();

        assert!(sql.contains("LIMIT 10"), "{sql}");
        assert!(sql.contains("OFFSET 20"), "{sql}");
    }

    #[test]
    fn count_query_ignores_limit_offset() {
        let clauses = filter_clauses(json!({"gender": "m"}));
        let registry = person_registry();
        let model = registry.get("person").unwrap();
        let builder = QueryBuilder::new(model, &registry, &IdentityMapper)
            .with_filters(&clauses)
            .with_page(PageSlice {
                limit: 1,
                offset: 0,
            });
        let sql = builder.build_count().unwrap();

        assert!(sql.contains("COUNT(*)"), "{sql}");
        assert!(sql.contains(r#""person"."gender" = 'm'"#), "{sql}");
        assert!(!sql.contains("LIMIT"), "count must ignore paging: {sql}");
    }

    #[test]
    fn count_query_counts_groups() {
        let group = fields::compile_group(&["gender".to_string()]);
        let registry = person_registry();
        let model = registry.get("person").unwrap();
        let sql = QueryBuilder::new(model, &registry, &IdentityMapper)
            .with_group(&group)
            .build_count()
            .unwrap();

        assert!(sql.contains(r#"GROUP BY "person"."gender""#), "{sql}");
        assert!(sql.contains("FROM ("), "count should wrap a subquery: {sql}");
    }

    #[test]
    fn refiner_runs_last() {
        let registry = person_registry();
        let model = registry.get("person").unwrap();
        let refiner = |query: &mut SelectStatement| {
            query.and_where(Expr::col(Alias::new("status")).eq(1));
        };
        let sql = QueryBuilder::new(model, &registry, &IdentityMapper)
            .with_refiner(&refiner)
            .build()
            .unwrap();

        assert!(sql.contains(r#""status" = 1"#), "{sql}");
    }

    #[test]
    fn mapper_transforms_plain_fields_not_aggregates() {
        use crate::schema::SnakeCaseMapper;

        let clauses = filter_clauses(json!({"firstName": "Ada"}));
        let projection = vec![
            fields::parse_field("avg(birthYear)"),
            fields::parse_field("firstName"),
        ];
        let registry = person_registry();
        let model = registry.get("person").unwrap();
        let sql = QueryBuilder::new(model, &registry, &SnakeCaseMapper)
            .with_filters(&clauses)
            .with_projection(&projection)
            .build()
            .unwrap();

        assert!(sql.contains(r#""person"."first_name" = 'Ada'"#), "{sql}");
        assert!(sql.contains(r#""person"."first_name""#), "{sql}");
        assert!(
            sql.contains(r#"avg(birthYear) AS "avg""#),
            "aggregates bypass the mapper: {sql}"
        );
    }
}
