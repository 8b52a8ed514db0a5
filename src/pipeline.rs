//! End-to-end run: inspect, extract, resolve, plan.
//!
//! ```text
//! MetadataSource ──► SchemaBuilder ──► Schema ──► join::classify
//!                                        │
//! RowSource ──────► EntityExtractor ◄────┘
//!                        │
//!                        ▼
//!                 ReferenceResolver ──► FixturePlan::build (sort + inclusion)
//! ```

use thiserror::Error;

use crate::config::{Driver, Settings, SettingsError};
use crate::entity::{EntityExtractor, ExtractError, ReferenceResolver, ResolveError};
use crate::metadata::{MetadataSource, RowSource, SourceError, SqliteSource};
use crate::plan::{FixturePlan, InclusionDecider, PlanError, TableRules};
use crate::schema::{join, JoinSimplifications, Schema, SchemaBuilder, SchemaError, TableId};
use crate::strategy::{
    InflectorNaming, LiteralRenderer, NamingStrategy, SqlTypeMapper, Strategies, TypeMapper,
    ValueRenderer,
};

/// Any error a run can end with.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Settings(#[from] SettingsError),

    #[error(transparent)]
    Source(#[from] SourceError),

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Extract(#[from] ExtractError),

    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error(transparent)]
    Plan(#[from] PlanError),

    #[error("table not found in schema {schema}: {table}")]
    UnknownTable { schema: String, table: String },
}

pub type PipelineResult<T> = Result<T, PipelineError>;

/// A configured run with its strategies.
pub struct Pipeline {
    settings: Settings,
    naming: Box<dyn NamingStrategy>,
    types: Box<dyn TypeMapper>,
    values: Box<dyn ValueRenderer>,
}

impl Pipeline {
    /// A pipeline with the default strategies.
    pub fn new(settings: Settings) -> Self {
        let naming = InflectorNaming::new(settings.naming.singularize_entities);
        Self {
            settings,
            naming: Box::new(naming),
            types: Box::new(SqlTypeMapper),
            values: Box::new(LiteralRenderer),
        }
    }

    pub fn with_naming(mut self, naming: impl NamingStrategy + 'static) -> Self {
        self.naming = Box::new(naming);
        self
    }

    pub fn with_types(mut self, types: impl TypeMapper + 'static) -> Self {
        self.types = Box::new(types);
        self
    }

    pub fn with_values(mut self, values: impl ValueRenderer + 'static) -> Self {
        self.values = Box::new(values);
        self
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    fn strategies(&self) -> Strategies<'_> {
        Strategies::new(self.naming.as_ref(), self.types.as_ref(), self.values.as_ref())
    }

    /// Build the schema graph and classify join tables.
    pub fn inspect<S>(&self, source: &S) -> PipelineResult<(Schema, JoinSimplifications)>
    where
        S: MetadataSource + ?Sized,
    {
        let schema = SchemaBuilder::new(source)
            .exclude(self.settings.extract.exclude_patterns()?)
            .build(&self.settings.connection.schema)?;
        let joins = join::classify(&schema, self.naming.as_ref());
        Ok((schema, joins))
    }

    /// Tables to extract: the configured list, or every table in dependency order.
    pub fn extraction_order(&self, schema: &Schema) -> PipelineResult<Vec<TableId>> {
        if self.settings.extract.tables.is_empty() {
            return Ok(schema.creation_order());
        }
        self.settings
            .extract
            .tables
            .iter()
            .map(|name| self.find_table(schema, name))
            .collect()
    }

    /// The inclusion decider described by `[inclusion]`.
    pub fn table_rules(&self, schema: &Schema) -> PipelineResult<TableRules> {
        let inclusion = &self.settings.inclusion;
        let mut rules = TableRules::new(inclusion.default);
        for (name, decision) in inclusion.rules() {
            rules = rules.with(self.find_table(schema, name)?, decision);
        }
        Ok(rules)
    }

    /// Run every stage with an explicit inclusion decider.
    pub fn run<S>(&self, source: &S, decider: &dyn InclusionDecider) -> PipelineResult<FixturePlan>
    where
        S: MetadataSource + RowSource,
    {
        let (schema, joins) = self.inspect(source)?;
        self.plan(source, schema, joins, decider)
    }

    /// Run every stage with the decider built from `[inclusion]`.
    pub fn run_configured<S>(&self, source: &S) -> PipelineResult<FixturePlan>
    where
        S: MetadataSource + RowSource,
    {
        let (schema, joins) = self.inspect(source)?;
        let rules = self.table_rules(&schema)?;
        self.plan(source, schema, joins, &rules)
    }

    fn plan(
        &self,
        rows: &dyn RowSource,
        schema: Schema,
        joins: JoinSimplifications,
        decider: &dyn InclusionDecider,
    ) -> PipelineResult<FixturePlan> {
        let order = self.extraction_order(&schema)?;

        let mut entities = EntityExtractor::new(&schema, rows, self.strategies())
            .fetch_size(self.settings.extract.fetch_size)
            .extract(&order)?;
        ReferenceResolver::new(&schema)
            .policy(self.settings.resolve.unresolved_required)
            .resolve(&mut entities)?;

        let plan = FixturePlan::build(schema, joins, entities, decider)?;
        log::info!("planned {} entities", plan.order.len());
        Ok(plan)
    }

    fn find_table(&self, schema: &Schema, name: &str) -> PipelineResult<TableId> {
        schema
            .find_table_by_name(name)
            .ok_or_else(|| PipelineError::UnknownTable {
                schema: schema.name.clone(),
                table: name.to_string(),
            })
    }
}

/// Open the database described by `[connection]`.
pub fn connect(settings: &Settings) -> PipelineResult<SqliteSource> {
    let driver = settings.connection.driver_type()?;
    let path = settings.connection.resolved_path()?;
    log::debug!("opening {} database {}", driver.as_str(), path);
    match driver {
        Driver::Sqlite => Ok(SqliteSource::open(path)?),
    }
}
