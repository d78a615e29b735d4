mod graphs;
mod proper_nouns;
mod sql;

use std::sync::Arc;

use ai::ChatModel;
use chart::{ChartKind, ChartRenderer};
use config::AgentConfig;
use db::Database;
use nouns::ProperNounResolver;

use crate::registry::{ToolError, ToolRegistry};

/// Shared handles the built-in tools run against.
#[derive(Clone)]
pub struct Toolbox {
    pub database: Arc<dyn Database>,
    pub resolver: Arc<ProperNounResolver>,
    pub charts: Arc<ChartRenderer>,
    pub model: Arc<dyn ChatModel>,
    pub dialect: String,
    pub top_k: usize,
}

impl std::fmt::Debug for Toolbox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Toolbox")
            .field("dialect", &self.dialect)
            .field("model", &self.model.name())
            .field("resolver", &self.resolver)
            .field("charts", &self.charts)
            .field("top_k", &self.top_k)
            .finish_non_exhaustive()
    }
}

impl Toolbox {
    pub fn new(
        database: Arc<dyn Database>,
        resolver: Arc<ProperNounResolver>,
        charts: Arc<ChartRenderer>,
        model: Arc<dyn ChatModel>,
        config: &AgentConfig,
    ) -> Self {
        Self {
            database,
            resolver,
            charts,
            model,
            dialect: config.dialect.clone(),
            top_k: config.top_k,
        }
    }
}

/// Registers the SQL toolkit, the proper-noun lookup and the three chart tools.
pub fn standard_registry(toolbox: Toolbox) -> Result<ToolRegistry, ToolError> {
    let mut registry = ToolRegistry::new();

    registry.register(
        sql::query_spec(),
        sql::QueryTool {
            database: Arc::clone(&toolbox.database),
        },
    )?;
    registry.register(
        sql::schema_spec(),
        sql::SchemaTool {
            database: Arc::clone(&toolbox.database),
        },
    )?;
    registry.register(
        sql::list_tables_spec(),
        sql::ListTablesTool {
            database: Arc::clone(&toolbox.database),
        },
    )?;
    registry.register(
        sql::query_checker_spec(),
        sql::QueryCheckerTool {
            model: toolbox.model,
            dialect: toolbox.dialect,
        },
    )?;
    registry.register(
        proper_nouns::search_spec(),
        proper_nouns::SearchProperNouns {
            resolver: toolbox.resolver,
            top_k: toolbox.top_k,
        },
    )?;

    for kind in [ChartKind::Bar, ChartKind::Line, ChartKind::Pie] {
        registry.register(
            graphs::graph_spec(kind),
            graphs::DrawGraph {
                renderer: Arc::clone(&toolbox.charts),
                kind,
            },
        )?;
    }

    Ok(registry)
}
