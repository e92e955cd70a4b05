//! Deployment orchestrator and the public facade of the engine

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::{BlueprintDeployContext, DependencyGraph};
use crate::config::EngineConfig;
use crate::discovery::DependencyDiscovererRegistry;
use crate::error::{BlueprintError, Result};
use crate::functions::FunctionExecutorRegistry;
use crate::node::{NodeId, NodeKind, NodeTree, NodeType};
use crate::parser::BlueprintParser;
use crate::resources::{ResourceManagerRegistry, ResourceMatcher};
use crate::store::BlueprintStore;
use crate::template::{ResourceLoader, TemplateContext};
use crate::types::{dedup_bindings, BindResource, BlueprintRecord};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeploymentStage {
    Parse,
    Discover,
    TopoSort,
    Execute,
    Deployed,
    Failed,
}

impl fmt::Display for DeploymentStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DeploymentStage::Parse => "PARSE",
            DeploymentStage::Discover => "DISCOVER",
            DeploymentStage::TopoSort => "TOPO_SORT",
            DeploymentStage::Execute => "EXECUTE",
            DeploymentStage::Deployed => "DEPLOYED",
            DeploymentStage::Failed => "FAILED",
        };
        f.write_str(name)
    }
}

/// Outcome of a successful deploy or redeploy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentReport {
    pub blueprint_id: String,
    /// Every binding now persisted for the blueprint
    pub bindings: Vec<BindResource>,
    /// Keys bound for the first time
    pub created: Vec<String>,
    /// Keys present before and after
    pub retained: Vec<String>,
    /// Orphaned managed keys that were deleted
    pub deleted: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlannedStep {
    pub path: String,
    pub node_type: NodeType,
    pub kind: String,
    pub depends_on: Vec<String>,
}

/// Evaluation order computed without running any executor or manager
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentPlan {
    pub node_count: usize,
    pub steps: Vec<PlannedStep>,
}

/// Facade over parsing, discovery, evaluation and reconciliation.
/// Registries are fixed once the engine is built.
pub struct BlueprintEngine {
    config: EngineConfig,
    parser: BlueprintParser,
    discoverers: DependencyDiscovererRegistry,
    functions: FunctionExecutorRegistry,
    resources: ResourceManagerRegistry,
    store: Arc<dyn BlueprintStore>,
}

impl BlueprintEngine {
    pub fn new(
        config: EngineConfig,
        resources: ResourceManagerRegistry,
        store: Arc<dyn BlueprintStore>,
    ) -> Self {
        let parser = BlueprintParser::new(&config);
        Self {
            config,
            parser,
            discoverers: DependencyDiscovererRegistry::with_default_discoverers(),
            functions: FunctionExecutorRegistry::with_builtin_functions(),
            resources,
            store,
        }
    }

    pub fn with_functions(mut self, functions: FunctionExecutorRegistry) -> Self {
        self.functions = functions;
        self
    }

    pub fn with_discoverers(mut self, discoverers: DependencyDiscovererRegistry) -> Self {
        self.discoverers = discoverers;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Deploy a blueprint under a fresh id
    pub fn deploy_blueprint(
        &self,
        loader: &dyn ResourceLoader,
        variables: Value,
    ) -> Result<DeploymentReport> {
        let blueprint_id = Uuid::new_v4().to_string();
        self.run_deployment(&blueprint_id, loader, variables, None)
    }

    /// Redeploy a known blueprint and reconcile its bindings
    pub fn update_blueprint(
        &self,
        blueprint_id: &str,
        loader: &dyn ResourceLoader,
        variables: Value,
    ) -> Result<DeploymentReport> {
        let previous = self.load_record(blueprint_id)?;
        self.run_deployment(blueprint_id, loader, variables, Some(previous))
    }

    /// Delete every managed resource of a blueprint, then drop its record.
    /// Returns the bindings that were deleted.
    pub fn remove_blueprint(&self, blueprint_id: &str) -> Result<Vec<BindResource>> {
        let record = self.load_record(blueprint_id)?;
        info!(
            "Removing blueprint {} ({} bindings)",
            blueprint_id,
            record.bindings.len()
        );

        let mut deleted = Vec::new();
        for bind in record.bindings.iter().rev() {
            if !bind.managed {
                debug!("Leaving unmanaged resource {}", bind.key());
                continue;
            }
            if self
                .resources
                .delete_resource(bind, &ResourceMatcher::exact(bind))?
            {
                info!("Deleted resource {}", bind.key());
            } else {
                warn!("Resource {} was already gone", bind.key());
            }
            deleted.push(bind.clone());
        }

        self.store.delete(blueprint_id)?;
        info!("Blueprint {} removed", blueprint_id);
        Ok(deleted)
    }

    /// Rendered variables schema of a blueprint package, if it has one
    pub fn get_variable_json_schema(&self, loader: &dyn ResourceLoader) -> Result<Option<Value>> {
        let context = self.base_context(loader, "", &self.config.tenant_id)?;
        self.render_schema(loader, &context)
    }

    /// Validate `variables` against the package's schema. No schema accepts anything.
    pub fn validate_variables(&self, loader: &dyn ResourceLoader, variables: &Value) -> Result<()> {
        let context = self.base_context(loader, "", &self.config.tenant_id)?;
        match self.render_schema(loader, &context)? {
            Some(schema) => validate_against(&schema, variables),
            None => Ok(()),
        }
    }

    /// Rendered index template, before it is parsed into nodes
    pub fn render_index(&self, loader: &dyn ResourceLoader, variables: Value) -> Result<Value> {
        let context = self.prepare_context(loader, "", &self.config.tenant_id, variables)?;
        let index = self.config.files.index.as_str();
        self.parser
            .renderer()
            .render(loader, index, &context)?
            .ok_or_else(|| BlueprintError::TemplateNotFound {
                path: index.to_string(),
            })
    }

    /// Parse, discover and sort without executing anything
    pub fn plan(&self, loader: &dyn ResourceLoader, variables: Value) -> Result<DeploymentPlan> {
        let blueprint_id = "";
        let context =
            self.prepare_context(loader, blueprint_id, &self.config.tenant_id, variables)?;
        let tree = self.parser.parse_blueprint(loader, context.clone())?;

        let deploy_ctx = BlueprintDeployContext {
            blueprint_id,
            tenant_id: &self.config.tenant_id,
            variables: &context.variables,
            template_context: &context,
        };
        let graph = DependencyGraph::build(&tree, &self.discoverers, &deploy_ctx)?;
        let order = graph.topological_order(&tree)?;

        let steps = order
            .into_iter()
            .map(|id| PlannedStep {
                path: tree.path(id),
                node_type: tree.get(id).node_type(),
                kind: executable_kind(&tree, id),
                depends_on: graph
                    .dependencies(id)
                    .into_iter()
                    .map(|dependency| tree.path(dependency))
                    .collect(),
            })
            .collect();
        Ok(DeploymentPlan {
            node_count: tree.len(),
            steps,
        })
    }

    fn load_record(&self, blueprint_id: &str) -> Result<BlueprintRecord> {
        self.store
            .load(blueprint_id)?
            .ok_or_else(|| BlueprintError::BlueprintNotFound {
                blueprint_id: blueprint_id.to_string(),
            })
    }

    fn run_deployment(
        &self,
        blueprint_id: &str,
        loader: &dyn ResourceLoader,
        variables: Value,
        previous: Option<BlueprintRecord>,
    ) -> Result<DeploymentReport> {
        let mut stage = DeploymentStage::Parse;
        match self.deploy_stages(blueprint_id, loader, variables, previous, &mut stage) {
            Ok(report) => {
                info!(
                    "Blueprint {} {}: {} created, {} retained, {} deleted",
                    blueprint_id,
                    DeploymentStage::Deployed,
                    report.created.len(),
                    report.retained.len(),
                    report.deleted.len()
                );
                Ok(report)
            }
            Err(e) => {
                warn!(
                    "Blueprint {} {} during {}: [{}] {}",
                    blueprint_id,
                    DeploymentStage::Failed,
                    stage,
                    e.code(),
                    e
                );
                Err(e)
            }
        }
    }

    fn deploy_stages(
        &self,
        blueprint_id: &str,
        loader: &dyn ResourceLoader,
        variables: Value,
        previous: Option<BlueprintRecord>,
        stage: &mut DeploymentStage,
    ) -> Result<DeploymentReport> {
        info!("Deploying blueprint {}", blueprint_id);
        let tenant_id = previous
            .as_ref()
            .map(|record| record.tenant_id.clone())
            .unwrap_or_else(|| self.config.tenant_id.clone());

        let context = self.prepare_context(loader, blueprint_id, &tenant_id, variables)?;
        let mut tree = self.parser.parse_blueprint(loader, context.clone())?;

        let deploy_ctx = BlueprintDeployContext {
            blueprint_id,
            tenant_id: &tenant_id,
            variables: &context.variables,
            template_context: &context,
        };

        *stage = DeploymentStage::Discover;
        let graph = DependencyGraph::build(&tree, &self.discoverers, &deploy_ctx)?;

        *stage = DeploymentStage::TopoSort;
        let order = graph.topological_order(&tree)?;

        *stage = DeploymentStage::Execute;
        let bindings = self.execute(&mut tree, &order, &deploy_ctx)?;

        let previous_bindings = previous.map(|record| record.bindings).unwrap_or_default();
        let deleted = self.delete_orphans(&previous_bindings, &bindings)?;

        let previous_keys: HashSet<String> =
            previous_bindings.iter().map(BindResource::key).collect();
        let (retained, created): (Vec<String>, Vec<String>) = bindings
            .iter()
            .map(BindResource::key)
            .partition(|key| previous_keys.contains(key));

        self.store.save(&BlueprintRecord {
            blueprint_id: blueprint_id.to_string(),
            tenant_id,
            chart: tree.chart(tree.root()),
            bindings: bindings.clone(),
            updated_at: Utc::now(),
        })?;
        *stage = DeploymentStage::Deployed;

        for key in &created {
            debug!("Bound {}", key);
        }
        for key in &retained {
            debug!("Kept {}", key);
        }
        Ok(DeploymentReport {
            blueprint_id: blueprint_id.to_string(),
            bindings,
            created,
            retained,
            deleted,
        })
    }

    /// Evaluate executables in order and collect the deduplicated bindings
    fn execute(
        &self,
        tree: &mut NodeTree,
        order: &[NodeId],
        ctx: &BlueprintDeployContext<'_>,
    ) -> Result<Vec<BindResource>> {
        let mut bindings = Vec::new();
        for id in order {
            match tree.get(*id).node_type() {
                NodeType::Function => self.functions.execute(tree, *id, ctx)?,
                NodeType::Resource => bindings.extend(self.resources.deploy(tree, *id, ctx)?),
                _ => {}
            }
        }
        Ok(dedup_bindings(bindings))
    }

    /// Delete previously managed bindings that the new set no longer holds,
    /// newest first
    fn delete_orphans(
        &self,
        previous: &[BindResource],
        current: &[BindResource],
    ) -> Result<Vec<String>> {
        let matcher = ResourceMatcher::absent_from(current);
        let mut deleted = Vec::new();
        for bind in previous.iter().rev() {
            if !matcher.matches(bind) {
                continue;
            }
            info!("Deleting orphaned resource {}", bind.key());
            self.resources.delete_resource(bind, &matcher)?;
            deleted.push(bind.key());
        }
        Ok(deleted)
    }

    /// System values, rendered constants and locale messages
    fn base_context(
        &self,
        loader: &dyn ResourceLoader,
        blueprint_id: &str,
        tenant_id: &str,
    ) -> Result<TemplateContext> {
        let renderer = self.parser.renderer();
        let mut context =
            TemplateContext::new(TemplateContext::system_values(blueprint_id, tenant_id));

        if let Some(constants) = renderer.render(loader, &self.config.files.constants, &context)? {
            context.constants = object_or_empty(constants);
        }
        if let Some(locale) = &self.config.locale {
            let path = format!("{}/{}.yaml", self.config.files.i18n_dir, locale);
            match renderer.render(loader, &path, &context)? {
                Some(messages) => context.i18n = object_or_empty(messages),
                None => debug!("No messages for locale {}", locale),
            }
        }
        Ok(context)
    }

    fn render_schema(
        &self,
        loader: &dyn ResourceLoader,
        context: &TemplateContext,
    ) -> Result<Option<Value>> {
        Ok(self
            .parser
            .renderer()
            .render(loader, &self.config.files.variables, context)?)
    }

    /// Full context for the index template, with `variables` validated
    fn prepare_context(
        &self,
        loader: &dyn ResourceLoader,
        blueprint_id: &str,
        tenant_id: &str,
        variables: Value,
    ) -> Result<TemplateContext> {
        let mut context = self.base_context(loader, blueprint_id, tenant_id)?;
        let variables = object_or_empty(variables);
        if let Some(schema) = self.render_schema(loader, &context)? {
            validate_against(&schema, &variables)?;
        }
        context.variables = variables;
        Ok(context)
    }
}

fn object_or_empty(value: Value) -> Value {
    if value.is_null() {
        json!({})
    } else {
        value
    }
}

fn executable_kind(tree: &NodeTree, id: NodeId) -> String {
    match tree.kind(id) {
        NodeKind::Function(function) => function.kind.clone(),
        NodeKind::Resource(resource) => resource.kind.clone(),
        other => other.node_type().to_string(),
    }
}

fn validate_against(schema: &Value, variables: &Value) -> Result<()> {
    let validator = jsonschema::validator_for(schema).map_err(|e| {
        BlueprintError::VariablesValidation {
            errors: vec![format!("invalid variables schema: {e}")],
        }
    })?;

    let errors: Vec<String> = validator
        .iter_errors(variables)
        .map(|e| format!("{}: {}", e.instance_path, e))
        .collect();
    if errors.is_empty() {
        Ok(())
    } else {
        Err(BlueprintError::VariablesValidation { errors })
    }
}
