use blueprint_deploy::config::EngineConfig;
use blueprint_deploy::deploy::BlueprintDeployContext;
use blueprint_deploy::functions::{
    FunctionCall, FunctionError, FunctionExecutor, FunctionExecutorRegistry,
};
use blueprint_deploy::resources::{InMemoryResourceService, ResourceManagerRegistry};
use blueprint_deploy::store::InMemoryBlueprintStore;
use blueprint_deploy::template::InMemoryResourceLoader;
use blueprint_deploy::BlueprintEngine;
use serde_json::{json, Value};
use std::sync::Arc;

/// `repeat(text, times)`
struct RepeatFunction;

impl FunctionExecutor for RepeatFunction {
    fn kind(&self) -> &'static str {
        "repeat"
    }

    fn execute(
        &self,
        call: &FunctionCall<'_>,
        _ctx: &BlueprintDeployContext<'_>,
    ) -> Result<Option<Value>, FunctionError> {
        let text: String = call.required(0)?;
        let times: i64 = call.required(1)?;
        let times = usize::try_from(times).map_err(|_| FunctionError::Failed {
            reason: format!("cannot repeat {times} times"),
        })?;
        Ok(Some(Value::String(text.repeat(times))))
    }
}

fn engine(service: Arc<InMemoryResourceService>) -> BlueprintEngine {
    let mut functions = FunctionExecutorRegistry::with_builtin_functions();
    functions.register(Box::new(RepeatFunction));
    BlueprintEngine::new(
        EngineConfig::default(),
        ResourceManagerRegistry::with_service(service, &["device"]),
        Arc::new(InMemoryBlueprintStore::new()),
    )
    .with_functions(functions)
}

fn device_with(name_markup: &str) -> InMemoryResourceLoader {
    let index = format!("device:\n  \"@res\": device\n  \"@props\":\n    name:\n{name_markup}");
    InMemoryResourceLoader::new().with_file("index.yaml", index)
}

#[test]
fn test_function_results_reach_resource_props() {
    let service = Arc::new(InMemoryResourceService::new());
    let loader = device_with(
        "      \"@fn\": concat\n      \"@params\":\n        - \"@fn\": repeat\n          \"@params\": [ab, 2]\n        - \"-\"\n        - \"@fn\": base64\n          \"@params\": [hello]\n",
    );

    let report = engine(service.clone())
        .deploy_blueprint(&loader, json!({}))
        .unwrap();
    let device = service.get("device", &report.bindings[0].id).unwrap();
    assert_eq!(device.props, json!({"name": "abab-aGVsbG8="}));
}

#[test]
fn test_type_mismatch_names_expected_type() {
    let service = Arc::new(InMemoryResourceService::new());
    let loader = device_with("      \"@fn\": repeat\n      \"@params\": [ab, twice]\n");

    let err = engine(service.clone())
        .deploy_blueprint(&loader, json!({}))
        .unwrap_err();
    assert_eq!(err.code(), "BLUEPRINT_FUNCTION_EXECUTION_FAILED");
    assert!(err.to_string().contains("long"));
    assert!(err.to_string().contains("$.device.props.name"));
    assert!(service.is_empty());
}

#[test]
fn test_parameters_are_converted_to_requested_type() {
    let service = Arc::new(InMemoryResourceService::new());
    let loader = device_with(
        "      \"@fn\": concat\n      \"@params\":\n        - \"@fn\": repeat\n          \"@params\": [ab, \"3\"]\n        - \"-\"\n        - \"@fn\": base64\n          \"@params\": [42]\n",
    );

    let report = engine(service.clone())
        .deploy_blueprint(&loader, json!({}))
        .unwrap();
    let device = service.get("device", &report.bindings[0].id).unwrap();
    assert_eq!(device.props, json!({"name": "ababab-NDI="}));
}

#[test]
fn test_null_parameter_is_missing() {
    let service = Arc::new(InMemoryResourceService::new());
    let loader = device_with("      \"@fn\": sha256\n      \"@params\": [null]\n");

    let err = engine(service)
        .deploy_blueprint(&loader, json!({}))
        .unwrap_err();
    assert_eq!(err.code(), "BLUEPRINT_FUNCTION_EXECUTION_FAILED");
    assert!(err.to_string().contains("Missing required parameter 0"));
}

#[test]
fn test_unknown_function_kind() {
    let service = Arc::new(InMemoryResourceService::new());
    let loader = device_with("      \"@fn\": upper\n      \"@params\": [x]\n");

    let err = engine(service)
        .deploy_blueprint(&loader, json!({}))
        .unwrap_err();
    assert_eq!(err.code(), "BLUEPRINT_FUNCTION_EXECUTOR_NOT_FOUND");
    assert!(err.to_string().contains("upper"));
}

#[test]
fn test_ref_falls_back_to_default() {
    let service = Arc::new(InMemoryResourceService::new());
    let index = "settings:\n  label: null\ndevice:\n  \"@res\": device\n  \"@props\":\n    name:\n      \"@fn\": ref\n      \"@params\": [settings.label, unnamed]\n";
    let loader = InMemoryResourceLoader::new().with_file("index.yaml", index);

    let report = engine(service.clone())
        .deploy_blueprint(&loader, json!({}))
        .unwrap();
    let device = service.get("device", &report.bindings[0].id).unwrap();
    assert_eq!(device.props, json!({"name": "unnamed"}));
}
