use blueprint_deploy::config::EngineConfig;
use blueprint_deploy::node::{NodeTree, NodeType};
use blueprint_deploy::parser::BlueprintParser;
use blueprint_deploy::template::{InMemoryResourceLoader, TemplateContext};
use blueprint_deploy::{BlueprintError, ErrorCategory};
use serde_json::json;

fn parse(loader: &InMemoryResourceLoader) -> Result<NodeTree, BlueprintError> {
    let parser = BlueprintParser::new(&EngineConfig::default());
    parser.parse_blueprint(loader, TemplateContext::default())
}

/// Index whose body is a flat list of `count` scalars
fn flat_list(count: usize) -> InMemoryResourceLoader {
    let items = vec!["1"; count].join(",");
    InMemoryResourceLoader::new().with_file("index.yaml", format!("[{items}]"))
}

/// Index opening a chain of `levels` nested templates
fn nested_chain(levels: usize) -> InMemoryResourceLoader {
    let mut loader =
        InMemoryResourceLoader::new().with_file("index.yaml", "\"@tpl\": t1.yaml\n");
    for level in 1..=levels {
        let content = if level == levels {
            "leaf: true\n".to_string()
        } else {
            format!("child:\n  \"@tpl\": t{}.yaml\n", level + 1)
        };
        loader.insert(format!("t{level}.yaml"), content);
    }
    loader
}

#[test]
fn test_node_ceiling_allows_exact_limit() {
    // root template + list + 65,533 scalars
    let tree = parse(&flat_list(65_533)).unwrap();
    assert_eq!(tree.len(), 65_535);
}

#[test]
fn test_node_ceiling_rejects_one_more() {
    let err = parse(&flat_list(65_534)).unwrap_err();
    assert_eq!(err.code(), "BLUEPRINT_MAX_TEMPLATE_NODE_COUNT_EXCEED");
    assert_eq!(err.category(), ErrorCategory::Parse);
}

#[test]
fn test_sixteen_nested_templates_parse() {
    let tree = parse(&nested_chain(16)).unwrap();
    let templates = tree
        .ids()
        .filter(|id| tree.get(*id).node_type() == NodeType::Template)
        .count();
    // the root template is not nested
    assert_eq!(templates, 17);
}

#[test]
fn test_seventeen_nested_templates_fail() {
    let err = parse(&nested_chain(17)).unwrap_err();
    assert_eq!(err.code(), "BLUEPRINT_MAX_NESTED_TEMPLATE_COUNT_EXCEED");
}

#[test]
fn test_sibling_templates_do_not_add_depth() {
    let mut index = String::from("items:\n");
    for _ in 0..20 {
        index.push_str("  - \"@tpl\": leaf.yaml\n");
    }
    let loader = InMemoryResourceLoader::new()
        .with_file("index.yaml", index)
        .with_file("leaf.yaml", "ok: true\n");

    let tree = parse(&loader).unwrap();
    let value = tree.materialize(tree.root());
    assert_eq!(value["items"].as_array().unwrap().len(), 20);
    assert_eq!(value["items"][19], json!({"ok": true}));
}

#[test]
fn test_self_including_template_is_rejected() {
    let loader = InMemoryResourceLoader::new()
        .with_file("index.yaml", "\"@tpl\": loop.yaml\n")
        .with_file("loop.yaml", "again:\n  \"@tpl\": loop.yaml\n");

    let config = EngineConfig {
        max_structure_depth: 64,
        ..EngineConfig::default()
    };
    let err = BlueprintParser::new(&config)
        .parse_blueprint(&loader, TemplateContext::default())
        .unwrap_err();
    assert_eq!(err.code(), "BLUEPRINT_TEMPLATE_PARSING_FAILED");
    assert!(err.to_string().contains("deeper than 64"));
}

#[test]
fn test_nested_template_receives_parameters() {
    let loader = InMemoryResourceLoader::new()
        .with_file(
            "index.yaml",
            "sensors:\n  - \"@tpl\": sensor.yaml\n    \"@params\":\n      name: s1\n",
        )
        .with_file(
            "sensor.yaml",
            "name: \"{{Parameters.name}}\"\nhash:\n  \"@fn\": md5\n  \"@params\": [\"{{Parameters.name}}\"]\n",
        );

    let tree = parse(&loader).unwrap();
    // the unevaluated function materializes as null and is dropped
    assert_eq!(
        tree.materialize(tree.root()),
        json!({"sensors": [{"name": "s1"}]})
    );

    let executables = tree.executables();
    assert_eq!(executables.len(), 1);
    assert_eq!(tree.path(executables[0]), "$.sensors[0].hash");
}

#[test]
fn test_typed_values() {
    let loader = InMemoryResourceLoader::new().with_file(
        "index.yaml",
        "port:\n  \"@v\": \"8080\"\n  \"@type\": long\nlabel:\n  \"@v\": 5\n  \"@type\": string\n",
    );
    let tree = parse(&loader).unwrap();
    assert_eq!(
        tree.materialize(tree.root()),
        json!({"port": 8080, "label": "5"})
    );
}

#[test]
fn test_unexpected_key_names_path() {
    let loader = InMemoryResourceLoader::new().with_file(
        "index.yaml",
        "bad:\n  \"@fn\": concat\n  extra: 1\n",
    );
    let err = parse(&loader).unwrap_err();
    assert_eq!(err.code(), "BLUEPRINT_TEMPLATE_PARSING_FAILED");
    assert!(err.to_string().contains("$.bad"));
    assert!(err.to_string().contains("extra"));
}

#[test]
fn test_unknown_reserved_key() {
    let loader = InMemoryResourceLoader::new().with_file("index.yaml", "x:\n  \"@foo\": 1\n");
    let err = parse(&loader).unwrap_err();
    assert_eq!(err.code(), "BLUEPRINT_TEMPLATE_PARSING_FAILED");
    assert!(err.to_string().contains("@foo"));
}

#[test]
fn test_missing_nested_template() {
    let loader = InMemoryResourceLoader::new().with_file(
        "index.yaml",
        "model:\n  \"@tpl\": models/absent.yaml\n",
    );
    let err = parse(&loader).unwrap_err();
    assert_eq!(err.code(), "BLUEPRINT_TEMPLATE_PARSING_FAILED");
    assert!(err.to_string().contains("models/absent.yaml"));
}

#[test]
fn test_missing_index() {
    let err = parse(&InMemoryResourceLoader::new()).unwrap_err();
    assert_eq!(err.code(), "BLUEPRINT_TEMPLATE_NOT_FOUND");
}

#[test]
fn test_malformed_dependency_path() {
    let loader = InMemoryResourceLoader::new().with_file(
        "index.yaml",
        "device:\n  \"@res\": device\n  \"@dependsOn\": [\"a..b\"]\n",
    );
    let err = parse(&loader).unwrap_err();
    assert_eq!(err.code(), "BLUEPRINT_TEMPLATE_PARSING_FAILED");
}
