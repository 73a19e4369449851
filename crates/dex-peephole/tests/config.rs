//! Configuration access as seen by passes.

use std::collections::{HashMap, HashSet};

use dex_peephole::{ConfigFiles, Error, JsonConfig, PeepholePass};

const CONFIG: &str = r#"{
    "no_optimizations_annotations": [
        "Lcom/facebook/redex/annotations/DoNotOptimize;",
        "Lcom/example/Keep;"
    ],
    "bool_flags": { "unused": [] },
    "debug": "On",
    "verbose": 0,
    "threads": 4,
    "method_lists": {
        "hot": ["LFoo;.bar:()V"],
        "cold": []
    },
    "PeepholePass": {
        "disabled_rules": ["remove_self_move"],
        "strict": "yes"
    }
}"#;

fn load() -> JsonConfig {
    JsonConfig::parse(CONFIG).expect("config parses")
}

#[test]
fn reads_top_level_values() {
    let config = load();
    assert!(config.get("debug", false).unwrap());
    assert!(!config.get("verbose", true).unwrap());
    assert_eq!(config.get("threads", 1usize).unwrap(), 4);
    assert_eq!(config.get("missing", 9i64).unwrap(), 9);

    let lists: HashMap<String, Vec<String>> = config.get("method_lists", HashMap::new()).unwrap();
    assert_eq!(lists["hot"], vec!["LFoo;.bar:()V".to_string()]);
    assert!(lists["cold"].is_empty());
}

#[test]
fn reads_pass_section() {
    let section = load().section("PeepholePass").unwrap();
    assert!(section.get("strict", false).unwrap());
    let disabled: HashSet<String> = section.get("disabled_rules", HashSet::new()).unwrap();
    assert!(disabled.contains("remove_self_move"));
}

#[test]
fn conversion_errors_name_the_key() {
    let config = load();
    match config.get("threads", String::new()) {
        Ok(value) => assert_eq!(value, "4"),
        Err(err) => panic!("numbers convert to strings: {err}"),
    }
    let err = config.get("method_lists", false).unwrap_err();
    assert!(matches!(err, Error::Conversion { ref key, .. } if key == "method_lists"));
    assert!(err.to_string().contains("method_lists"));
}

#[test]
fn config_files_exposes_denylist() {
    let files = ConfigFiles::new(load()).unwrap();
    assert_eq!(files.no_optimizations_annotations().len(), 2);
    assert!(files.blocks_optimization(&["Lcom/example/Keep;".to_string()]));
    assert_eq!(files.json().get("threads", 0u64).unwrap(), 4);
}

#[test]
fn misshapen_pass_section_is_fatal() {
    let files = ConfigFiles::new(
        JsonConfig::parse(r#"{ "PeepholePass": ["mul_lit_neg_one_to_neg"] }"#).unwrap(),
    )
    .unwrap();
    let err = PeepholePass::from_config(&files).err().expect("list section must be rejected");
    assert!(matches!(err, Error::Conversion { ref key, .. } if key == "PeepholePass"));
}

#[test]
fn non_object_root_is_fatal() {
    let json = JsonConfig::parse(r#"["no_optimizations_annotations"]"#).unwrap();
    assert!(matches!(ConfigFiles::new(json), Err(Error::Conversion { .. })));
}

#[test]
fn integral_reals_convert_to_bool() {
    let config = JsonConfig::parse(r#"{ "on": 1.0, "off": 0.0, "half": 0.5 }"#).unwrap();
    assert!(config.get("on", false).unwrap());
    assert!(!config.get("off", true).unwrap());
    assert!(config.get("half", false).is_err());
}

#[test]
fn empty_config_has_no_denylist() {
    let files = ConfigFiles::new(JsonConfig::default()).unwrap();
    assert!(files.no_optimizations_annotations().is_empty());
}
