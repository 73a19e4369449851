//! Pass-level behaviour: annotations, configuration and defective tables.

use dex_peephole::peephole::pattern::{LIT, RA, Shape, lit, reg};
use dex_peephole::peephole::{Condition, Emit, LitExpr, RegExpr, Rule, Template};
use dex_peephole::test_harness::*;
use dex_peephole::{ConfigFiles, JsonConfig, PeepholePass, RuleTable};
use dex_peephole::{DexClass, DexMethod, DexStore, Opcode};
use serde_json::json;

fn config(value: serde_json::Value) -> ConfigFiles {
    ConfigFiles::new(JsonConfig::new(value)).expect("valid config")
}

#[test]
fn standard_pass_rewrites_method() {
    let pass = PeepholePass::default();
    let (code, stats) = run_pass_on_method(
        &pass,
        &ConfigFiles::default(),
        &[],
        asm(&["const/16 v0, #42", "div-int/lit16 v1, v0, #-1"]),
    );
    assert_eq!(code, asm(&["const/16 v0, #42", "neg-int v1, v0"]));
    assert_eq!(stats.methods_visited, 1);
    assert_eq!(stats.methods_changed, 1);
    assert_eq!(stats.total_applications(), 1);
    assert_eq!(stats.rule_applications["div_lit_neg_one_to_neg"], 1);
}

#[test]
fn removed_instructions_are_counted() {
    let (code, stats) = run_pass_on_method(
        &PeepholePass::default(),
        &ConfigFiles::default(),
        &[],
        asm(&["move v3, v3", "add-int/lit8 v2, v2, #0", "return v2"]),
    );
    assert_eq!(code, asm(&["return v2"]));
    assert_eq!(stats.instructions_removed, 2);
}

#[test]
fn no_optimizations_annotation_blocks_pass() {
    let config = config(json!({
        "no_optimizations_annotations": ["Lcom/facebook/redex/annotations/DoNotOptimize;"]
    }));
    let input = asm(&["const/16 v0, #42", "mul-int/lit8 v1, v0, #1"]);
    let (code, stats) = run_pass_on_method(
        &PeepholePass::default(),
        &config,
        &["Lcom/facebook/redex/annotations/DoNotOptimize;"],
        input.clone(),
    );
    assert_eq!(code, input);
    assert_eq!(stats.methods_skipped, 1);
    assert_eq!(stats.methods_changed, 0);

    // Other annotations do not block.
    let (code, _) = run_pass_on_method(&PeepholePass::default(), &config, &["LOther;"], input);
    assert_eq!(code, asm(&["const/16 v0, #42", "move v1, v0"]));
}

#[test]
fn disabled_rule_is_not_applied() {
    let config = config(json!({
        "PeepholePass": { "disabled_rules": ["mul_lit_neg_one_to_neg"] }
    }));
    let pass = PeepholePass::from_config(&config).unwrap();
    let input = asm(&["const/16 v0, #42", "mul-int/lit8 v1, v0, #-1", "div-int/lit8 v2, v0, #-1"]);
    let (code, stats) = run_pass_on_method(&pass, &config, &[], input);
    assert_eq!(
        code,
        asm(&["const/16 v0, #42", "mul-int/lit8 v1, v0, #-1", "neg-int v2, v0"])
    );
    assert!(!stats.rule_applications.contains_key("mul_lit_neg_one_to_neg"));
}

#[test]
fn defective_table_leaves_method_untouched() {
    // Valid statically, but a const above the lit16 range overflows the template.
    let rule = Rule::new(
        "const_to_add",
        vec![Shape::op(Opcode::Const).dest(reg(RA)).lit(lit(LIT))],
        Template::new(vec![
            Emit::new(Opcode::AddIntLit)
                .dest(RegExpr::Var(RA))
                .src(RegExpr::Var(RA))
                .lit(LitExpr::Var(LIT)),
        ]),
    )
    .when(Condition::LiteralIn(LIT, &[1, 1 << 20]));
    let pass = PeepholePass::new(RuleTable::new(vec![rule]).unwrap());

    let mut stores = vec![DexStore {
        name: "classes".to_string(),
        classes: vec![DexClass {
            name: "LFoo;".to_string(),
            annotations: Vec::new(),
            methods: vec![
                DexMethod {
                    name: "broken".to_string(),
                    code: Some(asm(&["const v0, #0x100000"])),
                },
                DexMethod {
                    name: "fine".to_string(),
                    code: Some(asm(&["const v0, #1"])),
                },
            ],
        }],
    }];
    let stats = pass.run(&mut stores, &ConfigFiles::default());
    assert_eq!(stats.methods_failed, 1);
    assert_eq!(stats.methods_changed, 1);

    let methods = &stores[0].classes[0].methods;
    assert_eq!(methods[0].code, Some(asm(&["const v0, #0x100000"])));
    assert_eq!(methods[1].code, Some(asm(&["add-int/lit8 v0, v0, #1"])));
}

#[test]
fn stores_round_trip_through_json() {
    let text = r#"{
        "name": "classes",
        "classes": [{
            "name": "LFoo;",
            "methods": [
                { "name": "bar", "code": ["const/16 v0, #42", "add-int/lit8 v1, v0, #0"] },
                { "name": "baz" }
            ]
        }]
    }"#;
    let mut stores = vec![serde_json::from_str::<DexStore>(text).unwrap()];
    PeepholePass::default().run(&mut stores, &ConfigFiles::default());
    let out = serde_json::to_value(&stores[0]).unwrap();
    assert_eq!(
        out["classes"][0]["methods"][0]["code"],
        json!(["const/16 v0, #42", "move v1, v0"])
    );
    assert!(out["classes"][0]["methods"][1].get("code").is_none());
}
