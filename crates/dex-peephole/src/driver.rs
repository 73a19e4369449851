//! Runs the peephole rewriter over every method of a set of stores.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::config::ConfigFiles;
use crate::dex::Instruction;
use crate::peephole::{RuleTable, rewrite};
use crate::Result;

/// Config section read by [`PeepholePass::from_config`].
pub const CONFIG_SECTION: &str = "PeepholePass";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DexStore {
    pub name: String,
    #[serde(default)]
    pub classes: Vec<DexClass>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DexClass {
    /// Type descriptor, e.g. `Lcom/example/Foo;`.
    pub name: String,
    /// Annotation type descriptors attached to the class.
    #[serde(default)]
    pub annotations: Vec<String>,
    #[serde(default)]
    pub methods: Vec<DexMethod>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DexMethod {
    pub name: String,
    /// `None` for abstract and native methods.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<Vec<Instruction>>,
}

/// Counters accumulated over one [`PeepholePass::run`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PassStats {
    pub methods_visited: usize,
    pub methods_skipped: usize,
    pub methods_changed: usize,
    pub methods_failed: usize,
    pub instructions_removed: usize,
    pub rule_applications: BTreeMap<&'static str, usize>,
}

impl PassStats {
    #[must_use]
    pub fn total_applications(&self) -> usize {
        self.rule_applications.values().sum()
    }
}

pub struct PeepholePass {
    table: RuleTable,
}

impl Default for PeepholePass {
    fn default() -> Self {
        Self::new(RuleTable::standard().clone())
    }
}

impl PeepholePass {
    #[must_use]
    pub const fn new(table: RuleTable) -> Self {
        Self { table }
    }

    /// Standard table minus `PeepholePass.disabled_rules`.
    pub fn from_config(config: &ConfigFiles) -> Result<Self> {
        let section = config.json().section(CONFIG_SECTION)?;
        let disabled: HashSet<String> = section.get("disabled_rules", HashSet::new())?;
        let standard = RuleTable::standard();
        for name in &disabled {
            if standard.get(name).is_none() {
                tracing::warn!(rule = %name, "disabled_rules names an unknown rule");
            }
        }
        Ok(Self::new(standard.without(&disabled)))
    }

    #[must_use]
    pub const fn table(&self) -> &RuleTable {
        &self.table
    }

    /// Rewrite every method with code, committing changes in place.
    ///
    /// Classes carrying a `no_optimizations_annotations` entry are left
    /// alone. A rule-table defect is logged and the affected method keeps its
    /// original instructions.
    pub fn run(&self, stores: &mut [DexStore], config: &ConfigFiles) -> PassStats {
        let mut stats = PassStats::default();
        tracing::debug!(
            rules = self.table.len(),
            denylisted_annotations = config.no_optimizations_annotations().len(),
            "peephole pass starting"
        );
        for store in stores.iter_mut() {
            for class in &mut store.classes {
                let blocked = config.blocks_optimization(&class.annotations);
                for method in &mut class.methods {
                    let Some(code) = method.code.as_mut() else {
                        continue;
                    };
                    if blocked {
                        tracing::debug!(
                            class = %class.name,
                            method = %method.name,
                            "skipping method with no-optimizations annotation"
                        );
                        stats.methods_skipped += 1;
                        continue;
                    }
                    stats.methods_visited += 1;
                    match rewrite(code, &self.table) {
                        Ok(None) => {}
                        Ok(Some(result)) => {
                            tracing::debug!(
                                class = %class.name,
                                method = %method.name,
                                applied = result.applications.len(),
                                removed = result.removed(),
                                "peephole changed method"
                            );
                            stats.methods_changed += 1;
                            stats.instructions_removed += result.removed();
                            for app in &result.applications {
                                *stats.rule_applications.entry(app.rule).or_default() += 1;
                            }
                            *code = result.instructions;
                        }
                        Err(err) => {
                            tracing::error!(
                                class = %class.name,
                                method = %method.name,
                                error = %err,
                                "peephole rule table defect, method left unchanged"
                            );
                            stats.methods_failed += 1;
                        }
                    }
                }
            }
        }
        tracing::info!(
            visited = stats.methods_visited,
            skipped = stats.methods_skipped,
            changed = stats.methods_changed,
            failed = stats.methods_failed,
            removed = stats.instructions_removed,
            "peephole pass finished"
        );
        stats
    }
}
