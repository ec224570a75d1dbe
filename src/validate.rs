//! Structural validation of the record set.
//!
//! Findings come in three tiers: errors (missing required fields, evolution
//! cycles) fail a standalone validation run, warnings (dangling references)
//! are non-blocking defects, and info entries are observational. None of
//! them abort index generation; the build favors maximal output so
//! downstream consumers can degrade gracefully.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::store::RecordStore;

/// Classified findings for one validation run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub info: Vec<String>,
}

impl ValidationReport {
    pub fn add_error(&mut self, msg: impl Into<String>) {
        self.errors.push(msg.into());
    }

    pub fn add_warning(&mut self, msg: impl Into<String>) {
        self.warnings.push(msg.into());
    }

    pub fn add_info(&mut self, msg: impl Into<String>) {
        self.info.push(msg.into());
    }

    /// A standalone validation run exits nonzero iff this is true.
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Emit the report through the log, one line per finding.
    pub fn log(&self) {
        for err in &self.errors {
            tracing::error!("{err}");
        }
        for warn in &self.warnings {
            tracing::warn!("{warn}");
        }
        for info in &self.info {
            tracing::info!("{info}");
        }
    }
}

impl std::fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "資料驗證報告")?;
        if !self.errors.is_empty() {
            writeln!(f, "\n錯誤 ({}):", self.errors.len())?;
            for err in &self.errors {
                writeln!(f, "  [E] {err}")?;
            }
        }
        if !self.warnings.is_empty() {
            writeln!(f, "\n警告 ({}):", self.warnings.len())?;
            for warn in &self.warnings {
                writeln!(f, "  [W] {warn}")?;
            }
        }
        if !self.info.is_empty() {
            writeln!(f, "\n資訊 ({}):", self.info.len())?;
            for info in &self.info {
                writeln!(f, "  [I] {info}")?;
            }
        }
        if self.has_errors() {
            writeln!(f, "\n驗證發現 {} 個錯誤", self.errors.len())
        } else {
            writeln!(f, "\n驗證通過，無嚴重錯誤")
        }
    }
}

/// Runs every structural check against one immutable [`RecordStore`]
/// snapshot. Checks are independent and each exhaustive over its input set.
#[derive(Debug)]
pub struct Validator<'a> {
    store: &'a RecordStore,
}

impl<'a> Validator<'a> {
    pub fn new(store: &'a RecordStore) -> Self {
        Validator { store }
    }

    pub fn run(&self) -> ValidationReport {
        let mut report = ValidationReport::default();

        for warning in self.store.load_warnings() {
            report.add_warning(warning.clone());
        }
        report.add_info(format!("載入證素: {} 個", self.store.zhengsu().len()));
        report.add_info(format!("載入證型: {} 個", self.store.len()));
        report.add_info(format!("載入方劑: {} 個", self.store.formula_ids().len()));
        report.add_info(format!("載入中藥: {} 個", self.store.herb_ids().len()));
        report.add_info(format!("載入症狀: {} 個", self.store.symptom_ids().len()));

        self.check_required_fields(&mut report);
        self.check_zhengsu_references(&mut report);
        self.check_evolution_references(&mut report);
        self.check_differentiation_references(&mut report);
        self.check_formula_and_herb_references(&mut report);
        self.check_evolution_cycles(&mut report);

        report.log();
        report
    }

    /// Check 1: required authoring fields present on every record.
    fn check_required_fields(&self, report: &mut ValidationReport) {
        for record in self.store.patterns() {
            let mut missing: Vec<&str> = Vec::new();
            if record.name.is_none() {
                missing.push("name");
            }
            if record.zhengsu_composition.is_none() {
                missing.push("zhengsu_composition");
            }
            if record.symptoms.is_none() {
                missing.push("symptoms");
            }
            if record.treatment_principle.is_none() {
                missing.push("treatment_principle");
            }
            for field in missing {
                report.add_error(format!(
                    "證型 [{}] 缺少必填欄位: {field}",
                    record.display_name()
                ));
            }
        }
    }

    /// Check 2: composition classifier ids resolve against the zhengsu set.
    fn check_zhengsu_references(&self, report: &mut ValidationReport) {
        for record in self.store.patterns() {
            for loc_id in record.location() {
                if !self.store.has_zhengsu(loc_id) {
                    report.add_warning(format!(
                        "證型 [{}] 引用了不存在的病位證素: {loc_id}",
                        record.display_name()
                    ));
                }
            }
            for nat_id in record.nature() {
                if !self.store.has_zhengsu(nat_id) {
                    report.add_warning(format!(
                        "證型 [{}] 引用了不存在的病性證素: {nat_id}",
                        record.display_name()
                    ));
                }
            }
        }
    }

    /// Checks 3 and 5: evolution targets resolve; one-directional
    /// declarations are tolerated and noted. If data-quality policy ever
    /// tightens, switching the asymmetry note to `add_warning` here is the
    /// whole change.
    fn check_evolution_references(&self, report: &mut ValidationReport) {
        for record in self.store.patterns() {
            for target in &record.can_evolve_to {
                let Some(target_record) = self.store.get(target) else {
                    report.add_warning(format!(
                        "證型 [{}] 的 can_evolve_to 引用了不存在的證型: {target}",
                        record.display_name()
                    ));
                    continue;
                };
                if !target_record.evolved_from.contains(&record.id) {
                    report.add_info(format!(
                        "演變關係單向: [{}] → [{}]，但反向未標記",
                        record.display_name(),
                        target_record.display_name()
                    ));
                }
            }
            for source in &record.evolved_from {
                if !self.store.contains(source) {
                    report.add_warning(format!(
                        "證型 [{}] 的 evolved_from 引用了不存在的證型: {source}",
                        record.display_name()
                    ));
                }
            }
        }
    }

    /// Check 4: differentiation cross-references resolve.
    fn check_differentiation_references(&self, report: &mut ValidationReport) {
        for record in self.store.patterns() {
            for diff_id in &record.differentiate_from {
                if !self.store.contains(diff_id) {
                    report.add_warning(format!(
                        "證型 [{}] 的 differentiate_from 引用了不存在的證型: {diff_id}",
                        record.display_name()
                    ));
                }
            }
            for diff in &record.differentiation {
                if !diff.compare_with.is_empty() && !self.store.contains(&diff.compare_with) {
                    report.add_warning(format!(
                        "證型 [{}] 的 differentiation 引用了不存在的證型: {}",
                        record.display_name(),
                        diff.compare_with
                    ));
                }
            }
        }
    }

    /// Formula and herb pointers that have no data file yet are expected
    /// during incremental authoring; observational only.
    fn check_formula_and_herb_references(&self, report: &mut ValidationReport) {
        for record in self.store.patterns() {
            for formula_id in &record.recommended_formulas {
                if !self.store.formula_ids().contains(formula_id) {
                    report.add_info(format!(
                        "證型 [{}] 引用的方劑 [{formula_id}] 尚未建立資料檔案",
                        record.display_name()
                    ));
                }
            }
            for herb_id in &record.recommended_herbs {
                if !self.store.herb_ids().contains(herb_id) {
                    report.add_info(format!(
                        "證型 [{}] 引用的中藥 [{herb_id}] 尚未建立資料檔案",
                        record.display_name()
                    ));
                }
            }
        }
    }

    /// Check 6: cycle detection over the forward (`can_evolve_to`)
    /// adjacency, restricted to edges whose endpoints both resolve. Every
    /// declaring record is a potential start; the visited set is shared
    /// across starts so already-explored subtrees are not re-entered, while
    /// the path stack is per start.
    fn check_evolution_cycles(&self, report: &mut ValidationReport) {
        let mut adjacency: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
        for record in self.store.patterns() {
            for target in &record.can_evolve_to {
                if self.store.contains(target) {
                    adjacency
                        .entry(record.id.as_str())
                        .or_default()
                        .push(target.as_str());
                }
            }
        }

        let mut visited: BTreeSet<&str> = BTreeSet::new();
        let starts: Vec<&str> = adjacency.keys().copied().collect();
        for start in starts {
            if !visited.contains(start) {
                let mut path = Vec::new();
                self.cycle_dfs(start, &adjacency, &mut visited, &mut path, report);
            }
        }
    }

    /// Returns true when a cycle was reported below `node`; the unwind
    /// stops further exploration of that start.
    fn cycle_dfs<'b>(
        &'b self,
        node: &'b str,
        adjacency: &BTreeMap<&'b str, Vec<&'b str>>,
        visited: &mut BTreeSet<&'b str>,
        path: &mut Vec<&'b str>,
        report: &mut ValidationReport,
    ) -> bool {
        if let Some(pos) = path.iter().position(|n| *n == node) {
            let cycle_names: Vec<&str> = path[pos..]
                .iter()
                .chain(std::iter::once(&node))
                .map(|id| self.store.name_of(id))
                .collect();
            report.add_error(format!("發現演變循環: {}", cycle_names.join(" → ")));
            return true;
        }
        if visited.contains(node) {
            return false;
        }

        visited.insert(node);
        path.push(node);

        if let Some(targets) = adjacency.get(node) {
            for next in targets {
                if self.cycle_dfs(next, adjacency, visited, path, report) {
                    return true;
                }
            }
        }

        path.pop();
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{
        Differentiation, PatternRecord, RecordStore, SymptomSet, ZhengsuComposition,
    };

    /// A record passing the required-field check.
    fn complete(id: &str, name: &str) -> PatternRecord {
        PatternRecord {
            id: id.to_string(),
            name: Some(name.to_string()),
            zhengsu_composition: Some(ZhengsuComposition::default()),
            symptoms: Some(SymptomSet::default()),
            treatment_principle: Some(vec!["補氣".to_string()]),
            ..Default::default()
        }
    }

    #[test]
    fn missing_required_fields_are_errors() {
        let store = RecordStore::from_records(vec![PatternRecord {
            id: "bare".to_string(),
            name: Some("裸證".to_string()),
            ..Default::default()
        }]);
        let report = Validator::new(&store).run();
        assert_eq!(report.errors.len(), 3);
        assert!(report
            .errors
            .iter()
            .all(|e| e.contains("缺少必填欄位")));
        assert!(report.has_errors());
    }

    #[test]
    fn dangling_evolution_target_is_warning_not_error() {
        let mut a = complete("a", "甲證");
        a.can_evolve_to = vec!["ghost".to_string()];
        let store = RecordStore::from_records(vec![a]);
        let report = Validator::new(&store).run();
        assert!(!report.has_errors());
        assert!(report
            .warnings
            .iter()
            .any(|w| w.contains("can_evolve_to") && w.contains("ghost")));
    }

    #[test]
    fn one_directional_evolution_is_info_only() {
        let mut a = complete("a", "甲證");
        a.can_evolve_to = vec!["b".to_string()];
        let b = complete("b", "乙證");
        let store = RecordStore::from_records(vec![a, b]);
        let report = Validator::new(&store).run();
        assert!(!report.has_errors());
        assert!(report.info.iter().any(|i| i.contains("演變關係單向")));
    }

    #[test]
    fn reciprocal_evolution_produces_no_asymmetry_note() {
        let mut a = complete("a", "甲證");
        a.can_evolve_to = vec!["b".to_string()];
        let mut b = complete("b", "乙證");
        b.evolved_from = vec!["a".to_string()];
        let store = RecordStore::from_records(vec![a, b]);
        let report = Validator::new(&store).run();
        assert!(!report.info.iter().any(|i| i.contains("演變關係單向")));
    }

    #[test]
    fn three_node_cycle_reported_once_with_every_node() {
        let mut a = complete("a", "甲證");
        a.can_evolve_to = vec!["b".to_string()];
        let mut b = complete("b", "乙證");
        b.can_evolve_to = vec!["c".to_string()];
        let mut c = complete("c", "丙證");
        c.can_evolve_to = vec!["a".to_string()];

        let store = RecordStore::from_records(vec![a, b, c]);
        let report = Validator::new(&store).run();

        let cycles: Vec<&String> = report
            .errors
            .iter()
            .filter(|e| e.contains("發現演變循環"))
            .collect();
        assert_eq!(cycles.len(), 1);
        for name in ["甲證", "乙證", "丙證"] {
            assert!(cycles[0].contains(name));
        }
    }

    #[test]
    fn self_loop_is_a_cycle() {
        let mut a = complete("a", "甲證");
        a.can_evolve_to = vec!["a".to_string()];
        let store = RecordStore::from_records(vec![a]);
        let report = Validator::new(&store).run();
        assert!(report.errors.iter().any(|e| e.contains("發現演變循環")));
    }

    #[test]
    fn unresolved_composition_and_differentiation_refs_warn() {
        let mut a = complete("a", "甲證");
        a.zhengsu_composition = Some(ZhengsuComposition {
            location: vec!["xin".to_string()],
            nature: vec!["qi_xu".to_string()],
        });
        a.differentiate_from = vec!["nobody".to_string()];
        a.differentiation = vec![Differentiation {
            compare_with: "nobody_else".to_string(),
            compare_name: None,
            key_points: vec![],
        }];
        let store = RecordStore::from_records(vec![a]).with_zhengsu_ids(["qi_xu"]);
        let report = Validator::new(&store).run();

        assert!(report.warnings.iter().any(|w| w.contains("病位證素: xin")));
        assert!(!report
            .warnings
            .iter()
            .any(|w| w.contains("病性證素: qi_xu")));
        assert!(report
            .warnings
            .iter()
            .any(|w| w.contains("differentiate_from")));
        assert!(report
            .warnings
            .iter()
            .any(|w| w.contains("differentiation") && w.contains("nobody_else")));
    }
}
