//! Supplemental flat indexes derived from the same record snapshot: the
//! symptom reverse-index and the composition-to-pattern mapping.
//!
//! Unlike the evolution graph these are plain keyed aggregations; they live
//! here so the `build` pipeline can emit the complete index set in one run.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{index::INDEX_VERSION, store::RecordStore};

/// One named keyword group for symptom categorization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymptomCategory {
    pub name: String,
    pub keywords: Vec<String>,
}

/// Keyword table mapping symptom phrases to coarse display categories.
/// Anything unmatched falls into the catch-all category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SymptomCategories {
    pub groups: Vec<SymptomCategory>,
    pub fallback: String,
}

impl Default for SymptomCategories {
    fn default() -> Self {
        let group = |name: &str, keywords: &[&str]| SymptomCategory {
            name: name.to_string(),
            keywords: keywords.iter().map(|s| s.to_string()).collect(),
        };
        SymptomCategories {
            groups: vec![
                group(
                    "發熱類",
                    &[
                        "發熱", "潮熱", "低熱", "壯熱", "寒熱", "惡寒", "惡風", "身熱",
                        "五心煩熱", "骨蒸", "午後熱",
                    ],
                ),
                group(
                    "疼痛類",
                    &[
                        "頭痛", "胸痛", "腹痛", "腰痛", "肢痛", "關節痛", "痠痛", "脹痛",
                        "刺痛", "隱痛", "絞痛",
                    ],
                ),
                group(
                    "虛損類",
                    &[
                        "乏力", "氣短", "神疲", "懶言", "倦怠", "自汗", "盜汗", "頭暈",
                        "眩暈", "心悸", "失眠",
                    ],
                ),
                group(
                    "二便類",
                    &["便秘", "泄瀉", "便溏", "下利", "小便不利", "尿頻", "遺尿", "尿閉"],
                ),
                group(
                    "神志類",
                    &[
                        "煩躁", "不寐", "多夢", "健忘", "神昏", "譫語", "狂躁", "抑鬱",
                        "恍惚", "驚悸",
                    ],
                ),
                group(
                    "呼吸類",
                    &["咳嗽", "氣喘", "胸悶", "痰多", "喘息", "呼吸困難", "鼻塞"],
                ),
                group(
                    "消化類",
                    &["納呆", "食少", "嘔吐", "噁心", "噯氣", "呃逆", "腹脹", "反酸"],
                ),
                group(
                    "皮膚類",
                    &["皮疹", "瘙癢", "瘡瘍", "水腫", "黃疸", "脫屑", "斑疹"],
                ),
            ],
            fallback: "其他".to_string(),
        }
    }
}

impl SymptomCategories {
    pub fn categorize(&self, symptom: &str) -> &str {
        for group in &self.groups {
            if group.keywords.iter().any(|kw| symptom.contains(kw.as_str())) {
                return &group.name;
            }
        }
        &self.fallback
    }
}

/// One pattern referencing a symptom.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymptomRef {
    pub id: String,
    pub name: String,
    /// 主症 (primary) or 次症 (secondary).
    pub relevance: String,
    /// Compact tongue/pulse/leading-symptom digest for telling co-listed
    /// patterns apart at a glance.
    pub differentiation_hint: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymptomEntry {
    pub display_name: String,
    pub related_syndromes: Vec<SymptomRef>,
    pub category: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SymptomStatistics {
    pub total_symptoms: usize,
    pub symptoms_with_main_relevance: usize,
}

/// The symptom reverse-index artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymptomIndex {
    pub version: String,
    pub generated_at: NaiveDate,
    pub symptoms: BTreeMap<String, SymptomEntry>,
    pub categories: Vec<String>,
    pub statistics: SymptomStatistics,
}

/// Reverse-map every listed main and secondary symptom to the patterns
/// declaring it.
pub fn build_symptom_index(
    store: &RecordStore,
    categories: &SymptomCategories,
    generated_at: NaiveDate,
) -> SymptomIndex {
    let mut symptoms: BTreeMap<String, SymptomEntry> = BTreeMap::new();

    for record in store.patterns() {
        let Some(sym) = record.symptoms.as_ref() else {
            continue;
        };
        let hint = differentiation_hint(sym);
        for (list, relevance) in [(&sym.main, "主症"), (&sym.secondary, "次症")] {
            for symptom in list {
                let symptom = symptom.trim();
                if symptom.is_empty() {
                    continue;
                }
                let entry = symptoms
                    .entry(symptom.to_string())
                    .or_insert_with(|| SymptomEntry {
                        display_name: symptom.to_string(),
                        related_syndromes: Vec::new(),
                        category: categories.categorize(symptom).to_string(),
                    });
                entry.related_syndromes.push(SymptomRef {
                    id: record.id.clone(),
                    name: record.display_name().to_string(),
                    relevance: relevance.to_string(),
                    differentiation_hint: hint.clone(),
                });
            }
        }
    }

    for entry in symptoms.values_mut() {
        entry
            .related_syndromes
            .sort_by(|a, b| {
                let rank = |r: &SymptomRef| if r.relevance == "主症" { 0 } else { 1 };
                (rank(a), &a.name).cmp(&(rank(b), &b.name))
            });
    }

    let mut category_names: Vec<String> =
        symptoms.values().map(|e| e.category.clone()).collect();
    category_names.sort();
    category_names.dedup();

    let statistics = SymptomStatistics {
        total_symptoms: symptoms.len(),
        symptoms_with_main_relevance: symptoms
            .values()
            .filter(|e| e.related_syndromes.iter().any(|r| r.relevance == "主症"))
            .count(),
    };

    tracing::info!(symptoms = statistics.total_symptoms, "symptom index built");
    SymptomIndex {
        version: INDEX_VERSION.to_string(),
        generated_at,
        symptoms,
        categories: category_names,
        statistics,
    }
}

fn differentiation_hint(symptoms: &crate::store::SymptomSet) -> String {
    let mut hints: Vec<&str> = Vec::new();
    if !symptoms.tongue.is_empty() {
        hints.push(&symptoms.tongue);
    }
    if !symptoms.pulse.is_empty() {
        hints.push(&symptoms.pulse);
    }
    for main in symptoms.main.iter().take(3) {
        hints.push(main);
    }
    hints.truncate(4);
    hints.join("、")
}

/// One pattern related to a composition classifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternRef {
    pub id: String,
    pub name: String,
    pub is_primary: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZhengsuEntry {
    pub name: String,
    pub related_zhengxing: Vec<PatternRef>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedRef {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompositionView {
    pub location: Vec<NamedRef>,
    pub nature: Vec<NamedRef>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ZhengsuStatistics {
    pub total_zhengsu: usize,
    pub total_zhengxing: usize,
}

/// The bidirectional classifier-to-pattern mapping artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZhengsuMapping {
    pub version: String,
    pub generated_at: NaiveDate,
    pub by_zhengsu: BTreeMap<String, ZhengsuEntry>,
    pub by_zhengxing: BTreeMap<String, CompositionView>,
    pub statistics: ZhengsuStatistics,
}

/// Map every known classifier to the patterns composed from it, and every
/// pattern back to its named composition. References to unknown classifiers
/// are dropped here; the validator is where they warn.
pub fn build_zhengsu_mapping(store: &RecordStore, generated_at: NaiveDate) -> ZhengsuMapping {
    let mut related: BTreeMap<&str, Vec<PatternRef>> = BTreeMap::new();
    let mut by_zhengxing: BTreeMap<String, CompositionView> = BTreeMap::new();

    for record in store.patterns() {
        let nature_count = record.nature().len();
        for loc_id in record.location() {
            // Few nature classifiers means the location carries the
            // pattern's identity.
            related.entry(loc_id).or_default().push(PatternRef {
                id: record.id.clone(),
                name: record.display_name().to_string(),
                is_primary: nature_count <= 2,
            });
        }
        for nat_id in record.nature() {
            related.entry(nat_id).or_default().push(PatternRef {
                id: record.id.clone(),
                name: record.display_name().to_string(),
                is_primary: nature_count == 1,
            });
        }

        let named = |ids: &[String]| {
            ids.iter()
                .map(|id| NamedRef {
                    id: id.clone(),
                    name: store.zhengsu_name_of(id).to_string(),
                })
                .collect::<Vec<_>>()
        };
        by_zhengxing.insert(
            record.id.clone(),
            CompositionView {
                location: named(record.location()),
                nature: named(record.nature()),
            },
        );
    }

    let mut by_zhengsu = BTreeMap::new();
    for (zs_id, zs_name) in store.zhengsu() {
        let mut patterns = related.remove(zs_id.as_str()).unwrap_or_default();
        patterns.sort_by(|a, b| {
            let rank = |p: &PatternRef| if p.is_primary { 0 } else { 1 };
            (rank(a), &a.name).cmp(&(rank(b), &b.name))
        });
        by_zhengsu.insert(
            zs_id.clone(),
            ZhengsuEntry {
                name: zs_name.clone(),
                related_zhengxing: patterns,
            },
        );
    }

    let statistics = ZhengsuStatistics {
        total_zhengsu: by_zhengsu.len(),
        total_zhengxing: by_zhengxing.len(),
    };
    tracing::info!(
        zhengsu = statistics.total_zhengsu,
        zhengxing = statistics.total_zhengxing,
        "zhengsu mapping built"
    );
    ZhengsuMapping {
        version: INDEX_VERSION.to_string(),
        generated_at,
        by_zhengsu,
        by_zhengxing,
        statistics,
    }
}
