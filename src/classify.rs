//! Node classification: category, severity, and criticality for one record.
//!
//! Classification is a pure function of a single [`PatternRecord`] plus a
//! [`ClassifyConfig`]. The keyword tables were module-level globals in
//! earlier tooling; they are explicit configuration here so tests and
//! downstream deployments can substitute their own tables without touching
//! shared state. [`ClassifyConfig::default`] carries the reference tables.

use std::{
    collections::BTreeSet,
    fmt::{Display, Formatter},
    fs::read_to_string,
    path::Path,
};

use serde::{Deserialize, Serialize};

use crate::{error::ZhengtuError, store::PatternRecord};

/// Coarse pattern category. Serialized with the authored Chinese labels so
/// the emitted index matches the record vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Category {
    /// Foundational, unlocalized pattern.
    #[serde(rename = "基礎證候")]
    Foundational,
    /// Pattern localized to an organ system (non-empty composition location).
    #[serde(rename = "臟腑證候")]
    OrganLocalized,
    /// Six-stage (liu jing) disease pattern.
    #[serde(rename = "六經證候")]
    SixStage,
    /// Acute / collapse-type pattern.
    #[serde(rename = "危重證候")]
    Critical,
}

impl Display for Category {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Category::Foundational => "基礎證候",
            Category::OrganLocalized => "臟腑證候",
            Category::SixStage => "六經證候",
            Category::Critical => "危重證候",
        };
        write!(f, "{label}")
    }
}

/// One severity tier of the keyword table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeverityKeywords {
    pub severity: u8,
    pub keywords: Vec<String>,
}

/// Keyword tables driving classification. TOML-loadable so a deployment can
/// retune severity vocabulary without a rebuild.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifyConfig {
    /// Name keywords per severity tier. Scanned highest severity first;
    /// first hit wins.
    pub severity_keywords: Vec<SeverityKeywords>,
    /// Nature classifier ids that mark a pattern as critical (severity 4).
    pub critical_natures: BTreeSet<String>,
    /// Id substrings identifying six-stage disease patterns.
    pub six_stage_markers: Vec<String>,
    /// Pattern ids always categorized as critical.
    pub critical_patterns: BTreeSet<String>,
    /// Collapse / expiration / reversal terms that mark a name as critical.
    pub critical_name_markers: Vec<String>,
}

impl Default for ClassifyConfig {
    fn default() -> Self {
        let owned = |items: &[&str]| items.iter().map(|s| s.to_string()).collect::<Vec<_>>();
        ClassifyConfig {
            severity_keywords: vec![
                SeverityKeywords {
                    severity: 1,
                    keywords: owned(&["虛", "不足"]),
                },
                SeverityKeywords {
                    severity: 2,
                    keywords: owned(&["下陷", "不固", "氣滯"]),
                },
                SeverityKeywords {
                    severity: 3,
                    keywords: owned(&["脫", "厥", "閉"]),
                },
                SeverityKeywords {
                    severity: 4,
                    keywords: owned(&["亡", "危"]),
                },
            ],
            critical_natures: ["qi_tuo", "wang_yin", "wang_yang", "qi_jue", "xue_tuo"]
                .into_iter()
                .map(String::from)
                .collect(),
            six_stage_markers: owned(&[
                "taiyang", "yangming", "shaoyang", "taiyin", "shaoyin", "jueyin",
            ]),
            critical_patterns: ["qi_tuo_zheng", "wang_yin_zheng", "wang_yang_zheng"]
                .into_iter()
                .map(String::from)
                .collect(),
            critical_name_markers: owned(&["亡", "脫", "厥"]),
        }
    }
}

impl ClassifyConfig {
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> Result<Self, ZhengtuError> {
        tracing::debug!("reading classifier config from {:?}", path.as_ref());
        let content = read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }
}

/// Derived classification for one graph node.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NodeClass {
    pub category: Category,
    pub severity: u8,
    pub is_critical: bool,
}

/// Classifies records against a [`ClassifyConfig`]. Total: unknown inputs
/// degrade to (Foundational, 1, non-critical) rather than erroring.
#[derive(Debug, Clone, Default)]
pub struct NodeClassifier {
    config: ClassifyConfig,
}

impl NodeClassifier {
    pub fn new(config: ClassifyConfig) -> Self {
        NodeClassifier { config }
    }

    pub fn classify(&self, record: &PatternRecord) -> NodeClass {
        NodeClass {
            category: self.category(record),
            severity: self.severity(record),
            is_critical: self.is_critical(record),
        }
    }

    /// Category resolution, first match wins: six-stage marker in the id,
    /// critical allow-list, non-empty composition location, foundational.
    pub fn category(&self, record: &PatternRecord) -> Category {
        if self
            .config
            .six_stage_markers
            .iter()
            .any(|marker| record.id.contains(marker.as_str()))
        {
            return Category::SixStage;
        }
        if self.config.critical_patterns.contains(&record.id) {
            return Category::Critical;
        }
        if !record.location().is_empty() {
            return Category::OrganLocalized;
        }
        Category::Foundational
    }

    /// Severity 1-4 from the name keyword table (highest tier checked
    /// first), falling back to 4 for critical natures and 1 otherwise.
    pub fn severity(&self, record: &PatternRecord) -> u8 {
        let name = record.name.as_deref().unwrap_or("");

        let mut tiers: Vec<&SeverityKeywords> = self.config.severity_keywords.iter().collect();
        tiers.sort_by(|a, b| b.severity.cmp(&a.severity));
        for tier in tiers {
            if tier.keywords.iter().any(|kw| name.contains(kw.as_str())) {
                return tier.severity;
            }
        }

        if record
            .nature()
            .iter()
            .any(|zs| self.config.critical_natures.contains(zs))
        {
            return 4;
        }
        1
    }

    pub fn is_critical(&self, record: &PatternRecord) -> bool {
        if record
            .nature()
            .iter()
            .any(|zs| self.config.critical_natures.contains(zs))
        {
            return true;
        }
        let name = record.name.as_deref().unwrap_or("");
        self.config
            .critical_name_markers
            .iter()
            .any(|marker| name.contains(marker.as_str()))
    }
}

/// Ordinal display label for a severity rank, saturating at the critical
/// tier.
pub fn severity_label(severity: u8) -> &'static str {
    match severity {
        0 | 1 => "輕",
        2 => "中",
        3 => "重",
        _ => "危",
    }
}
