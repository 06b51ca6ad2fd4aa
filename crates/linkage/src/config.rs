use serde::Deserialize;

use crate::blocking::BlockingKey;
use crate::compare::{validate_rules, ComparisonRule, RuleRole};
use crate::error::LinkError;
use crate::select::{ReportColumns, TiePolicy, DEFAULT_MIN_EVIDENCE_SCORE};
use crate::similarity::{Comparator, StringAlgorithm, StringComparator, DEFAULT_LEN_SHORT};

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LinkConfig {
    pub name: String,
    /// Field separator of both input tables. Tab unless set.
    #[serde(default = "default_delimiter")]
    pub delimiter: String,
    /// Word list used for dictionary cleaning of names, if any side asks for it.
    #[serde(default)]
    pub vocabulary: Option<String>,
    pub left: SourceConfig,
    pub right: SourceConfig,
    pub passes: Vec<PassConfig>,
}

fn default_delimiter() -> String {
    "\t".into()
}

// ---------------------------------------------------------------------------
// Sources
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SourceConfig {
    pub file: String,
    /// Column holding the unique record id.
    pub id: String,
    /// Column used for deduplicated pool counts (left side only).
    #[serde(default)]
    pub count_column: Option<String>,
    #[serde(default)]
    pub dict_clean: Option<DictCleanConfig>,
}

/// Derive `into` from `from` by dropping vocabulary words.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DictCleanConfig {
    pub from: String,
    pub into: String,
}

// ---------------------------------------------------------------------------
// Passes
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PassConfig {
    pub name: String,
    pub block: BlockingKey,
    #[serde(default = "default_min_evidence_score")]
    pub min_evidence_score: f64,
    #[serde(default)]
    pub tie_policy: TiePolicy,
    #[serde(default)]
    pub report: Option<ReportColumns>,
    #[serde(default)]
    pub rules: Vec<RuleConfig>,
    /// Generate the standard organization rule set instead of listing rules.
    #[serde(default)]
    pub organization: Option<OrganizationPreset>,
}

fn default_min_evidence_score() -> f64 {
    DEFAULT_MIN_EVIDENCE_SCORE
}

/// One comparison rule as written in the config file.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RuleConfig {
    pub label: String,
    pub left: String,
    pub right: String,
    #[serde(default)]
    pub role: RuleRole,
    pub method: MethodSpec,
    #[serde(default)]
    pub threshold: Option<f64>,
    #[serde(default)]
    pub method_short: Option<MethodSpec>,
    #[serde(default)]
    pub threshold_short: Option<f64>,
    #[serde(default)]
    pub len_short: Option<usize>,
    #[serde(default)]
    pub missing_value: f64,
}

/// `method = "qgram"` or `method = { name = "qgram", q = 3 }`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum MethodSpec {
    Name(String),
    Detailed {
        name: String,
        #[serde(default)]
        q: Option<usize>,
        #[serde(default)]
        min_len: Option<usize>,
    },
}

impl MethodSpec {
    fn name(&self) -> &str {
        match self {
            Self::Name(n) | Self::Detailed { name: n, .. } => n,
        }
    }

    fn algorithm(&self) -> Result<StringAlgorithm, LinkError> {
        match self {
            Self::Name(n) => n.parse(),
            Self::Detailed { name, q, min_len } => StringAlgorithm::with_params(name, *q, *min_len),
        }
    }
}

impl From<&str> for MethodSpec {
    fn from(name: &str) -> Self {
        Self::Name(name.to_string())
    }
}

fn check_threshold(label: &str, field: &str, value: Option<f64>) -> Result<(), LinkError> {
    match value {
        Some(t) if !(0.0..=1.0).contains(&t) => Err(LinkError::ConfigValidation(format!(
            "rule '{label}': {field} must be within [0, 1], got {t}"
        ))),
        _ => Ok(()),
    }
}

impl RuleConfig {
    /// Resolve method names and parameters into an engine rule.
    pub fn compile(&self) -> Result<ComparisonRule, LinkError> {
        if self.label.trim().is_empty() {
            return Err(LinkError::ConfigValidation("rule label must not be empty".into()));
        }
        if !self.missing_value.is_finite() {
            return Err(LinkError::ConfigValidation(format!(
                "rule '{}': missing_value must be a finite number",
                self.label
            )));
        }
        let comparator = match self.method.name() {
            "exact" | "zip" | "zipcode" | "zip_partial" => {
                if self.threshold.is_some()
                    || self.method_short.is_some()
                    || self.threshold_short.is_some()
                    || self.len_short.is_some()
                    || matches!(self.method, MethodSpec::Detailed { .. })
                {
                    return Err(LinkError::ConfigValidation(format!(
                        "rule '{}': method '{}' takes no string-similarity options",
                        self.label,
                        self.method.name()
                    )));
                }
                if self.method.name() == "exact" {
                    Comparator::Exact
                } else {
                    Comparator::ZipPartial
                }
            }
            _ => {
                check_threshold(&self.label, "threshold", self.threshold)?;
                check_threshold(&self.label, "threshold_short", self.threshold_short)?;
                let short_algorithm = match &self.method_short {
                    Some(method) => method.algorithm()?,
                    None => StringAlgorithm::default(),
                };
                Comparator::String(StringComparator {
                    algorithm: self.method.algorithm()?,
                    threshold: self.threshold,
                    short_algorithm,
                    short_threshold: self.threshold_short,
                    len_short: self.len_short.unwrap_or(DEFAULT_LEN_SHORT),
                })
            }
        };

        Ok(ComparisonRule::new(&self.label, &self.left, &self.right, comparator)
            .role(self.role)
            .missing_value(self.missing_value))
    }
}

// ---------------------------------------------------------------------------
// Organization preset
// ---------------------------------------------------------------------------

/// Name and address columns of one side.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OrgColumns {
    pub name: String,
    pub name_stand: String,
    pub zip: String,
    pub city: String,
    pub state: String,
}

impl OrgColumns {
    /// Columns following the `<prefix>_zipcode` / `<prefix>_city` /
    /// `<prefix>_state` convention, e.g. prefix `company` or `job`.
    pub fn with_address_prefix(name: &str, name_stand: &str, prefix: &str) -> Self {
        Self {
            name: name.to_string(),
            name_stand: name_stand.to_string(),
            zip: format!("{prefix}_zipcode"),
            city: format!("{prefix}_city"),
            state: format!("{prefix}_state"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OrganizationPreset {
    pub left: OrgColumns,
    pub right: OrgColumns,
}

const PRESET_THRESHOLD: f64 = 0.95;
const PRESET_THRESHOLD_SHORT: f64 = 0.98;

impl OrganizationPreset {
    /// Four raw/standardized name cross products, zip partial, city and
    /// state exact.
    pub fn rules(&self) -> Vec<ComparisonRule> {
        let jw = || {
            Comparator::String(StringComparator {
                algorithm: StringAlgorithm::JaroWinkler,
                threshold: Some(PRESET_THRESHOLD),
                short_algorithm: StringAlgorithm::JaroWinkler,
                short_threshold: Some(PRESET_THRESHOLD_SHORT),
                len_short: DEFAULT_LEN_SHORT,
            })
        };
        let (l, r) = (&self.left, &self.right);
        vec![
            ComparisonRule::new("name_stand", &l.name_stand, &r.name_stand, jw()).role(RuleRole::Name),
            ComparisonRule::new("name_raw_stand", &l.name, &r.name_stand, jw()).role(RuleRole::Name),
            ComparisonRule::new("name_stand_raw", &l.name_stand, &r.name, jw()).role(RuleRole::Name),
            ComparisonRule::new("name_raw", &l.name, &r.name, jw()).role(RuleRole::Name),
            ComparisonRule::new("zipcode", &l.zip, &r.zip, Comparator::ZipPartial),
            ComparisonRule::new("city", &l.city, &r.city, jw()),
            ComparisonRule::new("state", &l.state, &r.state, Comparator::Exact),
        ]
    }
}

impl PassConfig {
    /// Standard organization pass blocking on the zip columns.
    pub fn organization(name: &str, left: OrgColumns, right: OrgColumns) -> Self {
        Self {
            name: name.to_string(),
            block: BlockingKey::per_side(&left.zip, &right.zip),
            min_evidence_score: DEFAULT_MIN_EVIDENCE_SCORE,
            tie_policy: TiePolicy::default(),
            report: None,
            rules: Vec::new(),
            organization: Some(OrganizationPreset { left, right }),
        }
    }

    /// Resolve into the engine's pass description.
    pub fn compile(&self) -> Result<Pass, LinkError> {
        let rules = match (&self.organization, self.rules.is_empty()) {
            (Some(preset), true) => preset.rules(),
            (None, false) => self
                .rules
                .iter()
                .map(RuleConfig::compile)
                .collect::<Result<Vec<_>, _>>()?,
            (Some(_), false) => {
                return Err(LinkError::ConfigValidation(format!(
                    "pass '{}': give either rules or organization, not both",
                    self.name
                )))
            }
            (None, true) => {
                return Err(LinkError::ConfigValidation(format!(
                    "pass '{}': rule list is empty",
                    self.name
                )))
            }
        };
        validate_rules(&rules).map_err(|e| match e {
            LinkError::ConfigValidation(msg) => {
                LinkError::ConfigValidation(format!("pass '{}': {msg}", self.name))
            }
            other => other,
        })?;
        self.block.validate()?;
        if !self.min_evidence_score.is_finite() {
            return Err(LinkError::ConfigValidation(format!(
                "pass '{}': min_evidence_score must be a finite number",
                self.name
            )));
        }

        let report = match &self.report {
            Some(cols) => cols.clone(),
            None => ReportColumns::from_rules(&rules),
        };

        Ok(Pass {
            name: self.name.clone(),
            block: self.block.clone(),
            rules,
            min_evidence_score: self.min_evidence_score,
            tie_policy: self.tie_policy,
            report,
        })
    }
}

/// A fully resolved pass: blocking key, rules, scoring policy.
#[derive(Debug, Clone, PartialEq)]
pub struct Pass {
    pub name: String,
    pub block: BlockingKey,
    pub rules: Vec<ComparisonRule>,
    pub min_evidence_score: f64,
    pub tie_policy: TiePolicy,
    pub report: ReportColumns,
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl LinkConfig {
    pub fn from_toml(input: &str) -> Result<Self, LinkError> {
        let config: LinkConfig =
            toml::from_str(input).map_err(|e| LinkError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), LinkError> {
        self.delimiter_byte()?;

        if self.passes.is_empty() {
            return Err(LinkError::ConfigValidation("at least one pass is required".into()));
        }

        let mut names: Vec<&str> = self.passes.iter().map(|p| p.name.as_str()).collect();
        names.sort_unstable();
        if let Some(dup) = names.windows(2).find(|w| w[0] == w[1]) {
            return Err(LinkError::ConfigValidation(format!(
                "duplicate pass name '{}'",
                dup[0]
            )));
        }

        let wants_vocabulary = self.left.dict_clean.is_some() || self.right.dict_clean.is_some();
        if wants_vocabulary && self.vocabulary.is_none() {
            return Err(LinkError::ConfigValidation(
                "dict_clean is configured but no vocabulary file is given".into(),
            ));
        }

        self.compile_passes()?;
        Ok(())
    }

    /// Resolved passes in configured order.
    pub fn compile_passes(&self) -> Result<Vec<Pass>, LinkError> {
        self.passes.iter().map(PassConfig::compile).collect()
    }

    pub fn delimiter_byte(&self) -> Result<u8, LinkError> {
        match self.delimiter.as_bytes() {
            [b] => Ok(*b),
            _ => Err(LinkError::ConfigValidation(format!(
                "delimiter must be a single ASCII character, got {:?}",
                self.delimiter
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
