//! Configuration.
//!
//! The block-type to transformer mapping uses a two-line format: a block type on one line, the
//! transformer identifier on the next one. Blank lines and lines starting with `#` are ignored.
//!
//! ```text
//! # continuous blocks
//! Integrator
//! IntegratorTransformer
//! ```
//!
//! A trailing `Transformer` in the identifier is optional. Everything else is a
//! [`TransformConfig`], stored as JSON.

crate::prelude!();

use std::{path::Path, str::FromStr};

use serde::{Deserialize, Serialize};

/// Block transformers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransformerKind {
    /// No-op, reports the block as untranslated.
    Empty,
    /// No-op, for blocks that are deliberately left out, *e.g.* subsystem containers.
    Skip,
    /// No-op, for blocks that only consume signals.
    Sink,
    /// Nondeterministic model input.
    Input,
    /// Constant value.
    Constant,
    /// Multiplication by a gain.
    Gain,
    /// Signed sum of the inputs.
    Sum,
    /// Product and quotient of the inputs.
    Product,
    /// Continuous integrator.
    Integrator,
    /// Discrete one-step delay.
    UnitDelay,
    /// Sample and hold.
    ZeroOrderHold,
    /// Clamp to bounds.
    Saturation,
    /// Two-way switch.
    Switch,
    /// Comparison of two inputs.
    Relational,
    /// Boolean combination of the inputs.
    Logic,
    /// Service block, translated through its contract.
    Contract,
}

impl TransformerKind {
    /// All transformers.
    pub const ALL: [Self; 16] = [
        Self::Empty,
        Self::Skip,
        Self::Sink,
        Self::Input,
        Self::Constant,
        Self::Gain,
        Self::Sum,
        Self::Product,
        Self::Integrator,
        Self::UnitDelay,
        Self::ZeroOrderHold,
        Self::Saturation,
        Self::Switch,
        Self::Relational,
        Self::Logic,
        Self::Contract,
    ];

    /// Identifier, as used in mapping files.
    pub fn ident(self) -> &'static str {
        match self {
            Self::Empty => "Empty",
            Self::Skip => "Skip",
            Self::Sink => "Sink",
            Self::Input => "Input",
            Self::Constant => "Constant",
            Self::Gain => "Gain",
            Self::Sum => "Sum",
            Self::Product => "Product",
            Self::Integrator => "Integrator",
            Self::UnitDelay => "UnitDelay",
            Self::ZeroOrderHold => "ZeroOrderHold",
            Self::Saturation => "Saturation",
            Self::Switch => "Switch",
            Self::Relational => "Relational",
            Self::Logic => "Logic",
            Self::Contract => "Contract",
        }
    }
}
impl fmt::Display for TransformerKind {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        write!(fmt, "{}Transformer", self.ident())
    }
}
impl FromStr for TransformerKind {
    type Err = Error;
    fn from_str(s: &str) -> Res<Self> {
        let ident = s.trim();
        let short = ident.strip_suffix("Transformer").unwrap_or(ident);
        Self::ALL
            .iter()
            .find(|kind| kind.ident() == short)
            .cloned()
            .ok_or_else(|| ErrorKind::UnknownTransformer(ident.into()).into())
    }
}

/// Default block-type mapping.
const DEFAULT_MAPPING: &[(&str, TransformerKind)] = &[
    ("Inport", TransformerKind::Input),
    ("Outport", TransformerKind::Sink),
    ("Scope", TransformerKind::Sink),
    ("Terminator", TransformerKind::Sink),
    ("Display", TransformerKind::Sink),
    ("Constant", TransformerKind::Constant),
    ("Gain", TransformerKind::Gain),
    ("Sum", TransformerKind::Sum),
    ("Product", TransformerKind::Product),
    ("Integrator", TransformerKind::Integrator),
    ("UnitDelay", TransformerKind::UnitDelay),
    ("Memory", TransformerKind::UnitDelay),
    ("ZeroOrderHold", TransformerKind::ZeroOrderHold),
    ("Saturate", TransformerKind::Saturation),
    ("Switch", TransformerKind::Switch),
    ("RelationalOperator", TransformerKind::Relational),
    ("Logic", TransformerKind::Logic),
    ("S-Function", TransformerKind::Contract),
    ("SubSystem", TransformerKind::Skip),
];

/// Default stateful block types.
const DEFAULT_STATEFUL: &[&str] = &[
    "Integrator",
    "DiscreteIntegrator",
    "UnitDelay",
    "Memory",
    "ZeroOrderHold",
    "DiscreteTransferFcn",
    "DiscreteFilter",
    "S-Function",
    "FromWorkspace",
];

lazy_static::lazy_static! {
    static ref DEFAULT_TABLE: IndexMap<String, TransformerKind> = DEFAULT_MAPPING
        .iter()
        .map(|(typ, kind)| (typ.to_string(), *kind))
        .collect();
}

/// Default stateful block types.
pub fn default_stateful() -> Set<String> {
    DEFAULT_STATEFUL.iter().map(|s| s.to_string()).collect()
}

/// Block-type to transformer mapping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Mapping {
    table: IndexMap<String, TransformerKind>,
}

impl Default for Mapping {
    fn default() -> Self {
        Self {
            table: DEFAULT_TABLE.clone(),
        }
    }
}

impl Mapping {
    /// Empty mapping.
    pub fn empty() -> Self {
        Self {
            table: IndexMap::new(),
        }
    }

    /// Parses a mapping in the two-line format.
    ///
    /// A block type mapped twice keeps the last transformer, with a warning.
    ///
    /// ```rust
    /// # use sldl::{conf::{Mapping, TransformerKind}, diag::Log};
    /// let mut log = Log::new();
    /// let mapping = Mapping::parse("\
    /// ## comment
    /// Gain
    /// GainTransformer
    ///
    /// MyFilter
    /// Contract
    /// ", &mut log).unwrap();
    /// assert_eq!(mapping.get("Gain"), Some(TransformerKind::Gain));
    /// assert_eq!(mapping.get("MyFilter"), Some(TransformerKind::Contract));
    /// assert_eq!(mapping.get("Sum"), None);
    /// ```
    pub fn parse(text: &str, log: &mut Log) -> Res<Self> {
        let mut table = IndexMap::new();
        let mut lines = text
            .lines()
            .enumerate()
            .map(|(idx, line)| (idx + 1, line.trim()))
            .filter(|(_, line)| !line.is_empty() && !line.starts_with('#'));

        while let Some((line, typ)) = lines.next() {
            let (kind_line, ident) = match lines.next() {
                Some(next) => next,
                None => bail!(ErrorKind::Config(
                    line,
                    format!("block type `{}` has no transformer", typ)
                )),
            };
            let kind: TransformerKind = ident
                .parse()
                .map_err(|e: Error| Error::from(ErrorKind::Config(kind_line, e.to_string())))?;
            if let Some(prev) = table.insert(typ.to_string(), kind) {
                log.warn(format!(
                    "line {}: block type `{}` mapped again, `{}` replaces `{}`",
                    line, typ, kind, prev
                ))
            }
        }

        Ok(Self { table })
    }

    /// Loads a mapping file.
    pub fn load(path: impl AsRef<Path>, log: &mut Log) -> Res<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .chain_err(|| format!("while reading mapping file `{}`", path.display()))?;
        Self::parse(&text, log).chain_err(|| format!("in mapping file `{}`", path.display()))
    }

    /// Writes the mapping in the two-line format.
    pub fn to_text(&self) -> String {
        let mut res = String::new();
        for (typ, kind) in &self.table {
            res.push_str(typ);
            res.push('\n');
            res.push_str(&kind.to_string());
            res.push_str("\n\n");
        }
        res
    }

    /// Transformer for a block type.
    pub fn get(&self, typ: &str) -> Option<TransformerKind> {
        self.table.get(typ).cloned()
    }
    /// Maps a block type, returns the previous transformer.
    pub fn insert(
        &mut self,
        typ: impl Into<String>,
        kind: TransformerKind,
    ) -> Option<TransformerKind> {
        self.table.insert(typ.into(), kind)
    }
    /// Number of mapped block types.
    pub fn len(&self) -> usize {
        self.table.len()
    }
    /// True if nothing is mapped.
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

/// Transformation configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransformConfig {
    /// Block-type to transformer mapping.
    #[serde(default)]
    pub mapping: Mapping,
    /// Mapping file, relative paths are relative to the configuration file.
    ///
    /// Overrides [`Self::mapping`] when the configuration is loaded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mapping_file: Option<std::path::PathBuf>,
    /// Block types whose outputs do not depend on their current inputs.
    #[serde(default = "default_stateful")]
    pub stateful: Set<String>,
    /// Break conjunctive tests on several lines.
    #[serde(default)]
    pub multi_line_tests: bool,
    /// Break conjunctive evolution domains on several lines.
    #[serde(default)]
    pub multi_line_domains: bool,
    /// Upper bound on the duration of each continuous evolution, as a number or a constant name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_bound: Option<String>,
}

impl Default for TransformConfig {
    fn default() -> Self {
        Self {
            mapping: Mapping::default(),
            mapping_file: None,
            stateful: default_stateful(),
            multi_line_tests: false,
            multi_line_domains: false,
            time_bound: None,
        }
    }
}

impl TransformConfig {
    /// Loads a JSON configuration file, and its mapping file if any.
    pub fn from_file(path: impl AsRef<Path>, log: &mut Log) -> Res<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .chain_err(|| format!("while reading configuration file `{}`", path.display()))?;
        let mut conf: Self = serde_json::from_str(&text)
            .chain_err(|| format!("while parsing configuration file `{}`", path.display()))?;
        if let Some(mapping_file) = &conf.mapping_file {
            let mapping_file = match path.parent() {
                Some(dir) if mapping_file.is_relative() => dir.join(mapping_file),
                _ => mapping_file.clone(),
            };
            conf.mapping = Mapping::load(mapping_file, log)?;
        }
        log.debug(format!(
            "loaded configuration `{}`, {} block type(s) mapped",
            path.display(),
            conf.mapping.len()
        ));
        Ok(conf)
    }

    /// Saves the configuration as JSON.
    pub fn save_to_file(&self, path: impl AsRef<Path>) -> Res<()> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)
            .chain_err(|| format!("while writing configuration file `{}`", path.display()))
    }

    /// Transformer for a block type, [`TransformerKind::Empty`] if unmapped.
    pub fn transformer(&self, typ: &str) -> TransformerKind {
        self.mapping.get(typ).unwrap_or(TransformerKind::Empty)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::io::Write;

    #[test]
    fn parse_mapping() {
        let mut log = Log::new();
        let mapping = Mapping::parse(
            "Gain\nGainTransformer\n\n# override\nGain\nSum\n  Sum  \n  SumTransformer  \n",
            &mut log,
        )
        .unwrap();
        assert_eq!(mapping.len(), 2);
        assert_eq!(mapping.get("Gain"), Some(TransformerKind::Sum));
        assert_eq!(mapping.get("Sum"), Some(TransformerKind::Sum));
        assert_eq!(log.count(Level::Warn), 1);
    }

    #[test]
    fn malformed_mappings() {
        let mut log = Log::new();
        let err = Mapping::parse("Gain\nGainTransformer\nSum\n", &mut log).unwrap_err();
        match err.kind() {
            ErrorKind::Config(3, _) => (),
            kind => panic!("unexpected error {}", kind),
        }
        let err = Mapping::parse("\n\nGain\nNope\n", &mut log).unwrap_err();
        match err.kind() {
            ErrorKind::Config(4, msg) => assert!(msg.contains("Nope")),
            kind => panic!("unexpected error {}", kind),
        }
    }

    #[test]
    fn mapping_text_round_trip() {
        let mapping = Mapping::default();
        let text = mapping.to_text();
        let parsed = Mapping::parse(&text, &mut Log::new()).unwrap();
        assert_eq!(parsed, mapping);
    }

    #[test]
    fn config_files() {
        let dir = tempfile::tempdir().unwrap();
        let mapping_path = dir.path().join("blocks.map");
        let mut file = std::fs::File::create(&mapping_path).unwrap();
        writeln!(file, "Inport\nInputTransformer\nFilterBlock\nContractTransformer").unwrap();

        let conf_path = dir.path().join("conf.json");
        std::fs::write(
            &conf_path,
            r#"{ "mapping_file": "blocks.map", "multi_line_tests": true, "time_bound": "h" }"#,
        )
        .unwrap();

        let mut log = Log::new();
        let conf = TransformConfig::from_file(&conf_path, &mut log).unwrap();
        assert_eq!(conf.mapping.len(), 2);
        assert_eq!(conf.transformer("FilterBlock"), TransformerKind::Contract);
        assert_eq!(conf.transformer("Gain"), TransformerKind::Empty);
        assert!(conf.multi_line_tests);
        assert!(!conf.multi_line_domains);
        assert!(conf.stateful.contains("Integrator"));
        assert_eq!(conf.time_bound.as_deref(), Some("h"));

        let saved = dir.path().join("saved.json");
        conf.save_to_file(&saved).unwrap();
        let reloaded = TransformConfig::from_file(&saved, &mut log).unwrap();
        assert_eq!(reloaded.mapping, conf.mapping);
    }

    #[test]
    fn missing_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = TransformConfig::from_file(dir.path().join("nope.json"), &mut Log::new())
            .unwrap_err();
        assert!(err.to_string().contains("nope.json"));
    }

    #[test]
    fn single_line_layout_by_default() {
        let conf = TransformConfig::default();
        assert!(!conf.multi_line_tests);
        assert!(!conf.multi_line_domains);
        let parsed: TransformConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(parsed, conf);
    }
}
