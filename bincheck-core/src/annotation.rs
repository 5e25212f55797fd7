//! Functional annotation of hits and module completeness.
//!
//! Reference targets carry their functional accession after the last
//! [`ACCESSION_DELIMITER`]. A module is a list of steps; a step is covered
//! when any of its accepted accessions occurs among a genome's best hits.

use std::collections::{BTreeMap, BTreeSet};
use std::io::Read;
use std::path::Path;

use serde::Deserialize;

use crate::constants::ACCESSION_DELIMITER;
use crate::homology::HitTable;
use crate::types::BinCheckError;

/// Functional accession of a reference target id.
///
/// # Examples
///
/// ```rust
/// use bincheck_core::annotation::functional_accession;
///
/// assert_eq!(functional_accession("UniRef100_A0A~K00001"), "K00001");
/// assert_eq!(functional_accession("K00002"), "K00002");
/// ```
#[must_use]
pub fn functional_accession(target: &str) -> &str {
    target
        .rsplit_once(ACCESSION_DELIMITER)
        .map_or(target, |(_, accession)| accession)
}

/// Accessions observed in one genome.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Annotation {
    /// Accession → number of proteins whose best hit maps to it.
    pub ortholog_counts: BTreeMap<String, u32>,
}

impl Annotation {
    /// Maps every best hit to its functional accession.
    #[must_use]
    pub fn from_hits(hits: &HitTable) -> Self {
        let mut ortholog_counts = BTreeMap::new();
        for (_, hit) in hits.iter() {
            *ortholog_counts
                .entry(functional_accession(&hit.target).to_string())
                .or_insert(0) += 1;
        }
        Self { ortholog_counts }
    }

    #[must_use]
    pub fn contains(&self, accession: &str) -> bool {
        self.ortholog_counts.contains_key(accession)
    }

    #[must_use]
    pub fn count(&self, accession: &str) -> u32 {
        self.ortholog_counts.get(accession).copied().unwrap_or(0)
    }
}

#[derive(Debug, Deserialize)]
struct DefinitionRow {
    module: String,
    step: String,
    accession: String,
}

/// Module → ordered steps → accepted accessions.
///
/// Loaded once from `module_definitions.tsv` and shared read-only.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModuleSchema {
    modules: BTreeMap<String, Vec<(String, BTreeSet<String>)>>,
}

impl ModuleSchema {
    /// Reads tab-separated `module`, `step`, `accession` rows.
    ///
    /// Several rows for the same step list alternative accessions.
    ///
    /// # Errors
    ///
    /// Returns [`BinCheckError::InvalidConfig`] when the table is unreadable
    /// or defines no module.
    pub fn from_path(path: &Path) -> Result<Self, BinCheckError> {
        let file = std::fs::File::open(path).map_err(|e| {
            BinCheckError::InvalidConfig(format!("{}: {e}", path.display()))
        })?;
        Self::from_reader(file)
            .map_err(|e| BinCheckError::InvalidConfig(format!("{}: {e}", path.display())))
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, BinCheckError> {
        let mut rdr = csv::ReaderBuilder::new()
            .delimiter(b'\t')
            .trim(csv::Trim::All)
            .comment(Some(b'#'))
            .from_reader(reader);

        let mut modules: BTreeMap<String, Vec<(String, BTreeSet<String>)>> = BTreeMap::new();
        for record in rdr.deserialize() {
            let row: DefinitionRow = record?;
            if row.module.is_empty() || row.step.is_empty() || row.accession.is_empty() {
                return Err(BinCheckError::InvalidConfig(
                    "module definition row with an empty field".to_string(),
                ));
            }
            let steps = modules.entry(row.module).or_default();
            match steps.iter_mut().find(|(step, _)| *step == row.step) {
                Some((_, accessions)) => {
                    accessions.insert(row.accession);
                }
                None => steps.push((row.step, BTreeSet::from([row.accession]))),
            }
        }

        if modules.is_empty() {
            return Err(BinCheckError::InvalidConfig(
                "module definitions are empty".to_string(),
            ));
        }
        Ok(Self { modules })
    }

    /// Module identifiers in sorted order.
    pub fn module_ids(&self) -> impl Iterator<Item = &str> {
        self.modules.keys().map(String::as_str)
    }

    #[must_use]
    pub fn contains(&self, module: &str) -> bool {
        self.modules.contains_key(module)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.modules.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// Fraction of covered steps for every module of the schema.
    #[must_use]
    pub fn completeness(&self, annotation: &Annotation) -> ModuleCompleteness {
        let fractions = self
            .modules
            .iter()
            .map(|(module, steps)| {
                let covered = steps
                    .iter()
                    .filter(|(_, accepted)| accepted.iter().any(|acc| annotation.contains(acc)))
                    .count();
                let fraction = if steps.is_empty() {
                    0.0
                } else {
                    covered as f64 / steps.len() as f64
                };
                (module.clone(), fraction)
            })
            .collect();
        ModuleCompleteness { fractions }
    }
}

/// Module id → completeness fraction in `[0, 1]`.
///
/// Holds an entry for every module of the schema it was computed from.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModuleCompleteness {
    fractions: BTreeMap<String, f64>,
}

impl ModuleCompleteness {
    #[must_use]
    pub fn get(&self, module: &str) -> Option<f64> {
        self.fractions.get(module).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.fractions.iter().map(|(module, &f)| (module.as_str(), f))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.fractions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fractions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::homology::Hit;

    const DEFINITIONS: &str = "module\tstep\taccession
# glycolysis core
M00001\ts1\tK00844
M00001\ts1\tK12407
M00001\ts2\tK01810
M00001\ts3\tK00850
M00002\ts1\tK01803
";

    fn schema() -> ModuleSchema {
        ModuleSchema::from_reader(DEFINITIONS.as_bytes()).unwrap()
    }

    fn hits(targets: &[&str]) -> HitTable {
        let mut table = HitTable::default();
        for (i, target) in targets.iter().enumerate() {
            table.insert(
                format!("p{i}"),
                Hit {
                    target: (*target).to_string(),
                    identity: 60.0,
                    evalue: 1e-20,
                    bitscore: 100.0,
                },
            );
        }
        table
    }

    #[test]
    fn test_functional_accession_uses_last_delimiter() {
        assert_eq!(functional_accession("a~b~K00003"), "K00003");
        assert_eq!(functional_accession("trailing~"), "");
    }

    #[test]
    fn test_schema_groups_alternatives() {
        let schema = schema();
        assert_eq!(schema.len(), 2);
        assert_eq!(schema.module_ids().collect::<Vec<_>>(), ["M00001", "M00002"]);
        assert!(schema.contains("M00002"));
    }

    #[test]
    fn test_zero_hits_gives_zero_for_every_module() {
        let completeness = schema().completeness(&Annotation::from_hits(&HitTable::default()));
        assert_eq!(completeness.len(), 2);
        assert!(completeness.iter().all(|(_, f)| f == 0.0));
    }

    #[test]
    fn test_full_coverage_is_exactly_one() {
        let annotation = Annotation::from_hits(&hits(&[
            "U1~K12407",
            "U2~K01810",
            "U3~K00850",
        ]));
        let completeness = schema().completeness(&annotation);
        assert_eq!(completeness.get("M00001"), Some(1.0));
        assert_eq!(completeness.get("M00002"), Some(0.0));
    }

    #[test]
    fn test_partial_coverage() {
        let annotation = Annotation::from_hits(&hits(&["U1~K00844", "U9~K01803", "U8~K01803"]));
        let completeness = schema().completeness(&annotation);
        assert!((completeness.get("M00001").unwrap() - 1.0 / 3.0).abs() < 1e-12);
        assert_eq!(completeness.get("M00002"), Some(1.0));
        assert_eq!(annotation.count("K01803"), 2);
        assert_eq!(annotation.count("K99999"), 0);
    }

    #[test]
    fn test_empty_definitions_rejected() {
        let result = ModuleSchema::from_reader("module\tstep\taccession\n".as_bytes());
        assert!(matches!(result, Err(BinCheckError::InvalidConfig(_))));

        let blank = ModuleSchema::from_reader("module\tstep\taccession\nM1\t\tK1\n".as_bytes());
        assert!(blank.is_err());
    }
}
