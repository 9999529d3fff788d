//! Data sanity checks for skill, species, and effect records. Run by the
//! `validate` subcommand and by tests; load-time code stays lenient (warn and
//! skip) while this pass reports everything loudly before deployment.

use std::collections::HashSet;
use std::fmt;

use crate::battle::state::SkillCategory;
use crate::data::skill::SkillRecord;
use crate::data::species::SpeciesRecord;
use crate::effects::EffectCatalog;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ValidationSeverity {
    Error,
    Warning,
    Info,
}

impl ValidationSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warning => "warning",
            Self::Info => "info",
        }
    }
}

impl fmt::Display for ValidationSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationDiagnostic {
    pub severity: ValidationSeverity,
    pub context: String,
    pub message: String,
}

#[derive(Debug, Clone, Default)]
pub struct ValidationReport {
    pub diagnostics: Vec<ValidationDiagnostic>,
}

impl ValidationReport {
    pub fn push(
        &mut self,
        severity: ValidationSeverity,
        context: impl Into<String>,
        message: impl Into<String>,
    ) {
        self.diagnostics.push(ValidationDiagnostic {
            severity,
            context: context.into(),
            message: message.into(),
        });
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|diag| diag.severity == ValidationSeverity::Error)
    }

    pub fn merge(&mut self, other: ValidationReport) {
        self.diagnostics.extend(other.diagnostics);
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        for diag in &self.diagnostics {
            out.push_str(&format!("[{}] {}: {}\n", diag.severity, diag.context, diag.message));
        }
        out.push_str(&format!(
            "{} diagnostics ({} errors)\n",
            self.diagnostics.len(),
            self.diagnostics
                .iter()
                .filter(|d| d.severity == ValidationSeverity::Error)
                .count()
        ));
        out
    }
}

/// Check every skill record against the effect catalog: field ranges, known
/// effect ids, and an argument count matching the summed arity. The unknown-id
/// case is an error here even though the dispatcher tolerates it at runtime.
pub fn validate_skills(records: &[SkillRecord], catalog: &EffectCatalog) -> ValidationReport {
    let mut report = ValidationReport::default();
    let mut seen_ids = HashSet::new();

    for record in records {
        let context = format!("skill {} ({})", record.id, record.name);

        if !seen_ids.insert(record.id) {
            report.push(ValidationSeverity::Error, &context, "duplicate skill id");
        }
        if record.name.trim().is_empty() {
            report.push(ValidationSeverity::Error, &context, "empty name");
        }
        if !(0..=250).contains(&record.power) {
            report.push(
                ValidationSeverity::Error,
                &context,
                format!("power {} outside [0, 250]", record.power),
            );
        }
        if record.category.is_offensive() && record.power == 0 {
            report.push(
                ValidationSeverity::Warning,
                &context,
                "offensive category with zero power",
            );
        }
        if record.category == SkillCategory::Status && record.power != 0 {
            report.push(
                ValidationSeverity::Warning,
                &context,
                "status category with nonzero power is ignored by the damage formula",
            );
        }
        if !(0.0..=100.0).contains(&record.accuracy) && !record.always_hits {
            report.push(
                ValidationSeverity::Error,
                &context,
                format!("accuracy {} outside [0, 100]", record.accuracy),
            );
        }
        if record.element == 0 {
            report.push(ValidationSeverity::Error, &context, "element id 0 is reserved");
        }
        if record.max_pp == 0 {
            report.push(ValidationSeverity::Error, &context, "max_pp must be at least 1");
        }

        let definition = record.to_definition();
        let mut expected_args = 0usize;
        for &effect_id in &definition.side_effects {
            match catalog.arity_of(effect_id) {
                Some(arity) => expected_args += arity,
                None => {
                    report.push(
                        ValidationSeverity::Error,
                        &context,
                        format!(
                            "unknown effect id {effect_id}: the dispatcher will skip it and \
                             consume no arguments"
                        ),
                    );
                }
            }
        }
        if definition.effect_args.len() != expected_args {
            report.push(
                ValidationSeverity::Error,
                &context,
                format!(
                    "argument count {} does not match summed arity {}",
                    definition.effect_args.len(),
                    expected_args
                ),
            );
        }

        // Each atom must accept its slice.
        for (atom, args) in crate::effects::trigger::decode_atoms(catalog, &definition) {
            if let Err(err) = atom.instantiate(&args) {
                report.push(
                    ValidationSeverity::Error,
                    &context,
                    format!("atom {atom:?} rejects its arguments: {err}"),
                );
            }
        }
    }

    report
}

/// Check species records: unique ids, sane base stats, legal type ids.
pub fn validate_species(records: &[SpeciesRecord]) -> ValidationReport {
    let mut report = ValidationReport::default();
    let mut seen_ids = HashSet::new();

    for record in records {
        let context = format!("species {} ({})", record.id, record.name);
        if !seen_ids.insert(record.id) {
            report.push(ValidationSeverity::Error, &context, "duplicate species id");
        }
        for (stat, value) in [
            ("hp", record.base.hp),
            ("attack", record.base.attack),
            ("defense", record.base.defense),
            ("sp_attack", record.base.sp_attack),
            ("sp_defense", record.base.sp_defense),
            ("speed", record.base.speed),
        ] {
            if !(1..=255).contains(&value) {
                report.push(
                    ValidationSeverity::Error,
                    &context,
                    format!("base {stat} {value} outside [1, 255]"),
                );
            }
        }
        if record.primary_type == 0 {
            report.push(ValidationSeverity::Error, &context, "primary type id 0 is reserved");
        }
        if record.secondary_type == Some(record.primary_type) {
            report.push(
                ValidationSeverity::Warning,
                &context,
                "secondary type repeats the primary type",
            );
        }
    }

    report
}

/// Full dataset validation as run by the CLI.
pub fn validate_dataset(
    species: &[SpeciesRecord],
    skills: &[SkillRecord],
    catalog: &EffectCatalog,
) -> ValidationReport {
    let mut report = validate_species(species);
    report.merge(validate_skills(skills, catalog));
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::skill::builtin_skills;
    use crate::data::species::builtin_species;

    #[test]
    fn builtin_data_validates_clean() {
        let catalog = EffectCatalog::builtin();
        let report = validate_dataset(&builtin_species(), &builtin_skills(), &catalog);
        assert!(!report.has_errors(), "{}", report.render());
    }

    #[test]
    fn unknown_effect_id_is_an_error_here() {
        let catalog = EffectCatalog::builtin();
        let mut record = builtin_skills()[0].clone();
        record.side_effects = "999".to_string();
        record.effect_args = String::new();
        let report = validate_skills(&[record], &catalog);
        assert!(report.has_errors());
        assert!(report.render().contains("unknown effect id 999"));
    }

    #[test]
    fn argument_arity_mismatch_is_flagged() {
        let catalog = EffectCatalog::builtin();
        let mut record = builtin_skills()[0].clone();
        record.side_effects = "4".to_string();
        record.effect_args = "1 100".to_string(); // arity 3, only 2 provided
        let report = validate_skills(&[record], &catalog);
        assert!(report.has_errors());
    }

    #[test]
    fn bad_species_stats_are_flagged() {
        let mut record = builtin_species()[0].clone();
        record.base.hp = 0;
        let report = validate_species(&[record]);
        assert!(report.has_errors());
    }

    #[test]
    fn duplicate_ids_are_flagged() {
        let catalog = EffectCatalog::builtin();
        let record = builtin_skills()[0].clone();
        let report = validate_skills(&[record.clone(), record], &catalog);
        assert!(report.has_errors());
    }
}
