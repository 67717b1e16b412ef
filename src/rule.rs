//! Rule engine: compiles the configuration once and sweeps entries.

use crate::checks;
use crate::config::{
    ChecksConfig, EtAlConfig, Requirement, Rule, Severity, SweepConfig, Target, ALL_TYPES,
};
use crate::entry::Entry;
use crate::matcher::{CompiledMatcher, MatcherError};
use crate::report::{EntryOutcome, SweepReport, Warning};
use crate::transformer::{self, apply_et_al, ActionError, CompiledAction, TransformError};
use indexmap::IndexMap;
use std::collections::{HashMap, HashSet};
use tracing::{debug, info, trace, warn};

/// A validated, compiled rule.
#[derive(Debug)]
pub struct CompiledRule {
    /// Rule name
    pub name: String,
    /// Whether the rule runs
    pub enabled: bool,
    /// What the action operates on
    pub target: Target,
    /// Failure policy
    pub on_failure: Severity,
    /// Treat "no field matched" as a failure
    pub must_match: bool,
    matcher: CompiledMatcher,
    action: CompiledAction,
}

impl CompiledRule {
    /// Compile a rule from configuration.
    pub fn compile(rule: &Rule) -> Result<Self, RuleError> {
        let name = rule.name.trim().to_string();

        let matcher = CompiledMatcher::compile(&rule.matcher).map_err(|source| {
            RuleError::Matcher {
                rule: name.clone(),
                source,
            }
        })?;

        let action = CompiledAction::compile(&rule.action).map_err(|source| RuleError::Action {
            rule: name.clone(),
            source,
        })?;

        if rule.target == Target::Key {
            if !action.supports_key() {
                return Err(RuleError::KeyTarget {
                    rule: name,
                    action: rule.action.kind(),
                });
            }
            if rule.matcher.field.is_some() {
                return Err(RuleError::KeyWithFieldPattern { rule: name });
            }
        }

        Ok(Self {
            name,
            enabled: rule.enabled,
            target: rule.target,
            on_failure: rule.on_failure,
            must_match: rule.must_match,
            matcher,
            action,
        })
    }

    /// Run the rule on one entry. Returns `Ok(None)` when the rule does not
    /// select the entry.
    fn run(&self, entry: &mut Entry) -> Result<Option<transformer::Applied>, TransformError> {
        if !self.matcher.matches_entry(entry) {
            return Ok(None);
        }
        if self.must_match
            && self.target == Target::Fields
            && self.matcher.matching_fields(entry).is_empty()
        {
            return Err(TransformError::NoMatchingField);
        }
        transformer::apply(&self.action, self.target, &self.matcher, entry).map(Some)
    }
}

/// Settings with names folded to lower case.
#[derive(Debug)]
struct CompiledSettings {
    /// alias type -> canonical type
    aliases: HashMap<String, String>,
    expand_opt_fields: bool,
    /// entry type (or `all`) -> allowed fields
    allow: HashMap<String, HashSet<String>>,
    deny: HashSet<String>,
    required: IndexMap<String, Vec<Requirement>>,
    missing_required: Severity,
    duplicate_keys: Severity,
    checks: ChecksConfig,
    et_al: EtAlConfig,
}

impl CompiledSettings {
    fn compile(config: &SweepConfig) -> Result<Self, RuleError> {
        let settings = &config.settings;

        let mut aliases = HashMap::new();
        for (canonical, alias_list) in &settings.type_aliases {
            for alias in alias_list {
                aliases.insert(alias.to_lowercase(), canonical.to_lowercase());
            }
        }

        for (entry_type, reqs) in &settings.required {
            if reqs.iter().any(|r| r.alternatives().is_empty()) {
                return Err(RuleError::EmptyRequirement {
                    entry_type: entry_type.clone(),
                });
            }
        }

        let allow = settings
            .allow_fields
            .iter()
            .map(|(t, fields)| {
                (
                    t.to_lowercase(),
                    fields.iter().map(|f| f.to_lowercase()).collect(),
                )
            })
            .collect();

        Ok(Self {
            aliases,
            expand_opt_fields: settings.expand_opt_fields,
            allow,
            deny: settings.deny_fields.iter().map(|f| f.to_lowercase()).collect(),
            required: settings.required.clone(),
            missing_required: settings.missing_required,
            duplicate_keys: settings.duplicate_keys,
            checks: settings.checks.clone(),
            et_al: settings.et_al.clone(),
        })
    }

    /// Allowed fields for an entry type, or `None` when every field is
    /// allowed.
    fn allowed_fields(&self, entry_type: &str) -> Option<HashSet<&str>> {
        let lists: Vec<&HashSet<String>> = [ALL_TYPES, entry_type]
            .iter()
            .filter_map(|t| self.allow.get(*t))
            .collect();
        if lists.is_empty() {
            return None;
        }
        Some(lists.into_iter().flatten().map(String::as_str).collect())
    }
}

/// Rule engine that applies the configuration to entries.
#[derive(Debug)]
pub struct RuleEngine {
    rules: Vec<CompiledRule>,
    settings: CompiledSettings,
}

impl RuleEngine {
    /// Validate and compile a configuration. Fails on the first malformed
    /// rule.
    pub fn new(config: &SweepConfig) -> Result<Self, RuleError> {
        let rules = config
            .rules
            .iter()
            .enumerate()
            .map(|(i, rule)| {
                if rule.name.trim().is_empty() {
                    return Err(RuleError::UnnamedRule(i));
                }
                CompiledRule::compile(rule)
            })
            .collect::<Result<Vec<_>, _>>()?;

        let settings = CompiledSettings::compile(config)?;

        debug!(
            rules = rules.len(),
            enabled = rules.iter().filter(|r| r.enabled).count(),
            "Rule engine compiled"
        );

        Ok(Self { rules, settings })
    }

    /// All compiled rules, in declaration order.
    pub fn rules(&self) -> &[CompiledRule] {
        &self.rules
    }

    /// Sweep every entry, then check the collection for duplicate keys.
    pub fn sweep(&self, entries: Vec<Entry>) -> SweepReport {
        let total = entries.len();
        let mut report = SweepReport::default();

        for entry in entries {
            let outcome = self.sweep_entry(entry);
            report.warnings.extend(outcome.warnings);
            if outcome.excluded {
                report.excluded.push(outcome.entry.key);
            } else {
                report.entries.push(outcome.entry);
            }
        }

        self.check_duplicates(&mut report);

        info!(
            entries_in = total,
            entries_out = report.entries.len(),
            excluded = report.excluded.len(),
            warnings = report.warnings.len(),
            "Sweep finished"
        );

        report
    }

    /// Sweep one entry through every step.
    pub fn sweep_entry(&self, mut entry: Entry) -> EntryOutcome {
        let mut warnings = Vec::new();

        self.resolve_alias(&mut entry);
        if self.settings.expand_opt_fields {
            expand_opt_fields(&mut entry);
        }

        for rule in self.rules.iter().filter(|r| r.enabled) {
            match rule.run(&mut entry) {
                Ok(None) => {
                    trace!(key = %entry.key, rule = %rule.name, "Rule does not select entry");
                }
                Ok(Some(applied)) => {
                    debug!(
                        key = %entry.key,
                        rule = %rule.name,
                        matched = applied.matched,
                        changed = applied.changed,
                        "Applied rule"
                    );
                }
                Err(e) => {
                    record(
                        &mut warnings,
                        Warning::new(&entry.key, e.to_string()).with_rule(&rule.name),
                    );
                    if rule.on_failure == Severity::Exclude {
                        return EntryOutcome {
                            entry,
                            excluded: true,
                            warnings,
                        };
                    }
                }
            }
        }

        self.filter_fields(&mut entry);

        let missing = checks::missing_required(&self.settings.required, &entry);
        for field in &missing {
            record(
                &mut warnings,
                Warning::new(&entry.key, format!("missing required field `{field}`")),
            );
        }
        if !missing.is_empty() && self.settings.missing_required == Severity::Exclude {
            return EntryOutcome {
                entry,
                excluded: true,
                warnings,
            };
        }

        self.lint(&entry, &mut warnings);

        let et_al = &self.settings.et_al;
        if let Some(authors) = entry
            .get("author")
            .and_then(|a| apply_et_al(a, et_al.threshold, et_al.ieee_mode))
        {
            entry.fields.insert("author", authors);
        }

        EntryOutcome {
            entry,
            excluded: false,
            warnings,
        }
    }

    fn resolve_alias(&self, entry: &mut Entry) {
        if let Some(canonical) = self.settings.aliases.get(&entry.entry_type) {
            debug!(key = %entry.key, from = %entry.entry_type, to = %canonical, "Resolved type alias");
            entry.entry_type = canonical.clone();
        }
    }

    fn filter_fields(&self, entry: &mut Entry) {
        let allowed = self.settings.allowed_fields(&entry.entry_type);
        let deny = &self.settings.deny;
        entry.fields.retain(|name, _| {
            !deny.contains(name) && allowed.as_ref().map_or(true, |a| a.contains(name))
        });
    }

    fn lint(&self, entry: &Entry, warnings: &mut Vec<Warning>) {
        if self.settings.checks.et_al_in_author && checks::et_al_in_author(entry) {
            record(
                warnings,
                Warning::new(&entry.key, "contains et al. embedded in author string"),
            );
        }

        if self.settings.checks.year_in_booktitle && checks::year_in_booktitle(entry) {
            let booktitle = entry.get("booktitle").unwrap_or_default();
            let hint = if entry.has("year") {
                "check the year field, it should probably match the booktitle"
            } else {
                "the year field is free, consider moving the year there"
            };
            record(
                warnings,
                Warning::new(
                    &entry.key,
                    format!("may contain year in booktitle ({booktitle}); {hint}"),
                ),
            );
        }
    }

    fn check_duplicates(&self, report: &mut SweepReport) {
        let duplicates = checks::find_duplicate_keys(&report.entries);
        if duplicates.is_empty() {
            return;
        }

        for dup in &duplicates {
            let first = &report.entries[dup.first].key;
            let key = &report.entries[dup.index].key;
            let action = match self.settings.duplicate_keys {
                Severity::Warn => "kept",
                Severity::Exclude => "excluded",
            };
            record(
                &mut report.warnings,
                Warning::new(
                    key.clone(),
                    format!("duplicate citation key (first used by `{first}`), {action}"),
                ),
            );
        }

        if self.settings.duplicate_keys == Severity::Exclude {
            let mut removed: Vec<String> = duplicates
                .iter()
                .rev()
                .map(|dup| report.entries.remove(dup.index).key)
                .collect();
            removed.reverse();
            report.excluded.extend(removed);
        }
    }
}

/// Log and keep a warning.
fn record(warnings: &mut Vec<Warning>, warning: Warning) {
    warn!(
        key = %warning.key,
        rule = warning.rule.as_deref().unwrap_or("-"),
        "{}",
        warning.message
    );
    warnings.push(warning);
}

/// Real field names that start with `opt`.
const OPT_LOOKALIKES: &[&str] = &["options"];

/// Fold `optX` fields into `X`, keeping the longer value when both exist.
pub fn expand_opt_fields(entry: &mut Entry) {
    let opt_fields: Vec<String> = entry
        .fields
        .names()
        .filter(|name| {
            name.len() > 3 && name.starts_with("opt") && !OPT_LOOKALIKES.contains(name)
        })
        .map(str::to_string)
        .collect();

    for opt in opt_fields {
        let base = &opt[3..];
        let opt_len = entry.get(&opt).map_or(0, |v| v.chars().count());
        match entry.get(base).map(|v| v.chars().count()) {
            Some(base_len) => {
                if base_len < opt_len {
                    if let Some(value) = entry.fields.remove(&opt) {
                        entry.fields.insert(base, value);
                    }
                } else {
                    entry.fields.remove(&opt);
                }
            }
            None => {
                entry.fields.rename(&opt, base);
            }
        }
    }
}

/// Errors in the rule configuration, reported before any entry is swept.
#[derive(Debug, thiserror::Error)]
pub enum RuleError {
    #[error("rule `{rule}`: {source}")]
    Matcher { rule: String, source: MatcherError },

    #[error("rule `{rule}`: {source}")]
    Action { rule: String, source: ActionError },

    #[error("rule `{rule}`: action `{action}` cannot target the citation key")]
    KeyTarget { rule: String, action: &'static str },

    #[error("rule `{rule}`: a key rule cannot have a field pattern")]
    KeyWithFieldPattern { rule: String },

    #[error("rule #{0} has no name")]
    UnnamedRule(usize),

    #[error("settings.required.{entry_type}: empty list of alternatives")]
    EmptyRequirement { entry_type: String },
}
