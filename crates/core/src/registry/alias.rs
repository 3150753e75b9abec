//! Alias rewriting of module identifiers.
//!
//! Aliases are pure rewrites applied before registry lookup, repeatedly until
//! a fixed point. Two rule shapes exist: prefix rewrites (`io/v3/* -> io/*`)
//! and namespace defaults (`sdk/* -> <area>/vN/*`).

use crate::ident::{ApiVersion, ModuleIdentifier};
use portico_api::{HostError, HostResult};
use std::collections::HashSet;

/// Hard cap on rewrite steps; reached only if a cycle slipped past the
/// registration-time probe (e.g. one that manifests for specific segments).
const MAX_REWRITE_STEPS: usize = 32;

#[derive(Debug, Clone)]
pub enum AliasRule {
    /// Leading-component match and replace: an identifier starting with
    /// `from`'s namespace, version, and segments is rewritten to start with
    /// `to` instead, keeping the remaining segments.
    Prefix {
        from: ModuleIdentifier,
        to: ModuleIdentifier,
    },
    /// Namespace alias at the configured default API version: the alias
    /// namespace is dropped, the next segment becomes the namespace, and the
    /// identifier is stamped with `version`. Covers `sdk/<area>/<name>` and
    /// scoped `@vendor/<area>/<name>` forms.
    NamespaceDefault { namespace: String, version: ApiVersion },
}

impl AliasRule {
    /// Apply this rule once, if it matches.
    fn apply(&self, id: &ModuleIdentifier) -> Option<ModuleIdentifier> {
        match self {
            AliasRule::Prefix { from, to } => {
                if id.namespace() != from.namespace()
                    || id.version() != from.version()
                    || id.segments().len() < from.segments().len()
                    || id.segments()[..from.segments().len()] != *from.segments()
                {
                    return None;
                }
                let remainder = id.segments()[from.segments().len()..].to_vec();
                let mut segments = to.segments().to_vec();
                segments.extend(remainder);
                Some(ModuleIdentifier::new(
                    to.namespace(),
                    to.version(),
                    segments,
                ))
            }
            AliasRule::NamespaceDefault { namespace, version } => {
                if id.namespace() != namespace
                    || id.version().is_some()
                    || id.segments().is_empty()
                {
                    return None;
                }
                let area = id.segments()[0].clone();
                let rest = id.segments()[1..].to_vec();
                Some(ModuleIdentifier::new(area, Some(*version), rest))
            }
        }
    }

    /// Number of leading components the rule consumes; higher is more
    /// specific.
    fn specificity(&self) -> usize {
        match self {
            AliasRule::Prefix { from, .. } => from.component_count(),
            AliasRule::NamespaceDefault { .. } => 1,
        }
    }

    /// A representative identifier matching this rule's pattern, used by the
    /// registration-time cycle probe.
    fn probe(&self) -> ModuleIdentifier {
        match self {
            AliasRule::Prefix { from, .. } => {
                let mut segments = from.segments().to_vec();
                segments.push("__probe".to_string());
                ModuleIdentifier::new(from.namespace(), from.version(), segments)
            }
            AliasRule::NamespaceDefault { namespace, .. } => ModuleIdentifier::new(
                namespace.clone(),
                None,
                vec!["__area".to_string(), "__probe".to_string()],
            ),
        }
    }

    pub fn pattern_key(&self) -> String {
        match self {
            AliasRule::Prefix { from, .. } => format!("{from}/*"),
            AliasRule::NamespaceDefault { namespace, .. } => format!("{namespace}/*"),
        }
    }

    /// The namespace this rule accepts; feeds the recognized-namespace set.
    pub fn source_namespace(&self) -> &str {
        match self {
            AliasRule::Prefix { from, .. } => from.namespace(),
            AliasRule::NamespaceDefault { namespace, .. } => namespace,
        }
    }
}

/// Rewrite `id` to its alias fixed point.
///
/// Precedence when several rules match: most-specific-pattern-wins (greatest
/// number of matched leading components); a prefix rule beats a namespace
/// default of equal specificity; remaining ties go to the earliest-registered
/// rule.
pub fn rewrite(rules: &[AliasRule], id: &ModuleIdentifier) -> HostResult<ModuleIdentifier> {
    let mut current = id.clone();
    let mut seen = HashSet::new();
    seen.insert(current.canonical_key());

    for _ in 0..MAX_REWRITE_STEPS {
        let Some(next) = best_match(rules, &current) else {
            return Ok(current);
        };
        if !seen.insert(next.canonical_key()) {
            return Err(HostError::AliasCycle {
                pattern: next.canonical_key(),
            });
        }
        current = next;
    }
    Err(HostError::AliasCycle {
        pattern: current.canonical_key(),
    })
}

fn best_match(rules: &[AliasRule], id: &ModuleIdentifier) -> Option<ModuleIdentifier> {
    let mut best: Option<(&AliasRule, usize)> = None;
    for rule in rules {
        if rule.apply(id).is_none() {
            continue;
        }
        let rank = rule.specificity() * 2
            + usize::from(matches!(rule, AliasRule::Prefix { .. }));
        match best {
            Some((_, best_rank)) if best_rank >= rank => {}
            _ => best = Some((rule, rank)),
        }
    }
    best.and_then(|(rule, _)| rule.apply(id))
}

/// Verify that adding `candidate` to `existing` introduces no rewrite cycle.
///
/// Every rule's pattern is probed through the full rewrite loop; a revisited
/// form fails registration with `AliasCycle`, so no resolution ever runs the
/// rewrite indefinitely for these patterns.
pub fn check_for_cycles(existing: &[AliasRule], candidate: &AliasRule) -> HostResult<()> {
    let mut all: Vec<AliasRule> = existing.to_vec();
    all.push(candidate.clone());
    for rule in &all {
        if rewrite(&all, &rule.probe()).is_err() {
            return Err(HostError::AliasCycle {
                pattern: candidate.pattern_key(),
            });
        }
    }
    Ok(())
}
