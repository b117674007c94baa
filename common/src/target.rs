//! # Chaos Target Model
//!
//! Defines how the victims of a chaos command are described on the command line.
//!
//! The argument list can be:
//! * A list of literal names (e.g., `web-1 web-2`).
//! * A single RE2 pattern prefixed with `re2:` (e.g., `re2:^api-`).
//! * Nothing at all, which matches every candidate the backend reports.
//!
//! Matching against the live inventory happens per tick, after the backend has
//! listed its candidates. Random narrowing to a single victim lives here too,
//! since every command shares it.

use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use rand::{Rng, SeedableRng, rngs::StdRng};
use regex::Regex;
use tracing::debug;

use crate::error::ChaosError;

/// Marks an argument as a regular expression instead of a literal name.
pub const RE2_PREFIX: &str = "re2:";

/// Resolved description of which targets a command acts on.
#[derive(Clone, Debug)]
pub enum TargetSpec {
    /// Literal identifiers, in the order given.
    Names(Vec<String>),
    /// Compiled pattern (prefix already stripped).
    Pattern(Regex),
}

impl TargetSpec {
    /// Resolves raw CLI arguments into a [`TargetSpec`].
    ///
    /// If the first argument carries the [`RE2_PREFIX`], the remainder is compiled and
    /// any further arguments are ignored. Otherwise every argument is a literal name.
    pub fn resolve<S: AsRef<str>>(args: &[S]) -> Result<Self, ChaosError> {
        if let Some(first) = args.first()
            && let Some(pattern) = first.as_ref().strip_prefix(RE2_PREFIX)
        {
            return parse_pattern(pattern);
        }

        Ok(Self::Names(
            args.iter().map(|arg| arg.as_ref().to_string()).collect(),
        ))
    }

    /// Returns `true` if a discovered resource called `name` is a victim.
    pub fn matches(&self, name: &str) -> bool {
        match self {
            Self::Names(names) if names.is_empty() => true,
            Self::Names(names) => names.iter().any(|n| n == name),
            Self::Pattern(re) => re.is_match(name),
        }
    }

    /// Keeps the matching items, preserving inventory order.
    pub fn filter<T, F>(&self, items: Vec<T>, name_of: F) -> Vec<T>
    where
        F: Fn(&T) -> &str,
    {
        items
            .into_iter()
            .filter(|item| self.matches(name_of(item)))
            .collect()
    }

    pub fn is_pattern(&self) -> bool {
        matches!(self, Self::Pattern(_))
    }
}

impl fmt::Display for TargetSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Names(names) if names.is_empty() => write!(f, "<all>"),
            Self::Names(names) => write!(f, "{}", names.join(",")),
            Self::Pattern(re) => write!(f, "{RE2_PREFIX}{}", re.as_str()),
        }
    }
}

fn parse_pattern(pattern: &str) -> Result<TargetSpec, ChaosError> {
    Regex::new(pattern)
        .map(TargetSpec::Pattern)
        .map_err(|source| ChaosError::InvalidPattern {
            pattern: pattern.to_string(),
            source,
        })
}

/// Selects a single random item when `random` is set, using a time-seeded generator.
///
/// An empty list is returned unchanged; the caller decides how to report it.
pub fn narrow<T>(items: Vec<T>, random: bool) -> Vec<T> {
    if !random {
        return items;
    }
    let seed: u64 = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or_default();
    narrow_with(items, &mut StdRng::seed_from_u64(seed))
}

/// Same as [`narrow`] with random mode on, drawing the index from `rng`.
pub fn narrow_with<T, R: Rng>(mut items: Vec<T>, rng: &mut R) -> Vec<T> {
    if items.is_empty() {
        return items;
    }
    let idx: usize = rng.random_range(0..items.len());
    debug!(index = idx, candidates = items.len(), "selected single random target");
    vec![items.swap_remove(idx)]
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
