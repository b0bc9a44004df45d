//! Leader election between several copies of the tool in one build.
//!
//! When more than one package in a dependency tree carries its own copy, only
//! the highest version should run. Each copy registers itself; the first call
//! to [`PackageRegistry::leader`] closes registration and elects the winner.

use std::cmp::Ordering;

use parking_lot::Mutex;
use tracing::debug;

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("Cannot register '{name}@{version}': leader already elected")]
    Locked { name: String, version: String },

    #[error("No candidates registered")]
    Empty,
}

/// A registered copy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub name: String,
    pub version: String,
}

#[derive(Debug, Default)]
struct RegistryState {
    candidates: Vec<Candidate>,
    leader: Option<Candidate>,
}

/// Scoped to one build session; create a fresh one per session.
#[derive(Debug, Default)]
pub struct PackageRegistry {
    state: Mutex<RegistryState>,
}

impl PackageRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        &self,
        name: impl Into<String>,
        version: impl Into<String>,
    ) -> Result<(), RegistryError> {
        let mut state = self.state.lock();
        let candidate = Candidate {
            name: name.into(),
            version: version.into(),
        };
        if state.leader.is_some() {
            return Err(RegistryError::Locked {
                name: candidate.name,
                version: candidate.version,
            });
        }
        state.candidates.push(candidate);
        Ok(())
    }

    /// Elect (on first call) and return the highest-versioned candidate.
    ///
    /// Ties keep the earliest registration.
    pub fn leader(&self) -> Result<Candidate, RegistryError> {
        let mut state = self.state.lock();
        if let Some(leader) = &state.leader {
            return Ok(leader.clone());
        }

        let mut winner: Option<&Candidate> = None;
        for candidate in &state.candidates {
            match winner {
                Some(best) if compare_versions(&candidate.version, &best.version) != Ordering::Greater => {}
                _ => winner = Some(candidate),
            }
        }
        let winner = winner.cloned().ok_or(RegistryError::Empty)?;

        debug!(name = %winner.name, version = %winner.version, "elected leader");
        state.leader = Some(winner.clone());
        Ok(winner)
    }

    pub fn is_locked(&self) -> bool {
        self.state.lock().leader.is_some()
    }
}

/// Compare dotted versions part by part.
///
/// Release parts compare numerically when both are numbers, lexically
/// otherwise, and a numeric part sorts after a non-numeric one. Missing parts
/// count as smaller. A prerelease (`-beta.1`) sorts below its release;
/// prerelease identifiers follow semver, numeric below alphanumeric. Build
/// metadata (`+sha`) is ignored.
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    let (a_release, a_pre) = split_version(a);
    let (b_release, b_pre) = split_version(b);

    compare_parts(a_release.split('.'), b_release.split('.'), |l, r| {
        match (l.parse::<u64>(), r.parse::<u64>()) {
            (Ok(l), Ok(r)) => l.cmp(&r),
            (Ok(_), Err(_)) => Ordering::Greater,
            (Err(_), Ok(_)) => Ordering::Less,
            (Err(_), Err(_)) => l.cmp(r),
        }
    })
    .then_with(|| match (a_pre, b_pre) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(l), Some(r)) => compare_parts(l.split('.'), r.split('.'), |l, r| {
            match (l.parse::<u64>(), r.parse::<u64>()) {
                (Ok(l), Ok(r)) => l.cmp(&r),
                (Ok(_), Err(_)) => Ordering::Less,
                (Err(_), Ok(_)) => Ordering::Greater,
                (Err(_), Err(_)) => l.cmp(r),
            }
        }),
    })
}

/// `1.2.3-beta.1+sha` → (`1.2.3`, `Some("beta.1")`).
fn split_version(version: &str) -> (&str, Option<&str>) {
    let version = version.split_once('+').map_or(version, |(v, _)| v);
    match version.split_once('-') {
        Some((release, pre)) => (release, Some(pre)),
        None => (version, None),
    }
}

fn compare_parts<'a>(
    mut left: impl Iterator<Item = &'a str>,
    mut right: impl Iterator<Item = &'a str>,
    cmp: impl Fn(&str, &str) -> Ordering,
) -> Ordering {
    loop {
        match (left.next(), right.next()) {
            (None, None) => return Ordering::Equal,
            (Some(_), None) => return Ordering::Greater,
            (None, Some(_)) => return Ordering::Less,
            (Some(l), Some(r)) => {
                let order = cmp(l, r);
                if order != Ordering::Equal {
                    return order;
                }
            }
        }
    }
}
