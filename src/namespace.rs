//! Namespace configuration and longest-prefix resolution.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Namespace classes as reported by an IMAP NAMESPACE response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NamespaceKind {
    Personal,
    Other,
    Shared,
}

/// A single configured namespace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Namespace {
    /// Mailbox prefix, including the trailing delimiter. Empty for the
    /// default personal namespace.
    pub prefix: String,
    /// Hierarchy delimiter within this namespace.
    pub delimiter: char,
    pub kind: NamespaceKind,
}

impl Namespace {
    /// The prefix without its trailing delimiter: the path of the placeholder
    /// node representing this namespace in the tree.
    pub fn placeholder_name(&self) -> &str {
        self.prefix.strip_suffix(self.delimiter).unwrap_or(&self.prefix)
    }
}

/// Resolves mailbox paths to their owning namespace.
///
/// Matching is longest-prefix over the configured namespaces; a path equal to
/// a prefix minus its trailing delimiter also matches. Paths outside every
/// configured prefix fall back to the default personal namespace, which is
/// synthesized at construction when the configuration does not carry one.
/// Resolution results are memoized per path.
#[derive(Debug)]
pub struct NamespaceRegistry {
    namespaces: Vec<Namespace>,
    fallback: usize,
    cache: HashMap<String, usize>,
}

impl NamespaceRegistry {
    pub fn new(mut namespaces: Vec<Namespace>, default_delimiter: char) -> Self {
        let fallback = match namespaces.iter().position(|ns| ns.prefix.is_empty()) {
            Some(idx) => idx,
            None => {
                namespaces.push(Namespace {
                    prefix: String::new(),
                    delimiter: default_delimiter,
                    kind: NamespaceKind::Personal,
                });
                namespaces.len() - 1
            }
        };
        Self { namespaces, fallback, cache: HashMap::new() }
    }

    /// All namespaces, the fallback included.
    #[inline]
    pub fn namespaces(&self) -> &[Namespace] {
        &self.namespaces
    }

    /// Resolves `path` to its owning namespace.
    pub fn resolve(&mut self, path: &str) -> Namespace {
        if let Some(&idx) = self.cache.get(path) {
            return self.namespaces[idx].clone();
        }

        let mut best: Option<usize> = None;
        for (idx, ns) in self.namespaces.iter().enumerate() {
            if ns.prefix.is_empty() {
                continue;
            }
            let matches = path == ns.placeholder_name() || path.starts_with(ns.prefix.as_str());
            if matches && best.map_or(true, |b| self.namespaces[b].prefix.len() < ns.prefix.len()) {
                best = Some(idx);
            }
        }

        let idx = best.unwrap_or(self.fallback);
        self.cache.insert(path.to_string(), idx);
        self.namespaces[idx].clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_registry() -> NamespaceRegistry {
        NamespaceRegistry::new(
            vec![
                Namespace {
                    prefix: "Other Users/".to_string(),
                    delimiter: '/',
                    kind: NamespaceKind::Other,
                },
                Namespace {
                    prefix: "Shared/".to_string(),
                    delimiter: '/',
                    kind: NamespaceKind::Shared,
                },
                Namespace {
                    prefix: "Shared/global/".to_string(),
                    delimiter: '/',
                    kind: NamespaceKind::Shared,
                },
            ],
            '/',
        )
    }

    #[test]
    fn synthesizes_personal_fallback() {
        let mut reg = make_registry();
        assert_eq!(reg.namespaces().len(), 4);
        let ns = reg.resolve("INBOX");
        assert_eq!(ns.kind, NamespaceKind::Personal);
        assert_eq!(ns.prefix, "");
    }

    #[test]
    fn longest_prefix_wins() {
        let mut reg = make_registry();
        let ns = reg.resolve("Shared/global/announce");
        assert_eq!(ns.prefix, "Shared/global/");
        let ns = reg.resolve("Shared/team");
        assert_eq!(ns.prefix, "Shared/");
    }

    #[test]
    fn prefix_minus_delimiter_matches_its_own_namespace() {
        let mut reg = make_registry();
        let ns = reg.resolve("Other Users");
        assert_eq!(ns.prefix, "Other Users/");
        assert_eq!(ns.placeholder_name(), "Other Users");
    }

    #[test]
    fn resolution_is_memoized() {
        let mut reg = make_registry();
        let first = reg.resolve("Shared/team/reports");
        let again = reg.resolve("Shared/team/reports");
        assert_eq!(first, again);
        assert!(reg.cache.contains_key("Shared/team/reports"));
    }

    #[test]
    fn configured_empty_prefix_is_the_fallback() {
        let mut reg = NamespaceRegistry::new(
            vec![Namespace {
                prefix: String::new(),
                delimiter: '.',
                kind: NamespaceKind::Personal,
            }],
            '/',
        );
        assert_eq!(reg.namespaces().len(), 1);
        assert_eq!(reg.resolve("anything").delimiter, '.');
    }
}
