//! Resource graph - declarations, dependency edges and validation

use crate::context::{AttributeCatalog, ConfigSource};
use crate::error::{Error, Result};
use crate::resource::{is_valid_name, Declaration, Handle};
use crate::types::Value;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// Why one resource must come before another
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeKind {
    /// A property references the dependency's attribute
    Reference,
    /// Declared through `depends_on`
    Explicit,
    /// The dependency is the provider handle used to reach the resource
    Provider,
}

/// A "must exist before" edge: `from` is created before `to`
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Edge {
    pub from: String,
    pub to: String,
    pub kind: EdgeKind,
}

/// A named stack output
#[derive(Debug, Clone, PartialEq)]
pub struct Output {
    pub name: String,
    pub value: Value,
    pub sensitive: bool,
}

impl Output {
    /// Whether displays must hide the value
    pub fn is_masked(&self) -> bool {
        self.sensitive || self.value.is_secret()
    }
}

/// The declared resources of one stack
#[derive(Debug, Clone, Default)]
pub struct ResourceGraph {
    stack: String,
    resources: BTreeMap<String, Declaration>,
    insertion: Vec<String>,
    outputs: Vec<Output>,
}

impl ResourceGraph {
    pub fn new(stack: impl Into<String>) -> Self {
        Self {
            stack: stack.into(),
            ..Default::default()
        }
    }

    pub fn stack(&self) -> &str {
        &self.stack
    }

    /// Add a declaration, enforcing name validity and uniqueness
    pub fn add(&mut self, decl: Declaration) -> Result<Handle> {
        if !is_valid_name(&decl.name) {
            return Err(Error::InvalidName(decl.name));
        }
        if self.resources.contains_key(&decl.name) {
            return Err(Error::DuplicateName(decl.name));
        }
        log::debug!("declare {} ({})", decl.name, decl.kind);
        let handle = Handle::new(decl.name.clone(), decl.kind.clone());
        self.insertion.push(decl.name.clone());
        self.resources.insert(decl.name.clone(), decl);
        Ok(handle)
    }

    /// Export a stack output
    pub fn export(&mut self, name: impl Into<String>, value: Value, sensitive: bool) -> Result<()> {
        let name = name.into();
        if self.outputs.iter().any(|o| o.name == name) {
            return Err(Error::DuplicateOutput(name));
        }
        self.outputs.push(Output {
            name,
            value,
            sensitive,
        });
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Declaration> {
        self.resources.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.resources.contains_key(name)
    }

    /// Declarations in the order they were added
    pub fn iter(&self) -> impl Iterator<Item = &Declaration> {
        self.insertion.iter().filter_map(|n| self.resources.get(n))
    }

    /// Declarations of a given kind
    pub fn of_kind<'a>(&'a self, kind: &'a str) -> impl Iterator<Item = &'a Declaration> + 'a {
        self.iter().filter(move |d| d.kind == kind)
    }

    pub fn outputs(&self) -> &[Output] {
        &self.outputs
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    /// Every dependency edge, deduplicated and sorted
    ///
    /// Edges may point at undeclared resources; [`ResourceGraph::validate`]
    /// reports those.
    pub fn edges(&self) -> Vec<Edge> {
        let mut edges = BTreeSet::new();
        for decl in self.resources.values() {
            for r in decl.references() {
                edges.insert(Edge {
                    from: r.resource.clone(),
                    to: decl.name.clone(),
                    kind: EdgeKind::Reference,
                });
            }
            for dep in &decl.options.depends_on {
                edges.insert(Edge {
                    from: dep.clone(),
                    to: decl.name.clone(),
                    kind: EdgeKind::Explicit,
                });
            }
            if let Some(provider) = &decl.options.provider {
                edges.insert(Edge {
                    from: provider.clone(),
                    to: decl.name.clone(),
                    kind: EdgeKind::Provider,
                });
            }
        }
        edges.into_iter().collect()
    }

    /// `name` and everything it transitively depends on
    pub fn closure(&self, name: &str) -> BTreeSet<String> {
        let adjacency = self.adjacency_reversed();
        let mut seen = BTreeSet::new();
        let mut stack = vec![name.to_string()];
        while let Some(n) = stack.pop() {
            if !seen.insert(n.clone()) {
                continue;
            }
            if let Some(deps) = adjacency.get(&n) {
                stack.extend(deps.iter().cloned());
            }
        }
        seen
    }

    /// Check every graph invariant, collecting all violations
    pub fn validate<A, C>(&self, catalog: &A, config: &C) -> std::result::Result<(), Vec<Error>>
    where
        A: AttributeCatalog + ?Sized,
        C: ConfigSource + ?Sized,
    {
        let mut errors = Vec::new();

        for decl in self.iter() {
            for r in decl.references() {
                match self.resources.get(&r.resource) {
                    None => errors.push(Error::UnknownReference {
                        from: decl.name.clone(),
                        target: r.resource.clone(),
                    }),
                    Some(target) if !catalog.knows(&target.kind, &r.attribute) => {
                        errors.push(Error::UnknownAttribute {
                            from: decl.name.clone(),
                            target: r.resource.clone(),
                            kind: target.kind.clone(),
                            attribute: r.attribute.clone(),
                        });
                    }
                    Some(_) => {}
                }
            }
            for dep in &decl.options.depends_on {
                if !self.contains(dep) {
                    errors.push(Error::UnknownDependency {
                        from: decl.name.clone(),
                        target: dep.clone(),
                    });
                }
            }
            if let Some(provider) = &decl.options.provider
                && !self.contains(provider)
            {
                errors.push(Error::UnknownProvider {
                    from: decl.name.clone(),
                    target: provider.clone(),
                });
            }
            for s in decl.secret_refs() {
                if !config.has_secret(&s.key) {
                    errors.push(Error::MissingSecret {
                        resource: decl.name.clone(),
                        key: s.key.clone(),
                    });
                }
            }
        }

        for output in &self.outputs {
            let from = format!("output:{}", output.name);
            for r in output.value.refs() {
                if !self.contains(&r.resource) {
                    errors.push(Error::UnknownReference {
                        from: from.clone(),
                        target: r.resource.clone(),
                    });
                }
            }
            for s in output.value.secrets() {
                if !config.has_secret(&s.key) {
                    errors.push(Error::MissingSecret {
                        resource: from.clone(),
                        key: s.key.clone(),
                    });
                }
            }
        }

        if let Some(cycle) = self.find_cycle() {
            errors.push(Error::Cycle(cycle));
        }

        log::debug!(
            "validated {} resources in stack '{}': {} problem(s)",
            self.len(),
            self.stack,
            errors.len()
        );

        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }

    /// Find one dependency cycle, returned as a closed path `a -> b -> a`
    pub fn find_cycle(&self) -> Option<Vec<String>> {
        #[derive(Clone, Copy, PartialEq)]
        enum Mark {
            Visiting,
            Done,
        }

        fn visit(
            node: &str,
            adjacency: &BTreeMap<String, BTreeSet<String>>,
            marks: &mut BTreeMap<String, Mark>,
            path: &mut Vec<String>,
        ) -> Option<Vec<String>> {
            match marks.get(node) {
                Some(Mark::Done) => return None,
                Some(Mark::Visiting) => {
                    let start = path.iter().position(|n| n == node).unwrap_or(0);
                    let mut cycle = path[start..].to_vec();
                    cycle.push(node.to_string());
                    return Some(cycle);
                }
                None => {}
            }
            marks.insert(node.to_string(), Mark::Visiting);
            path.push(node.to_string());
            if let Some(next) = adjacency.get(node) {
                for n in next {
                    if let Some(cycle) = visit(n, adjacency, marks, path) {
                        return Some(cycle);
                    }
                }
            }
            path.pop();
            marks.insert(node.to_string(), Mark::Done);
            None
        }

        let adjacency = self.adjacency();
        let mut marks = BTreeMap::new();
        for name in self.resources.keys() {
            let mut path = Vec::new();
            if let Some(cycle) = visit(name, &adjacency, &mut marks, &mut path) {
                return Some(cycle);
            }
        }
        None
    }

    /// dependency -> dependents, declared resources only
    pub(crate) fn adjacency(&self) -> BTreeMap<String, BTreeSet<String>> {
        let mut adjacency: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        for edge in self.edges() {
            if self.contains(&edge.from) && self.contains(&edge.to) {
                adjacency.entry(edge.from).or_default().insert(edge.to);
            }
        }
        adjacency
    }

    /// dependent -> dependencies, declared resources only
    fn adjacency_reversed(&self) -> BTreeMap<String, BTreeSet<String>> {
        let mut adjacency: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        for edge in self.edges() {
            if self.contains(&edge.from) && self.contains(&edge.to) {
                adjacency.entry(edge.to).or_default().insert(edge.from);
            }
        }
        adjacency
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{AnyAttribute, MapConfig};
    use crate::types::Properties;

    fn raw(name: &str, props: Properties) -> Declaration {
        Declaration::raw("test:index:Thing", name, props)
    }

    struct OnlyId;

    impl AttributeCatalog for OnlyId {
        fn knows(&self, _kind: &str, attribute: &str) -> bool {
            attribute == "id"
        }
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let mut g = ResourceGraph::new("dev");
        g.add(raw("a", Properties::new())).unwrap();
        let err = g.add(raw("a", Properties::new())).unwrap_err();
        assert!(matches!(err, Error::DuplicateName(n) if n == "a"));
    }

    #[test]
    fn test_invalid_name_rejected() {
        let mut g = ResourceGraph::new("dev");
        assert!(matches!(
            g.add(raw("bad name", Properties::new())),
            Err(Error::InvalidName(_))
        ));
    }

    #[test]
    fn test_dotted_names_rejected_so_refs_stay_unambiguous() {
        let mut g = ResourceGraph::new("dev");
        assert!(matches!(
            g.add(raw("a.b", Properties::new())),
            Err(Error::InvalidName(n)) if n == "a.b"
        ));

        // With no dot in the name, the first dot separates it from the attribute
        g.add(raw("a", Properties::new())).unwrap();
        let json = serde_json::to_string(&Value::reference("a", "b.id")).unwrap();
        assert_eq!(json, r#"{"$ref":"a.b.id"}"#);
    }

    #[test]
    fn test_edges_from_refs_depends_on_and_provider() {
        let mut g = ResourceGraph::new("dev");
        let a = g.add(raw("a", Properties::new())).unwrap();
        let p = g.add(raw("p", Properties::new())).unwrap();
        g.add(
            raw("b", Properties::new().with("x", a.attr("id")))
                .depends_on(&a)
                .with_provider(&p),
        )
        .unwrap();

        let edges = g.edges();
        assert_eq!(edges.len(), 3);
        assert!(edges.iter().any(|e| e.from == "a" && e.to == "b" && e.kind == EdgeKind::Reference));
        assert!(edges.iter().any(|e| e.from == "a" && e.to == "b" && e.kind == EdgeKind::Explicit));
        assert!(edges.iter().any(|e| e.from == "p" && e.to == "b" && e.kind == EdgeKind::Provider));
        assert_eq!(
            g.closure("b"),
            ["a".to_string(), "b".to_string(), "p".to_string()].into_iter().collect()
        );
    }

    #[test]
    fn test_validate_reports_all_problems() {
        let mut g = ResourceGraph::new("dev");
        g.add(raw("a", Properties::new())).unwrap();
        let mut b = raw(
            "b",
            Properties::new()
                .with("x", Value::reference("ghost", "id"))
                .with("y", Value::reference("a", "selfLink"))
                .with("pw", Value::secret("unknown")),
        );
        b.options.depends_on.push("phantom".into());
        b.options.provider = Some("k8s".into());
        g.add(b).unwrap();

        let errors = g.validate(&OnlyId, &MapConfig::new()).unwrap_err();
        assert_eq!(errors.len(), 5);
        assert!(errors.iter().any(|e| matches!(e, Error::UnknownReference { target, .. } if target == "ghost")));
        assert!(errors.iter().any(|e| matches!(e, Error::UnknownAttribute { attribute, .. } if attribute == "selfLink")));
        assert!(errors.iter().any(|e| matches!(e, Error::UnknownDependency { target, .. } if target == "phantom")));
        assert!(errors.iter().any(|e| matches!(e, Error::UnknownProvider { target, .. } if target == "k8s")));
        assert!(errors.iter().any(|e| matches!(e, Error::MissingSecret { key, .. } if key == "unknown")));
    }

    #[test]
    fn test_cycle_detected_with_path() {
        let mut g = ResourceGraph::new("dev");
        g.add(raw("a", Properties::new().with("x", Value::reference("c", "id"))))
            .unwrap();
        g.add(raw("b", Properties::new().with("x", Value::reference("a", "id"))))
            .unwrap();
        g.add(raw("c", Properties::new().with("x", Value::reference("b", "id"))))
            .unwrap();

        let cycle = g.find_cycle().unwrap();
        assert_eq!(cycle.first(), cycle.last());
        assert_eq!(cycle.len(), 4);

        let errors = g.validate(&AnyAttribute, &MapConfig::new()).unwrap_err();
        assert!(matches!(errors.as_slice(), [Error::Cycle(_)]));
    }

    #[test]
    fn test_closure_includes_transitive_dependencies() {
        let mut g = ResourceGraph::new("dev");
        let a = g.add(raw("a", Properties::new())).unwrap();
        let b = g.add(raw("b", Properties::new().with("x", a.attr("id")))).unwrap();
        g.add(raw("c", Properties::new()).depends_on(&b)).unwrap();
        g.add(raw("unrelated", Properties::new())).unwrap();

        let closure = g.closure("c");
        assert_eq!(closure.len(), 3);
        assert!(!closure.contains("unrelated"));
    }

    #[test]
    fn test_outputs_masked_and_unique() {
        let mut g = ResourceGraph::new("dev");
        let a = g.add(raw("a", Properties::new())).unwrap();
        g.export("endpoint", a.attr("id"), false).unwrap();
        g.export("kubeconfig", a.attr("id"), true).unwrap();
        assert!(g.export("endpoint", a.attr("id"), false).is_err());
        assert!(!g.outputs()[0].is_masked());
        assert!(g.outputs()[1].is_masked());
    }
}
