use crate::errors::AppError;
use crate::models::TableSpec;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};
use std::fmt::Write;

/// The expected schema, validated and held in dependency order.
///
/// Lookups never touch the network. Rendered statements are meant for an
/// operator to review and run; nothing here executes them.
#[derive(Debug, Clone)]
pub struct DdlRegistry {
    specs: Vec<TableSpec>,
}

impl DdlRegistry {
    /// Validates `specs` and orders them so every table follows its dependencies.
    ///
    /// Fails on duplicate names, unknown dependencies and dependency cycles.
    pub fn new(specs: Vec<TableSpec>) -> Result<Self, AppError> {
        let mut seen = HashSet::new();
        for spec in &specs {
            if spec.name.trim().is_empty() {
                return Err(AppError::Config("table with empty name".into()));
            }
            if !seen.insert(spec.name.as_str()) {
                return Err(AppError::Config(format!("table {} declared twice", spec.name)));
            }
        }
        for spec in &specs {
            for dep in &spec.dependencies {
                if !seen.contains(dep.as_str()) {
                    return Err(AppError::Config(format!(
                        "table {} depends on unknown table {}",
                        spec.name, dep
                    )));
                }
                if dep == &spec.name {
                    return Err(AppError::Config(format!(
                        "table {} depends on itself",
                        spec.name
                    )));
                }
            }
        }

        let specs = dependency_order(specs)?;
        Ok(Self { specs })
    }

    /// All specs, dependencies first.
    pub fn specs(&self) -> &[TableSpec] {
        &self.specs
    }

    pub fn table_names(&self) -> Vec<String> {
        self.specs.iter().map(|s| s.name.clone()).collect()
    }

    pub fn get(&self, table: &str) -> Option<&TableSpec> {
        self.specs.iter().find(|s| s.name == table)
    }

    /// Creation statement for `table`.
    pub fn render(&self, table: &str) -> Result<&str, AppError> {
        self.get(table)
            .map(|s| s.ddl.as_str())
            .ok_or_else(|| AppError::NotFound(format!("no DDL registered for table {}", table)))
    }

    /// Creation statements for every table in `missing` that has one.
    pub fn render_missing(&self, missing: &BTreeSet<String>) -> BTreeMap<String, String> {
        let mut rendered = BTreeMap::new();
        for table in missing {
            match self.render(table) {
                Ok(ddl) => {
                    rendered.insert(table.clone(), ddl.to_string());
                }
                Err(e) => tracing::warn!("{}", e),
            }
        }
        rendered
    }

    /// One script with the DDL of `missing`, in dependency order.
    pub fn render_script(&self, missing: &BTreeSet<String>) -> String {
        let mut script = String::new();
        for spec in self.specs.iter().filter(|s| missing.contains(&s.name)) {
            let _ = writeln!(script, "-- {}", spec.name.to_uppercase());
            let _ = writeln!(script, "{}", spec.ddl);
            script.push('\n');
        }
        script
    }
}

/// Kahn's algorithm; ties keep declaration order.
fn dependency_order(specs: Vec<TableSpec>) -> Result<Vec<TableSpec>, AppError> {
    let position: HashMap<String, usize> = specs
        .iter()
        .enumerate()
        .map(|(i, s)| (s.name.clone(), i))
        .collect();

    let mut pending: Vec<usize> = specs.iter().map(|s| s.dependencies.len()).collect();
    let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); specs.len()];
    for (i, spec) in specs.iter().enumerate() {
        for dep in &spec.dependencies {
            dependents[position[dep]].push(i);
        }
    }

    let mut ready: VecDeque<usize> = (0..specs.len()).filter(|&i| pending[i] == 0).collect();
    let mut order = Vec::with_capacity(specs.len());
    while let Some(i) = ready.pop_front() {
        order.push(i);
        let mut unlocked = Vec::new();
        for &d in &dependents[i] {
            pending[d] -= 1;
            if pending[d] == 0 {
                unlocked.push(d);
            }
        }
        unlocked.sort_unstable();
        ready.extend(unlocked);
    }

    if order.len() != specs.len() {
        let stuck: Vec<&str> = specs
            .iter()
            .enumerate()
            .filter(|(i, _)| pending[*i] > 0)
            .map(|(_, s)| s.name.as_str())
            .collect();
        return Err(AppError::Config(format!(
            "dependency cycle among tables: {}",
            stuck.join(", ")
        )));
    }

    let mut slots: Vec<Option<TableSpec>> = specs.into_iter().map(Some).collect();
    Ok(order.into_iter().filter_map(|i| slots[i].take()).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(name: &str, deps: &[&str]) -> TableSpec {
        TableSpec::new(name, &format!("CREATE TABLE {} (id TEXT PRIMARY KEY);", name), deps)
    }

    #[test]
    fn test_orders_dependencies_first() {
        let registry = DdlRegistry::new(vec![
            spec("enrollments", &["lectures", "chapters"]),
            spec("chapters", &["lectures"]),
            spec("lectures", &[]),
            spec("products", &[]),
        ])
        .unwrap();
        assert_eq!(
            registry.table_names(),
            vec!["lectures", "products", "chapters", "enrollments"]
        );
    }

    #[test]
    fn test_rejects_cycles_and_unknown_tables() {
        let cycle = DdlRegistry::new(vec![spec("a", &["b"]), spec("b", &["a"])]);
        assert!(matches!(cycle, Err(AppError::Config(msg)) if msg.contains("cycle")));

        let unknown = DdlRegistry::new(vec![spec("a", &["ghost"])]);
        assert!(unknown.is_err());

        let duplicate = DdlRegistry::new(vec![spec("a", &[]), spec("a", &[])]);
        assert!(duplicate.is_err());
    }

    #[test]
    fn test_render_and_not_found() {
        let registry = DdlRegistry::new(vec![spec("a", &[])]).unwrap();
        assert!(registry.render("a").unwrap().starts_with("CREATE TABLE a"));
        assert!(matches!(registry.render("zzz"), Err(AppError::NotFound(_))));
    }

    #[test]
    fn test_render_script_follows_dependency_order() {
        let registry = DdlRegistry::new(vec![spec("child", &["parent"]), spec("parent", &[])])
            .unwrap();
        let missing: BTreeSet<String> = ["child".to_string(), "parent".to_string()].into();
        let script = registry.render_script(&missing);
        let parent_at = script.find("-- PARENT").unwrap();
        let child_at = script.find("-- CHILD").unwrap();
        assert!(parent_at < child_at);
    }
}
