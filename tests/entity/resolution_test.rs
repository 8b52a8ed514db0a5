#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use fixgraph::config::Settings;
    use fixgraph::entity::{
        EntityExtractor, EntitySet, Reference, ReferenceResolver, ResolveError, UnresolvedPolicy,
    };
    use fixgraph::metadata::SqliteSource;
    use fixgraph::pipeline::PipelineError;
    use fixgraph::plan::KeepAll;
    use fixgraph::schema::{Schema, SchemaBuilder};
    use fixgraph::strategy::{InflectorNaming, LiteralRenderer, SqlTypeMapper, Strategies};
    use fixgraph::Pipeline;

    fn source(sql: &str) -> SqliteSource {
        let source = SqliteSource::open_in_memory().unwrap();
        source.connection().execute_batch(sql).unwrap();
        source
    }

    fn extract(source: &SqliteSource) -> (Schema, EntitySet) {
        let schema = SchemaBuilder::new(source).build("main").unwrap();
        let naming = InflectorNaming::default();
        let strategies = Strategies::new(&naming, &SqlTypeMapper, &LiteralRenderer);
        let set = EntityExtractor::new(&schema, source, strategies)
            .extract(&schema.creation_order())
            .unwrap();
        (schema, set)
    }

    #[test]
    fn test_composite_key_matches_equality_join() {
        let source = source(
            "CREATE TABLE parent (x INTEGER, y INTEGER, label TEXT, PRIMARY KEY (x, y));
             CREATE TABLE child (
                 id INTEGER PRIMARY KEY,
                 px INTEGER NOT NULL,
                 py INTEGER NOT NULL,
                 FOREIGN KEY (px, py) REFERENCES parent(x, y)
             );
             INSERT INTO parent VALUES (1, 1, 'a'), (1, 2, 'b'), (2, 1, 'c'), (2, 2, 'd');
             INSERT INTO child VALUES (1, 1, 2), (2, 2, 1), (3, 2, 2), (4, 1, 1), (5, 1, 2);",
        );
        let (schema, mut set) = extract(&source);
        ReferenceResolver::new(&schema).resolve(&mut set).unwrap();

        let resolved: BTreeSet<(String, String)> = set
            .iter()
            .filter(|e| !e.required.is_empty())
            .map(|e| {
                let target = e.required[0].target.entity().unwrap();
                (e.label.clone(), set.get(target).label.clone())
            })
            .collect();

        let mut stmt = source
            .connection()
            .prepare(
                "SELECT child.id, parent.x, parent.y FROM child
                 JOIN parent ON child.px = parent.x AND child.py = parent.y",
            )
            .unwrap();
        let joined: BTreeSet<(String, String)> = stmt
            .query_map([], |row| {
                let id: i64 = row.get(0)?;
                let x: i64 = row.get(1)?;
                let y: i64 = row.get(2)?;
                Ok((format!("child[id={}]", id), format!("parent[x={},y={}]", x, y)))
            })
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();

        assert_eq!(resolved.len(), 5);
        assert_eq!(resolved, joined);
    }

    #[test]
    fn test_required_reference_resolves() {
        let source = source(
            "CREATE TABLE ref (id INTEGER PRIMARY KEY);
             CREATE TABLE item (id INTEGER PRIMARY KEY, ref_id INTEGER NOT NULL REFERENCES ref(id));
             INSERT INTO ref VALUES (1);
             INSERT INTO item VALUES (1, 1);",
        );
        let (schema, mut set) = extract(&source);
        let stats = ReferenceResolver::new(&schema).resolve(&mut set).unwrap();
        assert_eq!(stats.resolved, 1);

        let item = set.iter().find(|e| e.label == "item[id=1]").unwrap();
        let target = item.required[0].target.entity().unwrap();
        assert_eq!(set.get(target).label, "ref[id=1]");
    }

    #[test]
    fn test_text_keys_resolve() {
        let source = source(
            "CREATE TABLE country (code TEXT PRIMARY KEY, name TEXT);
             CREATE TABLE city (id INTEGER PRIMARY KEY, country TEXT NOT NULL REFERENCES country(code));
             INSERT INTO country VALUES ('NZ', 'New Zealand'), ('AU', 'Australia');
             INSERT INTO city VALUES (1, 'AU'), (2, 'NZ');",
        );
        let (schema, mut set) = extract(&source);
        ReferenceResolver::new(&schema).resolve(&mut set).unwrap();

        let city = set.iter().find(|e| e.label == "city[id=2]").unwrap();
        let target = city.required[0].target.entity().unwrap();
        assert_eq!(set.get(target).label, "country[code=\"NZ\"]");
    }

    #[test]
    fn test_unresolved_optional_reference_is_cleared() {
        let source = source(
            "PRAGMA foreign_keys = OFF;
             CREATE TABLE node (id INTEGER PRIMARY KEY, parent_id INTEGER REFERENCES node(id));
             INSERT INTO node VALUES (1, NULL), (2, 99);",
        );
        let (schema, mut set) = extract(&source);
        let stats = ReferenceResolver::new(&schema).resolve(&mut set).unwrap();

        assert_eq!(stats.unresolved_optional, 1);
        let orphan = set.iter().find(|e| e.label == "node[id=2]").unwrap();
        assert!(orphan.optional.is_empty());
    }

    const DANGLING: &str = "
        PRAGMA foreign_keys = OFF;
        CREATE TABLE ref (id INTEGER PRIMARY KEY);
        CREATE TABLE item (id INTEGER PRIMARY KEY, ref_id INTEGER NOT NULL REFERENCES ref(id));
        INSERT INTO ref VALUES (1);
        INSERT INTO item VALUES (7, 2);
    ";

    #[test]
    fn test_unresolved_required_reference_fails_the_run() {
        let source = source(DANGLING);
        let err = Pipeline::new(Settings::default())
            .run(&source, &KeepAll)
            .unwrap_err();

        match err {
            PipelineError::Resolve(ResolveError::UnresolvedRequired {
                entity,
                foreign_key,
                target,
            }) => {
                assert_eq!(entity, "item[id=7]");
                assert_eq!(foreign_key, "fk_item_1");
                assert_eq!(target, "ref[id=2]");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_lenient_policy_keeps_an_unresolved_marker() {
        let source = source(DANGLING);
        let mut settings = Settings::default();
        settings.resolve.unresolved_required = UnresolvedPolicy::Warn;

        let plan = Pipeline::new(settings).run(&source, &KeepAll).unwrap();
        let item = plan.ordered().find(|e| e.label == "item[id=7]").unwrap();
        assert!(matches!(item.required[0].target, Reference::Unresolved(_)));
        assert_eq!(plan.labels(), vec!["ref[id=1]", "item[id=7]"]);
    }
}
