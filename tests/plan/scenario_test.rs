#[cfg(test)]
mod tests {
    use fixgraph::config::Settings;
    use fixgraph::entity::{Entity, EntityKind};
    use fixgraph::metadata::SqliteSource;
    use fixgraph::pipeline::PipelineError;
    use fixgraph::plan::{Inclusion, KeepAll, PlanError};
    use fixgraph::schema::ConstructorArg;
    use fixgraph::Pipeline;

    fn source(sql: &str) -> SqliteSource {
        let source = SqliteSource::open_in_memory().unwrap();
        source.connection().execute_batch(sql).unwrap();
        source
    }

    fn pipeline() -> Pipeline {
        Pipeline::new(Settings::default())
    }

    #[test]
    fn test_required_reference_orders_target_first() {
        let source = source(
            "CREATE TABLE item (id INTEGER PRIMARY KEY, ref_id INTEGER NOT NULL REFERENCES ref(id));
             CREATE TABLE ref (id INTEGER PRIMARY KEY);
             INSERT INTO ref VALUES (1);
             INSERT INTO item VALUES (1, 1);",
        );
        let plan = pipeline().run(&source, &KeepAll).unwrap();

        assert_eq!(plan.labels(), vec!["ref[id=1]", "item[id=1]"]);
        let item = plan.ordered().nth(1).unwrap();
        let target = item.required[0].target.entity().unwrap();
        assert_eq!(plan.entities.get(target).label, "ref[id=1]");
    }

    #[test]
    fn test_nullable_self_reference_sorts() {
        let source = source(
            "CREATE TABLE node (id INTEGER PRIMARY KEY, parent_id INTEGER REFERENCES node(id));
             INSERT INTO node VALUES (2, 1), (1, NULL);",
        );
        let plan = pipeline().run(&source, &KeepAll).unwrap();
        assert_eq!(plan.order.len(), 2);

        let child = plan.ordered().find(|e| e.label == "node[id=2]").unwrap();
        let parent = child.optional["parent"].target.entity().unwrap();
        assert_eq!(plan.entities.get(parent).label, "node[id=1]");

        let root = plan.ordered().find(|e| e.label == "node[id=1]").unwrap();
        assert!(root.optional.is_empty());
    }

    #[test]
    fn test_join_table_recorded_for_each_anchor() {
        let source = source(
            "CREATE TABLE user (id INTEGER PRIMARY KEY, name TEXT);
             CREATE TABLE company (id INTEGER PRIMARY KEY, name TEXT);
             CREATE TABLE user_company (
                 user_id INTEGER NOT NULL REFERENCES user(id),
                 company_id INTEGER NOT NULL REFERENCES company(id),
                 PRIMARY KEY (user_id, company_id)
             );
             INSERT INTO user VALUES (1, 'ann');
             INSERT INTO company VALUES (1, 'acme');
             INSERT INTO user_company VALUES (1, 1);",
        );
        let plan = pipeline().run(&source, &KeepAll).unwrap();

        let user = plan.schema.find_table_by_name("user").unwrap();
        let user_company = plan.schema.find_table_by_name("user_company").unwrap();
        let shape = plan.joins.shape(user, user_company).unwrap();
        assert_eq!(shape[0], ConstructorArg::This);
        assert_eq!(shape[1].to_string(), "companyId");

        assert_eq!(
            plan.labels(),
            vec![
                "user[id=1]",
                "company[id=1]",
                "user_company[user_id=1,company_id=1]",
            ]
        );
    }

    #[test]
    fn test_dropped_dependency_names_the_dependent() {
        let source = source(
            "CREATE TABLE a (id INTEGER PRIMARY KEY);
             CREATE TABLE b (id INTEGER PRIMARY KEY, a_id INTEGER NOT NULL REFERENCES a(id));
             INSERT INTO a VALUES (1);
             INSERT INTO b VALUES (1, 1);",
        );
        let decider = |e: &Entity| {
            if e.label.starts_with("a[") {
                Inclusion::Drop
            } else {
                Inclusion::Keep
            }
        };
        let err = pipeline().run(&source, &decider).unwrap_err();

        match &err {
            PipelineError::Plan(PlanError::DroppedDependency { entity, dependency }) => {
                assert_eq!(entity, "b[id=1]");
                assert_eq!(dependency, "a[id=1]");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(err.to_string(), "b[id=1] requires a[id=1], which was dropped");
    }

    #[test]
    fn test_existing_entity_is_replaced_everywhere() {
        let source = source(
            "CREATE TABLE a (id INTEGER PRIMARY KEY, name TEXT);
             CREATE TABLE b (id INTEGER PRIMARY KEY, a_id INTEGER REFERENCES a(id));
             CREATE TABLE c (id INTEGER PRIMARY KEY, a_id INTEGER NOT NULL REFERENCES a(id));
             INSERT INTO a VALUES (1, 'shared');
             INSERT INTO b VALUES (1, 1);
             INSERT INTO c VALUES (1, 1);",
        );
        let decider = |e: &Entity| {
            if e.label.starts_with("a[") {
                Inclusion::Existing
            } else {
                Inclusion::Keep
            }
        };
        let plan = pipeline().run(&source, &decider).unwrap();

        assert_eq!(
            plan.labels(),
            vec!["a[id=1] (existing)", "b[id=1]", "c[id=1]"]
        );

        let (&original, &stand_in) = plan.replaced.iter().next().unwrap();
        assert_eq!(
            plan.entities.get(stand_in).kind,
            EntityKind::Existing { replaces: original }
        );

        let b = plan.ordered().nth(1).unwrap();
        let c = plan.ordered().nth(2).unwrap();
        assert_eq!(b.optional["a"].target.entity(), Some(stand_in));
        assert_eq!(c.required[0].target.entity(), Some(stand_in));
        assert!(plan
            .ordered()
            .flat_map(|e| e.links())
            .all(|link| link.target.entity() != Some(original)));
    }

    #[test]
    fn test_required_cycle_is_reported() {
        let source = source(
            "PRAGMA foreign_keys = OFF;
             CREATE TABLE x (id INTEGER PRIMARY KEY, y_id INTEGER NOT NULL REFERENCES y(id));
             CREATE TABLE y (id INTEGER PRIMARY KEY, x_id INTEGER NOT NULL REFERENCES x(id));
             INSERT INTO x VALUES (1, 1);
             INSERT INTO y VALUES (1, 1);",
        );
        let err = pipeline().run(&source, &KeepAll).unwrap_err();

        match err {
            PipelineError::Plan(PlanError::RequiredCycle { entities }) => {
                assert_eq!(entities.len(), 2);
                assert!(entities.contains(&"x[id=1]".to_string()));
                assert!(entities.contains(&"y[id=1]".to_string()));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    const LIBRARY: &str = "
        CREATE TABLE author (id INTEGER PRIMARY KEY, name TEXT NOT NULL);
        CREATE TABLE book (
            id INTEGER PRIMARY KEY,
            author_id INTEGER NOT NULL REFERENCES author(id),
            sequel_of INTEGER REFERENCES book(id),
            title TEXT
        );
        CREATE TABLE loan (
            id INTEGER PRIMARY KEY,
            book_id INTEGER NOT NULL REFERENCES book(id),
            returned BOOLEAN
        );
        INSERT INTO author VALUES (1, 'le guin'), (2, 'banks');
        INSERT INTO book VALUES (10, 2, NULL, 'consider phlebas'), (11, 1, NULL, 'the dispossessed'), (12, 2, 10, 'the player of games');
        INSERT INTO loan VALUES (100, 12, 0), (101, 11, 1);
    ";

    #[test]
    fn test_library_creation_order() {
        let source = source(LIBRARY);
        let plan = pipeline().run(&source, &KeepAll).unwrap();

        insta::assert_snapshot!(plan.labels().join("\n"), @r"
        author[id=1]
        author[id=2]
        book[id=10]
        book[id=11]
        book[id=12]
        loan[id=100]
        loan[id=101]
        ");
    }

    #[test]
    fn test_plan_serializes_to_json() {
        let source = source(LIBRARY);
        let mut settings = Settings::default();
        settings.inclusion.existing = vec!["author".into()];
        let plan = Pipeline::new(settings).run_configured(&source).unwrap();

        let json: serde_json::Value = serde_json::from_str(&plan.to_json().unwrap()).unwrap();
        assert_eq!(json["order"].as_array().unwrap().len(), 7);
        assert_eq!(json["replaced"].as_object().unwrap().len(), 2);
        assert_eq!(json["schema"]["name"], "main");

        let first = json["order"][0].as_u64().unwrap() as usize;
        let stand_in = &json["entities"][first];
        assert_eq!(stand_in["kind"]["type"], "existing");
        assert_eq!(stand_in["label"], "author[id=1]");

        let book = json["entities"]
            .as_array()
            .unwrap()
            .iter()
            .find(|e| e["label"] == "book[id=12]")
            .unwrap();
        assert_eq!(book["required"][0]["target"]["state"], "resolved");
        assert_eq!(book["optional"]["book"]["target"]["state"], "resolved");
        let title = book["values"]
            .as_array()
            .unwrap()
            .iter()
            .find(|v| v["name"] == "title")
            .unwrap();
        assert_eq!(title["value"]["fk"], "NON_FK");
    }
}
