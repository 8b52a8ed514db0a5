#[cfg(test)]
mod tests {
    use fixgraph::entity::{EntityExtractor, EntitySet, FkTag, Reference};
    use fixgraph::metadata::SqliteSource;
    use fixgraph::schema::{Schema, SchemaBuilder};
    use fixgraph::strategy::{InflectorNaming, LiteralRenderer, SqlTypeMapper, Strategies};

    fn source(sql: &str) -> SqliteSource {
        let source = SqliteSource::open_in_memory().unwrap();
        source.connection().execute_batch(sql).unwrap();
        source
    }

    fn extract(source: &SqliteSource, fetch_size: usize) -> (Schema, EntitySet) {
        let schema = SchemaBuilder::new(source).build("main").unwrap();
        let naming = InflectorNaming::default();
        let strategies = Strategies::new(&naming, &SqlTypeMapper, &LiteralRenderer);
        let set = EntityExtractor::new(&schema, source, strategies)
            .fetch_size(fetch_size)
            .extract(&schema.creation_order())
            .unwrap();
        (schema, set)
    }

    #[test]
    fn test_required_and_optional_placeholders() {
        let source = source(
            "CREATE TABLE customer (id INTEGER PRIMARY KEY, name TEXT);
             CREATE TABLE orders (
                 id INTEGER PRIMARY KEY,
                 customer_id INTEGER NOT NULL REFERENCES customer(id),
                 referrer_id INTEGER REFERENCES customer(id),
                 note TEXT
             );
             INSERT INTO customer VALUES (1, 'ann'), (2, 'bob');
             INSERT INTO orders VALUES (10, 1, 2, 'first'), (11, 2, NULL, NULL);",
        );
        let (schema, set) = extract(&source, 500);
        assert_eq!(set.len(), 4);

        let orders: Vec<_> = set
            .of_table(schema.find_table_by_name("orders").unwrap())
            .collect();
        let first = orders[0];
        assert_eq!(first.label, "orders[id=10]");
        assert_eq!(first.required.len(), 1);
        assert_eq!(first.required[0].attribute, "customer");
        match &first.required[0].target {
            Reference::Placeholder(p) => {
                assert_eq!(p.target_table, schema.find_table_by_name("customer").unwrap());
                assert_eq!(p.key_value("id").unwrap().as_str(), "1");
            }
            other => panic!("expected a placeholder, got {other:?}"),
        }
        assert!(first.optional.contains_key("referrer"));

        // Attached key columns are not repeated as plain values
        assert!(first.value("customerId").is_none());
        assert!(first.value("referrerId").is_none());
        assert_eq!(first.value("note").unwrap().value.as_str(), "\"first\"");
        assert_eq!(first.value("note").unwrap().fk, FkTag::NonFk);

        let second = orders[1];
        assert!(second.optional.is_empty());
        assert!(second.value("note").is_none());
    }

    #[test]
    fn test_partially_null_composite_key_is_absent() {
        let source = source(
            "CREATE TABLE slot (day INTEGER, hour INTEGER, PRIMARY KEY (day, hour));
             CREATE TABLE booking (
                 id INTEGER PRIMARY KEY,
                 slot_day INTEGER,
                 slot_hour INTEGER,
                 FOREIGN KEY (slot_day, slot_hour) REFERENCES slot(day, hour)
             );
             INSERT INTO slot VALUES (1, 9);
             INSERT INTO booking VALUES (1, 1, 9), (2, 1, NULL);",
        );
        let (schema, set) = extract(&source, 500);

        let bookings: Vec<_> = set
            .of_table(schema.find_table_by_name("booking").unwrap())
            .collect();
        assert_eq!(bookings[0].optional.len(), 1);
        assert!(bookings[0].value("slotDay").is_none());

        // The half key stays visible as a plain FK-tagged value
        assert!(bookings[1].optional.is_empty());
        let day = bookings[1].value("slotDay").unwrap();
        assert_eq!(day.value.as_str(), "1");
        assert_eq!(day.fk, FkTag::Fk);
    }

    #[test]
    fn test_key_columns_stay_as_values() {
        let source = source(
            "CREATE TABLE parent (id INTEGER PRIMARY KEY);
             CREATE TABLE child (
                 parent_id INTEGER PRIMARY KEY REFERENCES parent(id),
                 extra TEXT
             );
             CREATE TABLE grandchild (
                 id INTEGER PRIMARY KEY,
                 child_id INTEGER NOT NULL REFERENCES child(parent_id)
             );
             INSERT INTO parent VALUES (5);
             INSERT INTO child VALUES (5, 'x');
             INSERT INTO grandchild VALUES (1, 5);",
        );
        let (schema, set) = extract(&source, 500);

        let child = set
            .of_table(schema.find_table_by_name("child").unwrap())
            .next()
            .unwrap();
        assert_eq!(child.required.len(), 1);
        let key = child.value("parentId").unwrap();
        assert_eq!(key.value.as_str(), "5");
        assert_eq!(key.fk, FkTag::Fk);

        let grandchild = set
            .of_table(schema.find_table_by_name("grandchild").unwrap())
            .next()
            .unwrap();
        match &grandchild.required[0].target {
            Reference::Placeholder(p) => assert_eq!(p.key_value("parentId").unwrap().as_str(), "5"),
            other => panic!("expected a placeholder, got {other:?}"),
        }
    }

    #[test]
    fn test_colliding_reference_names_stay_distinct() {
        let source = source(
            "CREATE TABLE x (id INTEGER PRIMARY KEY);
             CREATE TABLE y (id INTEGER PRIMARY KEY);
             CREATE TABLE z (id INTEGER PRIMARY KEY);
             CREATE TABLE t (
                 id INTEGER PRIMARY KEY,
                 a2_id INTEGER REFERENCES y(id),
                 a_id INTEGER REFERENCES x(id),
                 FOREIGN KEY (a_id) REFERENCES z(id)
             );
             INSERT INTO x VALUES (1);
             INSERT INTO y VALUES (1);
             INSERT INTO z VALUES (1);
             INSERT INTO t VALUES (1, 1, 1);",
        );
        let (schema, set) = extract(&source, 500);
        let t = set
            .of_table(schema.find_table_by_name("t").unwrap())
            .next()
            .unwrap();

        let names: Vec<&str> = t.optional.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["a", "a2", "a3"]);

        let target = |name: &str| {
            let fk = schema.foreign_key(t.optional[name].foreign_key);
            schema.table(fk.target).name.name.clone()
        };
        assert_eq!(target("a2"), "y");
        let mut others = vec![target("a"), target("a3")];
        others.sort();
        assert_eq!(others, vec!["x", "z"]);
    }

    #[test]
    fn test_small_batches_see_every_row() {
        let source = source(
            "CREATE TABLE item (id INTEGER PRIMARY KEY, label TEXT);
             WITH RECURSIVE n(i) AS (SELECT 1 UNION ALL SELECT i + 1 FROM n WHERE i < 23)
             INSERT INTO item SELECT i, 'item ' || i FROM n;",
        );
        let (_, set) = extract(&source, 5);

        assert_eq!(set.len(), 23);
        let labels: Vec<&str> = set.iter().map(|e| e.label.as_str()).collect();
        assert_eq!(labels.first(), Some(&"item[id=1]"));
        assert_eq!(labels.last(), Some(&"item[id=23]"));
    }

    #[test]
    fn test_values_render_by_type() {
        let source = source(
            "CREATE TABLE sample (
                 id INTEGER PRIMARY KEY,
                 active BOOLEAN,
                 price DECIMAL(8, 2),
                 ratio REAL,
                 payload BLOB
             );
             INSERT INTO sample VALUES (1, 1, 9.5, 0.25, x'0102');",
        );
        let (_, set) = extract(&source, 500);
        let sample = set.iter().next().unwrap();

        assert_eq!(sample.value("active").unwrap().value.as_str(), "true");
        assert_eq!(sample.value("price").unwrap().value.as_str(), "9.5");
        assert_eq!(sample.value("ratio").unwrap().value.as_str(), "0.25");
        assert_eq!(sample.value("payload").unwrap().value.as_str(), "vec![1, 2]");
    }
}
