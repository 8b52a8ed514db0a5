#[cfg(test)]
mod tests {
    use fixgraph::config::Settings;
    use fixgraph::metadata::SqliteSource;
    use fixgraph::schema::ConstructorArg;
    use fixgraph::Pipeline;

    fn source(ddl: &str) -> SqliteSource {
        let source = SqliteSource::open_in_memory().unwrap();
        source.connection().execute_batch(ddl).unwrap();
        source
    }

    #[test]
    fn test_user_company_simplification() {
        let source = source(
            "CREATE TABLE user (id INTEGER PRIMARY KEY, name TEXT);
             CREATE TABLE company (id INTEGER PRIMARY KEY, name TEXT);
             CREATE TABLE user_company (
                 user_id INTEGER NOT NULL REFERENCES user(id),
                 company_id INTEGER NOT NULL REFERENCES company(id),
                 PRIMARY KEY (user_id, company_id)
             );",
        );
        let (schema, joins) = Pipeline::new(Settings::default()).inspect(&source).unwrap();

        let user = schema.find_table_by_name("user").unwrap();
        let company = schema.find_table_by_name("company").unwrap();
        let user_company = schema.find_table_by_name("user_company").unwrap();
        assert_eq!(schema.join_tables(), vec![user_company]);

        let shape = joins.shape(user, user_company).unwrap();
        assert_eq!(shape.len(), 2);
        assert_eq!(shape[0], ConstructorArg::This);
        match &shape[1] {
            ConstructorArg::Param { name, table, .. } => {
                assert_eq!(name, "companyId");
                assert_eq!(*table, company);
            }
            other => panic!("expected a parameter, got {other}"),
        }

        let for_company = joins.for_anchor(company).unwrap();
        assert_eq!(for_company.len(), 1);
        assert!(joins.for_anchor(user_company).is_none());
    }

    #[test]
    fn test_three_way_join_table() {
        let source = source(
            "CREATE TABLE student (id INTEGER PRIMARY KEY);
             CREATE TABLE course (id INTEGER PRIMARY KEY);
             CREATE TABLE term (id INTEGER PRIMARY KEY);
             CREATE TABLE enrolment (
                 student_id INTEGER NOT NULL REFERENCES student(id),
                 course_id INTEGER NOT NULL REFERENCES course(id),
                 term_id INTEGER NOT NULL REFERENCES term(id),
                 PRIMARY KEY (student_id, course_id, term_id)
             );",
        );
        let (schema, joins) = Pipeline::new(Settings::default()).inspect(&source).unwrap();

        let course = schema.find_table_by_name("course").unwrap();
        let enrolment = schema.find_table_by_name("enrolment").unwrap();
        let shape: Vec<String> = joins
            .shape(course, enrolment)
            .unwrap()
            .iter()
            .map(ToString::to_string)
            .collect();
        assert_eq!(shape, vec!["studentId", "this", "termId"]);
        assert_eq!(joins.iter().count(), 3);
    }

    #[test]
    fn test_ordinary_tables_are_not_join_tables() {
        let source = source(
            "CREATE TABLE tag (id INTEGER PRIMARY KEY, label TEXT);
             CREATE TABLE post (id INTEGER PRIMARY KEY, title TEXT, tag_id INTEGER REFERENCES tag(id));
             CREATE TABLE loose (a INTEGER, b INTEGER);",
        );
        let (schema, joins) = Pipeline::new(Settings::default()).inspect(&source).unwrap();

        assert!(schema.join_tables().is_empty());
        assert!(joins.is_empty());
    }

    #[test]
    fn test_composite_key_needs_every_column_in_a_foreign_key() {
        let source = source(
            "CREATE TABLE a (id INTEGER PRIMARY KEY);
             CREATE TABLE a_version (
                 a_id INTEGER NOT NULL REFERENCES a(id),
                 version INTEGER NOT NULL,
                 PRIMARY KEY (a_id, version)
             );",
        );
        let (schema, _) = Pipeline::new(Settings::default()).inspect(&source).unwrap();
        assert!(schema.join_tables().is_empty());
    }
}
