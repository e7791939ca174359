use pretty_assertions::assert_eq;
use serde_json::json;
use trellis::{
    collection, model, Builder, Expression, Filter, Operator, OrderBy, Pager, Query, ScalarTy,
    Schema, Table,
};

fn author_table() -> Table {
    Table::new(
        "authors",
        Schema::new("author")
            .prop("name", ScalarTy::String)
            .prop("address", ScalarTy::String)
            .prop("status", ScalarTy::String)
            .prop("articles", collection("article")),
    )
    .join("articles", "authors.id", "articles.author_id")
}

fn article_table() -> Table {
    Table::new(
        "articles",
        Schema::new("article")
            .prop("title", ScalarTy::String)
            .prop("status", ScalarTy::String)
            .prop("readCount", ScalarTy::Number)
            .prop("comments", collection("comment"))
            .prop("readers", collection("reader")),
    )
    .join("comments", "articles.id", "comments.article_id")
    .join("readers", "articles.id", "readers.article_id")
}

fn comment_table() -> Table {
    Table::new(
        "comments",
        Schema::new("comment").prop("comment_title", ScalarTy::String),
    )
}

fn reader_table() -> Table {
    Table::new("readers", Schema::new("reader").prop("name", ScalarTy::String))
}

fn builder() -> Builder {
    Builder::new(vec![
        author_table(),
        article_table(),
        comment_table(),
        reader_table(),
    ])
    .unwrap()
}

fn expression(value: serde_json::Value) -> Expression {
    Expression::from_json(&value).unwrap()
}

fn alias(built: &trellis::Built, schema: &str) -> String {
    built.context.mapping[schema].alias.clone()
}

#[test]
fn builds_a_basic_select_for_one_schema() {
    let customers = Table::new("customers", Schema::new("customer").prop("name", ScalarTy::String));
    let builder = Builder::new(vec![customers]).unwrap();

    let built = builder
        .build(&Query {
            expression: expression(json!({ "customer": { "name": true } })),
            ..Query::default()
        })
        .unwrap();

    let a = alias(&built, "customer");
    assert_eq!(
        built.sql,
        format!(r#"SELECT {a}.name AS "customer.name" FROM customers {a}"#)
    );
}

#[test]
fn parsed_paths_are_pre_order() {
    let built = builder()
        .build(&Query {
            expression: expression(json!({
                "author": { "name": true, "articles": { "title": true } }
            })),
            ..Query::default()
        })
        .unwrap();

    let paths: Vec<_> = built
        .context
        .parsed_expr
        .paths
        .iter()
        .map(|p| p.path.clone())
        .collect();
    assert_eq!(
        paths,
        ["author", "author.name", "author.articles", "author.articles.title"]
    );

    // Every descendant path is string-prefixed by its parent's path.
    for path in &paths[1..] {
        let parent = &path[..path.rfind('.').unwrap()];
        assert!(paths.iter().any(|p| p == parent));
    }
}

#[test]
fn joins_every_collection_on_the_declared_key_pair() {
    let built = builder()
        .build(&Query {
            expression: expression(json!({
                "author": {
                    "name": true,
                    "articles": {
                        "title": true,
                        "comments": { "comment_title": true },
                        "readers": { "name": true },
                    },
                }
            })),
            ..Query::default()
        })
        .unwrap();

    let au = alias(&built, "author");
    let ar = alias(&built, "article");
    let c = alias(&built, "comment");
    let r = alias(&built, "reader");

    assert_eq!(
        built.sql,
        format!(
            "SELECT {au}.name AS \"author.name\", \
             {ar}.title AS \"author.articles.title\", \
             {c}.comment_title AS \"author.articles.comments.comment_title\", \
             {r}.name AS \"author.articles.readers.name\" \
             FROM authors {au} \
             LEFT JOIN articles {ar} ON {au}.id = {ar}.author_id \
             LEFT JOIN comments {c} ON {ar}.id = {c}.article_id \
             LEFT JOIN readers {r} ON {ar}.id = {r}.article_id"
        )
    );
}

#[test]
fn joins_to_one_relations_through_their_key_pair() {
    let customers = Table::new(
        "customers",
        Schema::new("customer")
            .prop("name", ScalarTy::String)
            .prop("subscriptions", collection("subscription")),
    )
    .join("subscriptions", "customers.id", "subscriptions.customer_id");

    let subscriptions = Table::new(
        "subscriptions",
        Schema::new("subscription")
            .prop("status", ScalarTy::String)
            .prop("user", model("user")),
    )
    .join("user", "subscriptions.user_id", "users.id");

    let users = Table::new("users", Schema::new("user").prop("name", ScalarTy::String));

    let builder = Builder::new(vec![customers, subscriptions, users]).unwrap();
    let built = builder
        .build(&Query {
            expression: expression(json!({
                "customer": {
                    "name": true,
                    "subscriptions": { "status": true, "user": { "name": true } },
                }
            })),
            ..Query::default()
        })
        .unwrap();

    let c = alias(&built, "customer");
    let s = alias(&built, "subscription");
    let u = alias(&built, "user");

    assert_eq!(
        built.sql,
        format!(
            "SELECT {c}.name AS \"customer.name\", \
             {s}.status AS \"customer.subscriptions.status\", \
             {u}.name AS \"customer.subscriptions.user.name\" \
             FROM customers {c} \
             LEFT JOIN subscriptions {s} ON {c}.id = {s}.customer_id \
             LEFT JOIN users {u} ON {s}.user_id = {u}.id"
        )
    );
}

#[test]
fn filters_resolve_declared_aliases_and_canonical_paths() {
    let built = builder()
        .build(&Query {
            expression: expression(json!({
                "author Au": { "name": true, "articles A": { "title": true } }
            })),
            filters: vec![
                Filter::eq("A.status", "PUBLISHED"),
                Filter::eq("Au.A.status", "PUBLISHED"),
                Filter::eq("Au.status", "ACTIVE"),
                Filter::eq("Au.articles.status", "ACTIVE"),
                Filter::new("author.name", Operator::Like, "this is a author name\""),
            ],
            ..Query::default()
        })
        .unwrap();

    let au = alias(&built, "author");
    let ar = alias(&built, "article");

    assert_eq!(
        built.sql,
        format!(
            "SELECT {au}.name AS \"author.name\", {ar}.title AS \"author.articles.title\" \
             FROM authors {au} \
             LEFT JOIN articles {ar} ON {au}.id = {ar}.author_id \
             WHERE {ar}.status = 'PUBLISHED' \
             AND {ar}.status = 'PUBLISHED' \
             AND {au}.status = 'ACTIVE' \
             AND {ar}.status = 'ACTIVE' \
             AND {au}.name LIKE '%this is a author name\\\"%'"
        )
    );
}

#[test]
fn or_filters_chain_with_or() {
    let built = builder()
        .build(&Query {
            expression: expression(json!({ "author": { "name": true } })),
            filters: vec![
                Filter::eq("author.status", "ACTIVE"),
                Filter::eq("author.status", "PAUSED").or(),
            ],
            ..Query::default()
        })
        .unwrap();

    let au = alias(&built, "author");
    assert_eq!(
        built.sql,
        format!(
            "SELECT {au}.name AS \"author.name\" FROM authors {au} \
             WHERE {au}.status = 'ACTIVE' OR {au}.status = 'PAUSED'"
        )
    );
}

#[test]
fn between_filters_render_both_bounds() {
    let built = builder()
        .build(&Query {
            expression: expression(json!({
                "author": { "name": true, "articles": { "title": true } }
            })),
            filters: vec![Filter::new(
                "article.readCount",
                Operator::Between,
                trellis::Value::List(vec![trellis::Value::I64(10), trellis::Value::I64(20)]),
            )],
            ..Query::default()
        })
        .unwrap();

    let ar = alias(&built, "article");
    assert!(
        built.sql.ends_with(&format!("WHERE {ar}.readCount BETWEEN 10 AND 20")),
        "{}",
        built.sql
    );
}

#[test]
fn group_by_and_order_by_render_in_input_order() {
    let built = builder()
        .build(&Query {
            expression: expression(json!({
                "author Au": { "name": true, "articles A": { "status": true } }
            })),
            filters: vec![Filter::eq("A.status", "PUBLISHED")],
            group_by: vec!["author.name".to_string(), "A.status".to_string()],
            order_by: vec![OrderBy::asc("author.name"), OrderBy::desc("A.status")],
            ..Query::default()
        })
        .unwrap();

    let au = alias(&built, "author");
    let ar = alias(&built, "article");

    assert_eq!(
        built.sql,
        format!(
            "SELECT {au}.name AS \"author.name\", {ar}.status AS \"author.articles.status\" \
             FROM authors {au} \
             LEFT JOIN articles {ar} ON {au}.id = {ar}.author_id \
             WHERE {ar}.status = 'PUBLISHED' \
             GROUP BY {au}.name, {ar}.status \
             ORDER BY {au}.name ASC, {ar}.status DESC"
        )
    );
}

#[test]
fn whole_row_aggregation_renders_count_star() {
    let built = builder()
        .build(&Query {
            expression: expression(json!({
                "author": {
                    "name": true,
                    "nameCount": { "aggregation": "count" },
                    "articles": { "status": true },
                }
            })),
            group_by: vec![
                "author.name".to_string(),
                "author.articles.status".to_string(),
            ],
            distinct: true,
            ..Query::default()
        })
        .unwrap();

    let au = alias(&built, "author");
    let ar = alias(&built, "article");

    assert_eq!(
        built.sql,
        format!(
            "SELECT DISTINCT {au}.name AS \"author.name\", \
             {ar}.status AS \"author.articles.status\", \
             COUNT({au}.*) AS \"author.nameCount\" \
             FROM authors {au} \
             LEFT JOIN articles {ar} ON {au}.id = {ar}.author_id \
             GROUP BY {au}.name, {ar}.status"
        )
    );
}

#[test]
fn aggregation_with_a_field_targets_the_resolved_column() {
    let built = builder()
        .build(&Query {
            expression: expression(json!({
                "author": {
                    "name": true,
                    "readSum": { "aggregation": "sum", "field": "author.articles.readCount" },
                    "articles": { "title": true },
                }
            })),
            ..Query::default()
        })
        .unwrap();

    let ar = alias(&built, "article");
    assert!(
        built
            .sql
            .contains(&format!("SUM({ar}.readCount) AS \"author.readSum\"")),
        "{}",
        built.sql
    );
}

#[test]
fn filter_only_relations_still_join() {
    let built = builder()
        .build(&Query {
            expression: expression(json!({ "author": { "name": true } })),
            filters: vec![Filter::eq("author.articles.status", "PUBLISHED")],
            ..Query::default()
        })
        .unwrap();

    assert!(built.context.mapping.contains_key("article"));
    let ar = alias(&built, "article");
    assert!(built.sql.contains(&format!("LEFT JOIN articles {ar}")), "{}", built.sql);
}

#[test]
fn unmapped_filter_fields_are_dropped() {
    let built = builder()
        .build(&Query {
            expression: expression(json!({ "author": { "name": true } })),
            filters: vec![Filter::eq("author.bogus", "x")],
            ..Query::default()
        })
        .unwrap();

    assert!(!built.sql.contains("WHERE"), "{}", built.sql);
}

#[test]
fn unknown_relation_in_a_filter_path_fails_before_sql() {
    let err = builder()
        .build(&Query {
            expression: expression(json!({ "author": { "name": true } })),
            filters: vec![Filter::eq("author.bogus.title", "x")],
            ..Query::default()
        })
        .unwrap_err();
    assert!(err.is_configuration());
}

#[test]
fn unknown_root_schema_fails_before_sql() {
    let err = builder()
        .build(&Query {
            expression: expression(json!({ "nobody": { "name": true } })),
            ..Query::default()
        })
        .unwrap_err();
    assert!(err.is_configuration());
}

#[test]
fn pager_wraps_root_access_in_a_limited_subquery() {
    let built = builder()
        .build(&Query {
            expression: expression(json!({
                "author": { "name": true, "articles": { "title": true } }
            })),
            filters: vec![
                Filter::eq("author.status", "ACTIVE"),
                Filter::eq("author.articles.status", "PUBLISHED"),
            ],
            order_by: vec![OrderBy::asc("author.name")],
            pager: Some(Pager {
                limit: 10,
                page_idx: 2,
            }),
            ..Query::default()
        })
        .unwrap();

    let au = alias(&built, "author");
    let ar = alias(&built, "article");

    assert_eq!(
        built.sql,
        format!(
            "SELECT {au}.name AS \"author.name\", {ar}.title AS \"author.articles.title\" \
             FROM (SELECT * FROM authors {au} \
             WHERE {au}.status = 'ACTIVE' \
             ORDER BY {au}.name ASC \
             LIMIT 10 OFFSET 20) {au} \
             LEFT JOIN articles {ar} ON {au}.id = {ar}.author_id \
             WHERE {ar}.status = 'PUBLISHED'"
        )
    );
}

#[test]
fn pager_on_the_first_page_omits_offset() {
    let built = builder()
        .build(&Query {
            expression: expression(json!({ "author": { "name": true } })),
            pager: Some(Pager {
                limit: 10,
                page_idx: 0,
            }),
            ..Query::default()
        })
        .unwrap();

    assert!(built.sql.contains("LIMIT 10)"), "{}", built.sql);
    assert!(!built.sql.contains("OFFSET"), "{}", built.sql);
}

#[test]
fn zero_pager_limit_is_rejected() {
    let err = builder()
        .build(&Query {
            expression: expression(json!({ "author": { "name": true } })),
            pager: Some(Pager {
                limit: 0,
                page_idx: 0,
            }),
            ..Query::default()
        })
        .unwrap_err();
    assert!(err.is_validation());
}

#[test]
fn date_filters_format_as_utc_timestamps() {
    let people = Table::new(
        "people",
        Schema::new("person")
            .prop("name", ScalarTy::String)
            .prop("birthdate", ScalarTy::Date),
    );
    let builder = Builder::new(vec![people]).unwrap();

    let built = builder
        .build(&Query {
            expression: expression(json!({ "person": { "name": true } })),
            filters: vec![Filter::new("person.birthdate", Operator::Gte, "2020-01-02")],
            ..Query::default()
        })
        .unwrap();

    let p = alias(&built, "person");
    assert!(
        built
            .sql
            .ends_with(&format!("WHERE {p}.birthdate >= '2020-01-02 00:00:00.000'")),
        "{}",
        built.sql
    );
}

#[test]
fn filter_hook_rewrites_the_resolved_list() {
    let base = builder();
    let hooked = base.with_filter_hook(|filters, _context| {
        filters
            .into_iter()
            .filter(|f| f.column.ends_with(".status"))
            .collect()
    });

    let query = Query {
        expression: expression(json!({ "author": { "name": true } })),
        filters: vec![
            Filter::eq("author.name", "ada"),
            Filter::eq("author.status", "ACTIVE"),
        ],
        ..Query::default()
    };

    let hooked_built = hooked.build(&query).unwrap();
    let au = alias(&hooked_built, "author");
    assert!(
        hooked_built
            .sql
            .ends_with(&format!("WHERE {au}.status = 'ACTIVE'")),
        "{}",
        hooked_built.sql
    );

    // The base builder is untouched: both filters still render.
    let base_built = base.build(&query).unwrap();
    assert!(base_built.sql.contains(".name = 'ada'"), "{}", base_built.sql);
}

#[test]
fn builders_share_tables_across_threads() {
    let builder = std::sync::Arc::new(builder());
    let query = Query {
        expression: expression(json!({ "author": { "name": true } })),
        ..Query::default()
    };

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let builder = builder.clone();
            let query = query.clone();
            std::thread::spawn(move || builder.build(&query).unwrap().sql)
        })
        .collect();

    for handle in handles {
        assert!(handle.join().unwrap().starts_with("SELECT"));
    }
}
