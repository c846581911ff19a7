//! End-to-end route compilation tests.

use daedalus_config::{DaedalusConfig, FirewallRuleConfig, Languages, RouterConfig};
use daedalus_router::{Controller, Module, Resolution, Route, RouteBuilder, RouteTable};
use http::Method;
use proptest::prelude::*;

type Table = RouteTable<&'static str>;

fn localized() -> DaedalusConfig {
    DaedalusConfig::builder()
        .languages(Languages::new().with("cs", true, true).with("en", true, false))
        .router(RouterConfig {
            localized: true,
            ..RouterConfig::default()
        })
        .build()
}

fn resolve<'a>(table: &'a Table, method: Method, path: &str) -> Option<&'a Route<&'static str>> {
    match table.resolve(&method, path) {
        Resolution::Matched(route) => Some(route),
        _ => None,
    }
}

#[test]
fn test_localized_map_compiles_two_routes() {
    let table = Table::compile(
        vec![RouteBuilder::new()
            .name("article")
            .localized_path([("cs", "clanek"), ("en", "article")])
            .methods([Method::GET])
            .handler("article")],
        &localized(),
    )
    .unwrap();

    assert_eq!(table.len(), 2);
    assert_eq!(table.localized_routes("cs")[0].matcher().as_str(), "^/cs/clanek/?$");
    assert_eq!(table.localized_routes("en")[0].matcher().as_str(), "^/en/article/?$");
}

#[test]
fn test_localized_child_of_plain_parent_resolves() {
    let table = Table::compile(
        vec![RouteBuilder::new()
            .name("blog")
            .get("/blog")
            .handler("blog")
            .group([RouteBuilder::new()
                .name("article")
                .localized_path([("cs", "clanek/{id:[0-9]+}"), ("en", "article/{id:[0-9]+}")])
                .methods([Method::GET])
                .handler("article")])],
        &localized(),
    )
    .unwrap();

    let route = resolve(&table, Method::GET, "/en/blog/article/4").unwrap();
    assert_eq!(route.name(), "blog-article");
    assert_eq!(route.language(), Some("en"));
    assert!(resolve(&table, Method::GET, "/cs/blog/clanek/4").is_some());
    assert!(resolve(&table, Method::GET, "/blog/article/4").is_none());
}

#[test]
fn test_nested_blog_detail() {
    let table = Table::compile(
        vec![RouteBuilder::new()
            .name("blog")
            .get("/blog")
            .handler("blog")
            .group([RouteBuilder::new()
                .name("detail")
                .get("/{id:[0-9]+}")
                .handler("detail")])],
        &DaedalusConfig::default(),
    )
    .unwrap();

    let detail = table.find("blog-detail", None).unwrap();
    assert_eq!(detail.path(), "/blog/{id:[0-9]+}");

    let route = resolve(&table, Method::GET, "/blog/123").unwrap();
    assert_eq!(route.handler(), Some(&"detail"));
    assert!(resolve(&table, Method::GET, "/blog/abc").is_none());
    assert!(resolve(&table, Method::GET, "/blog/").is_some());
}

#[test]
fn test_module_routes_with_firewall() {
    let mut config = DaedalusConfig::default();
    config.security.firewall.insert(
        "admin".into(),
        FirewallRuleConfig {
            enabled: true,
            modules: vec!["admin".into()],
            roles: vec!["owner".into()],
            ..FirewallRuleConfig::default()
        },
    );

    let mut routes = Module::new("admin")
        .controller(
            Controller::new("user").routes([RouteBuilder::new()
                .name("list")
                .get("/admin/users")
                .handler("users")]),
        )
        .into_routes();
    routes.push(RouteBuilder::new().name("home").get("/").handler("home"));

    let table = Table::compile(routes, &config).unwrap();

    let users = resolve(&table, Method::GET, "/admin/users").unwrap();
    assert_eq!(users.name(), "admin.user.list");
    assert_eq!(users.access_rules().len(), 1);

    let home = resolve(&table, Method::GET, "/").unwrap();
    assert!(home.access_rules().is_empty());
}

#[test]
fn test_switch_language_by_index() {
    let table = Table::compile(
        vec![
            RouteBuilder::new().name("home").get("/").localize().handler("home"),
            RouteBuilder::new()
                .name("contact")
                .localized_path([("cs", "/kontakt"), ("en", "/contact")])
                .methods([Method::GET])
                .handler("contact"),
        ],
        &localized(),
    )
    .unwrap();

    let index = table.localized_index("en", "/en/contact").unwrap();
    let czech = table.localized_at("cs", index).unwrap();
    assert_eq!(czech.path(), "/{lang:cs}/kontakt");
}

proptest! {
    #[test]
    fn prop_numeric_detail_only_accepts_digits(id in "[0-9]{1,9}", word in "[a-z]{1,9}") {
        let table = Table::compile(
            vec![RouteBuilder::new().name("item").get("/item/{id:[0-9]+}").handler("item")],
            &DaedalusConfig::default(),
        ).unwrap();

        let numeric = format!("/item/{id}");
        let alpha = format!("/item/{word}");
        prop_assert!(resolve(&table, Method::GET, &numeric).is_some());
        prop_assert!(resolve(&table, Method::GET, &alpha).is_none());
    }

    #[test]
    fn prop_extracted_vars_rebuild_path(id in "[0-9]{1,6}", slug in "[a-z][a-z0-9-]{0,12}") {
        let table = Table::compile(
            vec![RouteBuilder::new().name("post").get("/post/{id:[0-9]+}/{slug}").handler("post")],
            &DaedalusConfig::default(),
        ).unwrap();

        let path = format!("/post/{id}/{slug}");
        let route = resolve(&table, Method::GET, &path).unwrap();
        let vars = route.extract_vars(&path);
        prop_assert_eq!(route.canonical_path(&vars), Some(path));
    }
}
