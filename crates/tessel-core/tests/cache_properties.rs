#![allow(clippy::unwrap_used)]
// Cache behaviour end to end: the test plays the transport by reading the
// dispatch channel and applying terminal events itself.

mod common;

use pretty_assertions::assert_eq;
use serde_json::json;

use common::{Fixture, app, apps, fetching, list_args, next, stays_silent};
use tessel_core::{
    ActionArgs, ActionBuilderConfig, EntityMonitorOptions, HttpMethod, OperationKey, RequestTarget,
    ResponseBody, StoreEvent, resolve_http_method,
};

// ── Deduplication ───────────────────────────────────────────────────

#[tokio::test]
async fn concurrent_entity_subscribers_share_one_fetch() {
    let mut fx = Fixture::new();
    let first = fx.apps.get_entity_monitor("app-1", fetching("ep-1")).unwrap();
    let second = fx.apps.get_entity_monitor("app-1", fetching("ep-1")).unwrap();

    let _entity = first.entity();
    let _settled = second.wait_for_entity();
    let _again = first.entity_request();

    let dispatched = fx.drain();
    assert_eq!(dispatched.len(), 1);
    assert_eq!(dispatched[0].http_method, HttpMethod::Get);
    assert_eq!(dispatched[0].entity_id().unwrap().as_str(), "app-1");
    assert_eq!(dispatched[0].url, "apps/app-1");
}

#[tokio::test]
async fn cached_entities_are_not_refetched() {
    let mut fx = Fixture::new();
    let monitor = fx.apps.get_entity_monitor("app-1", fetching("ep-1")).unwrap();
    let mut entity = monitor.entity();
    let get = fx.drain().pop().unwrap();
    fx.store
        .apply(StoreEvent::succeeded(&get, ResponseBody::Entity(app("app-1", "web"))));
    assert!(next(&mut entity).await.is_some());

    let later = fx.apps.get_entity_monitor("app-1", fetching("ep-1")).unwrap();
    let _stream = later.wait_for_entity();
    assert!(fx.drain().is_empty());
}

#[tokio::test]
async fn invalidated_entities_are_refetched() {
    let mut fx = Fixture::new();
    let monitor = fx.apps.get_entity_monitor("app-1", fetching("ep-1")).unwrap();
    let _entity = monitor.entity();
    let get = fx.drain().pop().unwrap();
    fx.store
        .apply(StoreEvent::succeeded(&get, ResponseBody::Entity(app("app-1", "web"))));

    fx.store.apply(StoreEvent::Invalidate {
        schema_key: "application".into(),
        id: "app-1".into(),
    });
    let _again = monitor.entity();
    assert_eq!(fx.drain().len(), 1);
}

#[tokio::test]
async fn concurrent_page_subscribers_share_one_fetch() {
    let mut fx = Fixture::new();
    let first = fx.apps.get_pagination_monitor(list_args()).unwrap();
    let second = fx.apps.get_pagination_monitor(list_args()).unwrap();
    assert_eq!(first.pagination_key(), second.pagination_key());

    let _a = first.current_page();
    let _b = second.current_page();
    let _c = fx.apps.get_pagination_service(list_args()).unwrap().entities();

    let dispatched = fx.drain();
    assert_eq!(dispatched.len(), 1);
    assert_eq!(dispatched[0].page(), Some(1));
}

// ── HTTP method resolution ───────────────────────────────────────────

#[test]
fn method_resolution_only_lets_update_be_overridden() {
    let methods = [
        HttpMethod::Get,
        HttpMethod::Post,
        HttpMethod::Put,
        HttpMethod::Patch,
        HttpMethod::Delete,
    ];
    for explicit in methods {
        let cfg = ActionBuilderConfig::entity("application", "apps/{id}").with_method(explicit);
        assert_eq!(resolve_http_method(&OperationKey::Get, &cfg).unwrap(), HttpMethod::Get);
        assert_eq!(
            resolve_http_method(&OperationKey::GetMultiple, &cfg).unwrap(),
            HttpMethod::Get
        );
        assert_eq!(resolve_http_method(&OperationKey::Create, &cfg).unwrap(), HttpMethod::Post);
        assert_eq!(
            resolve_http_method(&OperationKey::Remove, &cfg).unwrap(),
            HttpMethod::Delete
        );
        assert_eq!(resolve_http_method(&OperationKey::Update, &cfg).unwrap(), explicit);
    }
}

#[tokio::test]
async fn update_without_method_dispatches_put() {
    let mut fx = Fixture::new();
    let update = fx.apps.dispatcher(&OperationKey::Update).unwrap();
    let mut lifecycle = update
        .dispatch(ActionArgs::entity("app-1", "ep-1").body(json!({ "instances": 2 })))
        .unwrap();

    let dispatched = fx.drain();
    assert_eq!(dispatched.len(), 1);
    assert_eq!(dispatched[0].http_method, HttpMethod::Put);
    assert_eq!(dispatched[0].body, Some(json!({ "instances": 2 })));

    let info = next(&mut lifecycle).await;
    assert!(info.is_busy("update"));
    assert!(!info.fetching);
}

#[tokio::test]
async fn custom_operations_use_their_declared_method() {
    let mut fx = Fixture::new();
    let restage = fx.apps.dispatcher(&"restage".into()).unwrap();
    restage.dispatch(ActionArgs::entity("app-1", "ep-1")).unwrap();
    let dispatched = fx.drain();
    assert_eq!(dispatched[0].http_method, HttpMethod::Post);
    assert_eq!(dispatched[0].url, "apps/app-1/restage");
}

// ── Idempotent application ───────────────────────────────────────────

#[tokio::test]
async fn applying_a_success_twice_equals_applying_it_once() {
    let mut fx = Fixture::new();
    let monitor = fx.apps.get_entity_monitor("app-1", fetching("ep-1")).unwrap();
    let _stream = monitor.entity();
    let get = fx.drain().pop().unwrap();
    let success = StoreEvent::succeeded(
        &get,
        ResponseBody::Entity(json!({
            "metadata": { "guid": "app-1" },
            "entity": { "routes": [{ "metadata": { "guid": "r-1" } }] }
        })),
    );

    fx.store.apply(success.clone());
    let once = fx.store.snapshot();
    fx.store.apply(success);
    assert_eq!(fx.store.snapshot(), once);
    assert_eq!(once.entities["route"].len(), 1);
}

#[tokio::test]
async fn applying_a_page_twice_equals_applying_it_once() {
    let mut fx = Fixture::new();
    let _page = fx.apps.get_pagination_monitor(list_args()).unwrap().current_page();
    let list = fx.drain().pop().unwrap();
    let success = StoreEvent::succeeded(
        &list,
        ResponseBody::Page {
            entities: apps(&["a", "b"]),
            total_results: Some(2),
            total_pages: Some(1),
        },
    );

    fx.store.apply(success.clone());
    let once = fx.store.snapshot();
    fx.store.apply(success);
    assert_eq!(fx.store.snapshot(), once);
}

// ── Gated waiting ────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn wait_for_entity_never_emits_while_fetching() {
    let mut fx = Fixture::new();
    let monitor = fx.apps.get_entity_monitor("app-1", fetching("ep-1")).unwrap();
    let mut settled = monitor.wait_for_entity();
    let get = fx.drain().pop().unwrap();

    assert!(stays_silent(&mut settled).await);

    fx.store
        .apply(StoreEvent::succeeded(&get, ResponseBody::Entity(app("app-1", "web"))));
    let first = next(&mut settled).await;
    assert!(!first.request_info.fetching);
    assert_eq!(first.entity["entity"]["name"], "web");

    // An explicit refetch holds the stream again until it settles.
    fx.store.dispatch(get.clone());
    assert!(stays_silent(&mut settled).await);
    fx.store
        .apply(StoreEvent::succeeded(&get, ResponseBody::Entity(app("app-1", "api"))));
    let second = next(&mut settled).await;
    assert!(!second.request_info.fetching);
    assert_eq!(second.entity["entity"]["name"], "api");
}

#[tokio::test(start_paused = true)]
async fn wait_for_entity_holds_while_absent() {
    let fx = Fixture::new();
    let monitor = fx
        .apps
        .get_entity_monitor("app-9", EntityMonitorOptions::default())
        .unwrap();
    let mut settled = monitor.wait_for_entity();
    assert!(stays_silent(&mut settled).await);
}

// ── Key isolation ────────────────────────────────────────────────────

#[tokio::test]
async fn different_params_never_share_pagination_state() {
    let mut fx = Fixture::new();
    let asc = fx
        .apps
        .get_pagination_monitor(list_args().param("order", "asc"))
        .unwrap();
    let desc = fx
        .apps
        .get_pagination_monitor(list_args().param("order", "desc"))
        .unwrap();
    assert_ne!(asc.pagination_key(), desc.pagination_key());

    let _a = asc.current_page();
    let _d = desc.current_page();
    let dispatched = fx.drain();
    assert_eq!(dispatched.len(), 2);

    fx.store.apply(StoreEvent::succeeded(
        &dispatched[0],
        ResponseBody::Page {
            entities: apps(&["a"]),
            total_results: Some(1),
            total_pages: Some(1),
        },
    ));

    let asc_state = asc.snapshot().unwrap();
    let desc_state = desc.snapshot().unwrap();
    assert_ne!(asc_state.params_hash, desc_state.params_hash);
    assert_eq!(asc_state.ids_in_order().len(), 1);
    assert!(desc_state.pages.is_empty());
    assert!(desc_state.is_fetching());
}

// ── Paging ───────────────────────────────────────────────────────────

#[tokio::test]
async fn flatten_mode_concatenates_pages_in_order() {
    let mut fx = Fixture::new();
    let monitor = fx
        .apps
        .get_pagination_monitor(list_args().flatten(true))
        .unwrap();
    assert!(monitor.is_flatten());
    let mut records = monitor.current_page();

    let page_one = fx.drain().pop().unwrap();
    fx.store.apply(StoreEvent::succeeded(
        &page_one,
        ResponseBody::Page {
            entities: apps(&["a1", "a2", "a3", "a4", "a5"]),
            total_results: Some(8),
            total_pages: Some(2),
        },
    ));
    assert_eq!(next(&mut records).await.len(), 5);

    assert!(monitor.load_next_page());
    let page_two = fx.drain().pop().unwrap();
    assert_eq!(page_two.page(), Some(2));
    fx.store.apply(StoreEvent::succeeded(
        &page_two,
        ResponseBody::Page {
            entities: apps(&["b1", "b2", "b3"]),
            total_results: Some(8),
            total_pages: Some(2),
        },
    ));

    let all = next(&mut records).await;
    let ids: Vec<&str> = all.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, ["a1", "a2", "a3", "a4", "a5", "b1", "b2", "b3"]);
    assert!(!monitor.load_next_page());
}

#[tokio::test]
async fn page_mode_shows_only_the_selected_page() {
    let mut fx = Fixture::new();
    let monitor = fx.apps.get_pagination_monitor(list_args()).unwrap();
    let mut records = monitor.current_page();

    let page_one = fx.drain().pop().unwrap();
    fx.store.apply(StoreEvent::succeeded(
        &page_one,
        ResponseBody::Page {
            entities: apps(&["a1", "a2"]),
            total_results: Some(3),
            total_pages: Some(2),
        },
    ));
    assert_eq!(next(&mut records).await.len(), 2);

    assert!(monitor.fetch_page(2));
    let page_two = fx.drain().pop().unwrap();
    fx.store.apply(StoreEvent::succeeded(
        &page_two,
        ResponseBody::Page {
            entities: apps(&["b1"]),
            total_results: Some(3),
            total_pages: Some(2),
        },
    ));
    let second = next(&mut records).await;
    assert_eq!(second.len(), 1);
    assert_eq!(second[0].id.as_str(), "b1");

    // Going back to a cached page selects it without a request.
    assert!(!monitor.fetch_page(1));
    assert!(fx.drain().is_empty());
    assert_eq!(next(&mut records).await.len(), 2);
}

#[tokio::test]
async fn record_updates_reach_page_subscribers() {
    let mut fx = Fixture::new();
    let monitor = fx.apps.get_pagination_monitor(list_args()).unwrap();
    let mut records = monitor.current_page();
    let list = fx.drain().pop().unwrap();
    fx.store.apply(StoreEvent::succeeded(
        &list,
        ResponseBody::Page {
            entities: vec![app("app-1", "web")],
            total_results: Some(1),
            total_pages: Some(1),
        },
    ));
    assert_eq!(next(&mut records).await[0].payload["entity"]["name"], "web");

    let get = fx
        .apps
        .builder(&OperationKey::Get)
        .unwrap()
        .build(ActionArgs::entity("app-1", "ep-1"))
        .unwrap();
    fx.store
        .apply(StoreEvent::succeeded(&get, ResponseBody::Entity(app("app-1", "api"))));
    assert_eq!(next(&mut records).await[0].payload["entity"]["name"], "api");
}

#[tokio::test]
async fn child_listings_are_scoped_to_their_parent() {
    let mut fx = Fixture::new();
    let routes = fx.apps.paged_instance(&"routes".into()).unwrap();
    let of_one = routes
        .pagination_monitor(ActionArgs::entity("app-1", "ep-1").relation_path("application-route"))
        .unwrap();
    let of_two = routes
        .pagination_monitor(ActionArgs::entity("app-2", "ep-1").relation_path("application-route"))
        .unwrap();
    assert_ne!(of_one.pagination_key(), of_two.pagination_key());

    let _r = of_one.current_page();
    let dispatched = fx.drain();
    assert_eq!(dispatched[0].url, "apps/app-1/routes");
    assert_eq!(dispatched[0].schema_key().as_str(), "route");
}

// ── Failure surfacing ────────────────────────────────────────────────

#[tokio::test]
async fn repeated_failures_surface_every_time() {
    let mut fx = Fixture::new();
    let monitor = fx.apps.get_entity_monitor("app-2", fetching("ep-1")).unwrap();
    let mut requests = monitor.entity_request();
    let get = fx.drain().pop().unwrap();

    assert!(next(&mut requests).await.fetching);
    fx.store.apply(StoreEvent::failed(&get, "not found"));
    let failed = next(&mut requests).await;
    assert!(failed.error);
    assert!(!failed.fetching);
    assert_eq!(failed.message, "not found");

    fx.store.apply(StoreEvent::ClearError {
        target: RequestTarget::Entity {
            schema_key: "application".into(),
            id: "app-2".into(),
        },
    });
    assert!(!next(&mut requests).await.error);

    let _retry = fx
        .apps
        .dispatcher(&OperationKey::Get)
        .unwrap()
        .dispatch(ActionArgs::entity("app-2", "ep-1"))
        .unwrap();
    let retry = fx.drain().pop().unwrap();
    assert!(next(&mut requests).await.fetching);

    fx.store.apply(StoreEvent::failed(&retry, "not found"));
    let again = next(&mut requests).await;
    assert!(again.error);
    assert_eq!(again.message, "not found");
}

#[tokio::test]
async fn fast_transitions_are_not_collapsed() {
    let mut fx = Fixture::new();
    let monitor = fx
        .apps
        .get_entity_monitor("app-3", EntityMonitorOptions::default())
        .unwrap();
    let mut requests = monitor.entity_request();
    assert!(!next(&mut requests).await.fetching);

    // Start and fail before the subscriber polls again.
    let _lifecycle = fx
        .apps
        .dispatcher(&OperationKey::Get)
        .unwrap()
        .dispatch(ActionArgs::entity("app-3", "ep-1"))
        .unwrap();
    let get = fx.drain().pop().unwrap();
    fx.store.apply(StoreEvent::failed(&get, "gone"));

    let started = next(&mut requests).await;
    assert!(started.fetching);
    assert!(!started.error);
    let failed = next(&mut requests).await;
    assert!(!failed.fetching);
    assert_eq!(failed.message, "gone");
}

#[tokio::test]
async fn a_failed_page_waits_for_an_explicit_retry() {
    let mut fx = Fixture::new();
    let monitor = fx.apps.get_pagination_monitor(list_args()).unwrap();
    let mut records = monitor.current_page();
    let mut page_info = monitor.current_page_request_info();
    assert!(next(&mut page_info).await.fetching);

    let first = fx.drain().pop().unwrap();
    fx.store.apply(StoreEvent::failed(&first, "backend unavailable"));
    let failed = next(&mut page_info).await;
    assert!(!failed.fetching);
    assert!(failed.error);
    assert_eq!(failed.message, "backend unavailable");

    // Subscribing again does not refetch the failed page.
    let _again = monitor.current_page();
    assert!(fx.drain().is_empty());

    assert!(monitor.fetch_page(1));
    let retry = fx.drain().pop().unwrap();
    assert_eq!(retry.page(), Some(1));
    let refetching = next(&mut page_info).await;
    assert!(refetching.fetching);
    assert!(!refetching.error);

    fx.store.apply(StoreEvent::succeeded(
        &retry,
        ResponseBody::Page {
            entities: apps(&["a1", "a2"]),
            total_results: Some(2),
            total_pages: Some(1),
        },
    ));
    let settled = next(&mut page_info).await;
    assert!(!settled.fetching);
    assert!(!settled.error);
    assert_eq!(next(&mut records).await.len(), 2);
}

#[tokio::test]
async fn remove_marks_the_entity_deleted() {
    let mut fx = Fixture::new();
    let monitor = fx
        .apps
        .get_entity_monitor("app-1", EntityMonitorOptions::default())
        .unwrap();
    let mut deleting = monitor.is_deleting_entity();
    assert!(!next(&mut deleting).await);

    let _lifecycle = fx
        .apps
        .dispatcher(&OperationKey::Remove)
        .unwrap()
        .dispatch(ActionArgs::entity("app-1", "ep-1"))
        .unwrap();
    let remove = fx.drain().pop().unwrap();
    assert_eq!(remove.http_method, HttpMethod::Delete);
    assert!(next(&mut deleting).await);

    fx.store.apply(StoreEvent::succeeded(&remove, ResponseBody::Empty));
    assert!(!next(&mut deleting).await);
    assert!(monitor.current_request().deleted);
}

// ── Wiring errors ────────────────────────────────────────────────────

#[tokio::test]
async fn mismatched_registrations_fail_at_construction() {
    let fx = Fixture::new();
    let bad = tessel_core::EntityDefinition::new("application", "cf", "application")
        .operation("getMultiple", ActionBuilderConfig::entity("application", "apps/{id}"));
    let err = tessel_core::EntityCatalogEntry::new(fx.store.clone(), bad).unwrap_err();
    assert_eq!(err.to_string(), "`getMultiple` action is not of type pagination");

    assert!(fx.apps.instance(&OperationKey::Get).is_none());
    assert!(fx.apps.instance(&OperationKey::GetMultiple).is_some());
    assert!(fx.apps.paged_instance(&OperationKey::Get).is_err());
}
