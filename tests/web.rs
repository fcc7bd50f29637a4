//! Browser-side checks for the DOM glue
//! - run with `wasm-pack test --headless --firefox`
#![cfg(target_arch = "wasm32")]

use gallery_scene::assets::{self, keys};
use gallery_scene::browser;
use gallery_scene::config::{SceneConfig, Variant};
use gallery_scene::content::CATALOG;
use gallery_scene::events::{EventBus, EventKind, GalleryEvent};
use gallery_scene::subscribe_handlers;
use js_sys::{Object, Reflect};
use std::cell::RefCell;
use std::rc::Rc;
use wasm_bindgen::prelude::*;
use wasm_bindgen_test::*;

wasm_bindgen_test_configure!(run_in_browser);

#[wasm_bindgen_test]
async fn missing_asset_is_recorded_and_skipped() {
    let entries = vec![(keys::BACKGROUND.to_string(), "./no-such-image.png".to_string())];
    let store = assets::load_all(&entries).await;
    assert!(!store.contains(keys::BACKGROUND));
    assert_eq!(store.failures().len(), 1);
    assert_eq!(store.failures()[0].key, keys::BACKGROUND);
}

#[wasm_bindgen_test]
async fn single_image_failure_carries_its_key() {
    let err = assets::load("rope", "./no-such-rope.png")
        .await
        .expect_err("missing image should fail");
    assert!(format!("{:#}", err).contains("rope"));
}

#[wasm_bindgen_test]
fn touch_capability_check_answers() {
    assert!(browser::supports_touch().is_ok());
}

#[wasm_bindgen_test]
fn config_decodes_from_partial_js_object() {
    let object = Object::new();
    Reflect::set(&object, &"variant".into(), &"platformer".into()).expect("set variant");
    Reflect::set(&object, &"regionCount".into(), &JsValue::from_f64(5.0)).expect("set count");
    let config: SceneConfig = serde_wasm_bindgen::from_value(object.into()).expect("decode");
    assert_eq!(config.variant, Variant::Platformer);
    assert_eq!(config.region_count, 5);
    assert_eq!(config.scroll_speed, SceneConfig::default().scroll_speed);
}

/// `{ showProject, showAbout }` recording every call
fn recording_handlers(calls: Rc<RefCell<Vec<(String, JsValue)>>>) -> (JsValue, Vec<Closure<dyn FnMut(JsValue)>>) {
    let object = Object::new();
    let mut closures = Vec::new();
    for kind in [EventKind::ShowProject, EventKind::ShowAbout] {
        let calls = calls.clone();
        let closure = Closure::wrap(Box::new(move |payload: JsValue| {
            calls.borrow_mut().push((kind.name().to_string(), payload));
        }) as Box<dyn FnMut(JsValue)>);
        Reflect::set(&object, &kind.name().into(), closure.as_ref()).expect("set handler");
        closures.push(closure);
    }
    (object.into(), closures)
}

#[wasm_bindgen_test]
fn js_handlers_receive_events() {
    let calls = Rc::new(RefCell::new(Vec::new()));
    let (handlers, _closures) = recording_handlers(calls.clone());
    let bus = EventBus::new();
    let subscriptions = subscribe_handlers(&bus, &handlers).expect("subscribe");
    assert_eq!(subscriptions.len(), 2);
    assert!(!bus.has_subscriber(EventKind::ShowContact));

    assert!(bus.publish(&GalleryEvent::ShowProject(CATALOG[0].clone())));
    assert!(bus.publish(&GalleryEvent::ShowAbout));
    // nobody listens for contact, dropped
    assert!(!bus.publish(&GalleryEvent::ShowContact));

    let calls = calls.borrow();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0].0, "showProject");
    let title = Reflect::get(&calls[0].1, &"title".into()).expect("title");
    assert_eq!(title.as_string(), Some(CATALOG[0].title.clone()));
    assert_eq!(calls[1].0, "showAbout");
    assert!(calls[1].1.is_undefined());
}

#[wasm_bindgen_test]
fn unsubscribed_js_handler_is_silent() {
    let calls = Rc::new(RefCell::new(Vec::new()));
    let (handlers, _closures) = recording_handlers(calls.clone());
    let bus = EventBus::new();
    let subscriptions = subscribe_handlers(&bus, &handlers).expect("subscribe");
    for subscription in &subscriptions {
        bus.unsubscribe(subscription);
    }
    bus.publish(&GalleryEvent::ShowAbout);
    assert!(calls.borrow().is_empty());
}

#[wasm_bindgen_test]
fn missing_handlers_object_is_not_an_error() {
    let bus = EventBus::new();
    let subscriptions = subscribe_handlers(&bus, &JsValue::UNDEFINED).expect("subscribe");
    assert!(subscriptions.is_empty());
}
