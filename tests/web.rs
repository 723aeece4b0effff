// Browser tests, run with `wasm-pack test --headless --chrome`.
#![cfg(target_arch = "wasm32")]

use std::cell::Cell;
use std::rc::Rc;

use js_sys::{Function, Promise};
use portfolio_eggs::triggers::KONAMI_SEQUENCE;
use portfolio_eggs::web::{CanvasLoop, EasterEggs};
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::JsFuture;
use wasm_bindgen_test::*;
use web_sys::{HtmlCanvasElement, KeyboardEvent, KeyboardEventInit};

wasm_bindgen_test_configure!(run_in_browser);

fn canvas() -> HtmlCanvasElement {
    let document = web_sys::window().unwrap().document().unwrap();
    document
        .create_element("canvas")
        .unwrap()
        .dyn_into::<HtmlCanvasElement>()
        .unwrap()
}

#[wasm_bindgen_test]
fn detached_canvas_does_not_start() {
    let anim = CanvasLoop::new(canvas()).unwrap();
    let draw = js_sys::Function::new_no_args("");
    assert!(!anim.start(draw));
    assert!(!anim.is_running());
    anim.stop();
}

#[wasm_bindgen_test]
fn discoveries_round_trip_through_local_storage() {
    let config = r#"{ "storage_key": "eggs_wasm_test" }"#.to_string();
    let eggs = EasterEggs::new(Some(config.clone())).unwrap();
    eggs.reset();
    assert!(eggs.discover("matrix"));
    assert!(!eggs.discover("nope"));

    let reloaded = EasterEggs::new(Some(config)).unwrap();
    assert_eq!(reloaded.stats().unwrap(), r#"{"discovered":1,"total":5}"#);
    reloaded.reset();
}

/// Lets zero-delay deliveries run.
async fn settle() {
    let promise = Promise::new(&mut |resolve, _| {
        web_sys::window()
            .unwrap()
            .set_timeout_with_callback_and_timeout_and_arguments_0(&resolve, 20)
            .unwrap();
    });
    JsFuture::from(promise).await.unwrap();
}

fn press_konami() {
    let win = web_sys::window().unwrap();
    for code in KONAMI_SEQUENCE {
        let init = KeyboardEventInit::new();
        init.set_code(code);
        let event = KeyboardEvent::new_with_keyboard_event_init_dict("keydown", &init).unwrap();
        win.dispatch_event(&event).unwrap();
    }
}

/// JS callback counting calls whose first argument equals `wanted`.
fn counter(wanted: &'static str) -> (Rc<Cell<u32>>, Closure<dyn FnMut(JsValue, JsValue)>) {
    let hits = Rc::new(Cell::new(0));
    let sink = Rc::clone(&hits);
    let callback = Closure::wrap(Box::new(move |name: JsValue, _detail: JsValue| {
        if name.as_string().as_deref() == Some(wanted) {
            sink.set(sink.get() + 1);
        }
    }) as Box<dyn FnMut(JsValue, JsValue)>);
    (hits, callback)
}

fn as_function(callback: &Closure<dyn FnMut(JsValue, JsValue)>) -> Function {
    callback.as_ref().unchecked_ref::<Function>().clone()
}

#[wasm_bindgen_test]
async fn double_attach_matches_once_and_detach_stops_listening() {
    let config = r#"{ "storage_key": "eggs_attach_test" }"#.to_string();
    let mut eggs = EasterEggs::new(Some(config)).unwrap();
    eggs.reset();

    let (konami_hooks, hook) = counter("konami");
    eggs.set_trigger_hook(Some(as_function(&hook)));
    let (discoveries, subscriber) = counter("achievement-discovered");
    eggs.subscribe(as_function(&subscriber));

    eggs.attach().unwrap();
    eggs.attach().unwrap();
    assert!(eggs.is_attached());
    press_konami();
    settle().await;
    assert_eq!(konami_hooks.get(), 1);
    assert_eq!(discoveries.get(), 1);
    assert_eq!(eggs.stats().unwrap(), r#"{"discovered":1,"total":5}"#);

    eggs.detach();
    assert!(!eggs.is_attached());
    eggs.reset();
    press_konami();
    settle().await;
    assert_eq!(konami_hooks.get(), 1);
    assert_eq!(eggs.stats().unwrap(), r#"{"discovered":0,"total":5}"#);
}

#[wasm_bindgen_test]
async fn throwing_subscriber_does_not_block_the_next_one() {
    let config = r#"{ "storage_key": "eggs_subscriber_test" }"#.to_string();
    let eggs = EasterEggs::new(Some(config)).unwrap();
    eggs.reset();

    eggs.subscribe(Function::new_no_args("throw new Error('subscriber failed')"));
    let (discoveries, subscriber) = counter("achievement-discovered");
    eggs.subscribe(as_function(&subscriber));

    assert!(eggs.discover("matrix"));
    settle().await;
    assert_eq!(discoveries.get(), 1);
    eggs.reset();
}

#[wasm_bindgen_test]
fn exit_closes_the_terminal() {
    let eggs = EasterEggs::new(None).unwrap();
    assert!(eggs.toggle_terminal().unwrap());
    assert!(eggs.submit_command("exit").unwrap());
    assert!(!eggs.terminal_open());
}
