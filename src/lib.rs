// ==================== Imports ====================
use anyhow::{anyhow, Result};
use engine::input;
use engine::{GameLoop, Size};
use events::{EventBus, EventKind, GalleryEvent, Subscription};
use futures::channel::mpsc::{unbounded, UnboundedSender};
use game::{Gallery, Mount, ShellCommand};
use std::cell::Cell;
use std::rc::Rc;
use wasm_bindgen::prelude::*;
use wasm_bindgen::{JsCast, JsValue};

#[macro_use]
pub mod browser;
pub mod assets;
pub mod camera;
pub mod config;
pub mod content;
pub mod controller;
pub mod engine;
pub mod events;
pub mod game;
pub mod layout;
pub mod sprite;
pub mod trigger;

use config::SceneConfig;
use gloo_events::EventListener;

// ==================== Main Functions ====================
/// Runs once when the module is instantiated
#[wasm_bindgen(start)]
pub fn main_js() {
    // setup better panic messages for debugging
    console_error_panic_hook::set_once();
}

/// Entry for the page shell
/// - `config` : optional SceneConfig object
/// - `handlers` : `{ showProject(project), showAbout(), showContact() }`
/// - returns the handle the shell keeps until it unmounts the scene
#[wasm_bindgen]
pub fn mount(config: JsValue, handlers: JsValue) -> Result<GalleryHandle, JsValue> {
    GalleryHandle::mount(config, handlers).map_err(|err| JsValue::from_str(&format!("{:#}", err)))
}

/// Subscribe the shell's JS callbacks on `bus`, missing ones are skipped
/// - `showProject` receives the project as a plain JS object
pub fn subscribe_handlers(bus: &EventBus, handlers: &JsValue) -> Result<Vec<Subscription>> {
    if !handlers.is_object() {
        log!("No shell handlers given, scene events will be dropped");
        return Ok(Vec::new());
    }
    let mut subscriptions = Vec::new();
    for kind in EventKind::ALL {
        let value = js_sys::Reflect::get(handlers, &JsValue::from_str(kind.name()))
            .map_err(|err| anyhow!("Could not read handler '{}' : {:#?}", kind.name(), err))?;
        let Some(function) = value.dyn_ref::<js_sys::Function>().cloned() else {
            log!("Handler '{}' is not a function, skipped", kind.name());
            continue;
        };
        let subscription = bus.subscribe(
            kind,
            Box::new(move |event: &GalleryEvent| {
                let payload = match event {
                    GalleryEvent::ShowProject(project) => serde_wasm_bindgen::to_value(project),
                    GalleryEvent::ShowAbout | GalleryEvent::ShowContact => Ok(JsValue::UNDEFINED),
                };
                let outcome = payload
                    .map_err(|err| anyhow!("Could not convert payload : {}", err))
                    .and_then(|payload| {
                        function
                            .call1(&JsValue::NULL, &payload)
                            .map_err(|err| anyhow!("Handler threw : {:#?}", err))
                    });
                if let Err(err) = outcome {
                    error!("{} : {:#}", event.kind().name(), err);
                }
            }),
        )?;
        subscriptions.push(subscription);
    }
    Ok(subscriptions)
}

fn parse_config(config: JsValue) -> Result<SceneConfig> {
    if config.is_undefined() || config.is_null() {
        return Ok(SceneConfig::default());
    }
    let config: SceneConfig =
        serde_wasm_bindgen::from_value(config).map_err(|err| anyhow!("Invalid scene config : {}", err))?;
    Ok(config.sanitized())
}

// ==================== Handle ====================
struct Mounted {
    running: Rc<Cell<bool>>,
    commands: UnboundedSender<ShellCommand>,
    bus: EventBus,
    subscriptions: Vec<Subscription>,
    // dropping these unregisters them from the DOM
    listeners: Vec<EventListener>,
}

/// Owned by the shell, everything the scene registered hangs off it
#[wasm_bindgen]
pub struct GalleryHandle {
    mounted: Option<Mounted>,
}

impl GalleryHandle {
    fn mount(config: JsValue, handlers: JsValue) -> Result<GalleryHandle> {
        let config = parse_config(config)?;
        let bus = EventBus::new();
        let subscriptions = subscribe_handlers(&bus, &handlers)?;

        let (width, height) = browser::viewport_size()?;
        browser::resize_canvas(width, height)?;
        let viewport = Size { width, height };
        let supports_touch = match config.supports_touch {
            Some(supports_touch) => supports_touch,
            None => browser::supports_touch()?,
        };

        let (command_tx, command_rx) = unbounded::<ShellCommand>();
        let (input_rx, mut listeners) = input::prepare_input()?;
        let tx = command_tx.clone();
        let window: web_sys::EventTarget = browser::window()?.into();
        listeners.push(EventListener::new(&window, "resize", move |_| {
            match browser::viewport_size() {
                Ok((width, height)) => send_resize(&tx, width, height),
                Err(err) => error!("{:#}", err),
            }
        }));

        let running = Rc::new(Cell::new(true));
        let game = Gallery::new(Mount {
            config,
            bus: bus.clone(),
            commands: command_rx,
            supports_touch,
            viewport,
        });
        let loop_running = running.clone();
        browser::spawn_local(async move {
            if let Err(err) = GameLoop::start(game, input_rx, loop_running).await {
                error!("Could not start gallery : {:#}", err);
            }
        });
        log!("Gallery mounted at {}x{} (touch: {})", width, height, supports_touch);

        Ok(GalleryHandle {
            mounted: Some(Mounted {
                running,
                commands: command_tx,
                bus,
                subscriptions,
                listeners,
            }),
        })
    }

    fn send(&self, command: ShellCommand) {
        match &self.mounted {
            Some(mounted) => {
                if let Err(err) = mounted.commands.unbounded_send(command) {
                    error!("Could not reach scene : {:#?}", err);
                }
            }
            None => log!("{:?} ignored, gallery was torn down", command),
        }
    }
}

fn send_resize(commands: &UnboundedSender<ShellCommand>, width: f32, height: f32) {
    if let Err(err) = browser::resize_canvas(width, height) {
        error!("{:#}", err);
        return;
    }
    if let Err(err) = commands.unbounded_send(ShellCommand::Resize(Size { width, height })) {
        error!("Could not reach scene : {:#?}", err);
    }
}

#[wasm_bindgen]
impl GalleryHandle {
    /// The shell closed its modal, regions are clickable again
    #[wasm_bindgen(js_name = enableTriggers)]
    pub fn enable_triggers(&self) {
        self.send(ShellCommand::EnableTriggers);
    }

    pub fn resize(&self, width: f32, height: f32) {
        match &self.mounted {
            Some(mounted) => send_resize(&mounted.commands, width, height),
            None => log!("resize ignored, gallery was torn down"),
        }
    }

    /// Stop the loop, drop DOM listeners and event handlers
    /// - safe to call more than once
    pub fn teardown(&mut self) {
        let Some(mounted) = self.mounted.take() else {
            return;
        };
        mounted.running.set(false);
        mounted.commands.close_channel();
        for subscription in &mounted.subscriptions {
            mounted.bus.unsubscribe(subscription);
        }
        mounted.bus.clear();
        drop(mounted.listeners);
        log!("Gallery torn down");
    }

    #[wasm_bindgen(getter, js_name = isMounted)]
    pub fn is_mounted(&self) -> bool {
        self.mounted.is_some()
    }
}

impl Drop for GalleryHandle {
    fn drop(&mut self) {
        self.teardown();
    }
}
