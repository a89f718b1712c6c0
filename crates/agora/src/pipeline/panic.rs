//! Panic boundary for pipeline runs.
//!
//! A process-wide panic hook captures the backtrace of panics raised inside
//! [`contain`] and keeps them off stderr, so the pipeline can log each one as
//! a single structured event. Panics on other threads go to the previous hook.

use std::{
    any::Any,
    backtrace::Backtrace,
    cell::{Cell, RefCell},
    panic::{self, AssertUnwindSafe},
    sync::Once,
};

thread_local! {
    static IN_PIPELINE: Cell<bool> = const { Cell::new(false) };
    static LAST_BACKTRACE: RefCell<Option<String>> = const { RefCell::new(None) };
}

static HOOK: Once = Once::new();

/// A panic caught by [`contain`].
#[derive(Debug, Clone)]
pub struct Contained {
    pub message: String,
    pub backtrace: String,
}

pub fn install_hook() {
    HOOK.call_once(|| {
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            if IN_PIPELINE.with(Cell::get) {
                let location = info
                    .location()
                    .map(|l| format!("{}:{}:{}", l.file(), l.line(), l.column()))
                    .unwrap_or_default();
                let trace = format!("at {location}\n{}", Backtrace::force_capture());
                LAST_BACKTRACE.with(|slot| *slot.borrow_mut() = Some(trace));
            } else {
                previous(info);
            }
        }));
    });
}

/// Runs `f`, turning a panic into [`Contained`].
pub fn contain<T>(f: impl FnOnce() -> T) -> Result<T, Contained> {
    install_hook();
    let was_inside = IN_PIPELINE.with(|flag| flag.replace(true));
    let result = panic::catch_unwind(AssertUnwindSafe(f));
    IN_PIPELINE.with(|flag| flag.set(was_inside));

    result.map_err(|payload| Contained {
        message: panic_message(payload.as_ref()),
        backtrace: LAST_BACKTRACE
            .with(|slot| slot.borrow_mut().take())
            .unwrap_or_else(|| "<no backtrace captured>".to_string()),
    })
}

pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(text) = payload.downcast_ref::<&str>() {
        (*text).to_string()
    } else if let Some(text) = payload.downcast_ref::<String>() {
        text.clone()
    } else {
        "unknown panic".to_string()
    }
}
