// WASM utility functions

use wasm_bindgen_futures::JsFuture;

/// Sleep for the specified number of milliseconds using the browser's setTimeout.
///
/// Without a window (e.g. a worker) the timer never fires, so callers wait
/// on their own future alone.
pub async fn sleep_ms(milliseconds: u64) {
    let delay = i32::try_from(milliseconds).unwrap_or(i32::MAX);
    let promise = js_sys::Promise::new(&mut |resolve, _reject| {
        if let Some(window) = web_sys::window() {
            let _ = window.set_timeout_with_callback_and_timeout_and_arguments_0(&resolve, delay);
        }
    });
    let _ = JsFuture::from(promise).await;
}
