use wasm_bindgen::prelude::*;
use std::sync::{Arc, Mutex, atomic::{AtomicBool, Ordering}};
#[cfg(target_arch = "wasm32")]
use std::future::Future;


#[macro_export]
macro_rules! log {
    ( $( $t:tt )* ) => {
        web_sys::console::log_1(&format!( $( $t )* ).into());
    }
}


#[wasm_bindgen(module = "/helper.js")]
extern "C" {
    pub fn get_canvas_width() -> u32;
    pub fn get_canvas_height() -> u32;
}


/// Enable better error messages if our code ever panics
pub fn set_panic_hook() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}


/// Sets error flag and appends a line to the message shown in the egui error window
#[inline(always)]
pub fn set_error_for_egui(flag: &Arc<AtomicBool>, msg: &Arc<Mutex<String>>, s: String) {
    flag.store(true, Ordering::Relaxed);
    if let Ok(mut mutex) = msg.lock() {
        if !mutex.is_empty() {
            mutex.push('\n');
        }
        *mutex += s.as_str();
    }
}


/// Executes an async Future on the current thread
#[cfg(target_arch = "wasm32")]
#[inline(always)]
pub fn execute_future<F: Future<Output = ()> + 'static>(f: F) {
    wasm_bindgen_futures::spawn_local(f);
}


/// Check if a float is zero
#[cfg(test)]
#[inline(always)]
pub fn is_float_zero(x: f32, threshold: f32) -> bool {
    x.abs() < threshold
}


/// Check if two floats are equal
#[cfg(test)]
#[inline(always)]
pub fn are_floats_equal(x: f32, y: f32, threshold: f32) -> bool {
    is_float_zero(x - y, threshold)
}


/// Incremental moving average over the last `window` samples
pub struct IncrementalMA {
    window: usize,
    samples: Vec<f64>,
    next: usize,
    sum: f64,
}
impl IncrementalMA {
    pub fn new(window: usize) -> Self {
        let window = window.max(1);
        Self {
            window,
            samples: Vec::with_capacity(window),
            next: 0,
            sum: 0.0,
        }
    }

    /// Adds a sample and returns the current average
    pub fn add(&mut self, x: f64) -> f64 {
        if !x.is_finite() {
            return self.average();
        }
        if self.samples.len() < self.window {
            self.samples.push(x);
        } else {
            self.sum -= self.samples[self.next];
            self.samples[self.next] = x;
        }
        self.sum += x;
        self.next = (self.next + 1) % self.window;
        self.average()
    }

    pub fn average(&self) -> f64 {
        if self.samples.is_empty() {
            0.0
        } else {
            self.sum / self.samples.len() as f64
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn moving_average_fills_then_slides() {
        let mut ma = IncrementalMA::new(3);
        assert_eq!(ma.average(), 0.0);
        assert_eq!(ma.add(3.0), 3.0);
        assert_eq!(ma.add(6.0), 4.5);
        assert_eq!(ma.add(9.0), 6.0);
        // oldest sample (3.0) drops out
        assert_eq!(ma.add(12.0), 9.0);
    }

    #[test]
    fn moving_average_ignores_non_finite_samples() {
        let mut ma = IncrementalMA::new(4);
        ma.add(10.0);
        assert_eq!(ma.add(f64::INFINITY), 10.0);
        assert_eq!(ma.add(f64::NAN), 10.0);
    }

    #[test]
    fn zero_window_is_clamped() {
        let mut ma = IncrementalMA::new(0);
        assert_eq!(ma.add(1.0), 1.0);
        assert_eq!(ma.add(5.0), 5.0);
    }

    #[test]
    fn float_comparison() {
        assert!(is_float_zero(1e-7, 1e-5));
        assert!(!is_float_zero(-0.1, 1e-5));
        assert!(are_floats_equal(0.1 + 0.2, 0.3, 1e-6));
        assert!(!are_floats_equal(1.0, 1.1, 1e-3));
    }

    #[test]
    fn error_messages_accumulate() {
        let flag = Arc::new(AtomicBool::new(false));
        let msg = Arc::new(Mutex::new(String::new()));
        set_error_for_egui(&flag, &msg, "first".to_string());
        set_error_for_egui(&flag, &msg, "second".to_string());
        assert!(flag.load(Ordering::Relaxed));
        assert_eq!(&*msg.lock().unwrap(), "first\nsecond");
    }
}
