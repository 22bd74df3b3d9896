// WebAssembly bindings for the CW decoder
use cw_core::types::*;
use cw_core::{pipeline, synth, AnalysisBuffer, SymbolTable, Tracker};
use js_sys::Float32Array;
use wasm_bindgen::prelude::*;

mod support;

// Console logging for debugging
#[wasm_bindgen]
extern "C" {
    #[wasm_bindgen(js_namespace = console)]
    fn log(s: &str);
}

#[allow(unused_macros)]
macro_rules! console_log {
    ($($t:tt)*) => (log(&format_args!($($t)*).to_string()))
}

// Malformed or out-of-range configs are reported, never silently replaced
fn decoder_params(config_json: &str) -> cw_core::Result<DecoderParams> {
    DecoderParams::from_json(config_json)
}

fn js_error(e: cw_core::Error) -> JsValue {
    JsValue::from_str(&e.to_string())
}

/// Decode one window of mono samples. Returns a `WindowResult` object.
#[wasm_bindgen(js_name = decodeWindow)]
pub fn decode_window(samples: &[f32], sample_rate: u32, config_json: &str) -> Result<JsValue, JsValue> {
    let params = decoder_params(config_json).map_err(js_error)?;
    let result = pipeline::decode_window(samples, sample_rate, &params, SymbolTable::standard());
    support::to_js(&result)
}

/// Effective decoder configuration after applying defaults
#[wasm_bindgen(js_name = decoderConfig)]
pub fn decoder_config(config_json: &str) -> Result<String, JsValue> {
    let params = decoder_params(config_json).map_err(js_error)?;
    serde_json::to_string(&params).map_err(|e| JsValue::from_str(&e.to_string()))
}

// Streaming tracker for callers that feed capture windows themselves.
// Windows accumulate until one holds no tone, same as the native listener.
#[wasm_bindgen]
pub struct CwTracker {
    params: DecoderParams,
    tracker: Tracker,
    analysis: Option<AnalysisBuffer>,
    windows: u32,
}

#[wasm_bindgen]
impl CwTracker {
    #[wasm_bindgen(constructor)]
    pub fn new(config_json: &str) -> Result<CwTracker, JsValue> {
        let params = decoder_params(config_json).map_err(js_error)?;
        let tracker = Tracker::new(&params);
        Ok(CwTracker {
            params,
            tracker,
            analysis: None,
            windows: 0,
        })
    }

    /// Add a capture window, decode the transmission so far and fold it in.
    /// Returns a `DisplayUpdate` object.
    pub fn apply(&mut self, samples: &[f32], sample_rate: u32) -> Result<JsValue, JsValue> {
        let params = &self.params;
        if self.analysis.as_ref().map(AnalysisBuffer::sample_rate) != Some(sample_rate) {
            self.analysis = Some(AnalysisBuffer::new(params, sample_rate));
        }
        let analysis = self
            .analysis
            .get_or_insert_with(|| AnalysisBuffer::new(params, sample_rate));
        let job = analysis.push_window(samples, params);
        let mut result =
            pipeline::decode_window(&job.samples, sample_rate, params, SymbolTable::standard());
        result.finished = job.finished;
        let update = self.tracker.apply(&result);
        self.windows += 1;
        support::to_js(&update)
    }

    pub fn snapshot(&self) -> Result<JsValue, JsValue> {
        support::to_js(&self.tracker.snapshot())
    }

    #[wasm_bindgen(getter)]
    pub fn history(&self) -> Vec<String> {
        self.tracker.history().to_vec()
    }

    #[wasm_bindgen(getter)]
    pub fn windows(&self) -> u32 {
        self.windows
    }

    #[wasm_bindgen(js_name = windowLength)]
    pub fn window_length(&self, sample_rate: u32) -> usize {
        self.params.window_len(sample_rate)
    }
}

// Main JavaScript API functions

fn synthesize(text: &str, params: &SynthParams) -> cw_core::Result<Vec<f32>> {
    let samples = synth::synthesize(text, params, SymbolTable::standard())?;
    console_log!(
        "synthesized {} samples at {} Hz",
        samples.len(),
        params.sample_rate
    );
    Ok(samples)
}

wasm_fn! {
    /// Render text as keyed CW audio
    pub fn synthesize_cw(text: &str, config_json: &str) -> Result<Float32Array, JsValue>
    as synthesizeCw with synthesize, SynthParams, |samples: Vec<f32>| Float32Array::from(samples.as_slice())
}
