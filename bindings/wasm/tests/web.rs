use cw_wasm::{decode_window, decoder_config, synthesize_cw, CwTracker};
use wasm_bindgen_test::*;

#[wasm_bindgen_test]
fn synthesize_and_decode() {
    let samples = synthesize_cw("TEST", r#"{"frequencyHz": 700}"#).unwrap().to_vec();
    assert!(!samples.is_empty());

    let result = decode_window(&samples, 44100, "").unwrap();
    let tones = js_sys::Reflect::get(&result, &"tones".into()).unwrap();
    let tones = js_sys::Array::from(&tones);
    assert_eq!(tones.length(), 1);
    let text = js_sys::Reflect::get(&tones.get(0), &"text".into()).unwrap();
    assert_eq!(text.as_string().as_deref(), Some("TEST"));
}

#[wasm_bindgen_test]
fn tracker_confirms_word() {
    let samples = synthesize_cw("CQ CQ", "").unwrap().to_vec();
    let mut tracker = CwTracker::new("").unwrap();
    let window = tracker.window_length(44100);

    // One continuous transmission cut into capture windows, then silence
    let mut windows = 0;
    for chunk in samples.chunks(window) {
        let mut chunk = chunk.to_vec();
        chunk.resize(window, 0.0);
        tracker.apply(&chunk, 44100).unwrap();
        windows += 1;
    }
    let update = tracker.apply(&vec![0.0; window], 44100).unwrap();
    windows += 1;

    let status = js_sys::Reflect::get(&update, &"status".into()).unwrap();
    assert_eq!(status.as_string().as_deref(), Some("confirmed"));
    assert_eq!(tracker.windows(), windows);
    assert_eq!(tracker.history(), vec!["CQ CQ".to_string()]);
}

#[wasm_bindgen_test]
fn malformed_config_is_rejected() {
    assert!(decoder_config("{not json").is_err());
    assert!(CwTracker::new("{not json").is_err());
    assert!(decode_window(&[0.0; 100], 44100, "[1, 2]").is_err());
}

#[wasm_bindgen_test]
fn invalid_config_is_rejected() {
    assert!(decoder_config(r#"{"edgeThreshold": 2.0}"#).is_err());
    let json = decoder_config(r#"{"maxTones": 1}"#).unwrap();
    assert!(json.contains("\"maxTones\":1"));
}
