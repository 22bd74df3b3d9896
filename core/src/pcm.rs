//! Capture format conversion

const S32_SCALE: f32 = 1.0 / 2_147_483_648.0;

/// Interleaved little-endian signed 32-bit PCM to mono `f32`.
///
/// Keeps the first channel of every frame; a truncated trailing frame is
/// dropped.
pub fn s32le_to_f32(bytes: &[u8], channels: usize) -> Vec<f32> {
    let frame = 4 * channels.max(1);
    bytes
        .chunks_exact(frame)
        .map(|f| i32::from_le_bytes([f[0], f[1], f[2], f[3]]) as f32 * S32_SCALE)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bytes(values: &[i32]) -> Vec<u8> {
        values.iter().flat_map(|v| v.to_le_bytes()).collect()
    }

    #[test]
    fn test_mono_conversion() {
        let samples = s32le_to_f32(&bytes(&[0, i32::MIN, 1 << 30]), 1);
        assert_eq!(samples, vec![0.0, -1.0, 0.5]);
    }

    #[test]
    fn test_first_channel_only() {
        let samples = s32le_to_f32(&bytes(&[1 << 30, i32::MIN, -(1 << 30), 0]), 2);
        assert_eq!(samples, vec![0.5, -0.5]);
    }

    #[test]
    fn test_truncated_frame_ignored() {
        let mut raw = bytes(&[1 << 30]);
        raw.extend_from_slice(&[1, 2]);
        assert_eq!(s32le_to_f32(&raw, 1), vec![0.5]);
        assert!(s32le_to_f32(&[], 1).is_empty());
    }
}
