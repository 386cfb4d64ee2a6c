//! Engine id constants.
//!
//! The id space is closed and dense: `NONE = 0` is the pass-through slot,
//! engines occupy `1..=27` with no gaps. Ids are stable across releases;
//! new engines append, nothing renumbers.

/// Pass-through slot.
pub const NONE: u16 = 0;
/// FFT-partitioned convolution reverb.
pub const CONVOLUTION_REVERB: u16 = 1;
/// Algorithmic comb/allpass plate reverb.
pub const PLATE_REVERB: u16 = 2;
/// Wow/flutter tape echo.
pub const TAPE_ECHO: u16 = 3;
/// Ping-pong digital delay.
pub const DIGITAL_DELAY: u16 = 4;
/// Three-band vintage console EQ.
pub const CONSOLE_EQ: u16 = 5;
/// Multimode state variable filter.
pub const MULTIMODE_FILTER: u16 = 6;
/// Envelope-driven wah.
pub const AUTO_WAH: u16 = 7;
/// Soft-knee compressor.
pub const COMPRESSOR: u16 = 8;
/// Downward noise gate.
pub const NOISE_GATE: u16 = 9;
/// Lookahead brickwall limiter.
pub const LIMITER: u16 = 10;
/// Tape saturation.
pub const TAPE_SATURATION: u16 = 11;
/// Harmonic exciter.
pub const EXCITER: u16 = 12;
/// Oversampled waveshaping distortion.
pub const DISTORTION: u16 = 13;
/// Bit depth and sample rate reduction.
pub const BITCRUSHER: u16 = 14;
/// Wavefolding distortion.
pub const WAVEFOLDER: u16 = 15;
/// Dual-voice chorus.
pub const CHORUS: u16 = 16;
/// Swept-comb flanger with feedback.
pub const FLANGER: u16 = 17;
/// Four-stage allpass phaser.
pub const PHASER: u16 = 18;
/// Amplitude tremolo.
pub const TREMOLO: u16 = 19;
/// Micro pitch-shift detune.
pub const DETUNE: u16 = 20;
/// Mid/side stereo widener.
pub const WIDENER: u16 = 21;
/// Low-band mono fold-down.
pub const MONO_MAKER: u16 = 22;
/// Per-band phase rotation and alignment.
pub const PHASE_ALIGN: u16 = 23;
/// STFT spectral gate.
pub const SPECTRAL_GATE: u16 = 24;
/// STFT spectral freeze.
pub const SPECTRAL_FREEZE: u16 = 25;
/// Ring modulator.
pub const RING_MOD: u16 = 26;
/// Gain/pan/phase utility.
pub const GAIN_UTILITY: u16 = 27;

/// Number of ids in the closed space, `NONE` included.
pub const ENGINE_COUNT: u16 = 28;
