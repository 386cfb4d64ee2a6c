//! Tape echo.
//!
//! Feedback delay with the mechanical misbehavior of a tape loop: slow
//! wow (0.5 Hz) and fast flutter (~5.7 Hz) modulate the playback-head
//! position, and every pass through the loop goes through an asymmetric
//! tape saturator, so repeats get darker and rounder instead of louder.
//!
//! # Parameters
//!
//! | Index | Name        | Mapping                              |
//! |-------|-------------|--------------------------------------|
//! | 0     | Time        | 10 ms – 2000 ms, linear              |
//! | 1     | Feedback    | 0 – 1.15 loop gain (saturation-bounded) |
//! | 2     | Wow/Flutter | modulation depth                     |
//! | 3     | Saturation  | tape drive                           |
//! | 4     | Mix         | dry/wet                              |
//! | 5     | Sync        | > 0.5 snaps Time to note divisions   |
//!
//! With Sync on and a valid transport tempo, the time parameter is
//! quantized to the nearest note division. A host that reports no tempo
//! (`bpm <= 0`) leaves the free time in effect.

use marea_core::engine::{clamp_norm, clamp_sample_rate};
use marea_core::{
    DcBlocker, DenormalGuard, Engine, EngineCategory, EngineInfo, FractionalDelay, Interpolation,
    Lfo, SmoothedParam, StereoBlock, TransportInfo, flush_denormal, snap_to_division, tape_saturate,
    wet_dry_mix,
};

use crate::ids;

const PARAM_COUNT: usize = 6;
const MIX_PARAM: usize = 4;

const MIN_TIME_MS: f32 = 10.0;
const MAX_TIME_MS: f32 = 2_000.0;
const WOW_RATE_HZ: f32 = 0.5;
const FLUTTER_RATE_HZ: f32 = 5.7;
const WOW_DEPTH_MS: f32 = 3.0;
const FLUTTER_DEPTH_MS: f32 = 0.35;

/// Wow/flutter tape echo (see module docs for the parameter map).
pub struct TapeEcho {
    sample_rate: f32,
    time: SmoothedParam,
    feedback: SmoothedParam,
    wow_flutter: SmoothedParam,
    saturation: SmoothedParam,
    mix: SmoothedParam,
    sync: f32,
    transport: TransportInfo,
    delay_l: FractionalDelay,
    delay_r: FractionalDelay,
    wow: Lfo,
    flutter: Lfo,
    dc_l: DcBlocker,
    dc_r: DcBlocker,
}

impl TapeEcho {
    /// Create an unprepared engine with roster defaults.
    pub fn new() -> Self {
        let sample_rate = 48_000.0;
        let mut delay_l = FractionalDelay::from_time(sample_rate, MAX_TIME_MS * 1e-3 + 0.1);
        let mut delay_r = FractionalDelay::from_time(sample_rate, MAX_TIME_MS * 1e-3 + 0.1);
        delay_l.set_interpolation(Interpolation::Cubic);
        delay_r.set_interpolation(Interpolation::Cubic);
        Self {
            sample_rate,
            time: SmoothedParam::with_config(0.375, sample_rate, 100.0),
            feedback: SmoothedParam::with_config(0.35, sample_rate, 20.0),
            wow_flutter: SmoothedParam::with_config(0.25, sample_rate, 20.0),
            saturation: SmoothedParam::with_config(0.3, sample_rate, 20.0),
            mix: SmoothedParam::with_config(0.35, sample_rate, 20.0),
            sync: 0.0,
            transport: TransportInfo::default(),
            delay_l,
            delay_r,
            wow: Lfo::new(sample_rate, WOW_RATE_HZ),
            flutter: Lfo::new(sample_rate, FLUTTER_RATE_HZ),
            dc_l: DcBlocker::new(sample_rate),
            dc_r: DcBlocker::new(sample_rate),
        }
    }

    /// Time parameter mapped to seconds, with tempo sync applied.
    fn delay_seconds(&self) -> f32 {
        let free = (MIN_TIME_MS + self.time.get() * (MAX_TIME_MS - MIN_TIME_MS)) * 1e-3;
        if self.sync > 0.5 && self.transport.has_tempo() {
            snap_to_division(free, self.transport.bpm).clamp(MIN_TIME_MS * 1e-3, MAX_TIME_MS * 1e-3)
        } else {
            free
        }
    }
}

impl Default for TapeEcho {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine for TapeEcho {
    fn prepare(&mut self, sample_rate: f32, _max_block: usize) {
        let sr = clamp_sample_rate(sample_rate);
        self.sample_rate = sr;
        self.delay_l = FractionalDelay::from_time(sr, MAX_TIME_MS * 1e-3 + 0.1);
        self.delay_r = FractionalDelay::from_time(sr, MAX_TIME_MS * 1e-3 + 0.1);
        self.delay_l.set_interpolation(Interpolation::Cubic);
        self.delay_r.set_interpolation(Interpolation::Cubic);
        for p in [
            &mut self.time,
            &mut self.feedback,
            &mut self.wow_flutter,
            &mut self.saturation,
            &mut self.mix,
        ] {
            p.set_sample_rate(sr);
        }
        self.wow.set_sample_rate(sr);
        self.flutter.set_sample_rate(sr);
        self.dc_l.set_sample_rate(sr);
        self.dc_r.set_sample_rate(sr);
        self.reset();
    }

    fn process(&mut self, block: &mut StereoBlock<'_>) {
        let _guard = DenormalGuard::new();
        let sr = self.sample_rate;
        for (l, r) in block.frames_mut() {
            self.time.advance();
            let feedback = self.feedback.advance() * 1.15;
            let depth = self.wow_flutter.advance();
            let drive = self.saturation.advance();
            let mix = self.mix.advance();

            // Head position wobbles around the nominal delay.
            let wobble_ms = self.wow.next() * WOW_DEPTH_MS * depth
                + self.flutter.next() * FLUTTER_DEPTH_MS * depth;
            let delay_samples =
                ((self.delay_seconds() + wobble_ms * 1e-3) * sr).max(1.0);

            let tape_l = self.delay_l.read(delay_samples);
            let tape_r = self.delay_r.read(delay_samples);

            // Saturation inside the loop bounds feedback above unity.
            let loop_l = self.dc_l.process(tape_saturate(tape_l * feedback, drive));
            let loop_r = self.dc_r.process(tape_saturate(tape_r * feedback, drive));
            self.delay_l.write(flush_denormal(*l + loop_l));
            self.delay_r.write(flush_denormal(*r + loop_r));

            *l = wet_dry_mix(*l, tape_saturate(tape_l, drive * 0.5), mix);
            *r = wet_dry_mix(*r, tape_saturate(tape_r, drive * 0.5), mix);
        }
        block.scrub();
    }

    fn reset(&mut self) {
        self.delay_l.clear();
        self.delay_r.clear();
        self.wow.reset();
        self.flutter.reset();
        self.dc_l.reset();
        self.dc_r.reset();
        for p in [
            &mut self.time,
            &mut self.feedback,
            &mut self.wow_flutter,
            &mut self.saturation,
            &mut self.mix,
        ] {
            p.snap_to_target();
        }
    }

    fn set_param(&mut self, index: usize, value: f32) {
        let value = clamp_norm(value);
        match index {
            0 => self.time.set_target(value),
            1 => self.feedback.set_target(value),
            2 => self.wow_flutter.set_target(value),
            3 => self.saturation.set_target(value),
            4 => self.mix.set_target(value),
            5 => self.sync = value,
            _ => {}
        }
    }

    fn info(&self) -> EngineInfo {
        EngineInfo {
            id: ids::TAPE_ECHO,
            name: "Tape Echo",
            category: EngineCategory::Delay,
            param_count: PARAM_COUNT,
            mix_param: Some(MIX_PARAM),
        }
    }

    fn set_transport(&mut self, transport: TransportInfo) {
        self.transport = transport;
    }
}
