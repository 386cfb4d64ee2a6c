//! Digital delay.
//!
//! Clean stereo delay with optional ping-pong routing and a high-cut
//! filter inside the feedback loop. Where the tape echo colors every
//! repeat, this one keeps repeats transparent until the loop filter is
//! brought down; the ping-pong control continuously morphs straight
//! feedback into full cross-channel feedback.
//!
//! # Parameters
//!
//! | Index | Name      | Mapping                          |
//! |-------|-----------|----------------------------------|
//! | 0     | Time      | 10 ms – 2000 ms                  |
//! | 1     | Feedback  | 0 – 1.05 loop gain, clamped      |
//! | 2     | Ping-pong | straight ↔ crossed feedback      |
//! | 3     | High Cut  | loop filter 1 kHz – 20 kHz       |
//! | 4     | Mix       | dry/wet                          |
//! | 5     | Sync      | above 0.5, time snaps to the beat grid |

use libm::powf;
use marea_core::engine::{clamp_norm, clamp_sample_rate};
use marea_core::{
    DenormalGuard, Engine, EngineCategory, EngineInfo, FractionalDelay, OnePole, SmoothedParam,
    StereoBlock, TransportInfo, flush_denormal, hard_clip, snap_to_division, wet_dry_mix,
};

use crate::ids;

const PARAM_COUNT: usize = 6;
const MIX_PARAM: usize = 4;

const MIN_DELAY_SECONDS: f32 = 0.010;
const MAX_DELAY_SECONDS: f32 = 2.0;

/// Ping-pong digital delay (see module docs for the parameter map).
pub struct DigitalDelay {
    sample_rate: f32,
    time: SmoothedParam,
    feedback: SmoothedParam,
    ping_pong: SmoothedParam,
    high_cut: SmoothedParam,
    mix: SmoothedParam,
    sync: bool,
    transport: TransportInfo,
    line_l: FractionalDelay,
    line_r: FractionalDelay,
    loop_filter_l: OnePole,
    loop_filter_r: OnePole,
    fb_l: f32,
    fb_r: f32,
    applied_cut: f32,
}

impl DigitalDelay {
    /// Create an unprepared engine with roster defaults.
    pub fn new() -> Self {
        let sample_rate = 48_000.0;
        Self {
            sample_rate,
            time: SmoothedParam::with_config(0.25, sample_rate, 80.0),
            feedback: SmoothedParam::with_config(0.35, sample_rate, 20.0),
            ping_pong: SmoothedParam::with_config(0.0, sample_rate, 20.0),
            high_cut: SmoothedParam::with_config(1.0, sample_rate, 20.0),
            mix: SmoothedParam::with_config(0.35, sample_rate, 20.0),
            sync: false,
            transport: TransportInfo::default(),
            line_l: FractionalDelay::from_time(sample_rate, MAX_DELAY_SECONDS),
            line_r: FractionalDelay::from_time(sample_rate, MAX_DELAY_SECONDS),
            loop_filter_l: OnePole::new(sample_rate, 20_000.0),
            loop_filter_r: OnePole::new(sample_rate, 20_000.0),
            fb_l: 0.0,
            fb_r: 0.0,
            applied_cut: -1.0,
        }
    }

    fn delay_seconds(&self, norm: f32) -> f32 {
        let seconds = MIN_DELAY_SECONDS + norm * (MAX_DELAY_SECONDS - MIN_DELAY_SECONDS);
        if self.sync && self.transport.has_tempo() {
            snap_to_division(seconds, self.transport.bpm)
                .clamp(MIN_DELAY_SECONDS, MAX_DELAY_SECONDS)
        } else {
            seconds
        }
    }

    fn cut_hz(norm: f32) -> f32 {
        1_000.0 * powf(20.0, norm)
    }
}

impl Default for DigitalDelay {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine for DigitalDelay {
    fn prepare(&mut self, sample_rate: f32, _max_block: usize) {
        let sr = clamp_sample_rate(sample_rate);
        self.sample_rate = sr;
        self.line_l = FractionalDelay::from_time(sr, MAX_DELAY_SECONDS);
        self.line_r = FractionalDelay::from_time(sr, MAX_DELAY_SECONDS);
        self.loop_filter_l.set_sample_rate(sr);
        self.loop_filter_r.set_sample_rate(sr);
        for p in [
            &mut self.time,
            &mut self.feedback,
            &mut self.ping_pong,
            &mut self.high_cut,
            &mut self.mix,
        ] {
            p.set_sample_rate(sr);
            p.snap_to_target();
        }
        self.applied_cut = -1.0;
        self.reset();
    }

    fn process(&mut self, block: &mut StereoBlock<'_>) {
        let _guard = DenormalGuard::new();
        for (l, r) in block.frames_mut() {
            let time_norm = self.time.advance();
            let delay_samples = self.delay_seconds(time_norm) * self.sample_rate;
            let feedback = self.feedback.advance() * 1.05;
            let cross = self.ping_pong.advance();
            let cut_norm = self.high_cut.advance();
            let mix = self.mix.advance();

            if (cut_norm - self.applied_cut).abs() > 1e-3 {
                let hz = Self::cut_hz(cut_norm);
                self.loop_filter_l.set_frequency(hz);
                self.loop_filter_r.set_frequency(hz);
                self.applied_cut = cut_norm;
            }

            let tap_l = self.line_l.read(delay_samples);
            let tap_r = self.line_r.read(delay_samples);

            // Crossed portion of each channel's feedback comes from the
            // opposite tap; the loop is clamped rather than saturated.
            let loop_l = tap_l * (1.0 - cross) + tap_r * cross;
            let loop_r = tap_r * (1.0 - cross) + tap_l * cross;
            self.fb_l = flush_denormal(hard_clip(
                self.loop_filter_l.process(loop_l * feedback),
                2.0,
            ));
            self.fb_r = flush_denormal(hard_clip(
                self.loop_filter_r.process(loop_r * feedback),
                2.0,
            ));

            self.line_l.write(*l + self.fb_l);
            self.line_r.write(*r + self.fb_r);

            *l = wet_dry_mix(*l, tap_l, mix);
            *r = wet_dry_mix(*r, tap_r, mix);
        }
        block.scrub();
    }

    fn reset(&mut self) {
        self.line_l.clear();
        self.line_r.clear();
        self.loop_filter_l.reset();
        self.loop_filter_r.reset();
        self.fb_l = 0.0;
        self.fb_r = 0.0;
        for p in [
            &mut self.time,
            &mut self.feedback,
            &mut self.ping_pong,
            &mut self.high_cut,
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
            2 => self.ping_pong.set_target(value),
            3 => self.high_cut.set_target(value),
            4 => self.mix.set_target(value),
            5 => self.sync = value > 0.5,
            _ => {}
        }
    }

    fn info(&self) -> EngineInfo {
        EngineInfo {
            id: ids::DIGITAL_DELAY,
            name: "Digital Delay",
            category: EngineCategory::Delay,
            param_count: PARAM_COUNT,
            mix_param: Some(MIX_PARAM),
        }
    }

    fn set_transport(&mut self, transport: TransportInfo) {
        self.transport = transport;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(delay: &mut DigitalDelay, left: &[f32], right: &[f32]) -> (Vec<f32>, Vec<f32>) {
        let mut l = left.to_vec();
        let mut r = right.to_vec();
        for start in (0..left.len()).step_by(256) {
            let end = (start + 256).min(left.len());
            let (lh, rh) = (&mut l[start..end], &mut r[start..end]);
            let mut block = StereoBlock::new(lh, rh);
            delay.process(&mut block);
        }
        (l, r)
    }

    #[test]
    fn echo_lands_at_the_set_time() {
        let mut delay = DigitalDelay::new();
        delay.set_param(0, 0.045_226); // ~100 ms
        delay.set_param(1, 0.0);
        delay.set_param(4, 1.0);
        delay.prepare(48_000.0, 256);
        let len = 24_000;
        let mut left = vec![0.0f32; len];
        left[0] = 1.0;
        let right = left.clone();
        let (l, _) = run(&mut delay, &left, &right);
        let expected = 4_800;
        let peak = l
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.abs().total_cmp(&b.1.abs()))
            .map(|(n, _)| n)
            .unwrap();
        assert!(
            (peak as i64 - expected).abs() <= 48,
            "echo at {peak}, expected ~{expected}"
        );
    }

    #[test]
    fn ping_pong_bounces_to_the_other_channel() {
        let mut delay = DigitalDelay::new();
        delay.set_param(0, 0.045_226);
        delay.set_param(1, 0.6);
        delay.set_param(2, 1.0); // fully crossed
        delay.set_param(4, 1.0);
        delay.prepare(48_000.0, 256);
        let len = 24_000;
        let mut left = vec![0.0f32; len];
        left[0] = 1.0;
        let right = vec![0.0f32; len];
        let (_, r) = run(&mut delay, &left, &right);
        // The second repeat (~200 ms) is the first to arrive on the right.
        let window = &r[9_000..10_200];
        let peak = window.iter().fold(0.0f32, |acc, s| acc.max(s.abs()));
        assert!(peak > 0.1, "crossed feedback should land right, peak {peak}");
        let early = &r[0..4_000];
        assert!(early.iter().all(|s| s.abs() < 1e-3), "right starts silent");
    }

    #[test]
    fn full_feedback_stays_bounded() {
        let mut delay = DigitalDelay::new();
        delay.set_param(0, 0.02);
        delay.set_param(1, 1.0);
        delay.set_param(4, 0.5);
        delay.prepare(48_000.0, 256);
        let left: Vec<f32> = (0..96_000)
            .map(|n| 0.5 * libm::sinf(core::f32::consts::TAU * 220.0 * n as f32 / 48_000.0))
            .collect();
        let right = left.clone();
        let (l, _) = run(&mut delay, &left, &right);
        assert!(l.iter().all(|s| s.is_finite() && s.abs() <= 4.0));
    }

    #[test]
    fn sync_snaps_to_the_grid() {
        let mut delay = DigitalDelay::new();
        delay.set_param(5, 1.0);
        delay.set_transport(TransportInfo {
            bpm: 120.0,
            ..TransportInfo::default()
        });
        // 0.121 norm is ~251 ms free-running; the nearest division at
        // 120 BPM is the eighth note, 250 ms.
        let snapped = delay.delay_seconds(0.121);
        assert!((snapped - 0.25).abs() < 1e-3, "got {snapped}");
    }
}
